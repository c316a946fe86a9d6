use celoris_domain::{AppRoute, Navigation, RouteDecision, Session};
use tokio::sync::watch;

/// Re-evaluates a route's authorization on every session update.
///
/// Decisions are never cached: each call reads the latest session.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: watch::Receiver<Session>,
    route: AppRoute,
}

impl RouteGuard {
    /// Creates a guard for `route` following `session`.
    #[must_use]
    pub fn new(session: watch::Receiver<Session>, route: AppRoute) -> Self {
        Self { session, route }
    }

    /// Returns the guarded route.
    #[must_use]
    pub fn route(&self) -> AppRoute {
        self.route
    }

    /// Switches to another route.
    pub fn navigate_to(&mut self, route: AppRoute) {
        self.route = route;
    }

    /// Returns the decision for the latest session.
    #[must_use]
    pub fn decision(&self) -> RouteDecision {
        self.route.decide(&self.session.borrow())
    }

    /// Returns what the shell should do for the latest session.
    #[must_use]
    pub fn navigation(&self) -> Navigation {
        self.route.navigate(&self.session.borrow())
    }

    /// Waits for the next session update and returns the new decision.
    ///
    /// Returns `None` once the session store is gone.
    pub async fn changed(&mut self) -> Option<RouteDecision> {
        self.session.changed().await.ok()?;
        Some(self.route.decide(&self.session.borrow_and_update()))
    }

    /// Waits until the session has left the loading state and returns the decision.
    ///
    /// Returns [`RouteDecision::Pending`] only if the store is dropped while loading.
    pub async fn settle(&mut self) -> RouteDecision {
        match self.session.wait_for(|session| !session.is_loading()).await {
            Ok(session) => self.route.decide(&session),
            Err(_) => RouteDecision::Pending,
        }
    }
}
