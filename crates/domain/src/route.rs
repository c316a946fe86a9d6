use crate::{Role, Session};

/// Redirect destinations produced by route authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectTarget {
    /// Public sign-in entry point.
    Login,
    /// Landing page for administrators.
    AdminHome,
    /// Landing page for tutors.
    TutorHome,
}

impl RedirectTarget {
    /// Returns the path of the redirect target.
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::AdminHome => "/admin",
            Self::TutorHome => "/tutor",
        }
    }
}

/// Outcome of evaluating a navigation against the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session is still loading. Render a placeholder and do not redirect.
    Pending,
    /// Navigation refused. Redirect to `redirect`.
    Denied {
        /// Where the user is sent instead.
        redirect: RedirectTarget,
    },
    /// Protected content may be rendered.
    Granted,
}

impl RouteDecision {
    /// Returns the redirect target for denied decisions.
    #[must_use]
    pub fn redirect(&self) -> Option<RedirectTarget> {
        match self {
            Self::Denied { redirect } => Some(*redirect),
            Self::Pending | Self::Granted => None,
        }
    }
}

/// Decides whether `session` may enter a route guarded by `required_roles`.
///
/// Never fails: absence and insufficient role are expressed as redirects.
/// An authenticated user lacking the role goes to their own home, never to
/// the login page.
#[must_use]
pub fn authorize(session: &Session, required_roles: &[Role]) -> RouteDecision {
    if session.is_loading() {
        return RouteDecision::Pending;
    }

    if !session.is_authenticated() {
        return RouteDecision::Denied {
            redirect: RedirectTarget::Login,
        };
    }

    let role = session.role();
    if !required_roles.contains(&role) {
        return RouteDecision::Denied {
            redirect: role.home(),
        };
    }

    RouteDecision::Granted
}

/// What the shell should do for a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Show the loading placeholder.
    Placeholder,
    /// Replace the current location with the target.
    Redirect(RedirectTarget),
    /// Render the requested route.
    Render,
}

impl From<RouteDecision> for Navigation {
    fn from(value: RouteDecision) -> Self {
        match value {
            RouteDecision::Pending => Self::Placeholder,
            RouteDecision::Denied { redirect } => Self::Redirect(redirect),
            RouteDecision::Granted => Self::Render,
        }
    }
}

/// Top-level routes of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppRoute {
    /// `/login`, public.
    Login,
    /// `/`, sends users to their role home.
    Root,
    /// `/admin/*`, administrators only.
    Admin,
    /// `/tutor/*`, tutors and administrators.
    Tutor,
}

impl AppRoute {
    /// Maps a location path to a route. Unknown paths map to [`AppRoute::Root`].
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let first_segment = path.trim_start_matches('/').split('/').next().unwrap_or_default();

        match first_segment {
            "login" => Self::Login,
            "admin" => Self::Admin,
            "tutor" => Self::Tutor,
            _ => Self::Root,
        }
    }

    /// Returns the roles allowed into this route. Public routes return an empty slice.
    #[must_use]
    pub fn required_roles(&self) -> &'static [Role] {
        const ADMIN_ONLY: &[Role] = &[Role::Admin];

        match self {
            Self::Login => &[],
            Self::Root | Self::Tutor => Role::all(),
            Self::Admin => ADMIN_ONLY,
        }
    }

    /// Returns whether the route needs an authenticated session.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        !self.required_roles().is_empty()
    }

    /// Evaluates the route's authorization state for `session`.
    #[must_use]
    pub fn decide(&self, session: &Session) -> RouteDecision {
        if self.is_protected() {
            authorize(session, self.required_roles())
        } else {
            RouteDecision::Granted
        }
    }

    /// Resolves the navigation for `session`, including the root redirect.
    #[must_use]
    pub fn navigate(&self, session: &Session) -> Navigation {
        match (self, self.decide(session)) {
            (Self::Root, RouteDecision::Granted) => Navigation::Redirect(session.role().home()),
            (_, decision) => decision.into(),
        }
    }
}
