//! Process-wide session cell.
//!
//! Holds the cached identity and loading flag behind a single
//! `tokio::sync::watch` channel. Every update carries a ticket drawn when
//! the request that produced it was issued; the cell only applies tickets
//! newer than the last applied one, so a slow response can never overwrite
//! a fresher sign-in or sign-out.
//!
//! Writes confirmed by the auth service are the exception: they apply on
//! completion as long as the cached identity is still the same principal,
//! and a later sign-in event for that principal does not overwrite them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use celoris_core::Identity;
use celoris_domain::Session;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{AuthChange, AuthProvider, ProfileReconciler};

/// Sequence number reserved before issuing a request whose result may update the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct UpdateTicket(u64);

struct SessionCell {
    sender: watch::Sender<Session>,
    next_ticket: AtomicU64,
    /// Session version produced by the last confirmed write.
    confirmed_version: AtomicU64,
}

/// Single owner of the session state.
///
/// Readers observe it through [`SessionStore::snapshot`] or
/// [`SessionStore::watch`]. Writes happen only through the auth service and
/// the change subscription.
#[derive(Clone)]
pub struct SessionStore {
    cell: Arc<SessionCell>,
    auth_provider: Arc<dyn AuthProvider>,
}

impl SessionStore {
    /// Creates a store in the initial loading state.
    #[must_use]
    pub fn new(auth_provider: Arc<dyn AuthProvider>) -> Self {
        let (sender, _) = watch::channel(Session::initial());

        Self {
            cell: Arc::new(SessionCell {
                sender,
                next_ticket: AtomicU64::new(1),
                confirmed_version: AtomicU64::new(0),
            }),
            auth_provider,
        }
    }

    /// Returns a copy of the current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.cell.sender.borrow().clone()
    }

    /// Returns a receiver notified after every applied update.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.cell.sender.subscribe()
    }

    /// Fetches the current identity and leaves the loading state.
    ///
    /// Any failure, including the absence of a session, settles to signed out.
    pub async fn initialize(&self) {
        let ticket = self.issue_ticket();
        let identity = match self.auth_provider.current_identity().await {
            Ok(identity) => Some(identity),
            Err(error) if error.is_not_found() => {
                debug!("no active session");
                None
            }
            Err(error) => {
                warn!(error = %error, "failed to fetch current identity");
                None
            }
        };

        self.settle_with(ticket, identity);
    }

    /// Re-fetches the current identity.
    ///
    /// Unlike [`SessionStore::initialize`], transient failures keep the cached identity.
    pub async fn refresh(&self) {
        let ticket = self.issue_ticket();
        match self.auth_provider.current_identity().await {
            Ok(identity) => self.settle_with(ticket, Some(identity)),
            Err(error) if error.is_not_found() => self.settle_with(ticket, None),
            Err(error) => warn!(error = %error, "failed to refresh current identity"),
        }
    }

    /// Starts applying auth change events to the session.
    ///
    /// Each sign-in replaces the identity and then runs the profile
    /// reconciler once for that event. The returned handle must be kept for
    /// as long as the session should follow the auth service.
    #[must_use = "dropping the subscription stops following auth changes"]
    pub fn subscribe_to_changes(&self, reconciler: ProfileReconciler) -> SessionSubscription {
        let changes = self.auth_provider.subscribe();
        let store = self.clone();
        let task = tokio::spawn(async move { store.follow_changes(changes, reconciler).await });

        SessionSubscription { task: Some(task) }
    }

    async fn follow_changes(
        &self,
        mut changes: broadcast::Receiver<AuthChange>,
        reconciler: ProfileReconciler,
    ) {
        loop {
            match changes.recv().await {
                Ok(AuthChange::SignedIn(identity)) => {
                    info!(identity_id = %identity.id(), "signed in");
                    let ticket = self.issue_ticket();
                    self.apply_signed_in(ticket, identity.clone());
                    reconciler.reconcile(&identity).await;
                }
                Ok(AuthChange::SignedOut) => {
                    info!("signed out");
                    let ticket = self.issue_ticket();
                    self.apply_identity(ticket, None);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth change stream lagged, refreshing identity");
                    self.refresh().await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("auth change stream closed");
                    break;
                }
            }
        }
    }

    pub(crate) fn issue_ticket(&self) -> UpdateTicket {
        UpdateTicket(self.cell.next_ticket.fetch_add(1, Ordering::Relaxed))
    }

    /// Replaces the identity if `ticket` is newer than the last applied update.
    pub(crate) fn apply_identity(&self, ticket: UpdateTicket, identity: Option<Identity>) -> bool {
        self.cell.sender.send_if_modified(|session| {
            if ticket.0 <= session.version() {
                debug!(
                    ticket = ticket.0,
                    version = session.version(),
                    "discarding stale session update"
                );
                return false;
            }

            *session = session.with_identity(identity, ticket.0);
            true
        })
    }

    /// Applies a server-confirmed write issued under `ticket`.
    ///
    /// Applies when `ticket` is fresh, or when an update that landed while
    /// the write was in flight left the same principal cached. A sign-out
    /// or a different identity in between wins.
    pub(crate) fn apply_confirmed(&self, ticket: UpdateTicket, identity: Identity) -> bool {
        self.cell.sender.send_if_modified(|session| {
            let same_principal = session
                .identity()
                .is_some_and(|cached| cached.id() == identity.id());
            if ticket.0 <= session.version() && !same_principal {
                debug!(
                    ticket = ticket.0,
                    version = session.version(),
                    "discarding confirmed write for a replaced session"
                );
                return false;
            }

            let version = self.issue_ticket().0;
            *session = session.with_identity(Some(identity), version);
            self.cell.confirmed_version.store(version, Ordering::Relaxed);
            true
        })
    }

    /// Applies a sign-in event unless it re-announces the principal whose
    /// identity was just replaced by a confirmed write.
    fn apply_signed_in(&self, ticket: UpdateTicket, identity: Identity) -> bool {
        self.cell.sender.send_if_modified(|session| {
            if ticket.0 <= session.version() {
                debug!(ticket = ticket.0, "discarding stale sign-in event");
                return false;
            }

            let confirmed_version = self.cell.confirmed_version.load(Ordering::Relaxed);
            let confirmed = session.version() == confirmed_version
                && session
                    .identity()
                    .is_some_and(|cached| cached.id() == identity.id());
            if confirmed {
                debug!(
                    identity_id = %identity.id(),
                    "keeping identity from a newer confirmed write"
                );
                return false;
            }

            *session = session.with_identity(Some(identity), ticket.0);
            true
        })
    }

    /// Applies a fetched identity and leaves the loading state in one step.
    ///
    /// A stale identity is dropped but the session still settles.
    fn settle_with(&self, ticket: UpdateTicket, identity: Option<Identity>) {
        self.cell.sender.send_if_modified(|session| {
            let mut modified = false;
            if ticket.0 > session.version() {
                *session = session.with_identity(identity, ticket.0);
                modified = true;
            } else {
                debug!(ticket = ticket.0, "initial identity superseded by a newer update");
            }

            if session.is_loading() {
                *session = session.settled();
                modified = true;
            }

            modified
        });
    }
}

/// Handle keeping a change subscription alive. Dropping it unsubscribes.
#[derive(Debug)]
pub struct SessionSubscription {
    task: Option<JoinHandle<()>>,
}

impl SessionSubscription {
    /// Stops following auth changes.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    /// Returns whether the subscription is still following changes.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}
