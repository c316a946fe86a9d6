//! Application services and ports.

#![forbid(unsafe_code)]

mod auth_ports;
mod auth_service;
mod live_list;
mod profile_reconciler;
mod record_ports;
mod route_guard;
mod session_store;

#[cfg(test)]
mod test_support;

pub use auth_ports::{AuthChange, AuthProvider, Notifier, SignUpRequest};
pub use auth_service::{AuthService, RegisterParams};
pub use live_list::LiveList;
pub use profile_reconciler::{ProfileReconciler, ReconcileOutcome};
pub use record_ports::{
    FilterOperator, RECORD_ID_FIELD, Record, RecordChange, RecordEvent, RecordFilter, RecordOrder,
    RecordQuery, RecordStore, RecordSubscription, record_id,
};
pub use route_guard::RouteGuard;
pub use session_store::{SessionStore, SessionSubscription};
