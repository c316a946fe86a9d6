//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod collection;
mod profile;
mod role;
mod route;
mod session;

pub use collection::Collection;
pub use profile::{Profile, email_local_part};
pub use role::{ROLE_METADATA_KEY, Role, resolve_role};
pub use route::{AppRoute, Navigation, RedirectTarget, RouteDecision, authorize};
pub use session::{DISPLAY_NAME_FALLBACK, Session};
