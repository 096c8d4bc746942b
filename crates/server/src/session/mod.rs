//! Cookie-bound sessions.
//!
//! - [`SessionManager`] owns the token → identity store
//! - [`middleware::resolve_session`] attaches the identity to each request
//! - [`sweep::spawn_sweep_task`] periodically purges abandoned sessions

pub mod manager;
pub mod middleware;
pub mod sweep;

pub use manager::{
    DEFAULT_COOKIE_NAME, DEFAULT_TTL, SessionError, SessionManager, random_token,
};
pub use middleware::{CurrentIdentity, resolve_session};
pub use sweep::spawn_sweep_task;
