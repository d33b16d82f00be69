#![doc = include_str!("../README.md")]

mod api;
pub mod config;
pub mod error;
pub mod events;
mod heartbeat;
pub mod session;
pub mod types;

// Re-exports for convenient access
pub use config::{Endpoint, SessionConfig};
pub use error::{Error, InvalidReason};
pub use events::{EventKind, Listener, LogoutCause, SessionEvent};
pub use session::SessionClient;
pub use types::{Email, Permissions, Profile, Registration, Role, Session};
