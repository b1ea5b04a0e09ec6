//! Session store for the CTF console.
//!
//! Encapsulates the bearer-token lifecycle (login, register, restore from
//! disk, logout, forced logout on 401) and exposes the routing-guard
//! classification the console consumes.

pub mod persist;
pub mod store;

pub use persist::default_token_path;
pub use store::{Access, RouteRequirement, Session, SessionStore};
