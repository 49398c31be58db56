//! `backoffice-auth`: pure authorization boundary for backend tools.
//!
//! This crate is intentionally decoupled from HTTP, sessions and storage.

pub mod authorize;
pub mod permissions;
pub mod principal;

pub use authorize::{authorize, authorize_any, AuthzError};
pub use permissions::{Permission, UnknownPermission};
pub use principal::Principal;
