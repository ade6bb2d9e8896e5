//! PC Book Client Library
//!
//! - Connection setup (plaintext or TLS)
//! - Login and periodic token refresh
//! - Bearer-token interceptor
//! - Typed wrappers for the laptop RPCs

pub mod auth;
pub mod connection;
pub mod error;
pub mod laptop;

pub use auth::{AuthClient, BearerAuth, RefreshHandle, TokenSource, spawn_refresh};
pub use connection::{ConnectionConfig, connect};
pub use error::ClientError;
pub use laptop::LaptopClient;
