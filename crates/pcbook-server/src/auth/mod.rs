//! Authentication and authorization for the PC Book server.
//!
//! Provides JWT issuance/verification, password hashing, roles and the
//! per-method role policy enforced by the server interceptor.

pub mod claims;
pub mod jwt;
pub mod password;
pub mod policy;

pub use claims::{Claims, Role};
pub use jwt::{TokenError, TokenManager, TokenVerifier};
pub use policy::{AuthError, AuthInterceptor, RolePolicy};
