//! PC Book Server Library
//!
//! Core functionality for the PC Book laptop catalog:
//! - JWT issuance/verification and argon2 password hashing
//! - Role-based authorization interceptor
//! - In-memory laptop, rating, image and user stores
//! - gRPC services (Laptop, Auth)

pub mod auth;
pub mod config;
pub mod context;
pub mod server;
pub mod storage;
pub mod tls;
pub mod tracing_init;

#[cfg(test)]
mod test_helpers;
