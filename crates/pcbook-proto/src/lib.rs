//! PC Book Protocol Buffers
//!
//! Generated protobuf code for the PC Book gRPC API.
//!
//! This crate contains:
//! - `LaptopService` for catalog creation, search, image upload and rating
//! - `AuthService` for login and access-token issuance
//! - binary file helpers for any generated message

#![allow(clippy::derive_partial_eq_without_eq)]

/// PC Book v1 API definitions.
///
/// All generated types and services are included here.
pub mod v1 {
    tonic::include_proto!("pcbook.v1");
}

pub mod methods;
pub mod serializer;

// Re-export v1 as the default API version for convenience
pub use v1::*;

// Re-export prost_types for downstream crates that build timestamps
pub use prost_types;
