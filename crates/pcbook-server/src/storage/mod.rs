//! In-memory storage for the PC Book server.
//!
//! Each store is a trait so a durable backend can replace the reference
//! in-memory implementation without touching the service handlers. Every
//! read and write crosses a clone boundary: callers never alias the
//! store's own copy.

mod error;
mod image;
mod laptop;
mod rating;
mod user;

pub use error::StoreError;
pub use image::{DiskImageStore, ImageRecord, ImageStore, is_valid_image_type};
pub use laptop::{InMemoryLaptopStore, LaptopStore, is_qualified, memory_in_bits};
pub use rating::{InMemoryRatingStore, Rating, RatingStore};
pub use user::{InMemoryUserStore, User, UserStore};
