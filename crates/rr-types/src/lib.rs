//! Shared types for redirect-relay

pub mod errors;

pub use errors::{AppError, AppResult};
