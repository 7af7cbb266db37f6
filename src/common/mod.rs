//! Types, errors and utilities shared across the crate

pub mod errors;
pub mod normalize;
pub mod retry;
pub mod traits;
pub mod types;
