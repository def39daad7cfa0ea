//! Core business logic for livepoll.

pub mod services;

pub use services::*;
