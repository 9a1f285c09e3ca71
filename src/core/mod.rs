//! Core types and utilities shared by the classifier, grid and scan driver

pub mod types;
pub mod error;
pub mod logging;
pub mod time;

pub use types::*;
pub use error::Error;
