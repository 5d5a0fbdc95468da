//! Shared types for the ENCV service

pub mod error;
pub mod uuid_str;

pub use error::{EncvError, Result};
