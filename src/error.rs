//! Error handling for decompression operations
//!
//! This module re-exports the error types defined in `common`. It exists so
//! callers can write `use depacker::error::DepackError` without caring where
//! the type actually lives.

pub use crate::common::DepackError;
pub use crate::common::Result;
