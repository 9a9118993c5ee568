//! Target-language backends.

pub mod rust;

pub use rust::{RustWriter, RustWriterOptions};
