//! tlgen-compiler
//!
//! This crate implements:
//!  1) `decode_binary_schema` / `encode_binary_schema` for compiled `.tlo` schemas,
//!  2) the classifier deciding which types a writer can generate,
//!  3) request/result reachability for client and server builds,
//!  4) the writer-driven generator (`generate` → `String`, or one file per unit),
//!  5) error types (`TlError`), and the `TlWriter` trait with a Rust backend.

pub mod error;
pub mod utils;
pub mod file_utils;
pub mod compiler;
pub mod classifier;
pub mod reachability;
pub mod vars;
pub mod writer;
pub mod generator;
pub mod writers;

pub use classifier::{classify, Classification, GenContext, TypeClass};
pub use compiler::{decode_binary_schema, encode_binary_schema, read_schema_from_file};
pub use error::TlError;
pub use generator::{generate, generate_units, write_tl_to_file, write_tl_to_multiple_files};
pub use reachability::{compute_reachable_sets, ReachableSets};
pub use vars::VarTable;
pub use writer::{Kind, Mode, ProxyCase, TlWriter};
pub use writers::{RustWriter, RustWriterOptions};
