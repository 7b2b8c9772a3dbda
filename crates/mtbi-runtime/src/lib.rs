#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod definition;
pub mod engine;
mod error;
pub mod graph;
pub mod template;

#[doc(hidden)]
pub mod prelude;

pub use error::{PipelineError, PipelineResult};

/// Tracing target for runtime operations.
pub const TRACING_TARGET: &str = "mtbi_runtime";
