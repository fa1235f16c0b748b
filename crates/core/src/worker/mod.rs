//! Worker process contract and launch-side helpers.
//!
//! Everything here is free of job state: locating the worker executable,
//! building the environment the worker reads, and keeping a bounded tail
//! of its output for diagnostics.

pub mod env;
pub mod output;
pub mod resolver;
