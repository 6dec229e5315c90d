//! Output formatting module.
//!
//! [`Reporter`] renders per-port lines and the scan summary to a shared sink;
//! the free functions print fatal messages to stderr.

mod plain;
mod reporter;

pub use plain::{print_error, print_warning};
pub use reporter::{MemorySink, ReportOptions, Reporter};
