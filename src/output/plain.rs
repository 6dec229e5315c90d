//! Messages printed outside the per-port report stream.

use console::style;

/// Print a fatal error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("[ERR]").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}
