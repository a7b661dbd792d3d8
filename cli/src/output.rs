//! Output formatting utilities for CLI commands
//!
//! Status messages go to stderr so stdout stays clean for reports and
//! environment assignments.

use colored::Colorize;

/// Print success message
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print info message
pub fn info(msg: &str) {
    eprintln!("{} {}", "ℹ".blue(), msg);
}

/// Print warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}
