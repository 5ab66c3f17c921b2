//! Terminal output for CLI commands

use colored::{ColoredString, Colorize};

fn marker(symbol: &str, ok: bool) -> ColoredString {
    if ok {
        symbol.green()
    } else {
        symbol.yellow()
    }
}

pub fn success(msg: &str) {
    println!("{} {}", marker("✓", true), msg);
}

pub fn warning(msg: &str) {
    println!("{} {}", marker("⚠", false), msg);
}

pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Bold section title with a blank line above it.
pub fn heading(title: &str) {
    println!("\n{}", format!("=== {} ===", title).bold());
}

/// Right-aligned `label count` row.
pub fn row(label: &str, value: impl std::fmt::Display) {
    println!("  {:>24} {:>12}", label.dimmed(), value);
}
