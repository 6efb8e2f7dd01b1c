//! Logging with colored module prefixes.
//!
//! A library-friendly subset of terminal logging:
//! - `log!` macro for formatted output with a colored module prefix
//! - `debug!` macro gated on the global verbose flag
//!
//! # Example
//!
//! ```ignore
//! log!("bundle"; "registered `{}` with {} files", name, count);
//! debug!("cache"; "hit for {}", key);
//! ```

use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global verbose flag (set by the embedding application)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Serializes log lines so concurrent requests don't interleave output.
static OUT: Mutex<()> = Mutex::new(());

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a message with a colored module prefix
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let _guard = OUT.lock();
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{prefix} {message}");
}

/// Color the module prefix by area.
fn colorize_prefix(module: &str) -> String {
    let padded = format!("{module:>10}");
    match module {
        "error" => padded.red().bold().to_string(),
        "warning" => padded.yellow().bold().to_string(),
        "bundle" | "engine" => padded.green().bold().to_string(),
        "cache" | "process" => padded.cyan().bold().to_string(),
        _ => padded.blue().bold().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }
}
