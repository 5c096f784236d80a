#![deny(missing_docs)]
//! Shared logging utilities for the portal watch workspace.
//!
//! This crate provides the `watch_*` logging macros used across the codebase,
//! the per-thread cycle tag they prefix, and a minimal test initializer for the
//! global logger.

use std::cell::Cell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Thread-local storage for the number of the poll cycle being run.
    static CYCLE: Cell<u64> = const { Cell::new(0) };
}

/// Sets the poll cycle number for the current thread.
/// The poller calls this when a cycle starts; `0` clears the tag.
pub fn set_cycle(cycle: u64) {
    CYCLE.with(|v| v.set(cycle));
}

/// Retrieves the poll cycle number for the current thread.
/// Returns 0 outside of a cycle.
pub fn current_cycle() -> u64 {
    CYCLE.with(|v| v.get())
}

/// Prefix added to every message logged through the `watch_*` macros.
///
/// Empty when no cycle is running on this thread.
pub fn cycle_tag() -> String {
    match current_cycle() {
        0 => String::new(),
        n => format!("[cycle {n}] "),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! watch_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("{}{}", $crate::cycle_tag(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! watch_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("{}{}", $crate::cycle_tag(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! watch_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("{}{}", $crate::cycle_tag(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! watch_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("{}{}", $crate::cycle_tag(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! watch_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("{}{}", $crate::cycle_tag(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_tag_is_empty_outside_a_cycle() {
        set_cycle(0);
        assert_eq!(cycle_tag(), "");
    }

    #[test]
    fn cycle_tag_names_the_running_cycle() {
        set_cycle(12);
        assert_eq!(current_cycle(), 12);
        assert_eq!(cycle_tag(), "[cycle 12] ");
        set_cycle(0);
    }

    #[test]
    fn macros_accept_format_arguments() {
        initialize_for_tests();
        let id = "42";
        watch_info!("item {} seen", id);
        watch_debug!("plain message");
        watch_warn!("{id} inline");
    }
}
