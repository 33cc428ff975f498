#![deny(missing_docs)]
//! Shared logging utilities for the migrator workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a thread-local "current item" context that the macros prefix onto every
//! message, and initializers for the global logger.

use std::cell::RefCell;
use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

thread_local! {
    /// Identifier of the migration item currently being processed on this thread.
    static CURRENT_ITEM: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Guard that tags log lines on the current thread with an item identifier.
///
/// The previous context is restored when the guard is dropped, so scopes nest.
#[must_use = "the item context is cleared as soon as the guard is dropped"]
pub struct ItemScope {
    previous: Option<String>,
}

impl ItemScope {
    /// Sets `item` as the logging context until the returned guard is dropped.
    pub fn enter(item: &str) -> Self {
        let previous = CURRENT_ITEM.with(|slot| slot.replace(Some(item.to_string())));
        Self { previous }
    }
}

impl Drop for ItemScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_ITEM.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Returns the current item identifier for this thread, if any.
pub fn current_item() -> Option<String> {
    CURRENT_ITEM.with(|slot| slot.borrow().clone())
}

/// Returns the `[item] ` prefix used by the logging macros, or an empty string.
#[doc(hidden)]
pub fn item_prefix() -> String {
    CURRENT_ITEM.with(|slot| match slot.borrow().as_deref() {
        Some(item) => format!("[{item}] "),
        None => String::new(),
    })
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::item_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::item_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::item_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::item_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::item_prefix(), format_args!($($arg)*));
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the log file only.
    File,
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both the log file and the terminal.
    Both,
}

/// Initializes the global logger.
///
/// File output goes to `log_path`; if the file cannot be created the
/// terminal logger is still installed (for `Both`) and a warning is printed.
pub fn initialize(destination: LogDestination, level: LevelFilter, log_path: &Path) {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        if let Some(file_logger) = create_file_logger(level, config, log_path) {
            loggers.push(file_logger);
        }
    }
    if loggers.is_empty() {
        return;
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    log_path: &Path,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
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
    use super::{current_item, item_prefix, ItemScope};

    #[test]
    fn prefix_is_empty_without_scope() {
        assert_eq!(item_prefix(), "");
        assert_eq!(current_item(), None);
    }

    #[test]
    fn scopes_nest_and_restore() {
        let outer = ItemScope::enter("Main.FrontPage");
        assert_eq!(item_prefix(), "[Main.FrontPage] ");
        {
            let _inner = ItemScope::enter("Main.Other");
            assert_eq!(current_item().as_deref(), Some("Main.Other"));
        }
        assert_eq!(current_item().as_deref(), Some("Main.FrontPage"));
        drop(outer);
        assert_eq!(current_item(), None);
    }
}
