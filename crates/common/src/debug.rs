//! Debug infrastructure with per-module loggers.
//!
//! Control via the DEBUG environment variable:
//! - `DEBUG=*` - enable all loggers
//! - `DEBUG=vm` - enable only the VM engine
//! - `DEBUG=vm,recursive` - enable multiple
//!
//! Detail lines are gated behind `DEBUG_VERBOSITY=2` (default 1).

use std::collections::HashSet;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

enum Selection {
    All,
    None,
    Named(HashSet<String>),
}

struct Config {
    selection: Selection,
    verbosity: u8,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        let selection = match env::var("DEBUG").ok().as_deref() {
            None | Some("") => Selection::None,
            Some("*") | Some("1") | Some("true") => Selection::All,
            Some(value) => {
                let names: HashSet<_> = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if names.is_empty() {
                    Selection::None
                } else {
                    Selection::Named(names)
                }
            }
        };
        let verbosity = env::var("DEBUG_VERBOSITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1u8)
            .min(3);
        Config { selection, verbosity }
    })
}

fn selected(name: &str) -> bool {
    match &config().selection {
        Selection::None => false,
        Selection::All => true,
        Selection::Named(names) => names.contains(name),
    }
}

/// A named logger. Disabled loggers are free apart from one branch per call
/// site (the `log!` macros skip the `format!`).
pub struct Logger {
    name: &'static str,
    enabled: bool,
    indent: AtomicUsize,
}

impl Logger {
    pub const fn disabled() -> Self {
        Self { name: "", enabled: false, indent: AtomicUsize::new(0) }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn emit(&self, msg: &str) {
        let indent = self.indent.load(Ordering::Relaxed);
        eprintln!("{}[{}] {}", "  ".repeat(indent), self.name, msg);
    }

    #[inline]
    pub fn log(&self, msg: &str) {
        if self.enabled && config().verbosity >= 1 {
            self.emit(msg);
        }
    }

    #[inline]
    pub fn detail(&self, msg: &str) {
        if self.enabled && config().verbosity >= 2 {
            self.emit(msg);
        }
    }

    #[inline]
    pub fn push_indent(&self) {
        if self.enabled {
            self.indent.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn pop_indent(&self) {
        if self.enabled {
            let _ = self
                .indent
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
        }
    }
}

/// Create a logger. The name must be a static string.
pub fn create_logger(name: &'static str) -> Logger {
    if selected(name) {
        Logger { name, enabled: true, indent: AtomicUsize::new(0) }
    } else {
        Logger::disabled()
    }
}

// Macros so disabled loggers never pay for format!.

#[macro_export]
macro_rules! log {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() {
            $logger.log(&format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_detail {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() {
            $logger.detail(&format!($($arg)*));
        }
    };
}
