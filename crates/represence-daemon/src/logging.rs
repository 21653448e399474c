//! Diagnostic logging, gated by the `fileInfo.enableLogging` setting.
//!
//! The subscriber is installed once; the filter sits behind a reload layer
//! so the setting can be toggled without restarting the process.

use tracing::warn;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Handle for switching diagnostic logging on and off at runtime.
#[derive(Clone)]
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogControl {
    pub fn set_enabled(&self, enabled: bool) {
        if let Err(e) = self.handle.reload(filter(enabled)) {
            warn!("Failed to update log filter: {}", e);
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.handle
            .with_current(|f| f.to_string() != "off")
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for LogControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogControl")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn default_directive() -> String {
    let level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    format!("represence={level}")
}

fn filter(enabled: bool) -> EnvFilter {
    if !enabled {
        return EnvFilter::new("off");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive()))
}

/// Install the global subscriber.
///
/// In debug builds, output also goes to a timestamped file in the temp
/// directory. If a subscriber is already installed, toggling the returned
/// handle has no effect.
pub fn init(enabled: bool) -> LogControl {
    let (filter_layer, handle) = reload::Layer::new(filter(enabled));

    if cfg!(debug_assertions) {
        let temp_dir = std::env::temp_dir();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("represence-daemon-{timestamp}.log");
        let log_path = temp_dir.join(&log_filename);

        #[cfg(unix)]
        {
            let symlink_path = temp_dir.join("represence-daemon.log");
            let _ = std::fs::remove_file(&symlink_path);
            let _ = std::os::unix::fs::symlink(&log_path, &symlink_path);
        }

        let file_appender = tracing_appender::rolling::never(&temp_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Flushes on drop; the writer must live for the whole process
        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_line_number(true);

        let installed = tracing_subscriber::registry()
            .with(filter_layer)
            .with(file_layer)
            .with(stderr_layer)
            .try_init()
            .is_ok();

        if installed && enabled {
            eprintln!("Logging to: {} (and stderr)", log_path.display());
        }
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init();
    }

    LogControl { handle }
}
