//! Flushing logger for the UCI front end.
//!
//! Engine output must never sit in a buffer: a GUI communicates over pipes
//! and expects to see log lines as they happen. Every record is flushed.
//! The search log target can be switched at runtime between stderr and the
//! file configured through the `Use Search Log` options.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{LevelFilter, Log, Metadata, Record};

enum Target {
    Stderr,
    File(std::fs::File),
}

struct FlushingLogger {
    target: Arc<Mutex<Target>>,
}

impl Log for FlushingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut target = match self.target.lock() {
            Ok(target) => target,
            Err(_) => return,
        };
        let line = format!("[{}] {}", record.level(), record.args());
        match &mut *target {
            Target::Stderr => {
                let mut err = std::io::stderr().lock();
                let _ = writeln!(err, "{line}");
                let _ = err.flush();
            }
            Target::File(file) => {
                let _ = writeln!(file, "{line}");
                let _ = file.flush();
            }
        }
    }

    fn flush(&self) {}
}

/// Handle to retarget the installed logger at runtime.
#[derive(Clone)]
pub struct LoggerHandle {
    target: Arc<Mutex<Target>>,
}

impl LoggerHandle {
    /// Append log records to a file from now on.
    pub fn log_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if let Ok(mut target) = self.target.lock() {
            *target = Target::File(file);
        }
        Ok(())
    }

    /// Return log records to stderr.
    pub fn log_to_stderr(&self) {
        if let Ok(mut target) = self.target.lock() {
            *target = Target::Stderr;
        }
    }
}

/// Install the process-wide logger. Returns a handle used to switch the
/// output target when the search log options change.
pub fn init(level: LevelFilter) -> LoggerHandle {
    let target = Arc::new(Mutex::new(Target::Stderr));
    let handle = LoggerHandle {
        target: Arc::clone(&target),
    };
    let logger = FlushingLogger { target };

    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
    handle
}
