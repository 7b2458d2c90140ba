//! Console logging backed by the `log` facade.
//!
//! Orchestrator diagnostics go to stderr with a timestamp and level;
//! forwarded output from supervised build processes goes to stdout
//! unprefixed (see `executor`), so the two streams stay separable.

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};

struct ConsoleLogger {
    level: LevelFilter,
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!(
            "[{}] [{:<5}] {}",
            Local::now().format("%H:%M:%S"),
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Install the console logger as the global `log` backend.
///
/// Safe to call more than once; later calls are ignored by the `log` crate.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = log::set_boxed_logger(Box::new(ConsoleLogger { level }))
        .map(|()| log::set_max_level(level));
}
