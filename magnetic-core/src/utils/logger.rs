use embassy_time::Instant;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{self, Write};

struct Logger;

static LOGGER: Logger = Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let uptime = Instant::now().as_millis();
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "{}.{:03} {:<5} {} {}",
            uptime / 1000,
            uptime % 1000,
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Installs the stderr logger. Fails if another logger is already installed.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
