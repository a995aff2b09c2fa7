//! Serial console logger.
//!
//! Routes `log` records to a single static sink, normally the UART
//! writer, as `[LEVEL] message` lines. Records logged before a sink is
//! installed are discarded.

use core::fmt::Write;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

type Sink = &'static mut (dyn Write + Send);

static SINK: Mutex<Option<Sink>> = Mutex::new(None);

static LOGGER: SerialLogger = SerialLogger;

pub struct SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(sink) = SINK.lock().as_mut() {
            let _ = writeln!(sink, "[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the logger writing to `sink`.
///
/// Fails if another logger was installed first; the sink is kept either way.
pub fn init(sink: Sink, level: LevelFilter) -> Result<(), SetLoggerError> {
    set_sink(sink);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Replace the sink, returning the previous one.
pub fn set_sink(sink: Sink) -> Option<Sink> {
    SINK.lock().replace(sink)
}

pub fn take_sink() -> Option<Sink> {
    SINK.lock().take()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;
    use std::string::String;
    use std::sync::Mutex as StdMutex;

    static CAPTURED: StdMutex<String> = StdMutex::new(String::new());

    struct Capture;

    impl Write for Capture {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            CAPTURED.lock().map_err(|_| core::fmt::Error)?.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_records_reach_sink() {
        let sink: Sink = Box::leak(Box::new(Capture));
        let _ = init(sink, LevelFilter::Debug);

        log::info!("[NODE] link up");
        log::trace!("[NODE] filtered out");

        let out = CAPTURED.lock().unwrap().clone();
        assert!(out.contains("[INFO] [NODE] link up\n"));
        assert!(!out.contains("filtered out"));

        assert!(take_sink().is_some());
        log::warn!("[NODE] after take");
        assert!(!CAPTURED.lock().unwrap().contains("after take"));
    }
}
