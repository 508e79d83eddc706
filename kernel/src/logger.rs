//! Logger for the hybrid scheduler
//!
//! Formats `log` records into a fixed stack buffer (no allocation on the tick
//! path) and forwards each line to a sink registered by the host, typically
//! its serial console or kernel ring buffer.

use log::{Level, LevelFilter, Metadata, Record};
use spin::Once;

/// Line sink supplied by the host
pub type LogSink = fn(&str);

/// Maximum formatted line length; longer records are truncated
pub const LINE_CAPACITY: usize = 512;

static SINK: Once<LogSink> = Once::new();

/// Logger that writes through the registered sink
struct SinkLogger;

impl log::Log for SinkLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(sink) = SINK.get() else {
            return;
        };

        use core::fmt::Write;
        let mut buf = [0u8; LINE_CAPACITY];
        let mut writer = BufferWriter::new(&mut buf);
        // Format: [LEVEL] message
        let _ = write!(writer, "[{}] {}", level_str(record.level()), record.args());
        sink(writer.as_str());
    }

    fn flush(&self) {}
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN ",
        Level::Info => "INFO ",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Simple buffer writer for formatting without alloc
pub struct BufferWriter<'a> {
    pub buffer: &'a mut [u8],
    pub pos: usize,
}

impl<'a> BufferWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    /// Written bytes as text, cut back to the last complete UTF-8 character
    pub fn as_str(&self) -> &str {
        let bytes = &self.buffer[..self.pos];
        match core::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                // Truncation can split a multi-byte character.
                let valid = &bytes[..e.valid_up_to()];
                core::str::from_utf8(valid).unwrap_or_default()
            }
        }
    }
}

impl<'a> core::fmt::Write for BufferWriter<'a> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buffer.len() - self.pos;
        let to_write = bytes.len().min(remaining);

        if to_write > 0 {
            self.buffer[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
        }

        Ok(())
    }
}

/// Global logger instance
static LOGGER: SinkLogger = SinkLogger;

/// Install the logger at `Info` level
///
/// Returns `false` if another logger was already installed; the sink is
/// still recorded so a later `init` call is harmless.
pub fn init(sink: LogSink) -> bool {
    init_with_level(sink, LevelFilter::Info)
}

/// Install the logger with a specific level
pub fn init_with_level(sink: LogSink, level: LevelFilter) -> bool {
    SINK.call_once(|| sink);
    match log::set_logger(&LOGGER) {
        Ok(()) => {
            log::set_max_level(level);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;
    use std::sync::Mutex;
    use std::vec::Vec;

    #[test]
    fn test_buffer_writer_truncates() {
        let mut buf = [0u8; 8];
        let mut w = BufferWriter::new(&mut buf);
        write!(w, "hybrid-scheduler").unwrap();
        assert_eq!(w.as_str(), "hybrid-s");
    }

    #[test]
    fn test_buffer_writer_keeps_utf8_boundary() {
        let mut buf = [0u8; 4];
        let mut w = BufferWriter::new(&mut buf);
        write!(w, "abcé").unwrap();
        assert_eq!(w.as_str(), "abc");
    }

    static CAPTURED: Mutex<Vec<std::string::String>> = Mutex::new(Vec::new());

    fn capture(line: &str) {
        CAPTURED.lock().unwrap().push(line.into());
    }

    #[test]
    fn test_logger_forwards_to_sink() {
        init_with_level(capture, LevelFilter::Debug);
        log::warn!("[HYBRID] logger smoke test");
        let lines = CAPTURED.lock().unwrap();
        assert!(lines.iter().any(|l| l == "[WARN ] [HYBRID] logger smoke test"));
    }
}
