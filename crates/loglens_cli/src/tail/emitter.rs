use std::io::{self, Write};

use core_model::{Event, OutputMode};
use tracing::warn;

const HUMAN_TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S UTC";

/// Writes tailed events to a line-oriented sink in arrival order.
///
/// A record that cannot be written is logged and dropped; the stream keeps
/// going.
pub struct EventEmitter<W> {
    sink: W,
    mode: OutputMode,
    written: u64,
    dropped: u64,
}

impl<W: Write> EventEmitter<W> {
    pub fn new(sink: W, mode: OutputMode) -> Self {
        Self {
            sink,
            mode,
            written: 0,
            dropped: 0,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn emit(&mut self, event: &Event) {
        match self.write_record(event) {
            Ok(()) => self.written += 1,
            Err(err) => {
                self.dropped += 1;
                warn!(
                    timestamp = %event.timestamp,
                    "dropping event that could not be written: {err}"
                );
            }
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn write_record(&mut self, event: &Event) -> io::Result<()> {
        let line = render_line(self.mode, event)?;
        self.sink.write_all(line.as_bytes())?;
        self.sink.flush()
    }
}

/// Renders one event as a newline-terminated record.
pub fn render_line(mode: OutputMode, event: &Event) -> serde_json::Result<String> {
    let payload = serde_json::to_string(&event.payload)?;
    Ok(match mode {
        OutputMode::Structured => format!("{payload}\n"),
        OutputMode::HumanReadable => format!(
            "{}\t{}\n",
            event.timestamp.format(HUMAN_TIMESTAMP_FORMAT),
            payload
        ),
    })
}
