//! Debug recording of the raw streams

use std::io::Write;
use std::sync::Mutex;

type Writer = Mutex<Box<dyn Write + Send>>;

/// Optional copies of what crossed the adapter
///
/// Input is recorded one escaped, quoted line per DATA frame. Output is
/// recorded verbatim. Recording failures are ignored.
#[derive(Default)]
pub struct Recorder {
    input: Option<Writer>,
    output: Option<Writer>,
}

impl Recorder {
    /// Record inbound DATA frames to `writer`
    pub fn set_input(&mut self, writer: impl Write + Send + 'static) {
        self.input = Some(Mutex::new(Box::new(writer)));
    }

    /// Record outbound process output to `writer`
    pub fn set_output(&mut self, writer: impl Write + Send + 'static) {
        self.output = Some(Mutex::new(Box::new(writer)));
    }

    pub(crate) fn record_input(&self, data: &[u8]) {
        if let Some(writer) = &self.input {
            if let Ok(mut writer) = writer.lock() {
                let _ = writeln!(writer, "\"{}\"", data.escape_ascii());
            }
        }
    }

    pub(crate) fn record_output(&self, data: &[u8]) {
        if let Some(writer) = &self.output {
            if let Ok(mut writer) = writer.lock() {
                let _ = writer.write_all(data);
            }
        }
    }
}
