//! Terminal input scanning
//!
//! Input is split into key-sized units. A unit is one UTF-8 character, except
//! that an escape is sent together with whatever bytes are immediately
//! available after it, so sequences like arrow keys travel in one frame.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use wx_protocol::{ESCAPE, ESCAPE_BURST_MAX};

/// Expected length of a UTF-8 sequence from its lead byte
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Splits a raw input stream into key units
pub struct InputScanner<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> InputScanner<R> {
    /// Wrap a raw input stream
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next unit
    ///
    /// End of input before a unit starts is reported as
    /// [`io::ErrorKind::UnexpectedEof`]. End of input while collecting the
    /// bytes after an escape is not an error.
    pub async fn next_unit(&mut self) -> io::Result<Vec<u8>> {
        let lead = self.reader.read_u8().await?;
        let mut unit = vec![lead];

        // Invalid or truncated sequences are passed through byte for byte
        for _ in 1..utf8_width(lead) {
            let next = self.reader.fill_buf().await?.first().copied();
            match next {
                Some(byte) if is_continuation(byte) => {
                    unit.push(byte);
                    self.reader.consume(1);
                }
                _ => break,
            }
        }

        if lead == ESCAPE {
            let mut burst = [0u8; ESCAPE_BURST_MAX];
            let n = self.reader.read(&mut burst).await?;
            unit.extend_from_slice(&burst[..n]);
        }

        Ok(unit)
    }
}
