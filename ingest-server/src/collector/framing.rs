// Stream framing
//
// Turns raw socket chunks into readings. `Chunk` keeps the historical
// behaviour (one read call = one reading); `Lines` splits on '\n',
// reassembles values that straddle chunk boundaries and caps line length.

use std::str::FromStr;

use bytes::BytesMut;
use plexflo_core::constants::DEFAULT_MAX_LINE_LEN;
use plexflo_core::{Error, Result};
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

/// How raw bytes are cut into readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Each non-empty read is one reading, decoded as UTF-8
    #[default]
    Chunk,
    /// Newline-delimited values; blank lines are skipped
    Lines,
}

impl FromStr for Framing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chunk" => Ok(Framing::Chunk),
            "lines" | "newline" => Ok(Framing::Lines),
            other => Err(Error::Configuration(format!("Unknown framing: {}", other))),
        }
    }
}

/// Stateful decoder for one connection
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    lines: LinesCodec,
    pending: BytesMut,
}

impl FrameDecoder {
    pub fn new(framing: Framing) -> Self {
        Self::with_max_line_len(framing, DEFAULT_MAX_LINE_LEN)
    }

    /// Under `Lines`, a line longer than `max_line_len` bytes is a protocol error
    pub fn with_max_line_len(framing: Framing, max_line_len: usize) -> Self {
        Self {
            framing,
            lines: LinesCodec::new_with_max_length(max_line_len),
            pending: BytesMut::new(),
        }
    }

    /// Feed one non-empty chunk, returning the readings it completes
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        match self.framing {
            Framing::Chunk => Ok(vec![decode_utf8(chunk)?]),
            Framing::Lines => {
                self.pending.extend_from_slice(chunk);
                let mut readings = Vec::new();

                while let Some(line) = self.lines.decode(&mut self.pending).map_err(line_error)? {
                    if let Some(reading) = line_reading(line) {
                        readings.push(reading);
                    }
                }
                Ok(readings)
            }
        }
    }

    /// Flush whatever is left at end-of-stream
    pub fn finish(&mut self) -> Result<Option<String>> {
        match self.framing {
            Framing::Chunk => Ok(None),
            Framing::Lines => Ok(self
                .lines
                .decode_eof(&mut self.pending)
                .map_err(line_error)?
                .and_then(line_reading)),
        }
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::Protocol(format!("Chunk is not valid UTF-8: {}", e)))
}

fn line_error(err: LinesCodecError) -> Error {
    match err {
        LinesCodecError::MaxLineLengthExceeded => {
            Error::Protocol("Line exceeds the maximum length".to_string())
        }
        LinesCodecError::Io(e) => Error::Protocol(format!("Line is not valid UTF-8: {}", e)),
    }
}

fn line_reading(line: String) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
