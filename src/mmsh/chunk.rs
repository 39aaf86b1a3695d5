//! Chunk framing of the mmsh session transport.
//!
//! Every chunk on the wire looks like this:
//!
//! ```text
//! +-----------+-----------+----------------------+-----------------+
//! | type u16  | size u16  | extension header     | payload         |
//! | LE        | LE        | 4 or 8 bytes by type | size - ext bytes|
//! +-----------+-----------+----------------------+-----------------+
//! ```
//!
//! `size` counts the extension header plus the payload. Data and End chunks
//! carry a little-endian u32 sequence number in the first four bytes of
//! their extension header.

use std::fmt;
use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use super::error::{MmshError, Result};

/// Frame header length: type(2) + size(2).
pub const FRAME_HEADER_LEN: usize = 4;

/// Upper bound for one accumulated ASF header.
pub const MAX_HEADER_SIZE: usize = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Reset,
    Data,
    End,
    HeaderFragment,
}

impl ChunkKind {
    pub fn from_wire(chunk_type: u16) -> Option<Self> {
        match chunk_type {
            0x4324 => Some(Self::Reset),
            0x4424 => Some(Self::Data),
            0x4524 => Some(Self::End),
            0x4824 => Some(Self::HeaderFragment),
            _ => None,
        }
    }

    #[cfg(test)]
    pub const fn wire_type(self) -> u16 {
        match self {
            Self::Reset => 0x4324,
            Self::Data => 0x4424,
            Self::End => 0x4524,
            Self::HeaderFragment => 0x4824,
        }
    }

    pub const fn ext_header_len(self) -> usize {
        match self {
            Self::Reset | Self::End => 4,
            Self::Data | Self::HeaderFragment => 8,
        }
    }

    const fn has_sequence(self) -> bool {
        matches!(self, Self::Data | Self::End)
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reset => "RESET",
            Self::Data => "DATA",
            Self::End => "END",
            Self::HeaderFragment => "ASF_HEADER",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Zero for kinds without a sequence field.
    pub sequence: u32,
    pub payload: Vec<u8>,
}

/// Pulls chunks off one connection's body, one frame per call.
///
/// Not restartable: after an error or an End chunk it yields nothing more.
pub struct ChunkDemuxer<R> {
    reader: R,
    bytes_read: u64,
    expected_data_seq: u32,
    out_of_order: u64,
    finished: bool,
}

impl<R: Read> ChunkDemuxer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            bytes_read: 0,
            expected_data_seq: 0,
            out_of_order: 0,
            finished: false,
        }
    }

    /// Bytes consumed from the connection so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Data chunks whose sequence did not match the running counter.
    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    /// Reads the next chunk.
    ///
    /// `Ok(None)` means the connection closed cleanly on a chunk boundary;
    /// whether that is acceptable is the caller's decision.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.finished {
            return Ok(None);
        }
        let result = self.read_chunk();
        match &result {
            Ok(Some(chunk)) if chunk.kind == ChunkKind::End => self.finished = true,
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => self.finished = true,
        }
        result
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        let mut frame = [0u8; FRAME_HEADER_LEN];
        let got = self.fill(&mut frame)?;
        if got == 0 {
            return Ok(None);
        }
        if got < FRAME_HEADER_LEN {
            return Err(MmshError::UnexpectedEof(format!(
                "chunk header truncated after {got} bytes at offset {}",
                self.bytes_read
            )));
        }

        let chunk_type = LittleEndian::read_u16(&frame[0..2]);
        let declared_size = usize::from(LittleEndian::read_u16(&frame[2..4]));
        let kind = ChunkKind::from_wire(chunk_type).ok_or_else(|| {
            MmshError::ProtocolViolation(format!("unknown chunk type=0x{chunk_type:04x}"))
        })?;

        let ext_len = kind.ext_header_len();
        let mut ext = [0u8; 8];
        self.read_exact(&mut ext[..ext_len], "chunk extension header")?;
        let payload_size = declared_size.checked_sub(ext_len).ok_or_else(|| {
            MmshError::ProtocolViolation(format!(
                "{kind} chunk size={declared_size} shorter than its {ext_len}-byte extension header"
            ))
        })?;

        let mut payload = vec![0u8; payload_size];
        self.read_exact(&mut payload, "chunk payload")?;

        let sequence = if kind.has_sequence() {
            LittleEndian::read_u32(&ext[0..4])
        } else {
            0
        };

        match kind {
            ChunkKind::Reset if payload_size == 0 => {
                return Err(MmshError::ProtocolViolation(
                    "RESET chunk with empty payload".to_string(),
                ));
            }
            ChunkKind::End => match sequence {
                0 => {}
                1 => {
                    return Err(MmshError::NotSupported(
                        "server requested a follow-up request (END seq=1)".to_string(),
                    ));
                }
                other => {
                    return Err(MmshError::ProtocolViolation(format!(
                        "unexpected seq={other} for END"
                    )));
                }
            },
            ChunkKind::Data => {
                if sequence != self.expected_data_seq {
                    self.out_of_order += 1;
                    debug!(
                        expected = self.expected_data_seq,
                        got = sequence,
                        "out-of-order DATA chunk"
                    );
                }
                self.expected_data_seq = self.expected_data_seq.wrapping_add(1);
            }
            _ => {}
        }

        Ok(Some(Chunk {
            kind,
            sequence,
            payload,
        }))
    }

    /// Reads until `buf` is full or the stream ends; returns the byte count.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(MmshError::from_read(e, "chunk header")),
            }
        }
        self.bytes_read += filled as u64;
        Ok(filled)
    }

    fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        self.reader
            .read_exact(buf)
            .map_err(|e| MmshError::from_read(e, what))?;
        self.bytes_read += buf.len() as u64;
        Ok(())
    }
}

impl<R: Read> Iterator for ChunkDemuxer<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

/// Header bytes gathered from ASF_HEADER chunks in the current cycle.
///
/// A cycle starts at session begin and again after every RESET chunk.
#[derive(Debug, Default)]
pub struct HeaderAccumulator {
    buf: Vec<u8>,
    fragments: usize,
    consumed: bool,
}

impl HeaderAccumulator {
    pub fn push(&mut self, payload: &[u8]) -> Result<()> {
        if self.consumed {
            return Err(MmshError::ProtocolViolation(
                "ASF_HEADER chunk after the header was already consumed".to_string(),
            ));
        }
        if self.buf.len() + payload.len() > MAX_HEADER_SIZE {
            return Err(MmshError::ProtocolViolation(format!(
                "ASF header too long: {} + {} > {MAX_HEADER_SIZE}",
                self.buf.len(),
                payload.len()
            )));
        }
        self.buf.extend_from_slice(payload);
        self.fragments += 1;
        Ok(())
    }

    /// True once at least one fragment arrived and the header is not yet handed out.
    pub fn is_pending(&self) -> bool {
        !self.consumed && self.fragments > 0
    }

    #[cfg(test)]
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Hands out the finished header and marks the cycle as consumed.
    pub fn take(&mut self) -> Vec<u8> {
        self.consumed = true;
        self.fragments = 0;
        std::mem::take(&mut self.buf)
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.fragments = 0;
        self.consumed = false;
    }
}
