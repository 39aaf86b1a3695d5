//! ASF header object table: parsing and bitrate patching.
//!
//! The header delivered in ASF_HEADER chunks is the top-level ASF header
//! object (30 bytes of fixed fields) followed by GUID-tagged child objects,
//! each prefixed with a 16-byte GUID and a little-endian u64 total size.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use super::error::{MmshError, Result};

/// Child objects start right after the top-level object's fixed fields.
const FIRST_OBJECT_OFFSET: usize = 30;
/// GUID(16) + size(8).
const OBJECT_PREFIX_LEN: usize = 24;
/// Objects larger than this end the walk; the Data object is the usual case.
const MAX_WALKED_OBJECT_SIZE: u64 = 65535;
pub const MAX_STREAM_ID: u16 = 23;
pub const MAX_PACKET_SIZE: u32 = 65536;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Guid(pub [u8; 16]);

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}{:02X}{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6], b[8], b[9], b[10], b[11], b[12],
            b[13], b[14], b[15]
        )
    }
}

// On-disk byte order, as they appear in the header.
#[cfg(test)]
pub const GUID_HEADER: Guid =
    Guid([0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C]);
pub const GUID_DATA: Guid =
    Guid([0x36, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C]);
pub const GUID_FILE_PROPERTIES: Guid =
    Guid([0xA1, 0xDC, 0xAB, 0x8C, 0x47, 0xA9, 0xCF, 0x11, 0x8E, 0xE4, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65]);
pub const GUID_STREAM_PROPERTIES: Guid =
    Guid([0x91, 0x07, 0xDC, 0xB7, 0xB7, 0xA9, 0xCF, 0x11, 0x8E, 0xE6, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65]);
pub const GUID_STREAM_BITRATE_PROPERTIES: Guid =
    Guid([0xCE, 0x75, 0xF8, 0x7B, 0x8D, 0x46, 0xD1, 0x11, 0x8D, 0x82, 0x00, 0x60, 0x97, 0xC9, 0xA2, 0xB2]);
pub const GUID_AUDIO_MEDIA: Guid =
    Guid([0x40, 0x9E, 0x69, 0xF8, 0x4D, 0x5B, 0xCF, 0x11, 0xA8, 0xFD, 0x00, 0x80, 0x5F, 0x5C, 0x44, 0x2B]);
pub const GUID_VIDEO_MEDIA: Guid =
    Guid([0xC0, 0xEF, 0x19, 0xBC, 0x4D, 0x5B, 0xCF, 0x11, 0xA8, 0xFD, 0x00, 0x80, 0x5F, 0x5C, 0x44, 0x2B]);
pub const GUID_JFIF_MEDIA: Guid =
    Guid([0x00, 0xE1, 0x1B, 0xB6, 0x4E, 0x5B, 0xCF, 0x11, 0xA8, 0xFD, 0x00, 0x80, 0x5F, 0x5C, 0x44, 0x2B]);
pub const GUID_DEGRADABLE_JPEG_MEDIA: Guid =
    Guid([0xE0, 0x7D, 0x90, 0x35, 0x15, 0xE4, 0xCF, 0x11, 0xA9, 0x17, 0x00, 0x80, 0x5F, 0x5C, 0x44, 0x2B]);
pub const GUID_COMMAND_MEDIA: Guid =
    Guid([0xC0, 0xCF, 0xDA, 0x59, 0xE6, 0x59, 0xD0, 0x11, 0xA3, 0xAC, 0x00, 0xA0, 0xC9, 0x03, 0x48, 0xF6]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Audio,
    Video,
    Command,
    Unknown,
}

impl StreamKind {
    fn from_media_guid(guid: &Guid) -> Self {
        if *guid == GUID_AUDIO_MEDIA {
            Self::Audio
        } else if *guid == GUID_VIDEO_MEDIA
            || *guid == GUID_JFIF_MEDIA
            || *guid == GUID_DEGRADABLE_JPEG_MEDIA
        {
            Self::Video
        } else if *guid == GUID_COMMAND_MEDIA {
            Self::Command
        } else {
            Self::Unknown
        }
    }
}

/// What the session needs to know about one accumulated ASF header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub packet_size: u32,
    /// File size as advertised by File Properties (includes the index).
    pub total_size: Option<u64>,
    pub packet_count: Option<u64>,
    pub streams: BTreeMap<u16, StreamKind>,
    pub bitrates: BTreeMap<u16, u32>,
    /// Absolute offset of each stream's 4-byte bitrate field in the header.
    pub bitrate_offsets: BTreeMap<u16, usize>,
    /// Exact length of the header bytes this was parsed from.
    pub header_len: usize,
}

impl HeaderInfo {
    /// Length the reconstructed file must have, when the Data object told us
    /// the packet count.
    pub fn exact_output_size(&self) -> Option<u64> {
        self.packet_count.and_then(|count| {
            count
                .checked_mul(u64::from(self.packet_size))?
                .checked_add(self.header_len as u64)
        })
    }

    /// Best guess at the final size for progress display.
    ///
    /// The advertised file size usually exceeds what mmsh delivers since the
    /// trailing index is not streamed, so the packet count wins when known.
    /// A zero file size (live streams) counts as unknown.
    pub fn expected_output_size(&self) -> Option<u64> {
        self.exact_output_size()
            .or(self.total_size.filter(|&size| size > 0))
    }
}

fn field<'a>(buf: &'a [u8], at: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    buf.get(at..at + len).ok_or_else(|| {
        MmshError::MalformedInput(format!(
            "{what} at offset {at} runs past header end {}",
            buf.len()
        ))
    })
}

fn read_guid(buf: &[u8], at: usize, what: &str) -> Result<Guid> {
    let mut guid = [0u8; 16];
    guid.copy_from_slice(field(buf, at, 16, what)?);
    Ok(Guid(guid))
}

fn require_size(size: u64, min: u64, what: &str) -> Result<()> {
    if size < min {
        return Err(MmshError::MalformedInput(format!(
            "{what} object size={size} below minimum {min}"
        )));
    }
    Ok(())
}

fn check_stream_id(stream_id: u16) -> Result<()> {
    if stream_id > MAX_STREAM_ID {
        return Err(MmshError::MalformedInput(format!(
            "bad stream_id={stream_id}"
        )));
    }
    Ok(())
}

/// Walks the header object table.
pub fn parse_header(header: &[u8]) -> Result<HeaderInfo> {
    if header.is_empty() {
        return Err(MmshError::MalformedInput("missing ASF header".to_string()));
    }

    let mut packet_size = None;
    let mut total_size = None;
    let mut packet_count = None;
    let mut streams = BTreeMap::new();
    let mut bitrates = BTreeMap::new();
    let mut bitrate_offsets = BTreeMap::new();

    let mut i = FIRST_OBJECT_OFFSET;
    while i + OBJECT_PREFIX_LEN <= header.len() {
        let guid = read_guid(header, i, "object GUID")?;
        let size = LittleEndian::read_u64(field(header, i + 16, 8, "object size")?);
        require_size(size, OBJECT_PREFIX_LEN as u64, "ASF")?;

        if guid == GUID_FILE_PROPERTIES {
            require_size(size, 100, "File Properties")?;
            let ps = LittleEndian::read_u32(field(header, i + 92, 4, "packet size")?);
            if ps == 0 || ps > MAX_PACKET_SIZE {
                return Err(MmshError::MalformedInput(format!(
                    "bad packet_size={ps}"
                )));
            }
            packet_size = Some(ps);
            total_size = Some(LittleEndian::read_u64(field(header, i + 40, 8, "file size")?));
        } else if guid == GUID_STREAM_PROPERTIES {
            require_size(size, 74, "Stream Properties")?;
            let kind = StreamKind::from_media_guid(&read_guid(header, i + 24, "stream type")?);
            let stream_id = LittleEndian::read_u16(field(header, i + 72, 2, "stream number")?);
            check_stream_id(stream_id)?;
            if streams.insert(stream_id, kind).is_some() {
                return Err(MmshError::MalformedInput(format!(
                    "duplicate Stream Properties for stream_id={stream_id}"
                )));
            }
        } else if guid == GUID_STREAM_BITRATE_PROPERTIES {
            require_size(size, 26, "Stream Bitrate Properties")?;
            let count = LittleEndian::read_u16(field(header, i + 24, 2, "bitrate record count")?);
            require_size(size, 26 + 6 * u64::from(count), "Stream Bitrate Properties")?;
            for j in 0..usize::from(count) {
                let rec = i + 26 + j * 6;
                let record = field(header, rec, 6, "bitrate record")?;
                let stream_id = LittleEndian::read_u16(&record[0..2]);
                check_stream_id(stream_id)?;
                // A repeated stream id overwrites the earlier record.
                bitrates.insert(stream_id, LittleEndian::read_u32(&record[2..6]));
                bitrate_offsets.insert(stream_id, rec + 2);
            }
        } else if guid == GUID_DATA {
            packet_count = Some(LittleEndian::read_u64(field(header, i + 40, 8, "packet count")?));
        }

        if size > MAX_WALKED_OBJECT_SIZE {
            i = header.len();
            break;
        }
        let next = i as u64 + size;
        if next > header.len() as u64 {
            return Err(MmshError::MalformedInput(format!(
                "object at offset {i} with size={size} overruns header length {}",
                header.len()
            )));
        }
        i = next as usize;
    }

    if i != header.len() {
        return Err(MmshError::MalformedInput(format!(
            "object walk ended at {i}, header length is {}",
            header.len()
        )));
    }
    let packet_size = packet_size.ok_or_else(|| {
        MmshError::MalformedInput("could not find packet_size in ASF header".to_string())
    })?;
    if let Some(count) = packet_count {
        count
            .checked_mul(u64::from(packet_size))
            .and_then(|bytes| bytes.checked_add(header.len() as u64))
            .ok_or_else(|| {
                MmshError::MalformedInput(format!(
                    "packet_count={count} with packet_size={packet_size} overflows the file size"
                ))
            })?;
    }

    Ok(HeaderInfo {
        packet_size,
        total_size,
        packet_count,
        streams,
        bitrates,
        bitrate_offsets,
        header_len: header.len(),
    })
}

/// Returns a copy of `header` with the bitrate of every stream outside
/// `enabled` set to zero, so players do not auto-select those streams.
pub fn disable_streams(header: &[u8], info: &HeaderInfo, enabled: &BTreeSet<u16>) -> Vec<u8> {
    let mut patched = header.to_vec();
    for (stream_id, &offset) in &info.bitrate_offsets {
        if enabled.contains(stream_id) {
            continue;
        }
        if let Some(slot) = patched.get_mut(offset..offset + 4) {
            slot.fill(0);
        }
    }
    patched
}
