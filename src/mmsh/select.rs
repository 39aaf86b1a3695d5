//! Picks the substreams to request in the download phase.

use std::collections::BTreeSet;

use super::asf::{HeaderInfo, StreamKind};
use super::error::{MmshError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSelection {
    pub audio_id: Option<u16>,
    pub video_id: Option<u16>,
    /// Union of `audio_id` and `video_id`.
    pub enabled: BTreeSet<u16>,
}

/// Highest-bitrate stream of `kind`; lowest id wins a tie.
///
/// A bitrate of 0 marks a stream as disabled and it is never picked. A
/// stream with no bitrate record counts as -1.
pub fn best_stream(info: &HeaderInfo, kind: StreamKind) -> Option<u16> {
    let mut best: Option<(u16, i64)> = None;
    let floor = -2i64;
    for (&stream_id, &stream_kind) in &info.streams {
        if stream_kind != kind {
            continue;
        }
        let bitrate = info.bitrates.get(&stream_id).map_or(-1, |&b| i64::from(b));
        if bitrate == 0 {
            continue;
        }
        let current = best.map_or(floor, |(_, b)| b);
        if bitrate > current {
            best = Some((stream_id, bitrate));
        }
    }
    best.map(|(stream_id, _)| stream_id)
}

pub fn select_streams(info: &HeaderInfo) -> Result<StreamSelection> {
    let audio_id = best_stream(info, StreamKind::Audio);
    let video_id = best_stream(info, StreamKind::Video);
    if audio_id.is_none() && video_id.is_none() {
        return Err(MmshError::UnreachableStream(format!(
            "no audio or video stream among {} stream(s)",
            info.streams.len()
        )));
    }
    let enabled = audio_id.into_iter().chain(video_id).collect();
    Ok(StreamSelection {
        audio_id,
        video_id,
        enabled,
    })
}
