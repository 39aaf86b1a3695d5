//! The two-request mmsh session.
//!
//! 1. Discovery: ask for the stream with `request-context=1`, read ASF_HEADER
//!    chunks until the header is complete, parse it and pick the streams.
//! 2. Download: ask again with `request-context=2` and a stream-switch list,
//!    then write the patched header followed by every DATA payload padded to
//!    the packet size until END.

use tracing::{debug, info};

use super::asf::{self, HeaderInfo};
use super::chunk::{Chunk, ChunkDemuxer, ChunkKind, HeaderAccumulator};
use super::error::{MmshError, Result};
use super::select::{self, StreamSelection};
use super::sink::OutputSink;
use super::transport::Transport;

pub const USER_AGENT: &str = "NSPlayer/4.1.0.3856";
pub const CLIENT_GUID: &str = "{c77e7400-738a-11d2-9add-0020af0a3278}";

/// Stream-switch flag for a stream the server should deliver.
const STREAM_ENABLED: u8 = 0;
/// Stream-switch flag for a stream the server should leave out.
const STREAM_DISABLED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discovery,
    Download,
}

/// Everything that changes while chunks are processed.
#[derive(Debug)]
pub struct SessionState {
    pub phase: Phase,
    /// Bytes handed to the output sink so far.
    pub position: u64,
    /// Sink position where the current header cycle was written.
    pub cycle_start: u64,
    pub packets: u64,
    /// Content-Length of the download response, if the server sent one.
    pub declared_length: Option<u64>,
    header: HeaderAccumulator,
    /// Header of the current cycle, once consumed.
    current: Option<HeaderInfo>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: Phase::Discovery,
            position: 0,
            cycle_start: 0,
            packets: 0,
            declared_length: None,
            header: HeaderAccumulator::default(),
            current: None,
        }
    }

    #[cfg(test)]
    pub fn header_consumed(&self) -> bool {
        self.header.is_consumed()
    }
}

#[derive(Debug, Clone)]
pub struct Discovery {
    pub info: HeaderInfo,
    pub selection: StreamSelection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub written: u64,
    pub expected: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    pub bytes_written: u64,
    pub packets: u64,
    pub out_of_order_packets: u64,
    pub header_len: usize,
    pub expected_size: Option<u64>,
}

fn client_headers(request_context: u32) -> Vec<String> {
    vec![
        "Accept: */*".to_string(),
        format!("User-Agent: {USER_AGENT}"),
        format!(
            "Pragma: no-cache,rate=1.000000,stream-time=0,stream-offset=0:0,request-context={request_context},max-duration=0"
        ),
        format!("Pragma: xClientGUID={CLIENT_GUID}"),
    ]
}

pub fn discovery_headers() -> Vec<String> {
    client_headers(1)
}

/// `ffff:<id>:<flag>` for every known stream, ascending, space-joined.
pub fn stream_switch_descriptor(info: &HeaderInfo, selection: &StreamSelection) -> String {
    info.streams
        .keys()
        .map(|id| {
            let flag = if selection.enabled.contains(id) {
                STREAM_ENABLED
            } else {
                STREAM_DISABLED
            };
            format!("ffff:{id}:{flag}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn download_headers(info: &HeaderInfo, selection: &StreamSelection) -> Vec<String> {
    let mut headers = client_headers(2);
    headers.push("Pragma: xPlayStrm=1".to_string());
    headers.push(format!("Pragma: stream-switch-count={}", info.streams.len()));
    headers.push(format!(
        "Pragma: stream-switch-entry={}",
        stream_switch_descriptor(info, selection)
    ));
    headers
}

enum Flow {
    Continue,
    Finished,
}

pub struct MmshSession<'t, T: Transport + ?Sized> {
    transport: &'t T,
    url: String,
    state: SessionState,
}

impl<'t, T: Transport + ?Sized> MmshSession<'t, T> {
    pub fn new(transport: &'t T, url: &str) -> Self {
        Self {
            transport,
            url: url.trim().to_string(),
            state: SessionState::new(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Phase 1: fetch and parse the header, then choose streams.
    pub fn discover(&mut self) -> Result<Discovery> {
        if self.state.phase != Phase::Discovery {
            return Err(MmshError::ProtocolViolation(
                "discovery already completed for this session".to_string(),
            ));
        }
        info!(url = %self.url, "discovery request");
        let resp = self
            .transport
            .request(&self.url, &discovery_headers(), None)?;

        let mut demux = ChunkDemuxer::new(resp.body);
        loop {
            match demux.next_chunk()? {
                Some(Chunk {
                    kind: ChunkKind::HeaderFragment,
                    payload,
                    ..
                }) => self.state.header.push(&payload)?,
                Some(chunk) if self.state.header.is_pending() => {
                    debug!(kind = %chunk.kind, "header complete");
                    break;
                }
                Some(chunk) => {
                    return Err(MmshError::ProtocolViolation(format!(
                        "expected ASF_HEADER chunk, got {}",
                        chunk.kind
                    )));
                }
                None if self.state.header.is_pending() => break,
                None => {
                    return Err(MmshError::UnexpectedEof(
                        "connection closed before any ASF_HEADER chunk".to_string(),
                    ));
                }
            }
        }
        // Close the first connection before anything else happens.
        drop(demux);

        let header = self.state.header.take();
        let info = asf::parse_header(&header)?;
        let selection = select::select_streams(&info)?;
        info!(
            packet_size = info.packet_size,
            packet_count = ?info.packet_count,
            streams = info.streams.len(),
            audio = ?selection.audio_id,
            video = ?selection.video_id,
            "discovery finished"
        );

        self.state.header.reset();
        self.state.phase = Phase::Download;
        Ok(Discovery { info, selection })
    }

    /// Phase 2: stream the selected substreams into `sink`.
    pub fn download<S: OutputSink + ?Sized>(
        &mut self,
        discovery: &Discovery,
        sink: &mut S,
        progress: &mut dyn FnMut(ProgressSnapshot),
    ) -> Result<DownloadSummary> {
        if self.state.phase != Phase::Download {
            return Err(MmshError::ProtocolViolation(
                "download requested before discovery".to_string(),
            ));
        }
        let headers = download_headers(&discovery.info, &discovery.selection);
        info!(url = %self.url, descriptor = %stream_switch_descriptor(&discovery.info, &discovery.selection), "download request");
        let resp = self.transport.request(&self.url, &headers, None)?;
        self.state.declared_length = resp.content_length;
        let mut demux = ChunkDemuxer::new(resp.body);

        loop {
            let Some(chunk) = demux.next_chunk()? else {
                return Err(MmshError::UnexpectedEof(
                    "connection closed before END chunk".to_string(),
                ));
            };
            match self.step(chunk, discovery, sink, progress)? {
                Flow::Continue => {}
                Flow::Finished => break,
            }
        }

        let info = self.state.current.as_ref().ok_or_else(|| {
            MmshError::ProtocolViolation("session ended without an ASF header".to_string())
        })?;
        // Only the last header cycle is checked; bytes before a RESET are not.
        let written = self.state.position - self.state.cycle_start;
        if let Some(exact) = info.exact_output_size() {
            if written != exact {
                return Err(MmshError::ProtocolViolation(format!(
                    "output is {written} bytes, header promised {exact}"
                )));
            }
        }

        let summary = DownloadSummary {
            bytes_written: self.state.position,
            packets: self.state.packets,
            out_of_order_packets: demux.out_of_order(),
            header_len: info.header_len,
            expected_size: info.expected_output_size(),
        };
        info!(
            bytes = summary.bytes_written,
            packets = summary.packets,
            out_of_order = summary.out_of_order_packets,
            wire_bytes = demux.bytes_read(),
            "download finished"
        );
        Ok(summary)
    }

    fn step<S: OutputSink + ?Sized>(
        &mut self,
        chunk: Chunk,
        discovery: &Discovery,
        sink: &mut S,
        progress: &mut dyn FnMut(ProgressSnapshot),
    ) -> Result<Flow> {
        if chunk.kind == ChunkKind::HeaderFragment {
            self.state.header.push(&chunk.payload)?;
            return Ok(Flow::Continue);
        }
        if self.state.header.is_pending() {
            self.write_header(discovery, sink)?;
            progress(self.snapshot());
        }

        match chunk.kind {
            ChunkKind::Data => {
                let packet_size = self
                    .state
                    .current
                    .as_ref()
                    .map(|info| info.packet_size as usize)
                    .ok_or_else(|| {
                        MmshError::ProtocolViolation("DATA chunk before ASF header".to_string())
                    })?;
                let len = chunk.payload.len();
                if len > packet_size {
                    return Err(MmshError::ProtocolViolation(format!(
                        "DATA chunk of {len} bytes exceeds packet_size={packet_size}"
                    )));
                }
                sink.write_all(&chunk.payload)?;
                sink.write_zeros(packet_size - len)?;
                self.state.position += packet_size as u64;
                self.state.packets += 1;
                progress(self.snapshot());
                Ok(Flow::Continue)
            }
            ChunkKind::Reset => {
                debug!(position = self.state.position, "RESET chunk, starting new header cycle");
                self.state.header.reset();
                self.state.current = None;
                Ok(Flow::Continue)
            }
            ChunkKind::End => {
                sink.finish()?;
                Ok(Flow::Finished)
            }
            ChunkKind::HeaderFragment => Ok(Flow::Continue),
        }
    }

    /// Parses the finished header, zeroes bitrates of unselected streams and
    /// writes it out.
    fn write_header<S: OutputSink + ?Sized>(
        &mut self,
        discovery: &Discovery,
        sink: &mut S,
    ) -> Result<()> {
        let header = self.state.header.take();
        let info = asf::parse_header(&header)?;
        let patched = asf::disable_streams(&header, &info, &discovery.selection.enabled);
        sink.write_all(&patched)?;

        debug!(
            header_len = info.header_len,
            expected = ?info.expected_output_size(),
            "ASF header written"
        );
        self.state.cycle_start = self.state.position;
        self.state.position += patched.len() as u64;
        self.state.current = Some(info);
        Ok(())
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            written: self.state.position,
            expected: self
                .state
                .current
                .as_ref()
                .and_then(HeaderInfo::expected_output_size)
                .map(|size| size.saturating_add(self.state.cycle_start))
                .or(self.state.declared_length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmsh::asf::tests::{HeaderBuilder, sample_header};
    use crate::mmsh::asf::{GUID_AUDIO_MEDIA, GUID_VIDEO_MEDIA};
    use crate::mmsh::chunk::tests::frame;
    use crate::mmsh::error::ErrorKind;
    use crate::mmsh::transport::TransportResponse;
    use byteorder::{ByteOrder, LittleEndian};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Replays canned bodies and records what was asked for.
    #[derive(Default)]
    struct ScriptedTransport {
        bodies: RefCell<VecDeque<Vec<u8>>>,
        requests: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedTransport {
        fn with(bodies: Vec<Vec<u8>>) -> Self {
            Self {
                bodies: RefCell::new(bodies.into()),
                requests: RefCell::default(),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn request(
            &self,
            _url: &str,
            headers: &[String],
            _body: Option<&[u8]>,
        ) -> Result<TransportResponse> {
            self.requests.borrow_mut().push(headers.to_vec());
            let body = self
                .bodies
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| MmshError::Transport("no scripted response".to_string()))?;
            Ok(TransportResponse {
                content_length: Some(body.len() as u64),
                body: Box::new(Cursor::new(body)),
            })
        }
    }

    fn header_chunks(header: &[u8]) -> Vec<u8> {
        let (a, b) = header.split_at(header.len() / 2);
        let mut wire = frame(ChunkKind::HeaderFragment, 0, a);
        wire.extend(frame(ChunkKind::HeaderFragment, 1, b));
        wire
    }

    /// Header of exactly 500 bytes announcing 10 packets of 1000 bytes.
    fn header_500() -> Vec<u8> {
        let header = HeaderBuilder::default()
            .file_properties(99_999, 1000)
            .stream(GUID_AUDIO_MEDIA, 1)
            .stream(GUID_VIDEO_MEDIA, 2)
            .bitrates(&[(1, 32_000), (2, 300_000)])
            .opaque(98)
            .data(10, 0x00AB_CD12)
            .build();
        assert_eq!(header.len(), 500);
        header
    }

    fn download_body(header: &[u8], payloads: &[Vec<u8>], end_seq: u32) -> Vec<u8> {
        let mut wire = header_chunks(header);
        for (seq, payload) in payloads.iter().enumerate() {
            wire.extend(frame(ChunkKind::Data, seq as u32, payload));
        }
        wire.extend(frame(ChunkKind::End, end_seq, b""));
        wire
    }

    fn run(transport: &ScriptedTransport) -> Result<(Vec<u8>, DownloadSummary)> {
        let mut session = MmshSession::new(transport, "mmsh://example.org/clip.asf");
        let discovery = session.discover()?;
        let mut out = Vec::new();
        let summary = session.download(&discovery, &mut out, &mut |_| {})?;
        Ok((out, summary))
    }

    #[test]
    fn reconstructs_file_with_exact_length() {
        let header = header_500();
        let mut discovery = header_chunks(&header);
        discovery.extend(frame(ChunkKind::Data, 0, b"ignored"));

        let mut payloads: Vec<Vec<u8>> = (0..9).map(|n| vec![n as u8 + 1; 1000]).collect();
        payloads.push(vec![0xAA; 300]);
        let transport = ScriptedTransport::with(vec![discovery, download_body(&header, &payloads, 0)]);

        let (out, summary) = run(&transport).unwrap();
        assert_eq!(out.len(), 500 + 10 * 1000);
        assert_eq!(summary.bytes_written, 10_500);
        assert_eq!(summary.packets, 10);
        assert_eq!(summary.expected_size, Some(10_500));
        assert_eq!(&out[..500], header.as_slice());
        assert_eq!(&out[500..1500], vec![1u8; 1000].as_slice());
        let last = &out[9500..];
        assert!(last[..300].iter().all(|&b| b == 0xAA));
        assert!(last[300..].iter().all(|&b| b == 0));
    }

    #[test]
    fn requests_carry_client_identity_and_switch_list() {
        let header = HeaderBuilder::default()
            .file_properties(0, 100)
            .stream(GUID_AUDIO_MEDIA, 1)
            .stream(GUID_VIDEO_MEDIA, 2)
            .stream(GUID_AUDIO_MEDIA, 3)
            .bitrates(&[(1, 32_000), (2, 300_000), (3, 64_000)])
            .build();
        let transport = ScriptedTransport::with(vec![
            header_chunks(&header),
            download_body(&header, &[vec![7; 100]], 0),
        ]);

        let (out, _) = run(&transport).unwrap();

        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].iter().any(|h| h.contains("request-context=1")));
        assert!(requests[0].contains(&format!("User-Agent: {USER_AGENT}")));
        assert!(requests[1].iter().any(|h| h.contains("request-context=2")));
        assert!(requests[1].iter().any(|h| h.contains("stream-time=0")));
        assert!(requests[1].contains(&"Pragma: xPlayStrm=1".to_string()));
        assert!(requests[1].contains(&"Pragma: stream-switch-count=3".to_string()));
        assert!(
            requests[1]
                .contains(&"Pragma: stream-switch-entry=ffff:1:2 ffff:2:0 ffff:3:0".to_string())
        );

        // Stream 1 lost the selection, so its advertised bitrate is zeroed.
        let info = asf::parse_header(&header).unwrap();
        let off = info.bitrate_offsets[&1];
        assert_eq!(LittleEndian::read_u32(&out[off..off + 4]), 0);
        let off = info.bitrate_offsets[&3];
        assert_eq!(LittleEndian::read_u32(&out[off..off + 4]), 64_000);
    }

    #[test]
    fn discovery_accepts_eof_after_header() {
        let transport = ScriptedTransport::with(vec![header_chunks(&sample_header(2))]);
        let mut session = MmshSession::new(&transport, "mmsh://h/a.asf");
        let discovery = session.discover().unwrap();
        assert_eq!(discovery.selection.audio_id, Some(1));
        assert_eq!(discovery.selection.video_id, Some(2));
        assert_eq!(session.state().phase, Phase::Download);
        assert!(!session.state().header_consumed());
        assert_eq!(session.discover().unwrap_err().kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn discovery_failures() {
        let empty = ScriptedTransport::with(vec![Vec::new()]);
        let err = MmshSession::new(&empty, "mmsh://h/a").discover().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);

        let data_first = ScriptedTransport::with(vec![frame(ChunkKind::Data, 0, b"x")]);
        let err = MmshSession::new(&data_first, "mmsh://h/a").discover().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);

        let no_streams = HeaderBuilder::default().file_properties(0, 100).build();
        let t = ScriptedTransport::with(vec![header_chunks(&no_streams)]);
        let err = MmshSession::new(&t, "mmsh://h/a").discover().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreachableStream);
    }

    #[test]
    fn end_with_sequence_one_is_not_supported() {
        let header = sample_header(1);
        let transport = ScriptedTransport::with(vec![
            header_chunks(&header),
            download_body(&header, &[vec![1; 10]], 1),
        ]);
        assert_eq!(run(&transport).unwrap_err().kind(), ErrorKind::NotSupported);
    }

    #[test]
    fn unknown_chunk_type_writes_nothing() {
        let header = sample_header(1);
        let mut bad = vec![0x99, 0x99, 0x08, 0x00];
        bad.extend([0u8; 8]);
        let transport = ScriptedTransport::with(vec![header_chunks(&header), bad]);

        let mut session = MmshSession::new(&transport, "mmsh://h/a");
        let discovery = session.discover().unwrap();
        let mut out = Vec::new();
        let err = session.download(&discovery, &mut out, &mut |_| {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
        assert!(out.is_empty());
    }

    #[test]
    fn oversized_data_chunk_is_protocol_violation() {
        let header = sample_header(1);
        let transport = ScriptedTransport::with(vec![
            header_chunks(&header),
            download_body(&header, &[vec![1; 1001]], 0),
        ]);
        assert_eq!(run(&transport).unwrap_err().kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn packet_count_mismatch_is_detected() {
        let header = sample_header(3);
        let transport = ScriptedTransport::with(vec![
            header_chunks(&header),
            download_body(&header, &[vec![1; 1000], vec![2; 1000]], 0),
        ]);
        assert_eq!(run(&transport).unwrap_err().kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn connection_drop_before_end_is_unexpected_eof() {
        let header = sample_header(2);
        let mut body = header_chunks(&header);
        body.extend(frame(ChunkKind::Data, 0, &[1; 1000]));
        let transport = ScriptedTransport::with(vec![header_chunks(&header), body]);
        assert_eq!(run(&transport).unwrap_err().kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn reset_starts_a_new_header_cycle() {
        let header = sample_header(1);
        let mut body = header_chunks(&header);
        body.extend(frame(ChunkKind::Data, 0, &[1; 1000]));
        body.extend(frame(ChunkKind::Reset, 0, b"\x01\x00\x00\x00"));
        body.extend(header_chunks(&header));
        body.extend(frame(ChunkKind::Data, 0, &[2; 10]));
        body.extend(frame(ChunkKind::End, 0, b""));
        let transport = ScriptedTransport::with(vec![header_chunks(&header), body]);

        let (out, summary) = run(&transport).unwrap();
        let cycle = header.len() + 1000;
        assert_eq!(out.len(), 2 * cycle);
        assert_eq!(summary.packets, 2);
        assert_eq!(&out[cycle..cycle + header.len()], header.as_slice());
    }

    #[test]
    fn progress_reports_expected_total() {
        let header = sample_header(2);
        let transport = ScriptedTransport::with(vec![
            header_chunks(&header),
            download_body(&header, &[vec![1; 1000], vec![2; 5]], 0),
        ]);
        let mut session = MmshSession::new(&transport, "mmsh://h/a");
        let discovery = session.discover().unwrap();
        let mut seen = Vec::new();
        let mut out = Vec::new();
        session
            .download(&discovery, &mut out, &mut |snap| seen.push(snap))
            .unwrap();

        let total = header.len() as u64 + 2000;
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|s| s.expected == Some(total)));
        assert_eq!(seen.last().unwrap().written, total);
    }

    #[test]
    fn data_before_any_header_is_protocol_violation() {
        let header = sample_header(1);
        let mut body = frame(ChunkKind::Data, 0, &[1; 1000]);
        body.extend(frame(ChunkKind::End, 0, b""));
        let transport = ScriptedTransport::with(vec![header_chunks(&header), body]);

        let mut session = MmshSession::new(&transport, "mmsh://h/a");
        let discovery = session.discover().unwrap();
        let mut out = Vec::new();
        let err = session.download(&discovery, &mut out, &mut |_| {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
        assert!(out.is_empty());
    }

    #[test]
    fn header_fragment_after_consumed_header_is_rejected() {
        let header = sample_header(2);
        let mut body = header_chunks(&header);
        body.extend(frame(ChunkKind::Data, 0, &[1; 1000]));
        body.extend(frame(ChunkKind::HeaderFragment, 0, &header[..10]));
        body.extend(frame(ChunkKind::Data, 1, &[2; 1000]));
        body.extend(frame(ChunkKind::End, 0, b""));
        let transport = ScriptedTransport::with(vec![header_chunks(&header), body]);

        let mut session = MmshSession::new(&transport, "mmsh://h/a");
        let discovery = session.discover().unwrap();
        let mut out = Vec::new();
        let err = session.download(&discovery, &mut out, &mut |_| {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
        assert_eq!(out.len(), header.len() + 1000);
        assert!(session.state().header_consumed());
    }

    #[test]
    fn huge_packet_count_fails_discovery_cleanly() {
        let header = HeaderBuilder::default()
            .file_properties(1_234_567, 1000)
            .stream(GUID_AUDIO_MEDIA, 1)
            .data(u64::MAX / 2, 0x00AB_CD12)
            .build();
        let transport = ScriptedTransport::with(vec![header_chunks(&header)]);
        let err = MmshSession::new(&transport, "mmsh://h/a").discover().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn progress_falls_back_to_content_length() {
        let header = HeaderBuilder::default()
            .file_properties(0, 100)
            .stream(GUID_AUDIO_MEDIA, 1)
            .build();
        let body = download_body(&header, &[vec![1; 100]], 0);
        let declared = body.len() as u64;
        let transport = ScriptedTransport::with(vec![header_chunks(&header), body]);

        let mut session = MmshSession::new(&transport, "mmsh://h/a");
        let discovery = session.discover().unwrap();
        let mut seen = Vec::new();
        let mut out = Vec::new();
        session
            .download(&discovery, &mut out, &mut |snap| seen.push(snap))
            .unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|s| s.expected == Some(declared)));
    }

    #[test]
    fn switch_descriptor_lists_every_known_stream() {
        let info = asf::parse_header(&sample_header(1)).unwrap();
        let selection = StreamSelection {
            audio_id: None,
            video_id: Some(2),
            enabled: [2].into_iter().collect(),
        };
        assert_eq!(stream_switch_descriptor(&info, &selection), "ffff:1:2 ffff:2:0");
    }
}
