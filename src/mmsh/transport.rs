//! Request/response transport underneath an mmsh session.

use std::io::Read;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_ENCODING, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use super::error::{MmshError, Result};

pub struct TransportResponse {
    pub body: Box<dyn Read + Send>,
    pub content_length: Option<u64>,
}

/// Issues one request and hands back the response body as a byte stream.
///
/// Non-success statuses and connection problems all surface as
/// [`MmshError::Transport`].
pub trait Transport {
    fn request(&self, url: &str, headers: &[String], body: Option<&[u8]>)
    -> Result<TransportResponse>;
}

static RE_SCHEME: OnceLock<Regex> = OnceLock::new();

fn re_scheme() -> &'static Regex {
    RE_SCHEME.get_or_init(|| Regex::new(r"^(?i)(mmsh|http)://").expect("compile RE_SCHEME"))
}

/// `mmsh://host/path` is plain HTTP on the wire.
pub fn to_http_url(url: &str) -> Result<String> {
    let url = url.trim();
    let Some(m) = re_scheme().find(url) else {
        return Err(MmshError::Transport(format!("unsupported URL: {url}")));
    };
    Ok(format!("http://{}", &url[m.end()..]))
}

/// Splits `"Name: value"` request header lines into a header map, keeping
/// repeated names in order.
pub fn build_header_map(headers: &[String]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for line in headers {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        if line.contains(['\r', '\n']) {
            return Err(MmshError::Transport(format!(
                "line break inside request header {line:?}"
            )));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| MmshError::Transport(format!("missing colon in request header {line:?}")))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| MmshError::Transport(format!("bad header name in {line:?}: {e}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| MmshError::Transport(format!("bad header value in {line:?}: {e}")))?;
        map.append(name, value);
    }
    Ok(map)
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// `read_timeout` bounds every blocking read of the response body.
    pub fn new(read_timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        // The body is raw chunk framing; never let anything transcode it.
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(read_timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn request(
        &self,
        url: &str,
        headers: &[String],
        body: Option<&[u8]>,
    ) -> Result<TransportResponse> {
        let http_url = to_http_url(url)?;
        let header_map = build_header_map(headers)?;
        debug!(url = %http_url, headers = header_map.len(), "sending request");

        let request = match body {
            Some(data) => self.client.post(&http_url).body(data.to_vec()),
            None => self.client.get(&http_url),
        };
        let resp = request.headers(header_map).send()?;
        let resp = resp.error_for_status()?;
        let content_length = resp.content_length();
        debug!(status = %resp.status(), ?content_length, "response headers received");

        Ok(TransportResponse {
            body: Box::new(resp),
            content_length,
        })
    }
}
