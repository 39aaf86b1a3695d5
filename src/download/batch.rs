//! Drives one mmsh download per line of a URL list.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{error, info, warn};

use super::models::{BatchResult, FinishedDownload, UrlTarget};
use super::progress::ProgressReporter;
use crate::base_system::context::{Config, safe_fs_name};
use crate::mmsh::{FileSink, MmshError, MmshSession, Transport};

const FALLBACK_FILE_NAME: &str = "download.asf";

static RE_SCHEME: OnceLock<Regex> = OnceLock::new();
static RE_QUERY: OnceLock<Regex> = OnceLock::new();

fn re_scheme() -> &'static Regex {
    RE_SCHEME.get_or_init(|| Regex::new(r"^([A-Za-z]\w+)://").expect("compile RE_SCHEME"))
}

fn re_query() -> &'static Regex {
    RE_QUERY.get_or_init(|| Regex::new(r"(?s)\?.*\z").expect("compile RE_QUERY"))
}

/// Last path segment with the query string removed.
pub fn output_file_name(url: &str) -> String {
    let without_query = re_query().replace(url.trim(), "");
    let segment = without_query
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim();
    if segment.is_empty() {
        return FALLBACK_FILE_NAME.to_string();
    }
    safe_fs_name(segment, '_', 200)
}

pub fn classify_url(line: &str) -> UrlTarget {
    let url = line.trim();
    let Some(caps) = re_scheme().captures(url) else {
        return UrlTarget::Invalid {
            line: url.to_string(),
        };
    };
    let scheme = caps[1].to_ascii_lowercase();
    if scheme == "mmsh" {
        UrlTarget::Mmsh {
            url: url.to_string(),
            file_name: output_file_name(url),
        }
    } else {
        UrlTarget::Unsupported {
            url: url.to_string(),
            scheme,
        }
    }
}

/// Non-empty lines that are not `#` comments.
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read URL list {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

pub fn download_one<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    file_name: &str,
    config: &Config,
) -> Result<FinishedDownload> {
    let save_dir = config.default_save_dir();
    fs::create_dir_all(&save_dir)
        .with_context(|| format!("create save directory {}", save_dir.display()))?;
    let path = save_dir.join(file_name);
    if !config.allow_overwrite_files && path.exists() {
        bail!("output file {} already exists", path.display());
    }

    info!("Downloading MMS from {url}");
    let start = Instant::now();
    let mut session = MmshSession::new(transport, url);
    let discovery = session
        .discover()
        .with_context(|| format!("discovery failed for {url}"))?;

    info!("Saving ASF to {}", path.display());
    let mut sink = FileSink::create(&path, config.allow_overwrite_files)
        .with_context(|| format!("create output file {}", path.display()))?;

    let mut reporter = ProgressReporter::new(file_name, config.show_progress);
    let outcome = session.download(&discovery, &mut sink, &mut |snap| reporter.update(snap));
    reporter.finish();
    let summary = match outcome {
        Ok(summary) => summary,
        Err(err) => {
            if let Some(percent) = reporter.percent() {
                warn!("{} stopped at {percent:.1}%", path.display());
            }
            return Err(err).with_context(|| format!("download failed for {url}"));
        }
    };

    info!(
        "Download finished ({} bytes) in {}s",
        summary.bytes_written,
        start.elapsed().as_secs_f64().ceil() as u64
    );
    Ok(FinishedDownload {
        path: sink.path().to_path_buf(),
        bytes: summary.bytes_written,
        packets: summary.packets,
    })
}

/// Runs every URL; one failing URL never stops the others.
pub fn run_batch<T: Transport + ?Sized>(
    transport: &T,
    lines: &[String],
    config: &Config,
) -> BatchResult {
    let mut result = BatchResult::default();
    for line in lines {
        match classify_url(line) {
            UrlTarget::Mmsh { url, file_name } => {
                match download_one(transport, &url, &file_name, config) {
                    Ok(done) => {
                        info!(
                            path = %done.path.display(),
                            packets = done.packets,
                            "saved {} bytes",
                            done.bytes
                        );
                        result.success += 1;
                    }
                    Err(err) => {
                        let kind = err.downcast_ref::<MmshError>().map(MmshError::kind);
                        error!(kind = ?kind, "{err:#}");
                        result.failed += 1;
                    }
                }
            }
            UrlTarget::Unsupported { url, scheme } => {
                warn!("Unsupported protocol {scheme} for URL: {url}");
                result.skipped += 1;
            }
            UrlTarget::Invalid { line } => {
                warn!("Invalid protocol for URL: {line}");
                result.skipped += 1;
            }
        }
    }
    info!(
        success = result.success,
        failed = result.failed,
        skipped = result.skipped,
        "all downloads processed"
    );
    result
}
