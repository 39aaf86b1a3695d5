//! Console and file logging for a download run.
//!
//! The console layer writes to stderr next to the progress bar; the file
//! layer always records DEBUG into `logs/latest.log`, which is zipped away
//! when the run ends or when it has grown past `MAX_LOG_BYTES`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::{io, panic};

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{error, info};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use zip::CompressionMethod;
use zip::write::FileOptions;

const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
const LATEST_LOG: &str = "latest.log";
/// Exit status after Ctrl-C, as shells report SIGINT.
const INTERRUPTED_EXIT: i32 = 130;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("subscriber init failed: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("time formatting failed: {0}")]
    Time(#[from] time::error::Format),
}

#[derive(Clone, Copy, Debug)]
pub struct LogOptions {
    /// Console shows DEBUG instead of INFO.
    pub debug: bool,
    pub use_color: bool,
    pub archive_on_exit: bool,
}

/// Keeps the file writer alive; dropping it flushes and archives the log.
pub struct LogSystem {
    shutdown: Arc<Shutdown>,
}

impl LogSystem {
    /// Logs go to `<base_dir>/logs`, or `./logs` without a base directory.
    pub fn init_with_base(options: LogOptions, base_dir: Option<&Path>) -> Result<Self, LogError> {
        let logs_dir = base_dir.map_or_else(|| PathBuf::from("logs"), |dir| dir.join("logs"));
        fs::create_dir_all(&logs_dir)?;
        let latest_log = logs_dir.join(LATEST_LOG);
        archive_if_large(&latest_log, &logs_dir)?;

        let (file_writer, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .finish(rolling::never(&logs_dir, LATEST_LOG));

        let console_level = if options.debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        let console_layer = fmt::layer()
            .with_target(false)
            .with_ansi(options.use_color)
            .with_writer(io::stderr)
            .with_filter(console_level);
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(file_writer)
            .with_filter(LevelFilter::DEBUG);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        let shutdown = Arc::new(Shutdown {
            logs_dir,
            latest_log,
            guard: Mutex::new(Some(guard)),
            done: AtomicBool::new(false),
            archive: options.archive_on_exit,
        });
        shutdown.on_ctrl_c();
        shutdown.on_panic();
        Ok(Self { shutdown })
    }
}

impl Drop for LogSystem {
    fn drop(&mut self) {
        self.shutdown.run();
    }
}

/// One-shot flush-and-archive, shared by drop, Ctrl-C and the panic hook.
struct Shutdown {
    logs_dir: PathBuf,
    latest_log: PathBuf,
    guard: Mutex<Option<WorkerGuard>>,
    done: AtomicBool,
    archive: bool,
}

impl Shutdown {
    fn on_ctrl_c(self: &Arc<Self>) {
        let shutdown = Arc::clone(self);
        // A second handler cannot be installed; logging still works without it.
        let _ = ctrlc::set_handler(move || {
            // The partial output file stays on disk as written so far.
            error!("interrupted, aborting download");
            shutdown.run();
            std::process::exit(INTERRUPTED_EXIT);
        });
    }

    fn on_panic(self: &Arc<Self>) {
        let shutdown = Arc::clone(self);
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            error!("panic: {info}");
            shutdown.run();
            previous(info);
        }));
    }

    fn run(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the guard flushes the non-blocking writer.
        if let Ok(mut guard) = self.guard.lock() {
            guard.take();
        }
        if self.archive {
            if let Err(err) = archive_log_file(&self.latest_log, &self.logs_dir) {
                eprintln!("failed to archive log: {err}");
            }
        }
    }
}

fn archive_if_large(latest_log: &Path, logs_dir: &Path) -> Result<(), LogError> {
    let too_big = fs::metadata(latest_log).is_ok_and(|meta| meta.len() >= MAX_LOG_BYTES);
    if too_big {
        archive_log_file(latest_log, logs_dir)?;
    }
    Ok(())
}

/// Zips `latest.log` into `mmsh_<timestamp>.zip` and removes it.
/// Empty logs are deleted instead; returns the archive path if one was made.
fn archive_log_file(latest_log: &Path, logs_dir: &Path) -> Result<Option<PathBuf>, LogError> {
    let len = match fs::metadata(latest_log) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if len == 0 {
        let _ = fs::remove_file(latest_log);
        return Ok(None);
    }

    let stamp = OffsetDateTime::now_utc().format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))?;
    let archive_path = logs_dir.join(format!("mmsh_{stamp}.zip"));
    let mut zip = zip::ZipWriter::new(File::create(&archive_path)?);
    zip.start_file(
        format!("mmsh_{stamp}.log"),
        FileOptions::default().compression_method(CompressionMethod::Deflated),
    )?;
    io::copy(&mut File::open(latest_log)?, &mut zip)?;
    zip.finish()?;

    let _ = fs::remove_file(latest_log);
    info!("log archived to {}", archive_path.display());
    Ok(Some(archive_path))
}
