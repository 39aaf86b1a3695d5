//! mmsh:// downloader: saves MMS-over-HTTP streams as byte-exact ASF files.
//!
//! Code layout:
//! - `mmsh`: chunk demuxer, ASF header parser, stream selection, session
//! - `download`: URL-list driver and progress bar
//! - `base_system`: config and logging

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use clap::Parser;

mod base_system;
mod download;
mod mmsh;

use base_system::config::load_or_create;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use download::batch;
use mmsh::HttpTransport;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "mmsh-downloader")]
#[command(about = "Download mmsh:// streams into ASF files")]
struct Cli {
    /// Enable debug log output
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Show version information and exit
    #[arg(long, default_value_t = false)]
    version: bool,

    /// Directory holding config.yml and logs/
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Text file with one URL per line
    #[arg(required_unless_present = "version")]
    url_list: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("mmsh-downloader v{VERSION}");
        return Ok(());
    }

    let data_dir = cli.data_dir.as_deref();
    let _log = init_logging(cli.debug, data_dir)?;

    let config = load_or_create::<Config>(data_dir).map_err(|e| anyhow!(e.to_string()))?;
    let Some(url_list) = cli.url_list else {
        bail!("no URL list given");
    };
    let urls = batch::read_url_list(&url_list)?;
    info!(count = urls.len(), list = %url_list.display(), "URL list loaded");

    let transport = HttpTransport::new(config.read_timeout(), config.connect_timeout())?;
    let result = batch::run_batch(&transport, &urls, &config);
    if !result.all_ok() {
        bail!("{} of {} downloads failed", result.failed, urls.len());
    }
    Ok(())
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: std::io::stderr().is_terminal(),
        archive_on_exit: true,
    };
    LogSystem::init_with_base(opts, base_dir).map_err(|e| anyhow!(e))
}
