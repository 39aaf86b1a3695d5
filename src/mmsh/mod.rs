//! mmsh:// (MMS over HTTP) client protocol.
//!
//! - `chunk`     : chunk framing demultiplexer
//! - `asf`       : ASF header object table parser and bitrate patch
//! - `select`    : audio/video substream choice
//! - `session`   : discovery + download request pair
//! - `transport` : blocking HTTP transport
//! - `sink`      : output destinations

pub mod asf;
pub mod chunk;
pub mod error;
pub mod select;
pub mod session;
pub mod sink;
pub mod transport;

pub use error::MmshError;
pub use session::{MmshSession, ProgressSnapshot};
pub use sink::FileSink;
pub use transport::{HttpTransport, Transport};
