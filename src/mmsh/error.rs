//! Typed failures of a single mmsh session.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MmshError>;

#[derive(Debug, Error)]
pub enum MmshError {
    #[error("malformed ASF header: {0}")]
    MalformedInput(String),
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("unexpected EOF: {0}")]
    UnexpectedEof(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("no usable stream: {0}")]
    UnreachableStream(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

/// Flat view of [`MmshError`] for matching without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    ProtocolViolation,
    UnexpectedEof,
    NotSupported,
    UnreachableStream,
    Transport,
    Io,
}

impl MmshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            Self::UnexpectedEof(_) => ErrorKind::UnexpectedEof,
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::UnreachableStream(_) => ErrorKind::UnreachableStream,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Maps a failed read from the session connection.
    pub(crate) fn from_read(err: io::Error, what: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof(format!("short read in {what}"))
        } else {
            Self::Transport(format!("read {what}: {err}"))
        }
    }
}

impl From<reqwest::Error> for MmshError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_failures_split_into_eof_and_transport() {
        let eof = MmshError::from_read(io::ErrorKind::UnexpectedEof.into(), "chunk payload");
        assert_eq!(eof.kind(), ErrorKind::UnexpectedEof);

        for kind in [io::ErrorKind::TimedOut, io::ErrorKind::ConnectionReset] {
            let err = MmshError::from_read(io::Error::new(kind, "gone"), "chunk payload");
            assert_eq!(err.kind(), ErrorKind::Transport);
            assert_eq!(err.to_string(), "transport error: read chunk payload: gone");
        }
    }
}
