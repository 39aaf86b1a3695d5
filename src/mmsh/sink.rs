//! Append-only destinations for the reconstructed ASF file.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const ZEROS: [u8; 4096] = [0u8; 4096];

pub trait OutputSink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn write_zeros(&mut self, mut count: usize) -> io::Result<()> {
        while count > 0 {
            let n = count.min(ZEROS.len());
            self.write_all(&ZEROS[..n])?;
            count -= n;
        }
        Ok(())
    }

    /// Flushes everything; nothing is written afterwards.
    fn finish(&mut self) -> io::Result<()>;
}

impl OutputSink for Vec<u8> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct FileSink {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileSink {
    /// Creates `path`; with `overwrite == false` an existing file is an error.
    pub fn create(path: &Path, overwrite: bool) -> io::Result<Self> {
        let mut opts = OpenOptions::new();
        opts.write(true);
        if overwrite {
            opts.create(true).truncate(true);
        } else {
            opts.create_new(true);
        }
        let file = opts.open(path)?;
        Ok(Self {
            writer: BufWriter::with_capacity(256 * 1024, file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for FileSink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }
}
