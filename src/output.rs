//! Output destination for the finished image

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, SeedError};

/// Where the image bytes go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A file, created or truncated
    File(PathBuf),
    /// Standard output (only when it is not a terminal)
    Stdout,
}

impl Destination {
    /// Pick the destination for an optional output path
    ///
    /// Refuses to send binary data to a terminal.
    pub fn resolve(path: Option<PathBuf>, stdout_is_terminal: bool) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::File(path)),
            None if !stdout_is_terminal => Ok(Self::Stdout),
            None => Err(SeedError::usage(
                "Won't write data to terminal (redirect or specify -o)",
            )),
        }
    }

    /// Resolve against the process's real standard output
    pub fn from_path(path: Option<PathBuf>) -> Result<Self> {
        Self::resolve(path, io::stdout().is_terminal())
    }

    /// Write the whole image in one go
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        match self {
            Self::File(path) => {
                debug!("Writing {} bytes to {}", bytes.len(), path.display());
                fs::write(path, bytes)?;
            }
            Self::Stdout => {
                debug!("Writing {} bytes to stdout", bytes.len());
                let mut stdout = io::stdout().lock();
                stdout.write_all(bytes)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}
