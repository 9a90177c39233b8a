//! Error types for drive management and the bounded FIFO buffers.

use std::io;
use std::path::PathBuf;

use format_neon_img::ImageError;
use thiserror::Error;

/// Failures of the attach/detach/flush lifecycle.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("no such drive: {0} (valid drives are 0-3)")]
    InvalidDrive(usize),
    #[error("cannot open image {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot load image {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("cannot write back image {}", path.display())]
    Flush {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

/// A push past the end of a command or result buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("command buffer full")]
    CommandOverflow,
    #[error("result buffer full")]
    ResultOverflow,
}
