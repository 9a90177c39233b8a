//! Controller configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options fixed when the controller is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FdcConfig {
    /// Log every FIFO byte and decoded command.
    pub trace: bool,
    /// Persist Write Data changes to the image file on flush.
    /// When off, writes only live in memory until the image is detached.
    pub write_back: bool,
}

impl Default for FdcConfig {
    fn default() -> Self {
        Self {
            trace: false,
            write_back: true,
        }
    }
}
