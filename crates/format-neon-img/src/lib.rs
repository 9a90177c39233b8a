//! NEON floppy image format.
//!
//! A flat, headerless sector dump: 80 cylinders x 2 heads x 10 sectors x
//! 512 bytes = 819,200 bytes. Tracks are interleaved by head, so the byte
//! offset of a sector is `(cylinder * 2 + head) * 5120 + (sector - 1) * 512`.

use std::io::{self, Read, Write};

use thiserror::Error;

pub const SECTOR_SIZE: usize = 512;
pub const SECTORS_PER_TRACK: usize = 10;
pub const HEADS: usize = 2;
pub const CYLINDERS: usize = 80;
pub const TRACK_SIZE: usize = SECTORS_PER_TRACK * SECTOR_SIZE;
pub const IMAGE_SIZE: usize = CYLINDERS * HEADS * TRACK_SIZE;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("sector outside image: cylinder {cylinder}, head {head}, sector index {index}")]
    OutOfRange { cylinder: u8, head: u8, index: u8 },
    #[error("image I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Byte offset of a sector within the image.
///
/// `index` is zero-based (the controller's sector number minus one). The
/// cylinder and head fields are taken as given; `None` means the sector
/// would not fit inside the image.
#[must_use]
pub fn sector_offset(cylinder: u8, head: u8, index: u8) -> Option<usize> {
    if usize::from(index) >= SECTORS_PER_TRACK {
        return None;
    }
    let track = usize::from(cylinder) * HEADS + usize::from(head);
    let offset = track * TRACK_SIZE + usize::from(index) * SECTOR_SIZE;
    (offset + SECTOR_SIZE <= IMAGE_SIZE).then_some(offset)
}

/// The whole disk held in memory.
pub struct NeonImage {
    data: Vec<u8>,
}

impl NeonImage {
    /// A zero-filled image.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            data: vec![0; IMAGE_SIZE],
        }
    }

    /// Load up to [`IMAGE_SIZE`] bytes from `reader`.
    ///
    /// Short sources are zero-padded. Returns the image together with the
    /// number of bytes actually read so the caller can report short images.
    pub fn read_from<R: Read>(reader: R) -> Result<(Self, usize), ImageError> {
        let mut data = Vec::with_capacity(IMAGE_SIZE);
        let loaded = reader.take(IMAGE_SIZE as u64).read_to_end(&mut data)?;
        data.resize(IMAGE_SIZE, 0);
        Ok((Self { data }, loaded))
    }

    /// Write the full image to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), ImageError> {
        writer.write_all(&self.data)?;
        writer.flush()?;
        Ok(())
    }

    /// Raw image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn sector_mut(
        &mut self,
        cylinder: u8,
        head: u8,
        index: u8,
    ) -> Result<&mut [u8], ImageError> {
        let start = sector_offset(cylinder, head, index).ok_or(ImageError::OutOfRange {
            cylinder,
            head,
            index,
        })?;
        Ok(&mut self.data[start..start + SECTOR_SIZE])
    }
}

impl Default for NeonImage {
    fn default() -> Self {
        Self::blank()
    }
}
