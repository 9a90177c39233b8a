//! One floppy drive and the image file attached to it.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use format_neon_img::{IMAGE_SIZE, ImageError, NeonImage};
use log::{info, warn};

use crate::error::DriveError;

/// An open image: the file handle and its in-memory copy.
struct Media {
    file: File,
    path: PathBuf,
    image: NeonImage,
}

/// A drive slot. Empty until an image is attached.
///
/// The whole image is cached in memory while attached; the file is only
/// touched again by [`FloppyDrive::flush`].
pub struct FloppyDrive {
    media: Option<Media>,
    read_only: bool,
    dirty: bool,
    write_back: bool,
    /// Last accessed position. Diagnostic only; commands address sectors
    /// from their own C/H/R fields.
    track: u8,
    side: u8,
    offset: usize,
}

impl FloppyDrive {
    #[must_use]
    pub fn new(write_back: bool) -> Self {
        Self {
            media: None,
            read_only: false,
            dirty: false,
            write_back,
            track: 0,
            side: 0,
            offset: 0,
        }
    }

    /// Open `path` and load it, replacing any image already attached.
    ///
    /// Tries read-write first and falls back to read-only. Pending writes of
    /// the current image are flushed before the new file is read. If the new
    /// file cannot be opened or read, the current image stays attached.
    pub fn attach(&mut self, path: impl AsRef<Path>) -> Result<(), DriveError> {
        let path = path.as_ref();

        let (mut file, read_only) = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => (file, false),
            Err(_) => match File::open(path) {
                Ok(file) => (file, true),
                Err(source) => {
                    return Err(DriveError::Open {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            },
        };

        // The new file may be the one already attached: its pending writes
        // must reach the disk before the fresh copy is read.
        if let Err(err) = self.flush() {
            warn!("{err}");
        }

        let file_len = file.metadata().map(|m| m.len()).unwrap_or(0);
        let (image, loaded) =
            NeonImage::read_from(&mut file).map_err(|source| DriveError::Load {
                path: path.to_path_buf(),
                source,
            })?;

        if loaded < IMAGE_SIZE {
            warn!(
                "{}: short image, {loaded} of {IMAGE_SIZE} bytes read; rest is zero-filled",
                path.display()
            );
        } else if file_len > IMAGE_SIZE as u64 {
            warn!(
                "{}: image is {file_len} bytes, only the first {IMAGE_SIZE} are used",
                path.display()
            );
        }

        if self.is_attached() {
            if let Err(err) = self.detach() {
                warn!("{err}");
            }
        }

        info!(
            "attached {}{}",
            path.display(),
            if read_only { " (read-only)" } else { "" }
        );
        self.media = Some(Media {
            file,
            path: path.to_path_buf(),
            image,
        });
        self.read_only = read_only;
        self.dirty = false;
        self.reset();
        Ok(())
    }

    /// Flush and close the image. Does nothing if no image is attached.
    ///
    /// The image is released even when the flush fails; the flush error is
    /// still returned.
    pub fn detach(&mut self) -> Result<(), DriveError> {
        if !self.is_attached() {
            return Ok(());
        }

        let flushed = self.flush();
        if let Some(media) = self.media.take() {
            info!("detached {}", media.path.display());
        }
        self.read_only = false;
        self.dirty = false;
        self.reset();
        flushed
    }

    /// Write the in-memory image back to its file.
    ///
    /// Only a writable, modified image is written, and only with write-back
    /// enabled.
    pub fn flush(&mut self) -> Result<(), DriveError> {
        if !self.dirty || self.read_only || !self.write_back {
            return Ok(());
        }
        let Some(media) = self.media.as_mut() else {
            return Ok(());
        };

        let result = media
            .file
            .seek(SeekFrom::Start(0))
            .map_err(ImageError::from)
            .and_then(|_| media.image.write_to(&mut media.file));
        if let Err(source) = result {
            return Err(DriveError::Flush {
                path: media.path.clone(),
                source,
            });
        }

        self.dirty = false;
        Ok(())
    }

    /// Zero the position cursor.
    ///
    /// The cached image is kept as is; it is not re-read from the file.
    pub fn reset(&mut self) {
        self.track = 0;
        self.side = 0;
        self.offset = 0;
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.media.is_some()
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The image holds writes not yet flushed to the file.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.media.as_ref().map(|m| m.path.as_path())
    }

    #[must_use]
    pub fn image(&self) -> Option<&NeonImage> {
        self.media.as_ref().map(|m| &m.image)
    }

    #[must_use]
    pub fn track(&self) -> u8 {
        self.track
    }

    #[must_use]
    pub fn side(&self) -> u8 {
        self.side
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn sector_mut(
        &mut self,
        cylinder: u8,
        head: u8,
        index: u8,
    ) -> Option<Result<&mut [u8], ImageError>> {
        self.media
            .as_mut()
            .map(|m| m.image.sector_mut(cylinder, head, index))
    }

    pub(crate) fn set_track(&mut self, track: u8) {
        self.track = track;
    }

    pub(crate) fn set_cursor(&mut self, track: u8, side: u8, offset: usize) {
        self.track = track;
        self.side = side;
        self.offset = offset;
    }

    pub(crate) fn mark_dirty(&mut self) {
        if self.is_attached() {
            self.dirty = true;
        }
    }

    /// Write-protect the attached image without touching file permissions.
    #[cfg(test)]
    pub(crate) fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }
}

impl Default for FloppyDrive {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{NamedTempFile, TempDir};

    fn image_file(fill: u8) -> NamedTempFile {
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), vec![fill; IMAGE_SIZE]).expect("write image");
        file
    }

    #[test]
    fn attach_loads_whole_image() {
        let file = image_file(0x5A);
        let mut drive = FloppyDrive::default();
        drive.attach(file.path()).expect("attach");
        assert!(drive.is_attached());
        assert!(!drive.is_read_only());
        assert_eq!(drive.path(), Some(file.path()));
        let image = drive.image().expect("image");
        assert_eq!(image.data().len(), IMAGE_SIZE);
        assert!(image.data().iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn attach_missing_file_leaves_drive_untouched() {
        let dir = TempDir::new().expect("temp dir");
        let good = image_file(0x11);
        let mut drive = FloppyDrive::default();
        drive.attach(good.path()).expect("attach");

        let err = drive.attach(dir.path().join("missing.img"));
        assert!(matches!(err, Err(DriveError::Open { .. })));
        assert!(drive.is_attached());
        assert_eq!(drive.path(), Some(good.path()));
    }

    #[test]
    fn short_image_is_zero_padded() {
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), vec![0xEE; 1024]).expect("write");
        let mut drive = FloppyDrive::default();
        drive.attach(file.path()).expect("attach");
        let data = drive.image().expect("image").data();
        assert_eq!(data[1023], 0xEE);
        assert_eq!(data[1024], 0x00);
    }

    #[test]
    fn detach_twice_is_harmless() {
        let file = image_file(0);
        let mut drive = FloppyDrive::default();
        drive.attach(file.path()).expect("attach");
        drive.set_cursor(3, 1, 4096);
        drive.detach().expect("detach");
        assert!(!drive.is_attached());
        assert!(drive.image().is_none());
        assert_eq!((drive.track(), drive.side(), drive.offset()), (0, 0, 0));
        drive.detach().expect("second detach");
        assert!(!drive.is_attached());
    }

    #[test]
    fn reset_keeps_image() {
        let file = image_file(0x77);
        let mut drive = FloppyDrive::default();
        drive.attach(file.path()).expect("attach");
        drive.set_cursor(10, 1, 512);
        drive.reset();
        assert_eq!((drive.track(), drive.side(), drive.offset()), (0, 0, 0));
        assert!(drive.is_attached());
        assert_eq!(drive.image().expect("image").data()[0], 0x77);
    }

    #[test]
    fn flush_writes_dirty_image_back() {
        let file = image_file(0x00);
        let mut drive = FloppyDrive::default();
        drive.attach(file.path()).expect("attach");
        drive
            .sector_mut(0, 0, 1)
            .expect("attached")
            .expect("in range")
            .fill(0xC3);
        drive.mark_dirty();
        drive.flush().expect("flush");
        assert!(!drive.is_dirty());

        let on_disk = fs::read(file.path()).expect("read back");
        assert_eq!(on_disk[512], 0xC3);
        assert_eq!(on_disk[0], 0x00);
    }

    #[test]
    fn flush_without_write_back_keeps_file() {
        let file = image_file(0x00);
        let mut drive = FloppyDrive::new(false);
        drive.attach(file.path()).expect("attach");
        drive
            .sector_mut(0, 0, 0)
            .expect("attached")
            .expect("in range")
            .fill(0xFF);
        drive.mark_dirty();
        drive.detach().expect("detach");

        let on_disk = fs::read(file.path()).expect("read back");
        assert_eq!(on_disk[0], 0x00);
    }

    #[test]
    fn reattach_same_file_keeps_pending_writes() {
        let file = image_file(0x00);
        let mut drive = FloppyDrive::default();
        drive.attach(file.path()).expect("attach");
        drive
            .sector_mut(0, 0, 0)
            .expect("attached")
            .expect("in range")
            .fill(0xAA);
        drive.mark_dirty();

        drive.attach(file.path()).expect("re-attach");
        assert_eq!(drive.image().expect("image").data()[0], 0xAA);
        drive
            .sector_mut(0, 0, 1)
            .expect("attached")
            .expect("in range")
            .fill(0xBB);
        drive.mark_dirty();
        drive.detach().expect("detach");

        let on_disk = fs::read(file.path()).expect("read back");
        assert_eq!(on_disk[0], 0xAA);
        assert_eq!(on_disk[512], 0xBB);
    }

    #[test]
    fn read_only_drive_never_flushes() {
        let file = image_file(0x00);
        let mut drive = FloppyDrive::default();
        drive.attach(file.path()).expect("attach");
        drive.set_read_only(true);
        drive
            .sector_mut(0, 0, 0)
            .expect("attached")
            .expect("in range")
            .fill(0xEE);
        drive.mark_dirty();
        drive.flush().expect("flush is a no-op");
        assert!(drive.is_dirty());

        drive.detach().expect("detach");
        assert!(!drive.is_read_only());
        assert_eq!(fs::read(file.path()).expect("read back")[0], 0x00);
    }

    #[test]
    fn sector_access_needs_an_image() {
        let mut drive = FloppyDrive::default();
        assert!(drive.sector_mut(0, 0, 0).is_none());
        drive.mark_dirty();
        assert!(!drive.is_dirty());
    }
}
