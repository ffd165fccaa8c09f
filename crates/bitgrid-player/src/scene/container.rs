//! BGR1 animation container.
//!
//! A 16-byte little-endian header followed by `frame_count` packed RGB
//! frames, each `width * height * 3` bytes, row-major from the top-left.

use std::io::{self, Read, Seek};
#[cfg(test)]
use std::io::Write;

use bytemuck::{Pod, Zeroable};

use crate::storage::StorageFile;

pub const BGR1_MAGIC: [u8; 4] = *b"BGR1";
pub const HEADER_LEN: u32 = 16;
pub const RGB_CHANNELS: u8 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("file too small: {size} bytes")]
    TooSmall { size: u64 },
    #[error("invalid magic: {0:?}")]
    BadMagic([u8; 4]),
    #[error("size mismatch: file={width}x{height}, display={display_width}x{display_height}")]
    SizeMismatch {
        width: u8,
        height: u8,
        display_width: u16,
        display_height: u16,
    },
    #[error("unsupported channels: {0} (expected 3)")]
    Channels(u8),
    #[error("invalid data_offset: {0}")]
    DataOffset(u32),
    #[error("no frames in file")]
    NoFrames,
    #[error("file truncated: {size} bytes, expected {expected}")]
    Truncated { size: u64, expected: u64 },
}

/// On-disk header layout; multi-byte fields stay as little-endian byte arrays.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawHeader {
    magic: [u8; 4],
    width: u8,
    height: u8,
    channels: u8,
    flags: u8,
    frame_count: [u8; 2],
    _reserved: [u8; 2],
    data_offset: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bgr1Header {
    pub width: u8,
    pub height: u8,
    pub channels: u8,
    pub flags: u8,
    pub frame_count: u16,
    pub data_offset: u32,
}

impl Bgr1Header {
    /// Decode the header fields. Only the magic is checked here.
    pub fn parse(bytes: &[u8; HEADER_LEN as usize]) -> Result<Self, ContainerError> {
        let raw: &RawHeader = bytemuck::from_bytes(bytes);
        if raw.magic != BGR1_MAGIC {
            return Err(ContainerError::BadMagic(raw.magic));
        }
        Ok(Self {
            width: raw.width,
            height: raw.height,
            channels: raw.channels,
            flags: raw.flags,
            frame_count: u16::from_le_bytes(raw.frame_count),
            data_offset: u32::from_le_bytes(raw.data_offset),
        })
    }

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, ContainerError> {
        let mut bytes = [0u8; HEADER_LEN as usize];
        r.read_exact(&mut bytes)?;
        Self::parse(&bytes)
    }

    /// Check the header against the display geometry and the file length.
    pub fn validate(
        &self,
        display_width: u16,
        display_height: u16,
        file_size: u64,
    ) -> Result<(), ContainerError> {
        if u16::from(self.width) != display_width || u16::from(self.height) != display_height {
            return Err(ContainerError::SizeMismatch {
                width: self.width,
                height: self.height,
                display_width,
                display_height,
            });
        }
        if self.channels != RGB_CHANNELS {
            return Err(ContainerError::Channels(self.channels));
        }
        if self.data_offset < HEADER_LEN {
            return Err(ContainerError::DataOffset(self.data_offset));
        }
        if self.frame_count == 0 {
            return Err(ContainerError::NoFrames);
        }
        let expected = self.required_size();
        if file_size < expected {
            return Err(ContainerError::Truncated {
                size: file_size,
                expected,
            });
        }
        Ok(())
    }

    /// Bytes per frame.
    pub fn frame_size(&self) -> usize {
        usize::from(self.width) * usize::from(self.height) * usize::from(self.channels)
    }

    pub fn frame_offset(&self, index: u16) -> u64 {
        u64::from(self.data_offset) + u64::from(index) * self.frame_size() as u64
    }

    /// Minimum file length holding every declared frame.
    pub fn required_size(&self) -> u64 {
        self.frame_offset(self.frame_count)
    }
}

/// Read and validate the header of an open container.
pub fn open_container(
    file: &mut dyn StorageFile,
    display_width: u16,
    display_height: u16,
) -> Result<Bgr1Header, ContainerError> {
    let size = file.size()?;
    if size < u64::from(HEADER_LEN) {
        return Err(ContainerError::TooSmall { size });
    }
    file.seek(io::SeekFrom::Start(0))?;
    let header = Bgr1Header::read_from(file)?;
    header.validate(display_width, display_height, size)?;
    Ok(header)
}

/// Writing side, used to build fixtures.
#[cfg(test)]
impl Bgr1Header {
    /// RGB header with frame data directly after it.
    pub fn new(width: u8, height: u8, frame_count: u16) -> Self {
        Self {
            width,
            height,
            channels: RGB_CHANNELS,
            flags: 0,
            frame_count,
            data_offset: HEADER_LEN,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN as usize] {
        let raw = RawHeader {
            magic: BGR1_MAGIC,
            width: self.width,
            height: self.height,
            channels: self.channels,
            flags: self.flags,
            frame_count: self.frame_count.to_le_bytes(),
            _reserved: [0; 2],
            data_offset: self.data_offset.to_le_bytes(),
        };
        bytemuck::cast(raw)
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }
}

/// Encode a complete container; `frames` must hold whole frames.
#[cfg(test)]
pub fn encode<W: Write + ?Sized>(
    w: &mut W,
    width: u8,
    height: u8,
    frames: &[u8],
) -> io::Result<Bgr1Header> {
    let frame_size = usize::from(width) * usize::from(height) * usize::from(RGB_CHANNELS);
    if frame_size == 0 || frames.len() % frame_size != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} bytes is not a whole number of {frame_size}-byte frames", frames.len()),
        ));
    }
    let frame_count = u16::try_from(frames.len() / frame_size)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many frames"))?;
    let header = Bgr1Header::new(width, height, frame_count);
    header.write_to(w)?;
    w.write_all(frames)?;
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DirStorage, Storage};

    fn header_bytes(width: u8, height: u8, channels: u8, frames: u16, offset: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"BGR1");
        out.extend_from_slice(&[width, height, channels, 0]);
        out.extend_from_slice(&frames.to_le_bytes());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&offset.to_le_bytes());
        out
    }

    #[test]
    fn header_layout_is_little_endian() {
        let bytes = Bgr1Header::new(24, 24, 0x0102).to_bytes();
        assert_eq!(bytes.to_vec(), header_bytes(24, 24, 3, 0x0102, 16));
    }

    #[test]
    fn parse_reads_fields() {
        let bytes: [u8; 16] = header_bytes(8, 4, 3, 300, 32).try_into().unwrap();
        let header = Bgr1Header::parse(&bytes).unwrap();
        assert_eq!(header.width, 8);
        assert_eq!(header.height, 4);
        assert_eq!(header.frame_count, 300);
        assert_eq!(header.data_offset, 32);
        assert_eq!(header.frame_size(), 96);
        assert_eq!(header.frame_offset(2), 32 + 192);
        assert_eq!(header.required_size(), 32 + 300 * 96);
    }

    #[test]
    fn parse_rejects_bad_magic() {
        let mut bytes: [u8; 16] = header_bytes(8, 4, 3, 1, 16).try_into().unwrap();
        bytes[3] = b'2';
        assert!(matches!(
            Bgr1Header::parse(&bytes),
            Err(ContainerError::BadMagic(m)) if &m == b"BGR2"
        ));
    }

    #[test]
    fn validate_rules() {
        let ok = Bgr1Header::new(24, 24, 2);
        let size = ok.required_size();
        assert!(ok.validate(24, 24, size).is_ok());
        assert!(matches!(
            ok.validate(16, 24, size),
            Err(ContainerError::SizeMismatch { .. })
        ));
        assert!(matches!(
            ok.validate(24, 24, size - 1),
            Err(ContainerError::Truncated { .. })
        ));

        let mut h = ok;
        h.channels = 4;
        assert!(matches!(h.validate(24, 24, u64::MAX), Err(ContainerError::Channels(4))));

        let mut h = ok;
        h.data_offset = 15;
        assert!(matches!(h.validate(24, 24, u64::MAX), Err(ContainerError::DataOffset(15))));

        let mut h = ok;
        h.frame_count = 0;
        assert!(matches!(h.validate(24, 24, u64::MAX), Err(ContainerError::NoFrames)));
    }

    #[test]
    fn larger_data_offset_is_accepted() {
        let mut h = Bgr1Header::new(2, 2, 1);
        h.data_offset = 64;
        assert!(h.validate(2, 2, 64 + 12).is_ok());
        assert!(h.validate(2, 2, 64 + 11).is_err());
    }

    #[test]
    fn open_container_checks_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut good = Vec::new();
        encode(&mut good, 2, 2, &[7u8; 24]).unwrap();
        std::fs::write(dir.path().join("good.bin"), &good).unwrap();
        std::fs::write(dir.path().join("tiny.bin"), b"BGR1").unwrap();
        std::fs::write(dir.path().join("short.bin"), &good[..good.len() - 1]).unwrap();

        let storage = DirStorage::new(dir.path());
        let mut file = storage.open("good.bin").unwrap();
        let header = open_container(file.as_mut(), 2, 2).unwrap();
        assert_eq!(header.frame_count, 2);

        let mut file = storage.open("tiny.bin").unwrap();
        assert!(matches!(
            open_container(file.as_mut(), 2, 2),
            Err(ContainerError::TooSmall { size: 4 })
        ));

        let mut file = storage.open("short.bin").unwrap();
        assert!(matches!(
            open_container(file.as_mut(), 2, 2),
            Err(ContainerError::Truncated { .. })
        ));
    }

    #[test]
    fn encode_rejects_partial_frames() {
        let mut out = Vec::new();
        assert!(encode(&mut out, 2, 2, &[0u8; 13]).is_err());
        assert!(encode(&mut out, 0, 2, &[]).is_err());
    }
}
