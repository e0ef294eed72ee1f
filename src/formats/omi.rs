// .omi container format
//
// A captured memory image plus metadata: capture offset, reported radio
// model and a CRC-32 over the whole record. All header integers are
// big-endian. Layout (32 bytes, then payload):
//
//   0   magic        "OMI!"
//   4   version      u16, currently 1
//   6   offset       u16, first memory address captured
//   8   size         u16, payload byte count
//   10  model_len    u8, true model length (storage may truncate)
//   11  crc32        u32 over header (this field zeroed) + payload
//   15  padding      u8, zero
//   16  model        16 bytes, zero-padded / right-truncated

use crate::util::{crc32, printable};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"OMI!";
pub const VERSION: u16 = 1;

const HEADER_SIZE: usize = 32;
const MODEL_STORAGE: usize = 16;
const CRC_OFFSET: usize = 11;

#[derive(Error, Debug)]
pub enum OmiError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid magic; maybe not an .omi file?")]
    BadMagic,

    #[error("unsupported version {0}; maybe written with a newer utility?")]
    UnsupportedVersion(u16),

    #[error("file does not contain data")]
    EmptyPayload,

    #[error("payload of {0} bytes does not fit the 16-bit size field")]
    PayloadTooLarge(usize),

    #[error("excessive data at the end of file")]
    TrailingData,

    #[error("CRC32 mismatch (calculated {calculated:#010x}, read {stored:#010x})")]
    ChecksumMismatch { calculated: u32, stored: u32 },
}

pub type Result<T> = std::result::Result<T, OmiError>;

/// One captured memory image with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmiFile {
    /// First memory address that was read.
    pub offset: u16,
    /// Model identifier as reported by the radio; routinely contains NULs.
    pub model: Vec<u8>,
    /// The raw memory bytes. May be resized externally before a save.
    pub data: Vec<u8>,
}

impl OmiFile {
    pub fn new(offset: u16, model: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            offset,
            model,
            data,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("reading {}", path.display());
        let file = File::open(path)?;
        Self::read_from(file)
    }

    pub fn read_from(mut reader: impl Read) -> Result<Self> {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let stored_crc = u32::from_be_bytes(header[CRC_OFFSET..CRC_OFFSET + 4].try_into().unwrap());
        let mut zeroed = header;
        zeroed[CRC_OFFSET..CRC_OFFSET + 4].fill(0);
        let mut calculated = crc32(0, &zeroed);

        if header[0..4] != MAGIC {
            return Err(OmiError::BadMagic);
        }
        let version = u16::from_be_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(OmiError::UnsupportedVersion(version));
        }

        let offset = u16::from_be_bytes([header[6], header[7]]);
        let size = u16::from_be_bytes([header[8], header[9]]) as usize;
        let model_len = header[10] as usize;
        tracing::debug!("offset {:#06x}, size {:#06x}, model length {}", offset, size, model_len);

        if size == 0 {
            return Err(OmiError::EmptyPayload);
        }

        let model = header[16..16 + model_len.min(MODEL_STORAGE)].to_vec();

        let mut data = vec![0u8; size];
        reader.read_exact(&mut data)?;

        let mut probe = [0u8; 1];
        if reader.read(&mut probe)? != 0 {
            return Err(OmiError::TrailingData);
        }

        calculated = crc32(calculated, &data);
        if calculated != stored_crc {
            return Err(OmiError::ChecksumMismatch {
                calculated,
                stored: stored_crc,
            });
        }

        Ok(Self {
            offset,
            model,
            data,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if self.data.is_empty() {
            return Err(OmiError::EmptyPayload);
        }
        if self.data.len() > u16::MAX as usize {
            return Err(OmiError::PayloadTooLarge(self.data.len()));
        }

        let mut writer = TempWriter::create(path)?;
        self.write_to(writer.file())?;
        writer.commit()?;
        Ok(())
    }

    pub fn write_to(&self, mut writer: impl Write) -> Result<()> {
        let header = self.header();
        writer.write_all(&header)?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn header(&self) -> [u8; HEADER_SIZE] {
        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(&MAGIC);
        header[4..6].copy_from_slice(&VERSION.to_be_bytes());
        header[6..8].copy_from_slice(&self.offset.to_be_bytes());
        header[8..10].copy_from_slice(&(self.data.len() as u16).to_be_bytes());
        // The length field keeps the true size even when storage truncates.
        header[10] = self.model.len().min(u8::MAX as usize) as u8;
        let stored = self.model.len().min(MODEL_STORAGE);
        header[16..16 + stored].copy_from_slice(&self.model[..stored]);

        let crc = crc32(crc32(0, &header), &self.data);
        header[CRC_OFFSET..CRC_OFFSET + 4].copy_from_slice(&crc.to_be_bytes());
        header
    }

    pub fn model_printable(&self) -> String {
        printable(&self.model)
    }
}

/// Writes to `<path>.tmp` and renames over the destination on commit.
/// Dropping without a commit removes the temporary file, leaving the
/// destination untouched on every error path.
struct TempWriter {
    tmp_path: PathBuf,
    dest: PathBuf,
    file: Option<File>,
}

impl TempWriter {
    fn create(dest: &Path) -> io::Result<Self> {
        let mut tmp_path = dest.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);
        tracing::debug!("writing {}", tmp_path.display());
        let file = File::create(&tmp_path)?;
        Ok(Self {
            tmp_path,
            dest: dest.to_path_buf(),
            file: Some(file),
        })
    }

    fn file(&mut self) -> &mut File {
        self.file.as_mut().unwrap()
    }

    fn commit(mut self) -> io::Result<()> {
        let file = self.file.take().unwrap();
        file.sync_all()?;
        drop(file);
        fs::rename(&self.tmp_path, &self.dest)
    }
}

impl Drop for TempWriter {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            tracing::debug!("removing stale {}", self.tmp_path.display());
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Shared by the table writer so text output gets the same atomic-rename
/// treatment as the container.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut writer = TempWriter::create(path)?;
    writer.file().write_all(contents)?;
    writer.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OmiFile {
        OmiFile::new(0, b"AT778UV\x00\x01".to_vec(), vec![0x5A; 128])
    }

    fn save_to_vec(omi: &OmiFile) -> Vec<u8> {
        let mut buf = Vec::new();
        omi.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_roundtrip() {
        let omi = sample();
        let bytes = save_to_vec(&omi);
        let loaded = OmiFile::read_from(&bytes[..]).unwrap();
        assert_eq!(loaded, omi);
    }

    #[test]
    fn test_flipped_payload_byte_fails_checksum() {
        let omi = sample();
        let bytes = save_to_vec(&omi);
        for i in 0..omi.data.len() {
            let mut corrupt = bytes.clone();
            corrupt[HEADER_SIZE + i] ^= 0x01;
            let err = OmiFile::read_from(&corrupt[..]).unwrap_err();
            assert!(matches!(err, OmiError::ChecksumMismatch { .. }));
        }
        // Untouched copy still loads.
        assert!(OmiFile::read_from(&bytes[..]).is_ok());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = save_to_vec(&sample());
        bytes[0] = b'X';
        assert!(matches!(
            OmiFile::read_from(&bytes[..]).unwrap_err(),
            OmiError::BadMagic
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let omi = sample();
        let mut bytes = save_to_vec(&omi);
        bytes[5] = 2;
        // CRC is checked after the version field, so this must report the
        // version, not the checksum.
        assert!(matches!(
            OmiFile::read_from(&bytes[..]).unwrap_err(),
            OmiError::UnsupportedVersion(2)
        ));
    }

    #[test]
    fn test_trailing_data_rejected() {
        let mut bytes = save_to_vec(&sample());
        bytes.push(0x00);
        assert!(matches!(
            OmiFile::read_from(&bytes[..]).unwrap_err(),
            OmiError::TrailingData
        ));
    }

    #[test]
    fn test_empty_payload_rejected() {
        let omi = OmiFile::new(0, Vec::new(), Vec::new());
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            omi.save(&dir.path().join("x.omi")).unwrap_err(),
            OmiError::EmptyPayload
        ));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let omi = OmiFile::new(0, b"AT778UV".to_vec(), vec![0u8; 0x10000]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.omi");
        assert!(matches!(
            omi.save(&path).unwrap_err(),
            OmiError::PayloadTooLarge(0x10000)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_long_model_truncated_but_length_kept() {
        let model = b"A-VERY-LONG-MODEL-STRING".to_vec();
        let omi = OmiFile::new(0, model.clone(), vec![1, 2, 3]);
        let bytes = save_to_vec(&omi);
        assert_eq!(bytes[10] as usize, model.len());

        let loaded = OmiFile::read_from(&bytes[..]).unwrap();
        assert_eq!(loaded.model, model[..MODEL_STORAGE]);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.omi");
        let omi = sample();
        omi.save(&path).unwrap();
        assert_eq!(OmiFile::load(&path).unwrap(), omi);
        // No stale temp file left behind.
        assert!(!dir.path().join("capture.omi.tmp").exists());
    }

    #[test]
    fn test_model_printable() {
        assert_eq!(sample().model_printable(), "AT778UV..");
    }
}
