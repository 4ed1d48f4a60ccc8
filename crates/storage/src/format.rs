//! On-disk byte format of a container file.
//!
//! ```text
//! +-------------------+-----------+-----------+---------------------------+
//! | magic (8 bytes)   | version   | reserved  | frame | frame | ...       |
//! | "DCHEST\0\x01"    | u16 LE    | u16 LE    |                           |
//! +-------------------+-----------+-----------+---------------------------+
//!
//! frame = payload_len: u32 LE | crc32(payload): u32 LE | payload
//! ```
//!
//! Frames are only ever appended. A frame that is cut short or fails its
//! checksum marks the end of the valid prefix.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{StorageError, StorageResult};

/// Magic bytes at the start of every container
pub const CONTAINER_MAGIC: [u8; 8] = *b"DCHEST\0\x01";

/// Current container format version
pub const FORMAT_VERSION: u16 = 1;

/// Size of the file header in bytes
pub const HEADER_SIZE: u64 = 12;

/// Size of a frame header (length + checksum) in bytes
pub const FRAME_HEADER_SIZE: u64 = 8;

/// Largest payload a single frame may carry
pub const MAX_PAYLOAD_SIZE: u32 = 1 << 30;

/// Write the container header
pub fn write_header<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(&CONTAINER_MAGIC)?;
    w.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    w.write_u16::<LittleEndian>(0)?;
    Ok(())
}

/// Read and check the container header, returning the format version
pub fn read_header<R: Read>(r: &mut R, path: &str) -> StorageResult<u16> {
    let mut magic = [0u8; 8];
    if read_fully(r, &mut magic)? != magic.len() || magic != CONTAINER_MAGIC {
        return Err(StorageError::BadMagic {
            path: path.to_string(),
        });
    }
    let version = r.read_u16::<LittleEndian>()?;
    let _reserved = r.read_u16::<LittleEndian>()?;
    if version > FORMAT_VERSION {
        return Err(StorageError::UnsupportedVersion { version });
    }
    Ok(version)
}

/// Refuse payloads a reader would classify as torn
pub fn check_payload_len(path: &str, len: usize) -> StorageResult<()> {
    if len > MAX_PAYLOAD_SIZE as usize {
        return Err(StorageError::RecordTooLarge {
            path: path.to_string(),
            len,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(())
}

/// Frame a record payload; its length must have passed [`check_payload_len`]
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE as usize + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Outcome of reading one frame
#[derive(Debug, PartialEq)]
pub enum FrameRead {
    /// A complete, checksum-valid payload
    Payload(Vec<u8>),
    /// Clean end of file at a frame boundary
    End,
    /// Truncated or corrupt frame; the valid prefix ends here
    Torn(String),
}

/// Read the next frame
pub fn read_frame<R: Read>(r: &mut R) -> io::Result<FrameRead> {
    let mut header = [0u8; FRAME_HEADER_SIZE as usize];
    let got = read_fully(r, &mut header)?;
    if got == 0 {
        return Ok(FrameRead::End);
    }
    if got < header.len() {
        return Ok(FrameRead::Torn(format!(
            "frame header cut short ({} of {} bytes)",
            got,
            header.len()
        )));
    }

    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if len > MAX_PAYLOAD_SIZE {
        return Ok(FrameRead::Torn(format!("implausible frame length {}", len)));
    }

    let mut payload = vec![0u8; len as usize];
    let got = read_fully(r, &mut payload)?;
    if got < payload.len() {
        return Ok(FrameRead::Torn(format!(
            "payload cut short ({} of {} bytes)",
            got, len
        )));
    }
    if crc32fast::hash(&payload) != crc {
        return Ok(FrameRead::Torn("checksum mismatch".to_string()));
    }
    Ok(FrameRead::Payload(payload))
}

/// Read until `buf` is full or EOF, returning the bytes read
fn read_fully<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
