//! Compressed executable container.
//!
//! Executables written to disk are wrapped in a small header followed by a zlib
//! stream of the raw binary blob:
//!
//! ```text
//! [u32 magic][u32 version major][u32 version minor][u32 uncompressed length][zlib payload]
//! ```
//!
//! The magic is the little-endian encoding of `MOOL`, so files start with those four bytes.
//! A blob without the magic is treated as an uncompressed executable.

use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::{
    file::io::{read_le_at, write_le},
    Error, Result,
};

/// Container identifier, `MOOL` read as a little-endian u32
pub const CONTAINER_MAGIC: u32 = u32::from_le_bytes(*b"MOOL");
/// Supported container major version
pub const CONTAINER_VERSION_MAJOR: u32 = 1;
/// Supported container minor version
pub const CONTAINER_VERSION_MINOR: u32 = 1;
/// Size of the fixed container header
pub const CONTAINER_HEADER_SIZE: usize = 16;
/// Upper bound on the buffer reserved up front from the declared length
const MAX_INITIAL_CAPACITY: usize = 1 << 20;

/// Returns true if `data` starts with the container magic.
#[must_use]
pub fn is_container(data: &[u8]) -> bool {
    let mut offset = 0;
    matches!(read_le_at::<u32>(data, &mut offset), Ok(CONTAINER_MAGIC))
}

/// Decompress a container into the raw executable blob.
///
/// # Errors
/// Returns [`Error::NotSupported`] for an unknown magic or version,
/// [`Error::Decompress`] if the zlib stream is corrupt, and [`Error::Malformed`] if the
/// decompressed size disagrees with the header.
pub fn unpack(data: &[u8]) -> Result<Vec<u8>> {
    let mut offset = 0;
    let magic = read_le_at::<u32>(data, &mut offset)?;
    let major = read_le_at::<u32>(data, &mut offset)?;
    let minor = read_le_at::<u32>(data, &mut offset)?;
    let length = read_le_at::<u32>(data, &mut offset)? as usize;

    if magic != CONTAINER_MAGIC
        || major != CONTAINER_VERSION_MAJOR
        || minor != CONTAINER_VERSION_MINOR
    {
        return Err(Error::NotSupported);
    }

    // One byte past the declared length is enough to detect an oversized stream
    let mut payload = Vec::with_capacity(length.min(MAX_INITIAL_CAPACITY));
    ZlibDecoder::new(&data[CONTAINER_HEADER_SIZE..])
        .take(length as u64 + 1)
        .read_to_end(&mut payload)
        .map_err(|e| Error::Decompress(e.to_string()))?;

    if payload.len() > length {
        return Err(malformed_error!(
            "Container declares {} bytes but decompresses to more",
            length
        ));
    }
    if payload.len() < length {
        return Err(malformed_error!(
            "Container declares {} bytes but decompressed to {}",
            length,
            payload.len()
        ));
    }

    Ok(payload)
}

/// Wrap a raw executable blob into a compressed container.
///
/// # Errors
/// Returns [`Error::Decompress`] if the encoder fails, or [`Error::Malformed`] if the blob
/// is larger than the header can describe.
pub fn pack(payload: &[u8]) -> Result<Vec<u8>> {
    let Ok(length) = u32::try_from(payload.len()) else {
        return Err(malformed_error!(
            "Executable of {} bytes is too large for a container",
            payload.len()
        ));
    };

    let mut out = Vec::with_capacity(CONTAINER_HEADER_SIZE + payload.len() / 2);
    write_le(&mut out, CONTAINER_MAGIC);
    write_le(&mut out, CONTAINER_VERSION_MAJOR);
    write_le(&mut out, CONTAINER_VERSION_MINOR);
    write_le(&mut out, length);

    let mut encoder = ZlibEncoder::new(out, Compression::default());
    encoder
        .write_all(payload)
        .map_err(|e| Error::Decompress(e.to_string()))?;
    encoder.finish().map_err(|e| Error::Decompress(e.to_string()))
}
