//! Little-endian primitive IO for the binary assembly format.
//!
//! Every multi-byte value in a compiled executable is stored little-endian. This module
//! provides the [`WireIO`] trait, implemented for the primitive types the format uses,
//! and free functions for bounds-checked reads from a byte slice and appends to a
//! growable output buffer.
//!
//! # Examples
//!
//! ```rust,ignore
//! use loomscope::file::io::{read_le_at, write_le};
//!
//! let mut out = Vec::new();
//! write_le(&mut out, -1_i32);
//!
//! let mut offset = 0;
//! assert_eq!(read_le_at::<i32>(&out, &mut offset)?, -1);
//! assert_eq!(offset, 4);
//! ```

use crate::Result;

/// Trait for primitive types that can be read from and written to the wire.
///
/// The associated `Bytes` array type ties the in-memory value to its fixed encoded
/// width, so a read never needs more than a slice conversion.
pub trait WireIO: Sized + Copy {
    /// Fixed-size byte array of the encoded value
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Decode a value from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Encode a value to little-endian bytes
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_wire_io {
    ($($ty:ty => $n:expr),* $(,)?) => {
        $(
            impl WireIO for $ty {
                type Bytes = [u8; $n];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_wire_io!(u8 => 1, i8 => 1, u16 => 2, i16 => 2, u32 => 4, i32 => 4, u64 => 8, i64 => 8);

/// Read a little-endian value from `data` at `offset`, advancing the offset.
///
/// # Arguments
/// * `data` - The source buffer
/// * `offset` - Position to read from, updated to point behind the value on success
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into the remaining data.
pub fn read_le_at<T: WireIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!(*offset, type_len));
    };
    if end > data.len() {
        return Err(out_of_bounds_error!(*offset, type_len));
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!(*offset, type_len));
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}

/// Read a little-endian value from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the value.
pub fn read_le<T: WireIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Append a little-endian value to `out`.
pub fn write_le<T: WireIO>(out: &mut Vec<u8>, value: T) {
    out.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Overwrite a little-endian value inside `data` at `offset`, advancing the offset.
///
/// Used to patch placeholders (lengths, positions) after the surrounding record was written.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit at `offset`.
pub fn write_le_at<T: WireIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(out_of_bounds_error!(*offset, bytes.len()));
    };
    if end > data.len() {
        return Err(out_of_bounds_error!(*offset, bytes.len()));
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}
