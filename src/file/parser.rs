//! Cursor-based reader for the binary assembly format.
//!
//! This module provides [`Parser`], a bounds-checked cursor over a byte slice. It exposes
//! the four wire primitives of the format (32-bit integers, one-byte booleans, single bytes
//! and length-prefixed strings) plus explicit position save/restore, which the assembly
//! loader uses to visit dependency records embedded elsewhere in the same buffer.
//!
//! # Architecture
//!
//! - **Position tracking** - Maintains the current offset for sequential reads
//! - **Bounds checking** - A read beyond the buffer is [`crate::Error::OutOfBounds`], never a short read
//! - **Count validation** - Element counts are checked against the remaining data before
//!   anything is allocated for them
//!
//! # Usage Examples
//!
//! ```rust
//! use loomscope::Parser;
//!
//! let data = [0x02, 0x00, 0x00, 0x00, 0x01, b'h', b'i'];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_i32()?, 2);
//! assert!(parser.read_bool()?);
//!
//! let saved = parser.pos();
//! parser.seek(0)?;
//! assert_eq!(parser.read_le::<u8>()?, 2);
//! parser.seek(saved)?;
//! # Ok::<(), loomscope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, WireIO},
    Result,
};

/// A bounds-checked cursor over a byte buffer.
///
/// `Parser` never copies the underlying data; strings are returned as borrowed slices
/// that live as long as the buffer.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
    strict_booleans: bool,
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser {
            data,
            position: 0,
            strict_booleans: true,
        }
    }

    /// Control whether a boolean byte other than `0` or `1` is rejected as corruption.
    ///
    /// When disabled, any non-zero byte reads as `true`.
    #[must_use]
    pub fn with_strict_booleans(mut self, strict: bool) -> Self {
        self.strict_booleans = strict;
        self
    }

    /// Total length of the underlying buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if there are bytes left to read
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of bytes left behind the cursor
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Current cursor position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Move the cursor to an absolute position.
    ///
    /// Seeking to the end of the buffer is allowed; the next read will fail.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies beyond the buffer.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!(pos, 0));
        }

        self.position = pos;
        Ok(())
    }

    /// The complete underlying buffer
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Read a little-endian primitive.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit into the remaining data.
    pub fn read_le<T: WireIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a 32-bit signed integer, the basic unit of the format.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_le::<i32>()
    }

    /// Read a single byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input.
    pub fn read_byte(&mut self) -> Result<u8> {
        self.read_le::<u8>()
    }

    /// Read a one-byte boolean.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input, or [`crate::Error::Malformed`]
    /// for a byte other than `0`/`1` when strict booleans are enabled.
    pub fn read_bool(&mut self) -> Result<bool> {
        let offset = self.position;
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other if self.strict_booleans => Err(malformed_error!(
                "Invalid boolean value {} at offset {}",
                other,
                offset
            )),
            _ => Ok(true),
        }
    }

    /// Read an element count and check that it is plausible for the remaining data.
    ///
    /// `min_element_size` is the smallest number of bytes one element can occupy on the
    /// wire; a count that could not possibly fit is rejected before any allocation happens.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for negative or impossible counts.
    pub fn read_count(&mut self, min_element_size: usize) -> Result<usize> {
        let offset = self.position;
        let count = self.read_i32()?;
        let Ok(count) = usize::try_from(count) else {
            return Err(malformed_error!(
                "Negative element count {} at offset {}",
                count,
                offset
            ));
        };

        if count.saturating_mul(min_element_size) > self.remaining() {
            return Err(malformed_error!(
                "Element count {} at offset {} exceeds remaining data ({} bytes)",
                count,
                offset,
                self.remaining()
            ));
        }

        Ok(count)
    }

    /// Read a length-prefixed byte string (`i32` length, then that many bytes).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a negative length and
    /// [`crate::Error::OutOfBounds`] if the payload is truncated.
    pub fn read_string(&mut self) -> Result<&'a [u8]> {
        let offset = self.position;
        let length = self.read_i32()?;
        let Ok(length) = usize::try_from(length) else {
            return Err(malformed_error!(
                "Negative string length {} at offset {}",
                length,
                offset
            ));
        };

        self.read_bytes(length)
    }

    /// Read a length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the bytes are not valid UTF-8.
    pub fn read_string_utf8(&mut self) -> Result<&'a str> {
        let start = self.position;
        let bytes = self.read_string()?;
        std::str::from_utf8(bytes).map_err(|e| {
            malformed_error!("Invalid UTF-8 string at offset {}: {}", start, e)
        })
    }

    /// Read `length` raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Compute the position `length` bytes behind the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if that position lies beyond the buffer.
    pub fn calc_end_position(&self, length: usize) -> Result<usize> {
        let end = self
            .position
            .checked_add(length)
            .ok_or(out_of_bounds_error!(self.position, length))?;
        if end > self.data.len() {
            return Err(out_of_bounds_error!(self.position, length));
        }

        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn sequential_reads() {
        let data = [
            0x2A, 0x00, 0x00, 0x00, // i32 42
            0x01, // true
            0x00, // false
            0x03, 0x00, 0x00, 0x00, b'a', b'b', b'c', // "abc"
        ];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_i32().unwrap(), 42);
        assert!(parser.read_bool().unwrap());
        assert!(!parser.read_bool().unwrap());
        assert_eq!(parser.read_string_utf8().unwrap(), "abc");
        assert!(!parser.has_more_data());
    }

    #[test]
    fn seek_and_restore() {
        let data = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];
        let mut parser = Parser::new(&data);

        parser.seek(4).unwrap();
        assert_eq!(parser.read_i32().unwrap(), 2);
        parser.seek(0).unwrap();
        assert_eq!(parser.read_i32().unwrap(), 1);

        assert!(parser.seek(8).is_ok());
        assert!(parser.seek(9).is_err());
    }

    #[test]
    fn truncated_string() {
        let data = [0x05, 0x00, 0x00, 0x00, b'a', b'b'];
        let mut parser = Parser::new(&data);

        assert!(matches!(
            parser.read_string(),
            Err(Error::OutOfBounds { offset: 4, len: 5 })
        ));
    }

    #[test]
    fn negative_length() {
        let data = [0xFE, 0xFF, 0xFF, 0xFF];
        let mut parser = Parser::new(&data);
        assert!(matches!(parser.read_string(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn strict_booleans() {
        let data = [0x02];
        assert!(Parser::new(&data).read_bool().is_err());
        assert!(Parser::new(&data)
            .with_strict_booleans(false)
            .read_bool()
            .unwrap());
    }

    #[test]
    fn implausible_count() {
        // claims 1000 four-byte elements with only 4 bytes remaining
        let data = [0xE8, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut parser = Parser::new(&data);
        assert!(matches!(parser.read_count(4), Err(Error::Malformed { .. })));

        let mut parser = Parser::new(&data[..4]);
        assert!(parser.read_count(0).is_ok());
    }
}
