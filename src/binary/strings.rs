//! The deduplicated string pool of an executable.
//!
//! Every identifier in the binary format (type, member, package and file names, attribute
//! keywords, metadata keys and values) is stored once in a pool at the start of the blob and
//! referenced everywhere else by its `i32` index. Index `-1` is reserved for the empty string.
//!
//! The reader copies all entries into one contiguous buffer and keeps only the entry ranges,
//! so lookups are O(1) and the pool does not borrow from the input.

use std::{collections::HashMap, ops::Range};

use crate::{
    file::{io::write_le, parser::Parser},
    Error, Result,
};

/// Wire index denoting the empty string
pub const EMPTY_STRING_INDEX: i32 = -1;

/// The string pool of one load session.
///
/// # Examples
///
/// ```rust
/// use loomscope::binary::strings::{StringPool, StringPoolBuilder};
/// use loomscope::Parser;
///
/// let mut builder = StringPoolBuilder::new();
/// let idx = builder.intern("system.Object");
/// assert_eq!(builder.intern("system.Object"), idx);
///
/// let mut bytes = Vec::new();
/// builder.write(&mut bytes);
///
/// let pool = StringPool::read(&mut Parser::new(&bytes))?;
/// assert_eq!(pool.get(idx)?, "system.Object");
/// assert_eq!(pool.get(-1)?, "");
/// # Ok::<(), loomscope::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct StringPool {
    buffer: String,
    entries: Vec<Range<usize>>,
}

impl StringPool {
    /// Read the pool header and all entries.
    ///
    /// The declared buffer size must equal the byte span of the entries (one `i32` length
    /// plus the characters per entry).
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for negative sizes, invalid UTF-8 or a buffer size that
    /// disagrees with the entries, and [`Error::OutOfBounds`] for truncated input.
    pub fn read(parser: &mut Parser) -> Result<StringPool> {
        let count = parser.read_count(4)?;
        let declared = parser.read_i32()?;
        let Ok(declared) = usize::try_from(declared) else {
            return Err(malformed_error!("Negative string buffer size {}", declared));
        };
        if declared > parser.remaining() {
            return Err(malformed_error!(
                "String buffer size {} exceeds remaining data ({} bytes)",
                declared,
                parser.remaining()
            ));
        }

        let start = parser.pos();
        let mut buffer = String::with_capacity(declared.saturating_sub(count * 4));
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let value = parser.read_string_utf8()?;
            let begin = buffer.len();
            buffer.push_str(value);
            entries.push(begin..buffer.len());
        }

        let consumed = parser.pos() - start;
        if consumed != declared {
            return Err(malformed_error!(
                "String pool declares {} bytes but its {} entries span {}",
                declared,
                count,
                consumed
            ));
        }

        Ok(StringPool { buffer, entries })
    }

    /// Look up the string at a wire index.
    ///
    /// # Errors
    /// Returns [`Error::StringIndexOutOfRange`] for any index other than `-1` that does not
    /// name an entry.
    pub fn get(&self, index: i32) -> Result<&str> {
        if index == EMPTY_STRING_INDEX {
            return Ok("");
        }

        usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i))
            .map(|range| &self.buffer[range.clone()])
            .ok_or(Error::StringIndexOutOfRange {
                index,
                count: self.entries.len(),
            })
    }

    /// Read one `i32` index from `parser` and resolve it.
    ///
    /// # Errors
    /// Returns an error on truncated input or an invalid index.
    pub fn read_str(&self, parser: &mut Parser) -> Result<&str> {
        let index = parser.read_i32()?;
        self.get(index)
    }

    /// Number of strings in the pool
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the pool holds no strings
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all pooled strings in index order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|range| &self.buffer[range.clone()])
    }
}

/// Collects strings for writing, handing out one index per distinct value.
#[derive(Debug, Default)]
pub struct StringPoolBuilder {
    lookup: HashMap<String, i32>,
    strings: Vec<String>,
}

impl StringPoolBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index of `value`, adding it on first use.
    ///
    /// The empty string is never pooled; it always maps to `-1`.
    pub fn intern(&mut self, value: &str) -> i32 {
        if value.is_empty() {
            return EMPTY_STRING_INDEX;
        }

        if let Some(&index) = self.lookup.get(value) {
            return index;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let index = self.strings.len() as i32;
        self.strings.push(value.to_string());
        self.lookup.insert(value.to_string(), index);
        index
    }

    /// Number of distinct strings
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if nothing was interned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Serialize the pool header and entries.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn write(&self, out: &mut Vec<u8>) {
        let buffer_size: usize = self.strings.iter().map(|s| 4 + s.len()).sum();

        write_le(out, self.strings.len() as i32);
        write_le(out, buffer_size as i32);
        for value in &self.strings {
            write_le(out, value.len() as i32);
            out.extend_from_slice(value.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(builder: &StringPoolBuilder) -> StringPool {
        let mut bytes = Vec::new();
        builder.write(&mut bytes);
        StringPool::read(&mut Parser::new(&bytes)).unwrap()
    }

    #[test]
    fn dedup() {
        let mut builder = StringPoolBuilder::new();
        let a = builder.intern("main");
        let b = builder.intern("system.Object");
        assert_eq!(builder.intern("main"), a);
        assert_ne!(a, b);
        assert_eq!(builder.len(), 2);

        let pool = roundtrip(&builder);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(a).unwrap(), "main");
        assert_eq!(pool.get(b).unwrap(), "system.Object");
        assert_eq!(pool.iter().collect::<Vec<_>>(), vec!["main", "system.Object"]);
    }

    #[test]
    fn empty_string_index() {
        let mut builder = StringPoolBuilder::new();
        assert_eq!(builder.intern(""), EMPTY_STRING_INDEX);
        assert!(builder.is_empty());

        let pool = roundtrip(&builder);
        assert_eq!(pool.get(-1).unwrap(), "");
    }

    #[test]
    fn index_out_of_range() {
        let mut builder = StringPoolBuilder::new();
        builder.intern("only");
        let pool = roundtrip(&builder);

        assert!(matches!(
            pool.get(1),
            Err(Error::StringIndexOutOfRange { index: 1, count: 1 })
        ));
        assert!(matches!(
            pool.get(-2),
            Err(Error::StringIndexOutOfRange { index: -2, .. })
        ));
    }

    #[test]
    fn buffer_size_mismatch() {
        let mut builder = StringPoolBuilder::new();
        builder.intern("abc");
        let mut bytes = Vec::new();
        builder.write(&mut bytes);
        // declared size 7 -> 8
        bytes[4] = 8;
        bytes.push(0);

        assert!(matches!(
            StringPool::read(&mut Parser::new(&bytes)),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn read_str_consumes_index() {
        let mut builder = StringPoolBuilder::new();
        let idx = builder.intern("value");
        let pool = roundtrip(&builder);

        let mut data = Vec::new();
        write_le(&mut data, idx);
        write_le(&mut data, -1_i32);
        let mut parser = Parser::new(&data);
        assert_eq!(pool.read_str(&mut parser).unwrap(), "value");
        assert_eq!(pool.read_str(&mut parser).unwrap(), "");
    }
}
