//! Executable input handling.
//!
//! This module abstracts where an executable's bytes come from (an owned buffer or a
//! memory-mapped file) and provides the low-level reading primitives every other part
//! of the crate builds on.
//!
//! # Key Components
//!
//! - [`crate::file::File`] - An executable input backed by memory or a mapped file
//! - [`crate::file::parser::Parser`] - Bounds-checked cursor over the binary format
//! - [`crate::file::io`] - Little-endian primitive reads and writes
//! - [`crate::file::container`] - The optional compressed container around a blob
//!
//! # Examples
//!
//! ```rust,no_run
//! use loomscope::File;
//!
//! let file = File::from_file("app.loom".as_ref())?;
//! let blob = file.payload()?;
//! println!("{} bytes of executable data", blob.len());
//! # Ok::<(), loomscope::Error>(())
//! ```

pub mod container;
pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::{borrow::Cow, path::Path};

use crate::{Error::Empty, Result};
use memory::Memory;
use physical::Physical;

/// Backing storage for executable input.
///
/// Implementations provide the raw bytes of an executable, no matter whether it lives in
/// an owned buffer or a memory-mapped file.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// An executable input, either a raw blob or a compressed container.
pub struct File {
    data: Box<dyn Backend>,
}

impl File {
    /// Memory-map an executable from disk.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file can not be opened and
    /// [`crate::Error::Empty`] for an empty file.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;
        Self::load(input)
    }

    /// Wrap an executable that is already in memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for an empty buffer.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);
        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        Ok(File {
            data: Box::new(data),
        })
    }

    /// Size of the input in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the input holds no data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw input bytes, as stored
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns true if the input is a compressed container
    #[must_use]
    pub fn is_container(&self) -> bool {
        container::is_container(self.data())
    }

    /// The executable blob, decompressing a container if necessary.
    ///
    /// # Errors
    /// Returns an error if the container header or its payload is invalid.
    pub fn payload(&self) -> Result<Cow<'_, [u8]>> {
        if self.is_container() {
            Ok(Cow::Owned(container::unpack(self.data())?))
        } else {
            Ok(Cow::Borrowed(self.data()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert!(matches!(File::from_mem(Vec::new()), Err(crate::Error::Empty)));
    }

    #[test]
    fn raw_payload_is_borrowed() {
        let file = File::from_mem(vec![1, 2, 3]).unwrap();
        assert!(!file.is_container());
        let payload = file.payload().unwrap();
        assert!(matches!(payload, Cow::Borrowed(_)));
        assert_eq!(payload.as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn container_payload_is_unpacked() {
        let packed = container::pack(&[9, 8, 7, 6]).unwrap();
        let file = File::from_mem(packed).unwrap();
        assert!(file.is_container());
        assert_eq!(file.payload().unwrap().as_ref(), &[9, 8, 7, 6]);
    }
}
