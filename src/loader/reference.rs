//! The reference table: every assembly embedded in one executable.
//!
//! Each entry names an assembly and locates its record inside the blob. The entry at
//! index 0 is the executable's own (entry) assembly; the others are dependencies, loaded
//! at most once per session no matter how many assemblies refer to them.

use std::collections::HashMap;

use crate::{
    binary::{format::REFERENCE_ENTRY_SIZE, strings::StringPool},
    file::parser::Parser,
    reflection::AssemblyRc,
    Result,
};

/// Load state of one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReferenceState {
    /// Not visited yet
    Unseen,
    /// Visited, its record is being read; seeing it again means a cycle
    Loading,
    /// Fully read, or already loaded in the VM before this session
    Loaded,
}

/// One embedded assembly
#[derive(Debug)]
pub(crate) struct ReferenceEntry {
    pub name: String,
    pub position: usize,
    pub length: usize,
    pub state: ReferenceState,
    pub assembly: Option<AssemblyRc>,
    /// The VM had this assembly before the session started
    pub preloaded: bool,
}

impl ReferenceEntry {
    /// Returns true if `[position, position + length)` lies within this reference
    pub fn contains(&self, position: usize, length: usize) -> bool {
        position
            .checked_add(length)
            .is_some_and(|end| end <= self.length)
    }
}

/// Name-indexed table of all embedded assemblies
#[derive(Debug, Default)]
pub(crate) struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
    by_name: HashMap<String, usize>,
}

impl ReferenceTable {
    /// Read `[count][count × (nameIdx, length, position)]`.
    ///
    /// Names must be unique and non-empty and every record must lie inside the blob.
    pub fn read(parser: &mut Parser, strings: &StringPool) -> Result<ReferenceTable> {
        let count = parser.read_count(REFERENCE_ENTRY_SIZE)?;
        let data_len = parser.len();

        let mut table = ReferenceTable {
            entries: Vec::with_capacity(count),
            by_name: HashMap::with_capacity(count),
        };
        for index in 0..count {
            let name = strings.read_str(parser)?;
            let length = parser.read_i32()?;
            let position = parser.read_i32()?;

            if name.is_empty() {
                return Err(malformed_error!("Reference {} has an empty name", index));
            }
            let (Ok(length), Ok(position)) = (usize::try_from(length), usize::try_from(position))
            else {
                return Err(malformed_error!(
                    "Reference {} has negative bounds ({}, {})",
                    name,
                    position,
                    length
                ));
            };
            if position.checked_add(length).map_or(true, |end| end > data_len) {
                return Err(malformed_error!(
                    "Reference {} spans [{}, +{}) beyond the end of data ({} bytes)",
                    name,
                    position,
                    length,
                    data_len
                ));
            }
            if table.by_name.insert(name.to_string(), index).is_some() {
                return Err(malformed_error!("Reference {} is listed twice", name));
            }

            table.entries.push(ReferenceEntry {
                name: name.to_string(),
                position,
                length,
                state: ReferenceState::Unseen,
                assembly: None,
                preloaded: false,
            });
        }

        Ok(table)
    }

    /// Index of the reference named `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, index: usize) -> Option<&ReferenceEntry> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ReferenceEntry> {
        self.entries.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark `index` as satisfied by an assembly the VM already holds
    pub fn preload(&mut self, index: usize, assembly: AssemblyRc) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.state = ReferenceState::Loaded;
            entry.assembly = Some(assembly);
            entry.preloaded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binary::strings::StringPoolBuilder, file::io::write_le, Error};

    fn table_bytes(entries: &[(&str, i32, i32)], padding: usize) -> Vec<u8> {
        let mut builder = StringPoolBuilder::new();
        let indices: Vec<i32> = entries.iter().map(|(n, _, _)| builder.intern(n)).collect();

        let mut out = Vec::new();
        builder.write(&mut out);
        write_le(&mut out, entries.len() as i32);
        for ((_, length, position), index) in entries.iter().zip(indices) {
            write_le(&mut out, index);
            write_le(&mut out, *length);
            write_le(&mut out, *position);
        }
        out.resize(out.len() + padding, 0);
        out
    }

    fn read(bytes: &[u8]) -> Result<ReferenceTable> {
        let mut parser = Parser::new(bytes);
        let strings = StringPool::read(&mut parser)?;
        ReferenceTable::read(&mut parser, &strings)
    }

    #[test]
    fn valid_table() {
        let bytes = table_bytes(&[("Main", 10, 0), ("System", 20, 10)], 64);
        let table = read(&bytes).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.index_of("System"), Some(1));
        let system = table.get(1).unwrap();
        assert_eq!(system.position, 10);
        assert_eq!(system.state, ReferenceState::Unseen);
        assert!(system.contains(4, 16));
        assert!(!system.contains(4, 17));
    }

    #[test]
    fn duplicate_name() {
        let bytes = table_bytes(&[("Main", 4, 0), ("Main", 4, 4)], 64);
        assert!(matches!(read(&bytes), Err(Error::Malformed { .. })));
    }

    #[test]
    fn empty_name() {
        let bytes = table_bytes(&[("", 4, 0)], 64);
        assert!(matches!(read(&bytes), Err(Error::Malformed { .. })));
    }

    #[test]
    fn beyond_data() {
        let bytes = table_bytes(&[("Main", 4096, 0)], 0);
        assert!(matches!(read(&bytes), Err(Error::Malformed { .. })));
    }

    #[test]
    fn preload() {
        let bytes = table_bytes(&[("Main", 4, 0)], 64);
        let mut table = read(&bytes).unwrap();
        let assembly = std::sync::Arc::new(crate::reflection::Assembly::new(
            "Main",
            "1.0",
            crate::config::AssemblyConfig::default(),
            crate::reflection::AssemblyFlags::empty(),
        ));
        table.preload(0, assembly);

        let entry = table.get(0).unwrap();
        assert_eq!(entry.state, ReferenceState::Loaded);
        assert!(entry.preloaded);
        assert!(table.get_mut(3).is_none());
    }
}
