//! The type index: one forward-declared shell per type of the whole closure.
//!
//! All shells exist before the first type record is read, so any name a record mentions,
//! whether it is declared earlier, later, or in another embedded assembly, resolves to
//! the same `Arc<Type>`.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    binary::{format::TYPE_INDEX_ENTRY_SIZE, strings::StringPool},
    file::parser::Parser,
    loader::reference::ReferenceTable,
    reflection::{Type, TypeRc},
    Result,
};

/// A type index entry as it appears on the wire, before references are known
#[derive(Debug)]
pub(crate) struct RawTypeIndex {
    pub reference: i32,
    pub name: String,
    pub position: i32,
    pub length: i32,
}

impl RawTypeIndex {
    /// Read `[count][count × (refOrdinal, nameIdx, position, length)]`
    pub fn read_all(parser: &mut Parser, strings: &StringPool) -> Result<Vec<RawTypeIndex>> {
        let count = parser.read_count(TYPE_INDEX_ENTRY_SIZE)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let reference = parser.read_i32()?;
            let name = strings.read_str(parser)?.to_string();
            let position = parser.read_i32()?;
            let length = parser.read_i32()?;
            entries.push(RawTypeIndex {
                reference,
                name,
                position,
                length,
            });
        }
        Ok(entries)
    }
}

/// A located type shell
#[derive(Debug)]
pub(crate) struct TypeIndexEntry {
    /// Index of the owning reference
    pub reference: usize,
    /// Absolute position of the type record
    pub position: usize,
    /// Length of the type record
    pub length: usize,
    /// The shell
    pub ty: TypeRc,
}

/// Name-indexed shells of one load session
#[derive(Debug, Default)]
pub(crate) struct TypeIndexTable {
    entries: HashMap<String, TypeIndexEntry>,
}

impl TypeIndexTable {
    /// Validate the raw entries against the reference table and allocate a shell for each.
    ///
    /// Entries owned by preloaded references are dropped; those types resolve through
    /// the VM. Positions are converted from reference-relative to absolute.
    pub fn build(raw: Vec<RawTypeIndex>, references: &ReferenceTable) -> Result<TypeIndexTable> {
        let mut entries = HashMap::with_capacity(raw.len());
        let mut seen = HashSet::with_capacity(raw.len());
        for index in raw {
            let reference = usize::try_from(index.reference)
                .ok()
                .and_then(|r| references.get(r).map(|entry| (r, entry)));
            let Some((reference, owner)) = reference else {
                return Err(malformed_error!(
                    "Type {} names reference {} of {}",
                    index.name,
                    index.reference,
                    references.len()
                ));
            };
            let (Ok(position), Ok(length)) =
                (usize::try_from(index.position), usize::try_from(index.length))
            else {
                return Err(malformed_error!(
                    "Type {} has negative bounds ({}, {})",
                    index.name,
                    index.position,
                    index.length
                ));
            };
            if !owner.contains(position, length) {
                return Err(malformed_error!(
                    "Type {} spans [{}, +{}) outside reference {} ({} bytes)",
                    index.name,
                    position,
                    length,
                    owner.name,
                    owner.length
                ));
            }
            if index.name.is_empty() {
                return Err(malformed_error!("Type index entry without a name"));
            }
            if !seen.insert(index.name.clone()) {
                return Err(malformed_error!("Type {} is indexed twice", index.name));
            }
            if owner.preloaded {
                continue;
            }

            let entry = TypeIndexEntry {
                reference,
                position: owner.position + position,
                length,
                ty: Arc::new(Type::new(&index.name)),
            };
            entries.insert(index.name, entry);
        }

        Ok(TypeIndexTable { entries })
    }

    pub fn get(&self, full_name: &str) -> Option<&TypeIndexEntry> {
        self.entries.get(full_name)
    }

    /// The shell for `full_name`
    pub fn shell(&self, full_name: &str) -> Option<TypeRc> {
        self.entries.get(full_name).map(|entry| entry.ty.clone())
    }

    /// Entries owned by reference `reference`
    pub fn owned_by(&self, reference: usize) -> impl Iterator<Item = &TypeIndexEntry> {
        self.entries
            .values()
            .filter(move |entry| entry.reference == reference)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binary::strings::StringPoolBuilder, file::io::write_le, Error};

    fn references(entries: &[(&str, i32, i32)]) -> ReferenceTable {
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
        out.resize(out.len() + 256, 0);

        let mut parser = Parser::new(&out);
        let strings = StringPool::read(&mut parser).unwrap();
        ReferenceTable::read(&mut parser, &strings).unwrap()
    }

    fn raw(reference: i32, name: &str, position: i32, length: i32) -> RawTypeIndex {
        RawTypeIndex {
            reference,
            name: name.to_string(),
            position,
            length,
        }
    }

    #[test]
    fn absolute_positions() {
        let refs = references(&[("Main", 40, 100), ("System", 40, 140)]);
        let table = TypeIndexTable::build(
            vec![raw(0, "game.Player", 8, 20), raw(1, "system.Object", 4, 36)],
            &refs,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        let player = table.get("game.Player").unwrap();
        assert_eq!(player.position, 108);
        assert_eq!(player.reference, 0);
        assert_eq!(table.get("system.Object").unwrap().position, 144);
        assert_eq!(table.owned_by(1).count(), 1);

        let shell = table.shell("game.Player").unwrap();
        assert!(Arc::ptr_eq(&shell, &player.ty));
        assert!(!shell.is_defined());
    }

    #[test]
    fn duplicate_names() {
        let refs = references(&[("Main", 40, 0)]);
        let result = TypeIndexTable::build(
            vec![raw(0, "game.Player", 0, 4), raw(0, "game.Player", 4, 4)],
            &refs,
        );
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn invalid_reference() {
        let refs = references(&[("Main", 40, 0)]);
        for bad in [raw(1, "game.A", 0, 4), raw(-1, "game.A", 0, 4)] {
            assert!(matches!(
                TypeIndexTable::build(vec![bad], &refs),
                Err(Error::Malformed { .. })
            ));
        }
    }

    #[test]
    fn outside_reference() {
        let refs = references(&[("Main", 40, 0)]);
        let result = TypeIndexTable::build(vec![raw(0, "game.A", 30, 20)], &refs);
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn preloaded_entries_dropped() {
        let mut refs = references(&[("Main", 40, 0), ("System", 40, 40)]);
        refs.preload(
            1,
            Arc::new(crate::reflection::Assembly::new(
                "System",
                "1.0",
                crate::config::AssemblyConfig::default(),
                crate::reflection::AssemblyFlags::empty(),
            )),
        );
        let table = TypeIndexTable::build(
            vec![raw(0, "game.Player", 0, 4), raw(1, "system.Object", 0, 4)],
            &refs,
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        assert!(table.get("system.Object").is_none());
    }
}
