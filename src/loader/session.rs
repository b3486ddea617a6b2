//! State of one top-level load.
//!
//! A [`LoadSession`] is created when an executable is opened and dropped when the load
//! returns, on success and on error alike. Nothing in it is shared with other loads.

use tracing::debug;

use crate::{
    binary::strings::StringPool,
    file::parser::Parser,
    loader::{
        reference::ReferenceTable,
        typeindex::{RawTypeIndex, TypeIndexTable},
    },
    reflection::AssemblyRc,
    runtime::Vm,
    Result,
};

/// The preamble tables of an executable plus the assemblies created so far
#[derive(Debug)]
pub(crate) struct LoadSession {
    pub strings: StringPool,
    pub references: ReferenceTable,
    pub types: TypeIndexTable,
    /// Assemblies deserialized in this session, in the order they were started
    pub loaded: Vec<AssemblyRc>,
}

impl LoadSession {
    /// Read the string pool, type index and reference table.
    ///
    /// References other than the entry that the VM already holds are satisfied by the VM;
    /// their type index entries are dropped.
    pub fn read(parser: &mut Parser, vm: &Vm) -> Result<LoadSession> {
        let strings = StringPool::read(parser)?;
        let raw_types = RawTypeIndex::read_all(parser, &strings)?;
        let mut references = ReferenceTable::read(parser, &strings)?;
        if references.is_empty() {
            return Err(malformed_error!("Executable contains no assemblies"));
        }

        for index in 1..references.len() {
            let Some(name) = references.get(index).map(|r| r.name.clone()) else {
                continue;
            };
            if let Some(assembly) = vm.assembly(&name) {
                debug!(assembly = %name, "reference already loaded");
                references.preload(index, assembly);
            }
        }

        let types = TypeIndexTable::build(raw_types, &references)?;
        debug!(
            strings = strings.len(),
            types = types.len(),
            references = references.len(),
            "read executable tables"
        );

        Ok(LoadSession {
            strings,
            references,
            types,
            loaded: Vec::new(),
        })
    }
}
