//! Reflected assemblies.
//!
//! An [`Assembly`] is the unit the compiler emits: a named, versioned set of modules plus
//! the names of the assemblies it depends on. It owns its modules and, through them, its
//! types. References to other assemblies are non-owning, because dependency graphs may
//! be cyclic; the [`crate::Vm`] owns every loaded assembly.
//!
//! # Examples
//!
//! ```rust,no_run
//! use loomscope::Vm;
//!
//! let vm = Vm::new();
//! let assembly = vm.load_executable(&std::fs::read("app.loom")?)?;
//!
//! for reference in assembly.references() {
//!     println!("{} depends on {}", assembly.name(), reference.name());
//! }
//! if let Some(main) = assembly.static_method_info("main") {
//!     println!("entry point declared in {:?}", main.declaring_type());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, OnceLock, Weak,
};

use bitflags::bitflags;
use tracing::debug;

use crate::{
    config::AssemblyConfig,
    reflection::{method::MethodRc, module::ModuleRc, types::TypeRc},
    runtime::{Value, Vm},
    Error, Result,
};

/// Reference counted `Assembly`
pub type AssemblyRc = Arc<Assembly>;

/// Qualified name of the base type whose subclasses run at bootstrap
pub const BOOTSTRAP_TYPE: &str = "system.Bootstrap";
/// Name of the method invoked on bootstrap types
pub const BOOTSTRAP_METHOD: &str = "initialize";
/// Name of the entry point method
pub const ENTRY_POINT: &str = "main";

/// A non-owning link to an [`Assembly`]
#[derive(Clone, Debug)]
pub struct AssemblyRef {
    weak_ref: Weak<Assembly>,
}

impl AssemblyRef {
    /// Create a new `AssemblyRef` from a strong reference
    #[must_use]
    pub fn new(strong_ref: &AssemblyRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the assembly, returning None if it has been closed
    #[must_use]
    pub fn upgrade(&self) -> Option<AssemblyRc> {
        self.weak_ref.upgrade()
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
    /// Build flags of an assembly
    pub struct AssemblyFlags: u8 {
        /// The assembly is the entry point of an executable
        const EXECUTABLE = 0x01;
        /// Bytecode was compiled for the JIT runtime
        const JIT = 0x02;
        /// Compiled with debug information
        const DEBUG_BUILD = 0x04;
    }
}

/// A loaded assembly
#[derive(Debug)]
pub struct Assembly {
    name: String,
    version: String,
    config: AssemblyConfig,
    flags: AssemblyFlags,
    /// Modules in record order
    pub modules: boxcar::Vec<ModuleRc>,
    references: boxcar::Vec<AssemblyRef>,
    type_table: OnceLock<Vec<TypeRc>>,
    load_count: AtomicUsize,
}

impl Assembly {
    /// Create an assembly without modules
    #[must_use]
    pub fn new(name: &str, version: &str, config: AssemblyConfig, flags: AssemblyFlags) -> Self {
        Assembly {
            name: name.to_string(),
            version: version.to_string(),
            config,
            flags,
            modules: boxcar::Vec::new(),
            references: boxcar::Vec::new(),
            type_table: OnceLock::new(),
            load_count: AtomicUsize::new(0),
        }
    }

    /// Assembly name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assembly version string
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The embedded configuration
    #[must_use]
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Build flags
    #[must_use]
    pub fn flags(&self) -> AssemblyFlags {
        self.flags
    }

    /// Returns true for the entry assembly of an executable
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.flags.contains(AssemblyFlags::EXECUTABLE)
    }

    /// Returns true if the bytecode targets the JIT runtime
    #[must_use]
    pub fn is_jit(&self) -> bool {
        self.flags.contains(AssemblyFlags::JIT)
    }

    /// Returns true for debug builds
    #[must_use]
    pub fn is_debug_build(&self) -> bool {
        self.flags.contains(AssemblyFlags::DEBUG_BUILD)
    }

    /// How many times this assembly's record was deserialized
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_loaded(&self) {
        self.load_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dependency. Adding the same assembly twice has no effect.
    pub fn add_reference(&self, reference: &AssemblyRc) {
        let known = self
            .references
            .iter()
            .any(|(_, r)| r.upgrade().is_some_and(|r| r.name == reference.name));
        if !known {
            self.references.push(AssemblyRef::new(reference));
        }
    }

    /// Referenced assemblies that are still loaded
    #[must_use]
    pub fn references(&self) -> Vec<AssemblyRc> {
        self.references
            .iter()
            .filter_map(|(_, r)| r.upgrade())
            .collect()
    }

    /// Referenced assembly named `name`
    #[must_use]
    pub fn reference(&self, name: &str) -> Option<AssemblyRc> {
        self.references().into_iter().find(|r| r.name == name)
    }

    /// All types of all modules, in record order
    #[must_use]
    pub fn types(&self) -> Vec<TypeRc> {
        self.modules
            .iter()
            .flat_map(|(_, m)| m.types.iter().map(|(_, t)| t.clone()).collect::<Vec<_>>())
            .collect()
    }

    /// Type named `full_name` declared in this assembly
    #[must_use]
    pub fn get_type(&self, full_name: &str) -> Option<TypeRc> {
        self.modules
            .iter()
            .find_map(|(_, m)| m.get_type(full_name))
    }

    /// The type at position `index` in record order.
    ///
    /// # Errors
    /// Returns [`Error::TypeOutOfRange`] if `index` is not below the number of types.
    pub fn type_at_index(&self, index: usize) -> Result<TypeRc> {
        let types = self.types();
        let count = types.len();
        types
            .into_iter()
            .nth(index)
            .ok_or(Error::TypeOutOfRange { index, count })
    }

    /// The type with compiler-assigned id `type_id`, once the assembly finished loading
    #[must_use]
    pub fn type_by_id(&self, type_id: i32) -> Option<TypeRc> {
        let index = usize::try_from(type_id).ok()?.checked_sub(1)?;
        self.type_table.get()?.get(index).cloned()
    }

    /// Build the id-indexed type table. Ids must be exactly `1..=type_count`.
    pub(crate) fn build_type_table(&self) -> Result<()> {
        let types = self.types();
        let count = types.len();
        let mut table: Vec<Option<TypeRc>> = vec![None; count];

        for ty in types {
            let type_id = ty.type_id().unwrap_or(0);
            let slot = usize::try_from(type_id)
                .ok()
                .and_then(|id| id.checked_sub(1))
                .and_then(|index| table.get_mut(index));

            match slot {
                Some(slot) if slot.is_none() => *slot = Some(ty),
                _ => {
                    return Err(Error::TypeIdOutOfRange {
                        assembly: self.name.clone(),
                        type_name: ty.full_name.clone(),
                        type_id,
                        count,
                    })
                }
            }
        }

        let table = table.into_iter().flatten().collect();
        self.type_table
            .set(table)
            .map_err(|_| malformed_error!("Type table of {} built twice", self.name))
    }

    /// The first static method named `name`, searching types in record order
    #[must_use]
    pub fn static_method_info(&self, name: &str) -> Option<MethodRc> {
        self.types().into_iter().find_map(|ty| {
            ty.methods
                .iter()
                .find(|(_, m)| m.is_static() && m.name() == name)
                .map(|(_, m)| m.clone())
        })
    }

    /// Invoke the static `main` method.
    ///
    /// # Errors
    /// Returns [`Error::MissingEntryPoint`] if the assembly has no static `main`, or the
    /// error of the invocation itself.
    pub fn execute(&self, vm: &Vm) -> Result<Value> {
        let Some(method) = self.static_method_info(ENTRY_POINT) else {
            return Err(Error::MissingEntryPoint {
                assembly: self.name.clone(),
                method: ENTRY_POINT.to_string(),
            });
        };

        debug!(assembly = %self.name, "executing entry point");
        vm.invoke(&method, &[])
    }

    /// Run `initialize` on every type deriving from `system.Bootstrap`.
    ///
    /// # Errors
    /// Returns [`Error::MissingEntryPoint`] for a bootstrap type without `initialize`, or the
    /// error of an invocation.
    pub fn bootstrap(&self, vm: &Vm) -> Result<()> {
        for ty in self.types() {
            if ty.full_name == BOOTSTRAP_TYPE
                || ty.full_name == "system.Null"
                || !ty.is_assignable_to(BOOTSTRAP_TYPE)
            {
                continue;
            }

            let Some(method) = ty.find_method(BOOTSTRAP_METHOD) else {
                return Err(Error::MissingEntryPoint {
                    assembly: self.name.clone(),
                    method: format!("{}:{}", ty.full_name, BOOTSTRAP_METHOD),
                });
            };

            debug!(assembly = %self.name, type_name = %ty.full_name, "bootstrapping");
            vm.invoke(&method, &[])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{
        member::MemberInfo,
        module::Module,
        types::{Type, TypeAttributes, TypeDefinition, TypeKind},
    };

    fn assembly_with_types(ids: &[i32]) -> AssemblyRc {
        let assembly = Arc::new(Assembly::new(
            "Game",
            "1.0",
            AssemblyConfig::default(),
            AssemblyFlags::EXECUTABLE,
        ));
        let module = Arc::new(Module::new("Game", "1.0", &assembly));
        for (i, id) in ids.iter().enumerate() {
            let ty = Arc::new(Type::new(&format!("game.T{i}")));
            ty.define(TypeDefinition {
                kind: TypeKind::Class,
                type_id: *id,
                info: MemberInfo::default(),
                flags: TypeAttributes::PUBLIC,
            })
            .unwrap();
            module.types.push(ty);
        }
        assembly.modules.push(module);
        assembly
    }

    #[test]
    fn type_table() {
        let assembly = assembly_with_types(&[2, 1, 3]);
        assembly.build_type_table().unwrap();

        assert_eq!(assembly.type_by_id(1).unwrap().full_name, "game.T1");
        assert_eq!(assembly.type_by_id(2).unwrap().full_name, "game.T0");
        assert!(assembly.type_by_id(0).is_none());
        assert!(assembly.type_by_id(4).is_none());
        assert_eq!(assembly.type_at_index(2).unwrap().full_name, "game.T2");
        assert!(matches!(
            assembly.type_at_index(3),
            Err(Error::TypeOutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn type_id_out_of_range() {
        let assembly = assembly_with_types(&[1, 5]);
        assert!(matches!(
            assembly.build_type_table(),
            Err(Error::TypeIdOutOfRange { type_id: 5, count: 2, .. })
        ));
    }

    #[test]
    fn duplicate_type_id() {
        let assembly = assembly_with_types(&[1, 1]);
        assert!(matches!(
            assembly.build_type_table(),
            Err(Error::TypeIdOutOfRange { type_id: 1, .. })
        ));
    }

    #[test]
    fn reference_dedup() {
        let assembly = assembly_with_types(&[]);
        let system = Arc::new(Assembly::new(
            "System",
            "1.0",
            AssemblyConfig::default(),
            AssemblyFlags::empty(),
        ));
        assembly.add_reference(&system);
        assembly.add_reference(&system);

        assert_eq!(assembly.references().len(), 1);
        assert!(assembly.reference("System").is_some());
        assert!(assembly.is_executable());
        assert!(!assembly.is_jit());
    }
}
