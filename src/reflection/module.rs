//! Reflected modules.

use std::sync::{Arc, Weak};

use crate::reflection::{
    assembly::{AssemblyRc, AssemblyRef},
    types::TypeRc,
};

/// Reference counted `Module`
pub type ModuleRc = Arc<Module>;

/// A non-owning link to a [`Module`]
#[derive(Clone, Debug)]
pub struct ModuleRef {
    weak_ref: Weak<Module>,
}

impl ModuleRef {
    /// Create a new `ModuleRef` from a strong reference
    #[must_use]
    pub fn new(strong_ref: &ModuleRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the module, returning None if it has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<ModuleRc> {
        self.weak_ref.upgrade()
    }
}

/// A named group of types inside an assembly. Owns its types.
#[derive(Debug)]
pub struct Module {
    /// Module name
    pub name: String,
    /// Module version string
    pub version: String,
    /// Types declared in this module, in record order
    pub types: boxcar::Vec<TypeRc>,
    assembly: AssemblyRef,
}

impl Module {
    /// Create an empty module belonging to `assembly`
    #[must_use]
    pub fn new(name: &str, version: &str, assembly: &AssemblyRc) -> Self {
        Module {
            name: name.to_string(),
            version: version.to_string(),
            types: boxcar::Vec::new(),
            assembly: AssemblyRef::new(assembly),
        }
    }

    /// The declaring assembly, if it is still alive
    #[must_use]
    pub fn assembly(&self) -> Option<AssemblyRc> {
        self.assembly.upgrade()
    }

    /// Type named `full_name` declared in this module
    #[must_use]
    pub fn get_type(&self, full_name: &str) -> Option<TypeRc> {
        self.types
            .iter()
            .find(|(_, t)| t.full_name == full_name)
            .map(|(_, t)| t.clone())
    }
}
