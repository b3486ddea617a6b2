//! The binary executable format.
//!
//! An executable is one little-endian blob:
//!
//! ```text
//! [string pool][type index][reference table][assembly record]...
//! ```
//!
//! - [`strings`] - the deduplicated string pool every record indexes into
//! - [`format`] - record kinds, size constants and the attribute keyword vocabulary
//! - [`def`] - an owned description of assemblies, modules, types and members
//! - [`writer`] - serializes definitions into the format the loader reads

pub mod def;
pub mod format;
pub mod strings;
pub mod writer;

pub use def::{
    AssemblyDef, ConstructorDef, FieldDef, MemberDef, MetaDef, MethodDef, ModuleDef,
    ParameterDef, PropertyDef, TemplateDef, TypeDef,
};
pub use writer::ExecutableWriter;
