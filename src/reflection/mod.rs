//! The live metadata graph produced by the loader.
//!
//! Ownership runs top-down: the [`crate::Vm`] owns every loaded [`Assembly`], an assembly
//! owns its [`Module`]s, a module owns its [`Type`]s and a type owns its members. Every
//! link pointing the other way, or sideways between types and assemblies, is a `Weak`
//! wrapper ([`TypeRef`], [`ModuleRef`], [`AssemblyRef`]). Cyclic assembly references and
//! mutually referencing types therefore never keep each other alive.
//!
//! Everything here is `Send + Sync`. Once a load completed, the graph is read-only and can
//! be shared between threads freely.
//!
//! # Examples
//!
//! ```rust,no_run
//! use loomscope::{reflection::Member, Vm};
//!
//! let vm = Vm::new();
//! let assembly = vm.load_executable(&std::fs::read("app.loom")?)?;
//!
//! for ty in assembly.types() {
//!     println!("{} ({:?})", ty.full_name, ty.kind());
//!     for member in ty.dispatch_table().unwrap_or_default().iter().flatten() {
//!         match member {
//!             Member::Method(m) => println!("  {}: method {}", m.ordinal(), m.name()),
//!             other => println!("  {}: {:?} {}", other.ordinal(), other.kind(), other.name()),
//!         }
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod assembly;
mod bytecode;
mod field;
mod member;
mod method;
mod module;
mod property;
mod types;

pub use assembly::{
    Assembly, AssemblyFlags, AssemblyRc, AssemblyRef, BOOTSTRAP_METHOD, BOOTSTRAP_TYPE,
    ENTRY_POINT,
};
pub use bytecode::ByteCode;
pub use field::{FieldAttributes, FieldInfo, FieldRc};
pub use member::{Member, MemberInfo, MemberKind, MetaInfo, TemplateInfo};
pub use method::{
    ConstructorInfo, ConstructorRc, MethodAttributes, MethodBase, MethodBody, MethodInfo,
    MethodRc, ParameterAttributes, ParameterInfo,
};
pub use module::{Module, ModuleRc, ModuleRef};
pub use property::{PropertyAttributes, PropertyInfo, PropertyRc};
pub use types::{
    Type, TypeAttributes, TypeDefinition, TypeKind, TypeRc, TypeRef, PRIMITIVE_TYPES,
};
