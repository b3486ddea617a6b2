//! # loomscope Prelude
//!
//! Re-exports the types most hosts need to load executables, inspect the reflection graph
//! and register natives.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all loomscope operations
pub use crate::Error;

/// The result type used throughout loomscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The virtual machine that loads and owns assemblies
pub use crate::Vm;

/// Two-phase loading
pub use crate::ExecutableHeader;

/// Low-level file parsing utilities
pub use crate::{File, Parser};

/// Loader options
pub use crate::config::{AssemblyConfig, BytecodeMode, LoaderConfig};

// ================================================================================================
// Reflection
// ================================================================================================

pub use crate::reflection::{
    Assembly, AssemblyRc, ConstructorInfo, FieldInfo, Member, MemberKind, MethodBody,
    MethodInfo, MethodRc, Module, ModuleRc, ParameterInfo, PropertyInfo, Type, TypeKind, TypeRc,
};

// ================================================================================================
// Runtime
// ================================================================================================

pub use crate::runtime::{
    Executor, NativeBinding, NativeKind, NativeRegistry, NativeSignature, Value,
};

// ================================================================================================
// Writing
// ================================================================================================

pub use crate::binary::{
    AssemblyDef, ExecutableWriter, FieldDef, MethodDef, ModuleDef, ParameterDef, PropertyDef,
    TypeDef,
};
