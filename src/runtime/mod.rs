//! The embedding side of the loader: the [`Vm`] session, host function registry and values.
//!
//! A [`Vm`] owns everything that outlives a single load: the assemblies loaded so far, a
//! cache of every type they declare, host-registered core types, the
//! [`NativeRegistry`] and an optional [`Executor`] that runs bytecode methods. The loader
//! consumes this interface to resolve types outside the executable being loaded and to
//! bind native methods.

mod native;
mod validation;
mod value;
mod vm;

pub use native::{NativeBinding, NativeFn, NativeKind, NativeRegistry, NativeSignature};
pub use validation::{validate_signature, ConversionTable, ScriptCategory};
pub use value::Value;
pub use vm::{Executor, Vm, CORE_TYPES};
