//! Host functions bound to script methods.
//!
//! The host registers its native implementations before loading an executable. Each
//! registration is keyed by the qualified member name, `package.Type:member`, the same key
//! the loader builds for every method carrying the `native` keyword. Every registration carries
//! the native signature of the implementation; the loader compares it with the script
//! declaration once, at load time, so calls through the binding are never checked again.
//!
//! Native *types* are registered separately by name, with a flag telling whether script code
//! may subclass them (`[Native(managed)]`).
//!
//! # Examples
//!
//! ```rust
//! use loomscope::runtime::{NativeRegistry, NativeSignature, Value};
//!
//! let registry = NativeRegistry::new();
//! registry.register(
//!     "system.Math",
//!     "abs",
//!     NativeSignature::new(&["double"], "double"),
//!     |args: &[Value]| Ok(Value::Number(args[0].as_number().unwrap_or(0.0).abs())),
//! );
//!
//! let binding = registry.get("system.Math", "abs").unwrap();
//! assert_eq!(binding.call(&[Value::Number(-2.0)])?, Value::Number(2.0));
//! # Ok::<(), loomscope::Error>(())
//! ```

use std::{fmt, sync::Arc};

use dashmap::DashMap;
use strum::Display;

use crate::{runtime::Value, Result};

/// A host implementation callable from script
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Calling convention of a native binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NativeKind {
    /// Regular native call through the bridge
    Function,
    /// Direct call that skips argument marshalling
    FastCall,
}

/// Declared signature of a native implementation, as C type names.
///
/// Parameters are the script-visible ones; an instance method's receiver is not listed.
/// An empty return type means `void`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeSignature {
    /// Parameter type names in order
    pub parameters: Vec<String>,
    /// Return type name
    pub return_type: String,
}

impl NativeSignature {
    /// Create a signature from type names
    #[must_use]
    pub fn new(parameters: &[&str], return_type: &str) -> Self {
        NativeSignature {
            parameters: parameters.iter().map(ToString::to_string).collect(),
            return_type: return_type.to_string(),
        }
    }
}

impl fmt::Display for NativeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let return_type = if self.return_type.is_empty() {
            "void"
        } else {
            &self.return_type
        };
        write!(f, "({}) -> {}", self.parameters.join(", "), return_type)
    }
}

/// A registered native implementation
#[derive(Clone)]
pub struct NativeBinding {
    /// Calling convention
    pub kind: NativeKind,
    /// Signature used for load-time validation
    pub signature: NativeSignature,
    function: NativeFn,
}

impl NativeBinding {
    /// Create a binding around `function`
    pub fn new<F>(kind: NativeKind, signature: NativeSignature, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        NativeBinding {
            kind,
            signature,
            function: Arc::new(function),
        }
    }

    /// Call the implementation
    ///
    /// # Errors
    /// Returns whatever the implementation returns.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.function)(args)
    }
}

impl fmt::Debug for NativeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBinding")
            .field("kind", &self.kind)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Registry of host functions and host types.
#[derive(Debug, Default)]
pub struct NativeRegistry {
    functions: DashMap<String, NativeBinding>,
    types: DashMap<String, bool>,
}

impl NativeRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry key of a member
    #[must_use]
    pub fn key(type_name: &str, member: &str) -> String {
        format!("{type_name}:{member}")
    }

    /// Register a regular native function for `type_name:member`, replacing any previous one
    pub fn register<F>(
        &self,
        type_name: &str,
        member: &str,
        signature: NativeSignature,
        function: F,
    ) where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(
            type_name,
            member,
            NativeBinding::new(NativeKind::Function, signature, function),
        );
    }

    /// Register a fast-call native function for `type_name:member`
    pub fn register_fast_call<F>(
        &self,
        type_name: &str,
        member: &str,
        signature: NativeSignature,
        function: F,
    ) where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(
            type_name,
            member,
            NativeBinding::new(NativeKind::FastCall, signature, function),
        );
    }

    /// Register a prepared binding
    pub fn insert(&self, type_name: &str, member: &str, binding: NativeBinding) {
        self.functions.insert(Self::key(type_name, member), binding);
    }

    /// Declare a host type; `managed` allows script subclasses
    pub fn register_type(&self, type_name: &str, managed: bool) {
        self.types.insert(type_name.to_string(), managed);
    }

    /// The binding for `type_name:member`
    #[must_use]
    pub fn get(&self, type_name: &str, member: &str) -> Option<NativeBinding> {
        self.functions
            .get(&Self::key(type_name, member))
            .map(|entry| entry.value().clone())
    }

    /// The `managed` flag of a registered host type
    #[must_use]
    pub fn native_type(&self, type_name: &str) -> Option<bool> {
        self.types.get(type_name).map(|entry| *entry.value())
    }

    /// Number of registered functions
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if no function is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn register_and_call() {
        let registry = NativeRegistry::new();
        registry.register_fast_call(
            "system.String",
            "fromNumber",
            NativeSignature::new(&["double"], "char const*"),
            |args| Ok(Value::String(format!("{}", args[0]))),
        );

        let binding = registry.get("system.String", "fromNumber").unwrap();
        assert_eq!(binding.kind, NativeKind::FastCall);
        assert_eq!(
            binding.call(&[Value::Number(3.0)]).unwrap(),
            Value::from("3")
        );
        assert!(registry.get("system.String", "toNumber").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn failing_function() {
        let registry = NativeRegistry::new();
        registry.register("game.Io", "read", NativeSignature::default(), |_| {
            Err(Error::Execution("device gone".to_string()))
        });

        let binding = registry.get("game.Io", "read").unwrap();
        assert!(matches!(binding.call(&[]), Err(Error::Execution(_))));
    }

    #[test]
    fn native_types() {
        let registry = NativeRegistry::new();
        registry.register_type("loom2d.display.Sprite", true);
        registry.register_type("loom.platform.Timer", false);

        assert_eq!(registry.native_type("loom2d.display.Sprite"), Some(true));
        assert_eq!(registry.native_type("loom.platform.Timer"), Some(false));
        assert_eq!(registry.native_type("game.Player"), None);
    }

    #[test]
    fn signature_display() {
        let signature = NativeSignature::new(&["int", "char const*"], "bool");
        assert_eq!(signature.to_string(), "(int, char const*) -> bool");
        assert_eq!(NativeSignature::new(&[], "").to_string(), "() -> void");
    }
}
