//! Load-time comparison of script and native signatures.
//!
//! Native implementations describe themselves with C type names (`int`, `char const*`,
//! `bool`). Script declarations use qualified script types. The [`ConversionTable`] maps
//! native names onto the handful of script categories that convert implicitly; a position
//! is only compared when both sides fall into a known category, so object types pass
//! through unchecked.

use std::collections::HashMap;

use strum::Display;

use crate::{
    reflection::{MethodBase, TypeRef},
    runtime::NativeSignature,
    Error, Result,
};

/// Script types a native type name can convert to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ScriptCategory {
    /// `system.String`
    String,
    /// `system.Number`
    Number,
    /// `system.Boolean`
    Boolean,
    /// No value
    Void,
}

impl ScriptCategory {
    /// Category of a script type name; `None` for types without an implicit conversion
    #[must_use]
    pub fn of_script_type(type_name: &str) -> Option<Self> {
        match type_name {
            "system.String" => Some(ScriptCategory::String),
            "system.Number" => Some(ScriptCategory::Number),
            "system.Boolean" => Some(ScriptCategory::Boolean),
            "system.Void" => Some(ScriptCategory::Void),
            _ => None,
        }
    }
}

/// Mapping from native type names to script categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTable {
    entries: HashMap<String, ScriptCategory>,
}

impl Default for ConversionTable {
    fn default() -> Self {
        let mut table = ConversionTable::new();
        for name in [
            "char const*",
            "char*",
            "const char*",
            "utString",
            "std::string",
            "std::basic_string<char>",
        ] {
            table.insert(name, ScriptCategory::String);
        }
        for name in [
            "int",
            "unsigned int",
            "float",
            "double",
            "char",
            "signed char",
            "short",
            "unsigned short",
            "unsigned char",
            "long",
            "unsigned long",
        ] {
            table.insert(name, ScriptCategory::Number);
        }
        table.insert("bool", ScriptCategory::Boolean);
        table.insert("void", ScriptCategory::Void);
        table
    }
}

impl ConversionTable {
    /// Create a table without entries
    #[must_use]
    pub fn new() -> Self {
        ConversionTable {
            entries: HashMap::new(),
        }
    }

    /// Map `native_type` to `category`, replacing a previous mapping
    pub fn insert(&mut self, native_type: &str, category: ScriptCategory) {
        self.entries.insert(native_type.to_string(), category);
    }

    /// Category of a native type name
    #[must_use]
    pub fn category(&self, native_type: &str) -> Option<ScriptCategory> {
        self.entries.get(native_type.trim()).copied()
    }

    /// Number of mapped names
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is mapped
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct ScriptSignature {
    parameters: Vec<Option<String>>,
    var_args: bool,
    return_type: Option<String>,
}

impl ScriptSignature {
    fn of(method: &MethodBase, return_type: Option<&TypeRef>) -> Self {
        ScriptSignature {
            parameters: method
                .parameters
                .iter()
                .map(|p| p.parameter_type.as_ref().and_then(TypeRef::full_name))
                .collect(),
            var_args: method.parameters.last().is_some_and(|p| p.is_var_args()),
            return_type: return_type.and_then(TypeRef::full_name),
        }
    }

    fn render(&self) -> String {
        let last = self.parameters.len().saturating_sub(1);
        let parameters: Vec<String> = self
            .parameters
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let name = p.as_deref().unwrap_or("*");
                if self.var_args && i == last {
                    format!("...{name}")
                } else {
                    name.to_string()
                }
            })
            .collect();
        format!(
            "({}) -> {}",
            parameters.join(", "),
            self.return_type.as_deref().unwrap_or("system.Void")
        )
    }
}

/// Check a native signature against the script declaration of `method`.
///
/// Arity must match exactly, unless the last script parameter collects variable arguments;
/// then the native side may take any number of parameters from the fixed ones on. Types are
/// compared per position, and for the return value, whenever both sides are in a category
/// of `table`. A missing script return type counts as void, as does an empty native one.
///
/// # Errors
/// Returns [`Error::SignatureMismatch`] rendering both signatures.
pub fn validate_signature(
    method: &MethodBase,
    return_type: Option<&TypeRef>,
    native: &NativeSignature,
    table: &ConversionTable,
) -> Result<()> {
    let script = ScriptSignature::of(method, return_type);
    let mismatch = || Error::SignatureMismatch {
        member: method.qualified_name(),
        script: script.render(),
        native: native.to_string(),
    };

    let fixed = if script.var_args {
        script.parameters.len() - 1
    } else {
        script.parameters.len()
    };
    let arity_ok = if script.var_args {
        native.parameters.len() >= fixed
    } else {
        native.parameters.len() == fixed
    };
    if !arity_ok {
        return Err(mismatch());
    }

    for (script_type, native_type) in script.parameters[..fixed].iter().zip(&native.parameters) {
        let expected = script_type.as_deref().and_then(ScriptCategory::of_script_type);
        if let (Some(expected), Some(found)) = (expected, table.category(native_type)) {
            if expected != found {
                return Err(mismatch());
            }
        }
    }

    let expected = match script.return_type.as_deref() {
        None => Some(ScriptCategory::Void),
        Some(name) => ScriptCategory::of_script_type(name),
    };
    let found = if native.return_type.trim().is_empty() {
        Some(ScriptCategory::Void)
    } else {
        table.category(&native.return_type)
    };
    if let (Some(expected), Some(found)) = (expected, found) {
        if expected != found {
            return Err(mismatch());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{
        ByteCode, MemberInfo, MethodAttributes, MethodBody, ParameterAttributes, ParameterInfo,
        Type, TypeKind, TypeRc,
    };
    use std::sync::Arc;

    struct Fixture {
        owner: TypeRc,
        number: TypeRc,
        string: TypeRc,
        boolean: TypeRc,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                owner: Arc::new(Type::new("game.Native")),
                number: Type::builtin("system.Number", TypeKind::Class),
                string: Type::builtin("system.String", TypeKind::Class),
                boolean: Type::builtin("system.Boolean", TypeKind::Class),
            }
        }

        fn method(&self, parameters: &[(&TypeRc, bool)]) -> MethodBase {
            MethodBase {
                info: MemberInfo {
                    name: "call".to_string(),
                    ..MemberInfo::default()
                },
                attributes: MethodAttributes::NATIVE | MethodAttributes::STATIC,
                template: None,
                parameters: parameters
                    .iter()
                    .enumerate()
                    .map(|(position, (ty, var_args))| ParameterInfo {
                        name: format!("p{position}"),
                        position,
                        parameter_type: Some(TypeRef::new(ty)),
                        attributes: if *var_args {
                            ParameterAttributes::VAR_ARGS
                        } else {
                            ParameterAttributes::empty()
                        },
                        template_types: Vec::new(),
                    })
                    .collect(),
                first_default_arg: None,
                body: MethodBody::ByteCode(ByteCode::default()),
                declaring_type: TypeRef::new(&self.owner),
            }
        }
    }

    #[test]
    fn matching_signature() {
        let f = Fixture::new();
        let method = f.method(&[(&f.number, false), (&f.string, false)]);
        let native = NativeSignature::new(&["int", "char const*"], "bool");
        let ret = TypeRef::new(&f.boolean);

        assert!(validate_signature(&method, Some(&ret), &native, &ConversionTable::default()).is_ok());
    }

    #[test]
    fn arity_mismatch() {
        let f = Fixture::new();
        let method = f.method(&[(&f.number, false), (&f.string, false)]);
        let native = NativeSignature::new(&["int"], "void");

        let err = validate_signature(&method, None, &native, &ConversionTable::default())
            .unwrap_err();
        match err {
            Error::SignatureMismatch {
                member,
                script,
                native,
            } => {
                assert_eq!(member, "game.Native:call");
                assert_eq!(script, "(system.Number, system.String) -> system.Void");
                assert_eq!(native, "(int) -> void");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn type_mismatch() {
        let f = Fixture::new();
        let method = f.method(&[(&f.string, false)]);
        let native = NativeSignature::new(&["float"], "");

        assert!(matches!(
            validate_signature(&method, None, &native, &ConversionTable::default()),
            Err(Error::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn return_mismatch() {
        let f = Fixture::new();
        let method = f.method(&[]);
        let ret = TypeRef::new(&f.number);

        assert!(matches!(
            validate_signature(
                &method,
                Some(&ret),
                &NativeSignature::new(&[], "void"),
                &ConversionTable::default()
            ),
            Err(Error::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn var_args() {
        let f = Fixture::new();
        let method = f.method(&[(&f.string, false), (&f.number, true)]);
        let table = ConversionTable::default();

        for params in [
            &["char*"][..],
            &["char*", "int"][..],
            &["char*", "int", "int", "int"][..],
        ] {
            let native = NativeSignature::new(params, "");
            assert!(validate_signature(&method, None, &native, &table).is_ok());
        }
        let native = NativeSignature::new(&[], "");
        assert!(validate_signature(&method, None, &native, &table).is_err());
    }

    #[test]
    fn unknown_types_pass() {
        let f = Fixture::new();
        let sprite = Arc::new(Type::new("loom2d.display.Sprite"));
        let method = f.method(&[(&sprite, false)]);
        let native = NativeSignature::new(&["Sprite*"], "");

        assert!(validate_signature(&method, None, &native, &ConversionTable::default()).is_ok());
    }

    #[test]
    fn custom_table() {
        let f = Fixture::new();
        let method = f.method(&[(&f.number, false)]);
        let native = NativeSignature::new(&["int64_t"], "");

        let mut table = ConversionTable::new();
        assert!(table.is_empty());
        table.insert("int64_t", ScriptCategory::String);
        assert!(validate_signature(&method, None, &native, &table).is_err());
        table.insert("int64_t", ScriptCategory::Number);
        assert!(validate_signature(&method, None, &native, &table).is_ok());
    }
}
