//! An owned description of an executable, the input of [`crate::binary::ExecutableWriter`].
//!
//! Names of types are qualified (`package.Name`) everywhere a record refers to a type. The
//! empty string means "no type", matching pool index `-1` on the wire.

use crate::{binary::format::qualified_name, reflection::TypeKind};

/// An annotation with all its instances
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaDef {
    /// Annotation tag
    pub name: String,
    /// One key/value list per instance of the tag
    pub instances: Vec<Vec<(String, String)>>,
}

impl MetaDef {
    /// Create a tag without instances
    #[must_use]
    pub fn new(name: &str) -> Self {
        MetaDef {
            name: name.to_string(),
            instances: Vec::new(),
        }
    }

    /// Add an instance with the given key/value pairs
    #[must_use]
    pub fn with_instance(mut self, keys: &[(&str, &str)]) -> Self {
        self.instances.push(
            keys.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        self
    }
}

/// The member info prefix shared by all records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDef {
    /// Simple name
    pub name: String,
    /// Dispatch ordinal
    pub ordinal: i32,
    /// Source file
    pub source: String,
    /// Source line
    pub line: i32,
    /// Annotations
    pub metadata: Vec<MetaDef>,
}

impl MemberDef {
    /// Create a member prefix
    #[must_use]
    pub fn new(name: &str, ordinal: i32) -> Self {
        MemberDef {
            name: name.to_string(),
            ordinal,
            ..MemberDef::default()
        }
    }
}

/// A template argument tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateDef {
    /// Qualified type name at this node
    pub type_name: String,
    /// Template arguments
    pub children: Vec<TemplateDef>,
}

impl TemplateDef {
    /// Create a leaf
    #[must_use]
    pub fn new(type_name: &str) -> Self {
        TemplateDef {
            type_name: type_name.to_string(),
            children: Vec::new(),
        }
    }

    /// Add a template argument
    #[must_use]
    pub fn with_child(mut self, child: TemplateDef) -> Self {
        self.children.push(child);
        self
    }
}

/// A method or constructor parameter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterDef {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub param_type: Option<String>,
    /// Has a default value
    pub has_default: bool,
    /// Collects remaining arguments
    pub var_args: bool,
    /// Template arguments of the declared type
    pub template_types: Vec<String>,
}

impl ParameterDef {
    /// Create a parameter of type `param_type`
    #[must_use]
    pub fn new(name: &str, param_type: &str) -> Self {
        ParameterDef {
            name: name.to_string(),
            param_type: (!param_type.is_empty()).then(|| param_type.to_string()),
            ..ParameterDef::default()
        }
    }

    /// Mark the parameter as having a default value
    #[must_use]
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Mark the parameter as collecting remaining arguments
    #[must_use]
    pub fn with_var_args(mut self) -> Self {
        self.var_args = true;
        self
    }
}

/// A method, or the method part of a constructor or accessor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodDef {
    /// Member prefix
    pub member: MemberDef,
    /// Attribute keywords
    pub attributes: Vec<String>,
    /// Template tree
    pub template: Option<TemplateDef>,
    /// Parameters
    pub parameters: Vec<ParameterDef>,
    /// Bytecode, empty for natives
    pub bytecode: Vec<u8>,
    /// Return type, ignored for constructors
    pub return_type: Option<String>,
}

impl MethodDef {
    /// Create a public method
    #[must_use]
    pub fn new(name: &str, ordinal: i32) -> Self {
        MethodDef {
            member: MemberDef::new(name, ordinal),
            attributes: vec!["public".to_string()],
            ..MethodDef::default()
        }
    }

    /// Add attribute keywords
    #[must_use]
    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes
            .extend(attributes.iter().map(ToString::to_string));
        self
    }

    /// Append a parameter
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterDef) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Set the return type
    #[must_use]
    pub fn returning(mut self, type_name: &str) -> Self {
        self.return_type = Some(type_name.to_string());
        self
    }

    /// Set the bytecode
    #[must_use]
    pub fn with_bytecode(mut self, bytecode: &[u8]) -> Self {
        self.bytecode = bytecode.to_vec();
        self
    }
}

/// A constructor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructorDef {
    /// The method part
    pub method: MethodDef,
    /// Synthesized by the compiler
    pub default_constructor: bool,
}

/// A field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDef {
    /// Member prefix
    pub member: MemberDef,
    /// Attribute keywords
    pub attributes: Vec<String>,
    /// Declared type
    pub field_type: Option<String>,
    /// Template tree
    pub template: Option<TemplateDef>,
}

impl FieldDef {
    /// Create a public field of type `field_type`
    #[must_use]
    pub fn new(name: &str, ordinal: i32, field_type: &str) -> Self {
        FieldDef {
            member: MemberDef::new(name, ordinal),
            attributes: vec!["public".to_string()],
            field_type: (!field_type.is_empty()).then(|| field_type.to_string()),
            template: None,
        }
    }
}

/// A property
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyDef {
    /// Member prefix
    pub member: MemberDef,
    /// Attribute keywords
    pub attributes: Vec<String>,
    /// Declared type
    pub property_type: Option<String>,
    /// Getter accessor
    pub getter: Option<MethodDef>,
    /// Setter accessor
    pub setter: Option<MethodDef>,
}

/// A type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    /// Declaration kind
    pub kind: TypeKind,
    /// Package, empty for the root package
    pub package: String,
    /// Simple name
    pub name: String,
    /// Type id within the assembly; 0 lets the writer number types in record order
    pub type_id: i32,
    /// Member prefix of the type itself
    pub member: MemberDef,
    /// Class attribute keywords
    pub attributes: Vec<String>,
    /// Base type
    pub base: String,
    /// Implemented interfaces
    pub interfaces: Vec<String>,
    /// Delegate parameter types
    pub delegate_types: Vec<String>,
    /// Delegate return type
    pub delegate_return_type: String,
    /// Imported types
    pub imports: Vec<String>,
    /// Constructor
    pub constructor: Option<ConstructorDef>,
    /// Fields
    pub fields: Vec<FieldDef>,
    /// Properties
    pub properties: Vec<PropertyDef>,
    /// Methods
    pub methods: Vec<MethodDef>,
    /// Static field initializer bytecode
    pub static_initializer: Vec<u8>,
    /// Instance field initializer bytecode
    pub instance_initializer: Vec<u8>,
}

impl TypeDef {
    /// Create a public, member-less type
    #[must_use]
    pub fn new(kind: TypeKind, package: &str, name: &str) -> Self {
        TypeDef {
            kind,
            package: package.to_string(),
            name: name.to_string(),
            type_id: 0,
            member: MemberDef::new(name, 0),
            attributes: vec!["public".to_string()],
            base: String::new(),
            interfaces: Vec::new(),
            delegate_types: Vec::new(),
            delegate_return_type: String::new(),
            imports: Vec::new(),
            constructor: None,
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            static_initializer: Vec::new(),
            instance_initializer: Vec::new(),
        }
    }

    /// Create a public class
    #[must_use]
    pub fn class(package: &str, name: &str) -> Self {
        Self::new(TypeKind::Class, package, name)
    }

    /// Qualified name
    #[must_use]
    pub fn full_name(&self) -> String {
        qualified_name(&self.package, &self.name)
    }

    /// Set the base type
    #[must_use]
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = base.to_string();
        self
    }

    /// Add an annotation to the type
    #[must_use]
    pub fn with_meta(mut self, meta: MetaDef) -> Self {
        self.member.metadata.push(meta);
        self
    }

    /// Set the constructor
    #[must_use]
    pub fn with_constructor(mut self, method: MethodDef, default_constructor: bool) -> Self {
        self.constructor = Some(ConstructorDef {
            method,
            default_constructor,
        });
        self
    }

    /// Add a field
    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a property
    #[must_use]
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    /// Add a method
    #[must_use]
    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }
}

/// A module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDef {
    /// Module name
    pub name: String,
    /// Module version
    pub version: String,
    /// Types in record order
    pub types: Vec<TypeDef>,
}

impl ModuleDef {
    /// Create an empty module
    #[must_use]
    pub fn new(name: &str, version: &str) -> Self {
        ModuleDef {
            name: name.to_string(),
            version: version.to_string(),
            types: Vec::new(),
        }
    }

    /// Add a type
    #[must_use]
    pub fn with_type(mut self, ty: TypeDef) -> Self {
        self.types.push(ty);
        self
    }
}

/// An assembly
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyDef {
    /// Assembly name, unique within an executable
    pub name: String,
    /// Version string
    pub version: String,
    /// Embedded JSON configuration
    pub config: String,
    /// Entry assembly flag
    pub executable: bool,
    /// JIT bytecode flag
    pub jit: bool,
    /// Debug build flag
    pub debug_build: bool,
    /// Names of referenced assemblies
    pub references: Vec<String>,
    /// Modules
    pub modules: Vec<ModuleDef>,
}

impl AssemblyDef {
    /// Create an assembly without modules
    #[must_use]
    pub fn new(name: &str, version: &str) -> Self {
        AssemblyDef {
            name: name.to_string(),
            version: version.to_string(),
            ..AssemblyDef::default()
        }
    }

    /// Reference another assembly
    #[must_use]
    pub fn with_reference(mut self, name: &str) -> Self {
        self.references.push(name.to_string());
        self
    }

    /// Add a module
    #[must_use]
    pub fn with_module(mut self, module: ModuleDef) -> Self {
        self.modules.push(module);
        self
    }

    /// Set the embedded configuration
    #[must_use]
    pub fn with_config(mut self, config: &str) -> Self {
        self.config = config.to_string();
        self
    }

    /// All types of all modules in record order
    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.modules.iter().flat_map(|m| m.types.iter())
    }
}
