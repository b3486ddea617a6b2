//! Methods, constructors and their parameters.
//!
//! [`MethodBase`] holds everything methods and constructors share: the member record,
//! attribute flags, an optional template tree, the parameter list and the body. The body
//! is either decoded bytecode, a binding to a host-registered native function, or, for
//! instance methods of primitive types, an intrinsic the host runtime implements itself.
//!
//! [`MethodInfo`] adds the return type and the owning property for accessors;
//! [`ConstructorInfo`] adds the default-constructor flag. Both dereference to their
//! [`MethodBase`].

use std::{
    fmt,
    ops::Deref,
    sync::{Arc, OnceLock, Weak},
};

use bitflags::bitflags;

use crate::{
    binary::format::Keyword,
    reflection::{
        bytecode::ByteCode,
        member::{MemberInfo, TemplateInfo},
        property::PropertyInfo,
        types::{TypeRc, TypeRef},
    },
    runtime::NativeBinding,
};

/// Reference counted `MethodInfo`
pub type MethodRc = Arc<MethodInfo>;
/// Reference counted `ConstructorInfo`
pub type ConstructorRc = Arc<ConstructorInfo>;

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
    /// Attribute keywords of a method or constructor
    pub struct MethodAttributes: u32 {
        /// Method belongs to the type, not an instance
        const STATIC = 0x0001;
        /// Visible everywhere
        const PUBLIC = 0x0002;
        /// Visible to the declaring type only
        const PRIVATE = 0x0004;
        /// Visible to the declaring type and subclasses
        const PROTECTED = 0x0008;
        /// Implemented by the host
        const NATIVE = 0x0010;
        /// May be overridden
        const VIRTUAL = 0x0020;
        /// Body calls the base implementation
        const SUPERCALL = 0x0040;
        /// Operator overload
        const OPERATOR = 0x0080;
    }
}

impl MethodAttributes {
    /// Flag for a wire keyword; keywords that do not apply to methods yield `None`
    #[must_use]
    pub fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Static => Some(Self::STATIC),
            Keyword::Public => Some(Self::PUBLIC),
            Keyword::Private => Some(Self::PRIVATE),
            Keyword::Protected => Some(Self::PROTECTED),
            Keyword::Native => Some(Self::NATIVE),
            Keyword::Virtual => Some(Self::VIRTUAL),
            Keyword::Supercall => Some(Self::SUPERCALL),
            Keyword::Operator => Some(Self::OPERATOR),
            Keyword::Const | Keyword::Final => None,
        }
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
    /// Flags of a single parameter
    pub struct ParameterAttributes: u8 {
        /// Parameter has a default value
        const HAS_DEFAULT = 0x01;
        /// Parameter collects all remaining arguments
        const VAR_ARGS = 0x02;
    }
}

/// A formal parameter of a method or constructor
#[derive(Debug, Clone)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Zero-based position in the parameter list
    pub position: usize,
    /// Declared type, if any
    pub parameter_type: Option<TypeRef>,
    /// Default/vararg flags
    pub attributes: ParameterAttributes,
    /// Template arguments of the declared type
    pub template_types: Vec<TypeRef>,
}

impl ParameterInfo {
    /// The declared type, if it has one and it is still alive
    #[must_use]
    pub fn parameter_type(&self) -> Option<TypeRc> {
        self.parameter_type.as_ref().and_then(TypeRef::upgrade)
    }

    /// Returns true if the parameter has a default value
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.attributes.contains(ParameterAttributes::HAS_DEFAULT)
    }

    /// Returns true if the parameter collects remaining arguments
    #[must_use]
    pub fn is_var_args(&self) -> bool {
        self.attributes.contains(ParameterAttributes::VAR_ARGS)
    }
}

/// How a method is executed
#[derive(Clone)]
pub enum MethodBody {
    /// Compiled script bytecode
    ByteCode(ByteCode),
    /// A host function bound at load time
    Native(NativeBinding),
    /// A primitive instance method implemented by the host runtime directly
    Intrinsic,
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBody::ByteCode(code) => write!(f, "ByteCode({} bytes)", code.len()),
            MethodBody::Native(binding) => write!(f, "Native({:?})", binding.kind),
            MethodBody::Intrinsic => write!(f, "Intrinsic"),
        }
    }
}

/// State shared by methods and constructors
#[derive(Debug)]
pub struct MethodBase {
    /// Name, ordinal, source location and annotations
    pub info: MemberInfo,
    /// Attribute keywords
    pub attributes: MethodAttributes,
    /// Template tree of a templated method
    pub template: Option<TemplateInfo>,
    /// Formal parameters in declaration order
    pub parameters: Vec<ParameterInfo>,
    /// Index of the first parameter with a default value
    pub first_default_arg: Option<usize>,
    /// The executable body
    pub body: MethodBody,
    /// The declaring type
    pub declaring_type: TypeRef,
}

impl MethodBase {
    /// Simple name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Dispatch ordinal
    #[must_use]
    pub fn ordinal(&self) -> u32 {
        self.info.ordinal
    }

    /// Returns true for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.attributes.contains(MethodAttributes::STATIC)
    }

    /// Returns true for methods implemented by the host
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.attributes.contains(MethodAttributes::NATIVE)
    }

    /// Returns true for methods bound to a fast-call native entry
    #[must_use]
    pub fn is_fast_call(&self) -> bool {
        matches!(&self.body, MethodBody::Native(b) if b.kind == crate::runtime::NativeKind::FastCall)
    }

    /// The decoded bytecode, for script methods
    #[must_use]
    pub fn bytecode(&self) -> Option<&ByteCode> {
        match &self.body {
            MethodBody::ByteCode(code) => Some(code),
            _ => None,
        }
    }

    /// The declaring type, if it is still alive
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeRc> {
        self.declaring_type.upgrade()
    }

    /// Qualified name, `package.Type:member`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!(
            "{}:{}",
            self.declaring_type.full_name().unwrap_or_default(),
            self.info.name
        )
    }

    /// Minimum number of arguments a call must supply
    #[must_use]
    pub fn required_arguments(&self) -> usize {
        let positional = self
            .parameters
            .iter()
            .take_while(|p| !p.is_var_args())
            .count();
        self.first_default_arg.unwrap_or(positional).min(positional)
    }
}

/// A reflected method
#[derive(Debug)]
pub struct MethodInfo {
    /// Shared method state
    pub base: MethodBase,
    /// Declared return type, `None` for methods returning nothing
    pub return_type: Option<TypeRef>,
    /// Owning property, for getters and setters
    property: OnceLock<Weak<PropertyInfo>>,
}

impl MethodInfo {
    /// Create a method from its parts
    #[must_use]
    pub fn new(base: MethodBase, return_type: Option<TypeRef>) -> Self {
        MethodInfo {
            base,
            return_type,
            property: OnceLock::new(),
        }
    }

    /// The declared return type, if any and still alive
    #[must_use]
    pub fn return_type(&self) -> Option<TypeRc> {
        self.return_type.as_ref().and_then(TypeRef::upgrade)
    }

    /// The property this method is an accessor of
    #[must_use]
    pub fn property(&self) -> Option<Arc<PropertyInfo>> {
        self.property.get().and_then(Weak::upgrade)
    }

    pub(crate) fn set_property(&self, property: &Arc<PropertyInfo>) {
        self.property.set(Arc::downgrade(property)).ok();
    }
}

impl Deref for MethodInfo {
    type Target = MethodBase;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// A reflected constructor
#[derive(Debug)]
pub struct ConstructorInfo {
    /// Shared method state
    pub base: MethodBase,
    /// True if the compiler synthesized this constructor
    pub default_constructor: bool,
}

impl Deref for ConstructorInfo {
    type Target = MethodBase;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}
