//! Reflected fields.

use std::sync::Arc;

use bitflags::bitflags;

use crate::{
    binary::format::Keyword,
    reflection::{
        member::{MemberInfo, TemplateInfo},
        types::{TypeRc, TypeRef},
    },
};

/// Reference counted `FieldInfo`
pub type FieldRc = Arc<FieldInfo>;

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
    /// Attribute keywords of a field
    pub struct FieldAttributes: u32 {
        /// Field belongs to the type, not an instance
        const STATIC = 0x0001;
        /// Visible everywhere
        const PUBLIC = 0x0002;
        /// Visible to the declaring type only
        const PRIVATE = 0x0004;
        /// Visible to the declaring type and subclasses
        const PROTECTED = 0x0008;
        /// Stored by the host
        const NATIVE = 0x0010;
        /// Compile-time constant
        const CONST = 0x0020;
    }
}

impl FieldAttributes {
    /// Flag for a wire keyword; keywords that do not apply to fields yield `None`
    #[must_use]
    pub fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Static => Some(Self::STATIC),
            Keyword::Public => Some(Self::PUBLIC),
            Keyword::Private => Some(Self::PRIVATE),
            Keyword::Protected => Some(Self::PROTECTED),
            Keyword::Native => Some(Self::NATIVE),
            Keyword::Const => Some(Self::CONST),
            _ => None,
        }
    }
}

/// A reflected field
#[derive(Debug)]
pub struct FieldInfo {
    /// Name, ordinal, source location and annotations
    pub info: MemberInfo,
    /// Attribute keywords
    pub attributes: FieldAttributes,
    /// Declared type, if any
    pub field_type: Option<TypeRef>,
    /// Template arguments of the declared type
    pub template: Option<TemplateInfo>,
    /// The declaring type
    pub declaring_type: TypeRef,
}

impl FieldInfo {
    /// Simple name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// The declared type, if it has one and it is still alive
    #[must_use]
    pub fn field_type(&self) -> Option<TypeRc> {
        self.field_type.as_ref().and_then(TypeRef::upgrade)
    }

    /// Returns true for static fields
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.attributes.contains(FieldAttributes::STATIC)
    }

    /// Returns true for constants
    #[must_use]
    pub fn is_const(&self) -> bool {
        self.attributes.contains(FieldAttributes::CONST)
    }
}
