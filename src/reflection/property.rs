//! Reflected properties.
//!
//! A property is a named pair of optional accessor methods. The accessors are full
//! [`MethodInfo`] records carrying their own ordinals; they are reachable through the
//! property but do not occupy slots in the declaring type's dispatch table.

use std::sync::Arc;

use bitflags::bitflags;

use crate::{
    binary::format::Keyword,
    reflection::{
        member::MemberInfo,
        method::MethodRc,
        types::{TypeRc, TypeRef},
    },
};

/// Reference counted `PropertyInfo`
pub type PropertyRc = Arc<PropertyInfo>;

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
    /// Attribute keywords of a property
    pub struct PropertyAttributes: u32 {
        /// Property belongs to the type, not an instance
        const STATIC = 0x0001;
        /// Visible everywhere
        const PUBLIC = 0x0002;
        /// Visible to the declaring type only
        const PRIVATE = 0x0004;
        /// Visible to the declaring type and subclasses
        const PROTECTED = 0x0008;
        /// Accessors are implemented by the host
        const NATIVE = 0x0010;
    }
}

impl PropertyAttributes {
    /// Flag for a wire keyword; keywords that do not apply to properties yield `None`
    #[must_use]
    pub fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Static => Some(Self::STATIC),
            Keyword::Public => Some(Self::PUBLIC),
            Keyword::Private => Some(Self::PRIVATE),
            Keyword::Protected => Some(Self::PROTECTED),
            Keyword::Native => Some(Self::NATIVE),
            _ => None,
        }
    }
}

/// A reflected property
#[derive(Debug)]
pub struct PropertyInfo {
    /// Name, ordinal, source location and annotations
    pub info: MemberInfo,
    /// Attribute keywords
    pub attributes: PropertyAttributes,
    /// Declared type, if any
    pub property_type: Option<TypeRef>,
    /// Getter accessor
    pub getter: Option<MethodRc>,
    /// Setter accessor
    pub setter: Option<MethodRc>,
    /// The declaring type
    pub declaring_type: TypeRef,
}

impl PropertyInfo {
    /// Simple name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// The declared type, if it has one and it is still alive
    #[must_use]
    pub fn property_type(&self) -> Option<TypeRc> {
        self.property_type.as_ref().and_then(TypeRef::upgrade)
    }

    /// Returns true for static properties
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.attributes.contains(PropertyAttributes::STATIC)
    }

    /// Returns true if the property has no setter
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.getter.is_some() && self.setter.is_none()
    }
}
