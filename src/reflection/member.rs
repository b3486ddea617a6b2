//! Data shared by every reflected member.
//!
//! Types, methods, constructors, fields and properties all start with the same record:
//! a name, the dispatch ordinal assigned by the compiler, the source location and a list
//! of metadata annotations. This module holds that common part together with the
//! template (generic argument) tree and the [`Member`] handle stored in dispatch tables.

use crate::reflection::{
    field::FieldRc,
    method::{ConstructorRc, MethodRc},
    property::PropertyRc,
    types::{TypeRc, TypeRef},
};

/// One metadata annotation, e.g. `[Native(managed)]` or `[Bind(event="onTouch")]`.
///
/// A member may carry several annotations with the same tag; each is its own `MetaInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaInfo {
    /// Annotation tag
    pub name: String,
    /// Key/value pairs in declaration order
    pub keys: Vec<(String, String)>,
}

impl MetaInfo {
    /// Create an annotation without keys
    #[must_use]
    pub fn new(name: &str) -> Self {
        MetaInfo {
            name: name.to_string(),
            keys: Vec::new(),
        }
    }

    /// Value of the first entry with `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if an entry with `key` exists
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.keys.iter().any(|(k, _)| k == key)
    }
}

/// Name, ordinal, source location and annotations of a member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberInfo {
    /// Simple name
    pub name: String,
    /// Dispatch ordinal, as written by the compiler
    pub ordinal: u32,
    /// Source file the member was declared in
    pub source: String,
    /// Line of the declaration
    pub line: i32,
    /// All metadata annotations
    pub metadata: Vec<MetaInfo>,
}

impl MemberInfo {
    /// First annotation with tag `name`
    #[must_use]
    pub fn meta(&self, name: &str) -> Option<&MetaInfo> {
        self.metadata.iter().find(|m| m.name == name)
    }

    /// All annotations with tag `name`
    pub fn metas<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetaInfo> + 'a {
        self.metadata.iter().filter(move |m| m.name == name)
    }
}

/// A node of a template argument tree, e.g. `Dictionary.<String, Vector.<Number>>`.
#[derive(Debug, Clone)]
pub struct TemplateInfo {
    /// Qualified name of the type at this node
    pub type_name: String,
    /// The resolved type
    pub resolved: Option<TypeRef>,
    /// Template arguments of this node
    pub types: Vec<TemplateInfo>,
}

impl TemplateInfo {
    /// The resolved type, if it is still alive
    #[must_use]
    pub fn resolved_type(&self) -> Option<TypeRc> {
        self.resolved.as_ref().and_then(TypeRef::upgrade)
    }

    /// Returns true if this node has template arguments of its own
    #[must_use]
    pub fn is_template(&self) -> bool {
        !self.types.is_empty()
    }
}

/// Kind of a [`Member`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// A constructor
    Constructor,
    /// A field
    Field,
    /// A property
    Property,
    /// A method
    Method,
}

/// A handle to any member of a type, as stored in its dispatch table
#[derive(Debug, Clone)]
pub enum Member {
    /// A constructor
    Constructor(ConstructorRc),
    /// A field
    Field(FieldRc),
    /// A property
    Property(PropertyRc),
    /// A method
    Method(MethodRc),
}

impl Member {
    /// The common member data
    #[must_use]
    pub fn info(&self) -> &MemberInfo {
        match self {
            Member::Constructor(c) => &c.info,
            Member::Field(f) => &f.info,
            Member::Property(p) => &p.info,
            Member::Method(m) => &m.info,
        }
    }

    /// Simple name of the member
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Dispatch ordinal of the member
    #[must_use]
    pub fn ordinal(&self) -> u32 {
        self.info().ordinal
    }

    /// What kind of member this is
    #[must_use]
    pub fn kind(&self) -> MemberKind {
        match self {
            Member::Constructor(_) => MemberKind::Constructor,
            Member::Field(_) => MemberKind::Field,
            Member::Property(_) => MemberKind::Property,
            Member::Method(_) => MemberKind::Method,
        }
    }

    /// Returns true for static members
    #[must_use]
    pub fn is_static(&self) -> bool {
        match self {
            Member::Constructor(_) => false,
            Member::Field(f) => f.is_static(),
            Member::Property(p) => p.is_static(),
            Member::Method(m) => m.is_static(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_lookup() {
        let info = MemberInfo {
            name: "Sprite".to_string(),
            metadata: vec![
                MetaInfo {
                    name: "Native".to_string(),
                    keys: vec![("managed".to_string(), String::new())],
                },
                MetaInfo {
                    name: "Bind".to_string(),
                    keys: vec![("event".to_string(), "onTouch".to_string())],
                },
                MetaInfo::new("Bind"),
            ],
            ..MemberInfo::default()
        };

        let native = info.meta("Native").unwrap();
        assert!(native.has_key("managed"));
        assert_eq!(native.get("managed"), Some(""));
        assert_eq!(info.meta("Bind").unwrap().get("event"), Some("onTouch"));
        assert_eq!(info.metas("Bind").count(), 2);
        assert!(info.meta("Inject").is_none());
    }
}
