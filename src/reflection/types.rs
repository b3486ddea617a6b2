//! Reflected types.
//!
//! A [`Type`] is created as an empty shell as soon as its name is known from the type
//! index of an executable, before any record that mentions it is read. The shell has a
//! stable identity from that point on, so every reference to the name, forward or
//! circular, resolves to the same `Arc`. The body is filled in later through shared
//! references: scalar data lives in [`OnceLock`]s and member lists in append-only
//! `boxcar::Vec`s.
//!
//! Links between types (base, interfaces, member types) are non-owning [`TypeRef`]s;
//! a type is owned by its [`crate::reflection::Module`], or by the [`crate::Vm`] for
//! types the host registers directly.

use std::{
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use bitflags::bitflags;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    binary::format::{Keyword, PACKAGE_SEPARATOR},
    reflection::{
        bytecode::ByteCode,
        field::FieldRc,
        member::{Member, MemberInfo},
        method::{ConstructorRc, MethodRc},
        module::{ModuleRc, ModuleRef},
        property::PropertyRc,
    },
    Error, Result,
};

/// Reference counted `Type`
pub type TypeRc = Arc<Type>;

/// Qualified names of the types the runtime treats as primitives
pub const PRIMITIVE_TYPES: [&str; 5] = [
    "system.String",
    "system.Number",
    "system.Boolean",
    "system.Null",
    "system.Function",
];

const MAX_HIERARCHY_DEPTH: usize = 256;

/// A non-owning link to a [`Type`]
#[derive(Clone)]
pub struct TypeRef {
    weak_ref: Weak<Type>,
}

impl TypeRef {
    /// Create a new `TypeRef` from a strong reference
    #[must_use]
    pub fn new(strong_ref: &TypeRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the type, returning None if the type has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<TypeRc> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced type is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }

    /// Get the qualified name of the referenced type (if still alive)
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        self.upgrade().map(|t| t.full_name.clone())
    }
}

impl From<&TypeRc> for TypeRef {
    fn from(strong_ref: &TypeRc) -> Self {
        Self::new(strong_ref)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(ty) => write!(f, "TypeRef({})", ty.full_name),
            None => write!(f, "TypeRef(<dropped>)"),
        }
    }
}

/// The declaration kind of a type, as written on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TypeKind {
    /// A class
    Class,
    /// An interface
    Interface,
    /// A value type
    Struct,
    /// A delegate (function) type
    Delegate,
    /// An enumeration
    Enum,
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
    /// Class-level attributes of a type
    pub struct TypeAttributes: u32 {
        /// Visible everywhere
        const PUBLIC = 0x0001;
        /// Static class
        const STATIC = 0x0002;
        /// Can not be subclassed
        const FINAL = 0x0004;
        /// Backed by a host type (`[Native]` annotation)
        const NATIVE = 0x0010;
        /// Native type that script code may subclass (`[Native(managed)]`)
        const NATIVE_MANAGED = 0x0020;
    }
}

impl TypeAttributes {
    /// Flag for a wire keyword; keywords that do not apply to classes yield `None`
    #[must_use]
    pub fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Public => Some(Self::PUBLIC),
            Keyword::Static => Some(Self::STATIC),
            Keyword::Final => Some(Self::FINAL),
            _ => None,
        }
    }
}

/// Header data of a type, available once its record was read
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    /// Declaration kind
    pub kind: TypeKind,
    /// Compiler-assigned id, unique within the declaring assembly
    pub type_id: i32,
    /// Name, ordinal, source location and annotations
    pub info: MemberInfo,
    /// Class-level attributes
    pub flags: TypeAttributes,
}

/// A reflected type
pub struct Type {
    /// Qualified name, `package.Name`
    pub full_name: String,
    definition: OnceLock<TypeDefinition>,
    base: OnceLock<TypeRef>,
    /// Implemented interfaces
    pub interfaces: boxcar::Vec<TypeRef>,
    /// Parameter types of a delegate
    pub delegate_types: boxcar::Vec<TypeRef>,
    delegate_return_type: OnceLock<TypeRef>,
    /// Types imported by the declaring source file
    pub imports: boxcar::Vec<TypeRef>,
    constructor: OnceLock<ConstructorRc>,
    /// Declared fields
    pub fields: boxcar::Vec<FieldRc>,
    /// Declared properties
    pub properties: boxcar::Vec<PropertyRc>,
    /// Declared methods
    pub methods: boxcar::Vec<MethodRc>,
    static_initializer: OnceLock<ByteCode>,
    instance_initializer: OnceLock<ByteCode>,
    module: OnceLock<ModuleRef>,
    dispatch: OnceLock<Vec<Option<Member>>>,
}

impl Type {
    /// Create an empty shell for `full_name`
    #[must_use]
    pub fn new(full_name: &str) -> Self {
        Type {
            full_name: full_name.to_string(),
            definition: OnceLock::new(),
            base: OnceLock::new(),
            interfaces: boxcar::Vec::new(),
            delegate_types: boxcar::Vec::new(),
            delegate_return_type: OnceLock::new(),
            imports: boxcar::Vec::new(),
            constructor: OnceLock::new(),
            fields: boxcar::Vec::new(),
            properties: boxcar::Vec::new(),
            methods: boxcar::Vec::new(),
            static_initializer: OnceLock::new(),
            instance_initializer: OnceLock::new(),
            module: OnceLock::new(),
            dispatch: OnceLock::new(),
        }
    }

    /// Create a defined, member-less type for the host to register with a [`crate::Vm`].
    #[must_use]
    pub fn builtin(full_name: &str, kind: TypeKind) -> TypeRc {
        let ty = Type::new(full_name);
        let definition = TypeDefinition {
            kind,
            type_id: 0,
            info: MemberInfo {
                name: ty.name().to_string(),
                ..MemberInfo::default()
            },
            flags: TypeAttributes::PUBLIC,
        };
        ty.definition.set(definition).ok();
        ty.dispatch.set(Vec::new()).ok();
        Arc::new(ty)
    }

    /// Simple name, the part after the last package separator
    #[must_use]
    pub fn name(&self) -> &str {
        match self.full_name.rfind(PACKAGE_SEPARATOR) {
            Some(pos) => &self.full_name[pos + 1..],
            None => &self.full_name,
        }
    }

    /// Package name, empty for the root package
    #[must_use]
    pub fn package(&self) -> &str {
        match self.full_name.rfind(PACKAGE_SEPARATOR) {
            Some(pos) => &self.full_name[..pos],
            None => "",
        }
    }

    /// Header data, once the type record was read
    #[must_use]
    pub fn definition(&self) -> Option<&TypeDefinition> {
        self.definition.get()
    }

    /// Returns true once the type record was read
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.definition.get().is_some()
    }

    /// Declaration kind
    #[must_use]
    pub fn kind(&self) -> Option<TypeKind> {
        self.definition.get().map(|d| d.kind)
    }

    /// Compiler-assigned type id
    #[must_use]
    pub fn type_id(&self) -> Option<i32> {
        self.definition.get().map(|d| d.type_id)
    }

    /// Class-level attributes, empty for undefined shells
    #[must_use]
    pub fn flags(&self) -> TypeAttributes {
        self.definition
            .get()
            .map(|d| d.flags)
            .unwrap_or_default()
    }

    /// Member record of the type itself
    #[must_use]
    pub fn info(&self) -> Option<&MemberInfo> {
        self.definition.get().map(|d| &d.info)
    }

    pub(crate) fn define(&self, definition: TypeDefinition) -> Result<()> {
        self.definition
            .set(definition)
            .map_err(|_| malformed_error!("Type {} is defined more than once", self.full_name))
    }

    /// The base type, if any
    #[must_use]
    pub fn base(&self) -> Option<TypeRc> {
        self.base.get().and_then(TypeRef::upgrade)
    }

    pub(crate) fn set_base(&self, base: &TypeRc) {
        self.base.set(TypeRef::new(base)).ok();
    }

    /// Return type of a delegate
    #[must_use]
    pub fn delegate_return_type(&self) -> Option<TypeRc> {
        self.delegate_return_type.get().and_then(TypeRef::upgrade)
    }

    pub(crate) fn set_delegate_return_type(&self, ty: &TypeRc) {
        self.delegate_return_type.set(TypeRef::new(ty)).ok();
    }

    /// The constructor, if the type declares one
    #[must_use]
    pub fn constructor(&self) -> Option<&ConstructorRc> {
        self.constructor.get()
    }

    pub(crate) fn set_constructor(&self, constructor: ConstructorRc) {
        self.constructor.set(constructor).ok();
    }

    /// Bytecode initializing static fields
    #[must_use]
    pub fn static_initializer(&self) -> Option<&ByteCode> {
        self.static_initializer.get()
    }

    /// Bytecode initializing instance fields
    #[must_use]
    pub fn instance_initializer(&self) -> Option<&ByteCode> {
        self.instance_initializer.get()
    }

    pub(crate) fn set_initializers(&self, static_init: ByteCode, instance_init: ByteCode) {
        self.static_initializer.set(static_init).ok();
        self.instance_initializer.set(instance_init).ok();
    }

    /// The declaring module, for types loaded from an executable
    #[must_use]
    pub fn module(&self) -> Option<ModuleRc> {
        self.module.get().and_then(ModuleRef::upgrade)
    }

    pub(crate) fn set_module(&self, module: &ModuleRc) {
        self.module.set(ModuleRef::new(module)).ok();
    }

    /// Returns true for the types the runtime handles as primitives
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        PRIMITIVE_TYPES.contains(&self.full_name.as_str())
    }

    /// Returns true for `[Native]` types
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.flags().contains(TypeAttributes::NATIVE)
    }

    /// Returns true for `[Native(managed)]` types
    #[must_use]
    pub fn is_native_managed(&self) -> bool {
        self.flags().contains(TypeAttributes::NATIVE_MANAGED)
    }

    /// Returns true for interfaces
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind() == Some(TypeKind::Interface)
    }

    /// Returns true for delegates
    #[must_use]
    pub fn is_delegate(&self) -> bool {
        self.kind() == Some(TypeKind::Delegate)
    }

    /// All members in dispatch-table insertion order: constructor, fields, properties, methods
    #[must_use]
    pub fn members(&self) -> Vec<Member> {
        let mut members = Vec::with_capacity(
            self.fields.count() + self.properties.count() + self.methods.count() + 1,
        );
        if let Some(constructor) = self.constructor.get() {
            members.push(Member::Constructor(constructor.clone()));
        }
        members.extend(self.fields.iter().map(|(_, f)| Member::Field(f.clone())));
        members.extend(self.properties.iter().map(|(_, p)| Member::Property(p.clone())));
        members.extend(self.methods.iter().map(|(_, m)| Member::Method(m.clone())));
        members
    }

    /// First member named `name`, searching fields, properties, methods and the constructor
    #[must_use]
    pub fn find_member(&self, name: &str) -> Option<Member> {
        self.members().into_iter().find(|m| m.name() == name)
    }

    /// Method named `name`
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<MethodRc> {
        self.methods
            .iter()
            .find(|(_, m)| m.name() == name)
            .map(|(_, m)| m.clone())
    }

    /// Field named `name`
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<FieldRc> {
        self.fields
            .iter()
            .find(|(_, f)| f.name() == name)
            .map(|(_, f)| f.clone())
    }

    /// Property named `name`
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<PropertyRc> {
        self.properties
            .iter()
            .find(|(_, p)| p.name() == name)
            .map(|(_, p)| p.clone())
    }

    /// Member occupying dispatch slot `ordinal`
    #[must_use]
    pub fn member_by_ordinal(&self, ordinal: u32) -> Option<Member> {
        self.dispatch
            .get()?
            .get(ordinal as usize)
            .and_then(Clone::clone)
    }

    /// The ordinal-indexed dispatch table, once built
    #[must_use]
    pub fn dispatch_table(&self) -> Option<&[Option<Member>]> {
        self.dispatch.get().map(Vec::as_slice)
    }

    /// Build the dense dispatch table from the member ordinals.
    ///
    /// # Errors
    /// Returns [`Error::OrdinalCollision`] if two members claim the same slot.
    pub(crate) fn build_dispatch_table(&self) -> Result<()> {
        let members = self.members();
        let size = members
            .iter()
            .map(|m| m.ordinal() as usize + 1)
            .max()
            .unwrap_or(0);

        let mut table: Vec<Option<Member>> = vec![None; size];
        for member in members {
            let slot = &mut table[member.ordinal() as usize];
            if let Some(existing) = slot {
                return Err(Error::OrdinalCollision {
                    type_name: self.full_name.clone(),
                    ordinal: member.ordinal(),
                    existing: existing.name().to_string(),
                    incoming: member.name().to_string(),
                });
            }
            *slot = Some(member);
        }

        self.dispatch
            .set(table)
            .map_err(|_| malformed_error!("Dispatch table of {} built twice", self.full_name))
    }

    /// Returns true if `name` appears in the base chain of this type
    #[must_use]
    pub fn is_subclass_of(&self, name: &str) -> bool {
        let mut next = self.base();
        let mut depth = 0;
        while let Some(ty) = next {
            if ty.full_name == name {
                return true;
            }
            depth += 1;
            if depth > MAX_HIERARCHY_DEPTH {
                return false;
            }
            next = ty.base();
        }
        false
    }

    /// Returns true if this type is `name`, derives from it, or implements it.
    #[must_use]
    pub fn is_assignable_to(&self, name: &str) -> bool {
        if self.full_name == name || self.implements(name) {
            return true;
        }

        let mut next = self.base();
        let mut depth = 0;
        while let Some(ty) = next {
            if ty.full_name == name || ty.implements(name) {
                return true;
            }
            depth += 1;
            if depth > MAX_HIERARCHY_DEPTH {
                return false;
            }
            next = ty.base();
        }
        false
    }

    fn implements(&self, name: &str) -> bool {
        self.interfaces
            .iter()
            .any(|(_, i)| i.upgrade().is_some_and(|i| i.full_name == name))
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("full_name", &self.full_name)
            .field("kind", &self.kind())
            .field("type_id", &self.type_id())
            .field("fields", &self.fields.count())
            .field("properties", &self.properties.count())
            .field("methods", &self.methods.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn names() {
        let ty = Type::new("loom.gameframework.LoomGroup");
        assert_eq!(ty.name(), "LoomGroup");
        assert_eq!(ty.package(), "loom.gameframework");
        assert!(!ty.is_defined());

        let root = Type::new("Main");
        assert_eq!(root.name(), "Main");
        assert_eq!(root.package(), "");
    }

    #[test]
    fn kinds() {
        assert_eq!(TypeKind::from_str("DELEGATE").unwrap(), TypeKind::Delegate);
        assert_eq!(TypeKind::Struct.to_string(), "STRUCT");
        assert!(TypeKind::from_str("class").is_err());
    }

    #[test]
    fn builtin() {
        let number = Type::builtin("system.Number", TypeKind::Class);
        assert!(number.is_defined());
        assert!(number.is_primitive());
        assert_eq!(number.info().unwrap().name, "Number");
        assert!(number.dispatch_table().unwrap().is_empty());

        let object = Type::builtin("system.Object", TypeKind::Class);
        assert!(!object.is_primitive());
    }

    #[test]
    fn define_twice() {
        let ty = Type::new("game.Player");
        let definition = TypeDefinition {
            kind: TypeKind::Class,
            type_id: 1,
            info: MemberInfo::default(),
            flags: TypeAttributes::PUBLIC,
        };
        assert!(ty.define(definition.clone()).is_ok());
        assert!(matches!(ty.define(definition), Err(Error::Malformed { .. })));
        assert_eq!(ty.type_id(), Some(1));
    }

    #[test]
    fn hierarchy() {
        let root = Type::builtin("system.Object", TypeKind::Class);
        let iface = Type::builtin("game.IUpdatable", TypeKind::Interface);
        let base = Arc::new(Type::new("game.Entity"));
        base.set_base(&root);
        base.interfaces.push(TypeRef::new(&iface));
        let derived = Arc::new(Type::new("game.Player"));
        derived.set_base(&base);

        assert!(derived.is_assignable_to("game.Player"));
        assert!(derived.is_assignable_to("game.Entity"));
        assert!(derived.is_assignable_to("system.Object"));
        assert!(derived.is_assignable_to("game.IUpdatable"));
        assert!(!derived.is_assignable_to("game.Enemy"));
        assert!(!root.is_assignable_to("game.Entity"));
        assert!(derived.is_subclass_of("system.Object"));
        assert!(!derived.is_subclass_of("game.Player"));
        assert!(!derived.is_subclass_of("game.IUpdatable"));
    }

    #[test]
    fn dropped_reference() {
        let weak = {
            let ty = Arc::new(Type::new("game.Temp"));
            TypeRef::new(&ty)
        };
        assert!(!weak.is_valid());
        assert!(weak.full_name().is_none());
    }
}
