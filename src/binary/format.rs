//! Constants and keyword vocabulary of the binary assembly format.

use strum::{Display, EnumString, IntoStaticStr};

/// Record kind written in front of every assembly record
pub const ASSEMBLY_KIND: &str = "ASSEMBLY";
/// Record kind written in front of every module record
pub const MODULE_KIND: &str = "MODULE";

/// Smallest wire size of one type index entry (four `i32`)
pub const TYPE_INDEX_ENTRY_SIZE: usize = 16;
/// Smallest wire size of one reference table entry (three `i32`)
pub const REFERENCE_ENTRY_SIZE: usize = 12;
/// Smallest wire size of a module record (three pool indices and a type count)
pub const MODULE_RECORD_MIN_SIZE: usize = 16;
/// Smallest wire size of a member info prefix (name, ordinal, source, line, meta count)
pub const MEMBER_INFO_MIN_SIZE: usize = 20;
/// Smallest wire size of a type record header (kind, package, name, id, source, line)
pub const TYPE_HEADER_SIZE: usize = 24;
/// Smallest wire size of a parameter record
pub const PARAMETER_MIN_SIZE: usize = 11;
/// Nesting limit of template trees
pub const MAX_TEMPLATE_DEPTH: usize = 64;

/// Separator between package and type name in a qualified name
pub const PACKAGE_SEPARATOR: char = '.';

/// Attribute keywords that may appear in class, method, field and property attribute lists.
///
/// Each record kind accepts a subset of these; keywords unknown to a record kind are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    /// `static`
    Static,
    /// `public`
    Public,
    /// `private`
    Private,
    /// `protected`
    Protected,
    /// `native`
    Native,
    /// `virtual`
    Virtual,
    /// `supercall`
    Supercall,
    /// `operator`
    Operator,
    /// `const`
    Const,
    /// `final`
    Final,
}

/// Build the qualified name of a type from its package and simple name.
///
/// The separator is always present, so a type in the root package is named `.Name`.
#[must_use]
pub fn qualified_name(package: &str, name: &str) -> String {
    format!("{package}{PACKAGE_SEPARATOR}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn keywords() {
        assert_eq!(Keyword::from_str("supercall").unwrap(), Keyword::Supercall);
        assert_eq!(Keyword::Const.to_string(), "const");
        assert!(Keyword::from_str("inline").is_err());
    }

    #[test]
    fn qualified() {
        assert_eq!(qualified_name("system", "Object"), "system.Object");
        assert_eq!(qualified_name("", "Main"), ".Main");
    }
}
