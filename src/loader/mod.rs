//! Reading executables into the reflection model.
//!
//! An executable is one blob holding a shared preamble and one record per embedded
//! assembly:
//!
//! ```text
//! [string pool][type index][reference table][assembly record]...
//! ```
//!
//! Loading runs in these steps, all against one [`LoaderContext`](context::LoaderContext)
//! that lives exactly as long as the load:
//!
//! 1. The preamble is read. Every indexed type gets an empty shell, so records can name
//!    any type of the closure regardless of order.
//! 2. The entry assembly's header is read (`ExecutableHeader`). The caller may stop here
//!    and inspect the embedded configuration.
//! 3. References are loaded depth-first from an explicit work-list, each at most once.
//!    An assembly's modules are read after all its references are resolved, then the
//!    assembly is finalized: dispatch tables, type ids, native type checks.
//! 4. On success, all new assemblies and their types are published to the [`Vm`].
//!    On failure the session is dropped and the VM is left untouched.
//!
//! # Modules
//! - `session`, `reference`, `typeindex`: the preamble tables
//! - `context`: the cursor plus tables shared by all readers
//! - `member`, `method`, `field`, `property`, `typedef`, `module`: record readers
//! - `assembly`: assembly headers and the reference work-list
//! - `finalize`: per-assembly checks after all records are read
//! - `header`: the type-state of a split load

mod assembly;
mod context;
mod field;
mod finalize;
mod header;
mod member;
mod method;
mod module;
mod property;
mod reference;
mod session;
mod typedef;
mod typeindex;

pub use header::ExecutableHeader;

use crate::{reflection::AssemblyRc, runtime::Vm, Result};

/// Read the preamble and entry assembly header of `data`.
pub(crate) fn load_executable_header<'a>(vm: &Vm, data: &'a [u8]) -> Result<ExecutableHeader<'a>> {
    let ctx = context::LoaderContext::new(vm, data)?;
    ExecutableHeader::read(ctx)
}

/// Load all of `data` and return the entry assembly.
pub(crate) fn load_executable(vm: &Vm, data: &[u8]) -> Result<AssemblyRc> {
    load_executable_header(vm, data)?.load_body()
}

#[cfg(test)]
mod tests {
    use crate::{
        binary::{strings::StringPool, FieldDef, MethodDef, TypeDef},
        file::parser::Parser,
        test::{assembly, class, game, vm, write},
        Error,
    };

    #[test]
    fn forward_declared_base() {
        let vm = vm();
        let game = vm.load_executable(&write(&[game()])).unwrap();

        let player = game.get_type("game.Player").unwrap();
        let entity = player.base().unwrap();
        assert_eq!(entity.full_name, "game.Entity");
        assert!(entity.is_defined());
        assert!(player.is_subclass_of("system.Object"));
        assert!(player.is_assignable_to("game.IActor"));
        assert_eq!(player.type_id(), Some(2));
        assert_eq!(game.type_by_id(3).unwrap().full_name, "game.Entity");
    }

    #[test]
    fn forward_declared_field_type() {
        let vm = vm();
        let data = write(&[assembly(
            "Game",
            &[],
            vec![
                class("A").with_field(FieldDef::new("b", 0, "game.B")),
                class("B"),
            ],
        )]);
        let game = vm.load_executable(&data).unwrap();

        let field = game.get_type("game.A").unwrap().find_field("b").unwrap();
        let b = field.field_type().unwrap();
        assert!(std::sync::Arc::ptr_eq(&b, &game.get_type("game.B").unwrap()));
        assert!(b.is_defined());
    }

    #[test]
    fn header_then_body() {
        let vm = vm();
        let data = write(&[game().with_config(r#"{"app_id": "com.example.game"}"#)]);

        let header = vm.load_executable_header(&data).unwrap();
        assert_eq!(header.name(), "Game");
        assert_eq!(header.config().app_id(), Some("com.example.game"));
        assert!(vm.assembly("Game").is_none());

        let game = header.load_body().unwrap();
        assert!(game.is_executable());
        assert!(vm.assembly("Game").is_some());
        assert!(vm.get_type("game.Entity").is_some());
    }

    #[test]
    fn dropped_header_registers_nothing() {
        let vm = vm();
        let data = write(&[game()]);
        drop(vm.load_executable_header(&data).unwrap());

        assert!(vm.assemblies().is_empty());
        assert!(vm.get_type("game.Player").is_none());
    }

    #[test]
    fn unresolved_base() {
        let vm = vm();
        let data = write(&[assembly(
            "Game",
            &[],
            vec![class("Orphan").with_base("game.Missing")],
        )]);

        assert!(matches!(
            vm.load_executable(&data),
            Err(Error::UnresolvedType(name)) if name == "game.Missing"
        ));
        assert!(vm.assemblies().is_empty());
    }

    #[test]
    fn unresolved_import_is_skipped() {
        let vm = vm();
        let mut ty = class("Main");
        ty.imports = vec!["game.Gone".to_string(), "system.String".to_string()];
        let game = vm
            .load_executable(&write(&[assembly("Game", &[], vec![ty])]))
            .unwrap();

        let main = game.get_type("game.Main").unwrap();
        assert_eq!(main.imports.count(), 1);
    }

    #[test]
    fn unknown_reference() {
        let vm = vm();
        let data = write(&[assembly("Game", &["Physics"], vec![class("Main")])]);
        assert!(matches!(
            vm.load_executable(&data),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn ordinal_collision() {
        let vm = vm();
        let ty = class("Main")
            .with_method(MethodDef::new("a", 3))
            .with_method(MethodDef::new("b", 3));
        let data = write(&[assembly("Game", &[], vec![ty])]);

        assert!(matches!(
            vm.load_executable(&data),
            Err(Error::OrdinalCollision { ordinal: 3, .. })
        ));
    }

    #[test]
    fn ordinal_limit() {
        let vm = vm();
        let data = write(&[assembly(
            "Game",
            &[],
            vec![class("Main").with_method(MethodDef::new("far", 70_000))],
        )]);
        assert!(matches!(
            vm.load_executable(&data),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn empty_input() {
        assert!(matches!(vm().load_executable(&[]), Err(Error::Empty)));
    }

    #[test]
    fn typed_kinds() {
        let vm = vm();
        let data = write(&[assembly(
            "Game",
            &[],
            vec![TypeDef::new(crate::reflection::TypeKind::Struct, "", "Point")],
        )]);
        let pool = StringPool::read(&mut Parser::new(&data)).unwrap();
        assert!(pool.iter().any(|s| s == ".Point"));

        let game = vm.load_executable(&data).unwrap();
        assert!(game.get_type("Point").is_none());
        let point = game.get_type(".Point").unwrap();
        assert_eq!(point.kind(), Some(crate::reflection::TypeKind::Struct));
        assert_eq!(point.name(), "Point");
        assert_eq!(point.package(), "");
    }
}
