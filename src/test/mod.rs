//! Small executables built with the writer, shared by the unit tests.

use crate::{
    binary::{
        AssemblyDef, ExecutableWriter, FieldDef, MethodDef, ModuleDef, ParameterDef, TypeDef,
    },
    reflection::TypeKind,
    runtime::Vm,
};

/// A VM with the core system types registered
pub fn vm() -> Vm {
    let vm = Vm::new();
    vm.register_core_types();
    vm
}

/// Serialize `assemblies`; the first one is the entry assembly
pub fn write(assemblies: &[AssemblyDef]) -> Vec<u8> {
    let mut writer = ExecutableWriter::new();
    for assembly in assemblies {
        writer.add_assembly(assembly.clone());
    }
    writer.write().unwrap()
}

/// An assembly with a single module holding `types`
pub fn assembly(name: &str, references: &[&str], types: Vec<TypeDef>) -> AssemblyDef {
    let module = types
        .into_iter()
        .fold(ModuleDef::new(name, "1.0"), ModuleDef::with_type);
    references
        .iter()
        .fold(AssemblyDef::new(name, "1.0"), |a, r| a.with_reference(r))
        .with_module(module)
}

/// An empty class in package `game`
pub fn class(name: &str) -> TypeDef {
    TypeDef::class("game", name)
}

/// `game.IActor`, `game.Player` and `game.Entity`, with the subclass written before its base
pub fn game() -> AssemblyDef {
    let actor = TypeDef::new(TypeKind::Interface, "game", "IActor");
    let mut player = class("Player").with_base("game.Entity").with_method(
        MethodDef::new("main", 0)
            .with_attributes(&["static"])
            .with_bytecode(&[0x1b, 0x4c]),
    );
    player.interfaces.push("game.IActor".to_string());

    let entity = class("Entity")
        .with_base("system.Object")
        .with_field(FieldDef::new("name", 0, "system.String"))
        .with_method(
            MethodDef::new("update", 1)
                .with_parameter(ParameterDef::new("dt", "system.Number"))
                .with_parameter(ParameterDef::new("scale", "system.Number").with_default())
                .returning("system.Boolean")
                .with_bytecode(&[1, 2, 3, 4]),
        );

    assembly("Game", &[], vec![actor, player, entity])
}
