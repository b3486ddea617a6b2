//! Damaged and incompatible executables must fail cleanly and leave the VM untouched.

use loomscope::{
    binary::{AssemblyDef, ExecutableWriter, FieldDef, MethodDef, ModuleDef, TypeDef},
    config::{BytecodeMode, LoaderConfig},
    file::container,
    Error, Result, Vm,
};

fn vm_with(config: LoaderConfig) -> Vm {
    let vm = Vm::with_config(config);
    vm.register_core_types();
    vm
}

fn vm() -> Vm {
    vm_with(LoaderConfig::default())
}

fn game() -> AssemblyDef {
    AssemblyDef::new("Game", "1.0").with_module(
        ModuleDef::new("Game", "1.0")
            .with_type(
                TypeDef::class("game", "Player")
                    .with_base("system.Object")
                    .with_field(FieldDef::new("hp", 0, "system.Number"))
                    .with_method(MethodDef::new("tick", 1).with_bytecode(&[1, 2, 3])),
            )
            .with_type(TypeDef::class("game", "Level")),
    )
}

fn write(assemblies: Vec<AssemblyDef>) -> Vec<u8> {
    let mut writer = ExecutableWriter::new();
    for assembly in assemblies {
        writer.add_assembly(assembly);
    }
    writer.write().unwrap()
}

fn i32_at(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn set_i32(data: &mut [u8], offset: usize, value: i32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Offsets of the type index and of the first reference entry
fn preamble(data: &[u8]) -> (usize, usize) {
    let pool = 8 + i32_at(data, 4) as usize;
    let types = i32_at(data, pool) as usize;
    (pool, pool + 4 + types * 16)
}

/// Absolute position of the entry assembly record
fn entry_position(data: &[u8]) -> usize {
    let (_, references) = preamble(data);
    i32_at(data, references + 4 + 8) as usize
}

#[test]
fn every_truncation_fails() {
    let data = write(vec![game()]);
    let vm = vm();
    for len in 0..data.len() {
        assert!(vm.load_executable(&data[..len]).is_err(), "prefix {len}");
    }
    assert!(vm.assemblies().is_empty());
    assert!(vm.load_executable(&data).is_ok());
}

#[test]
fn string_index_out_of_range() {
    let mut data = write(vec![game()]);
    let (types, _) = preamble(&data);
    set_i32(&mut data, types + 4 + 4, 9_999);

    assert!(matches!(
        vm().load_executable(&data),
        Err(Error::StringIndexOutOfRange { index: 9_999, .. })
    ));
}

#[test]
fn type_position_verified() -> Result<()> {
    let mut data = write(vec![game()]);
    let (types, _) = preamble(&data);
    let position = i32_at(&data, types + 4 + 8);
    set_i32(&mut data, types + 4 + 8, position + 1);

    assert!(matches!(
        vm().load_executable(&data),
        Err(Error::Malformed { .. })
    ));
    vm_with(LoaderConfig::production()).load_executable(&data)?;
    Ok(())
}

#[test]
fn invalid_boolean() -> Result<()> {
    let mut data = write(vec![game()]);
    let executable_flag = entry_position(&data) + 16;
    assert_eq!(data[executable_flag], 1);
    data[executable_flag] = 7;

    assert!(matches!(
        vm().load_executable(&data),
        Err(Error::Malformed { .. })
    ));
    let game = vm_with(LoaderConfig::production()).load_executable(&data)?;
    assert!(game.is_executable());
    Ok(())
}

#[test]
fn bytecode_mode_mismatch() -> Result<()> {
    let jit = AssemblyDef {
        jit: true,
        ..game()
    };
    let data = write(vec![jit]);

    assert!(matches!(
        vm().load_executable(&data),
        Err(Error::BytecodeModeMismatch { assembly, .. }) if assembly == "Game"
    ));

    let host = vm_with(LoaderConfig::default().with_bytecode_mode(BytecodeMode::Jit));
    assert!(host.load_executable(&data)?.is_jit());
    Ok(())
}

#[test]
fn bytecode_mode_mismatch_in_dependency() {
    let main = AssemblyDef::new("Main", "1.0").with_reference("Game");
    let dependency = AssemblyDef {
        jit: true,
        ..game()
    };
    let vm = vm();

    assert!(matches!(
        vm.load_executable(&write(vec![main, dependency])),
        Err(Error::BytecodeModeMismatch { assembly, .. }) if assembly == "Game"
    ));
    assert!(vm.assembly("Main").is_none());
}

#[test]
fn type_id_out_of_range() {
    let mut level = TypeDef::class("game", "Level");
    level.type_id = 5;
    let data = write(vec![AssemblyDef::new("Game", "1.0")
        .with_module(ModuleDef::new("Game", "1.0").with_type(level))]);

    assert!(matches!(
        vm().load_executable(&data),
        Err(Error::TypeIdOutOfRange { type_id: 5, count: 1, .. })
    ));
}

#[test]
fn invalid_configuration() {
    let data = write(vec![game().with_config("{ not json")]);
    assert!(matches!(vm().load_executable(&data), Err(Error::Config(_))));
}

#[test]
fn negative_counts() {
    let mut data = write(vec![game()]);
    let (types, _) = preamble(&data);
    set_i32(&mut data, types, -1);
    assert!(vm().load_executable(&data).is_err());
}

#[test]
fn damaged_container() -> Result<()> {
    let mut writer = ExecutableWriter::new();
    writer.add_assembly(game());
    let packed = writer.write_container()?;
    let dir = tempfile::tempdir()?;

    let mut wrong_version = packed.clone();
    wrong_version[4] = 9;
    let path = dir.path().join("version.loom");
    std::fs::write(&path, &wrong_version)?;
    assert!(matches!(
        vm().load_executable_file(&path),
        Err(Error::NotSupported)
    ));

    let truncated = &packed[..packed.len() / 2];
    assert!(matches!(
        container::unpack(truncated),
        Err(Error::Decompress(_) | Error::Malformed { .. })
    ));

    let missing = dir.path().join("missing.loom");
    assert!(matches!(
        vm().load_executable_file(&missing),
        Err(Error::FileError(_))
    ));
    Ok(())
}
