//! Entry points, bootstrap types and invocation through an installed executor.

use std::sync::{Arc, Mutex};

use loomscope::{
    binary::{AssemblyDef, ExecutableWriter, MethodDef, ModuleDef, ParameterDef, TypeDef},
    reflection::MethodInfo,
    runtime::{Executor, Value},
    Error, Result, Vm,
};

/// Records every invoked method and returns the length of its bytecode
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Executor for Recorder {
    fn invoke(&self, _vm: &Vm, method: &MethodInfo, args: &[Value]) -> Result<Value> {
        self.calls
            .lock()
            .map_err(|_| Error::LockError)?
            .push(format!("{}/{}", method.qualified_name(), args.len()));
        let size = method.bytecode().map_or(0, |code| code.len());
        Ok(Value::from(size as f64))
    }
}

fn vm() -> (Vm, Arc<Recorder>) {
    let vm = Vm::new();
    vm.register_core_types();
    let recorder = Arc::new(Recorder::default());
    vm.set_executor(recorder.clone()).unwrap();
    (vm, recorder)
}

fn write(assemblies: Vec<AssemblyDef>) -> Vec<u8> {
    let mut writer = ExecutableWriter::new();
    for assembly in assemblies {
        writer.add_assembly(assembly);
    }
    writer.write().unwrap()
}

fn system() -> AssemblyDef {
    AssemblyDef::new("System", "1.0").with_module(
        ModuleDef::new("System", "1.0").with_type(TypeDef::class("system", "Bootstrap")),
    )
}

fn game(types: Vec<TypeDef>) -> AssemblyDef {
    let module = types
        .into_iter()
        .fold(ModuleDef::new("Game", "1.0"), ModuleDef::with_type);
    AssemblyDef::new("Game", "1.0")
        .with_reference("System")
        .with_module(module)
}

fn static_method(name: &str, ordinal: i32, bytecode: &[u8]) -> MethodDef {
    MethodDef::new(name, ordinal)
        .with_attributes(&["static"])
        .with_bytecode(bytecode)
}

#[test]
fn execute_runs_static_main() -> Result<()> {
    let (vm, recorder) = vm();
    let data = write(vec![
        game(vec![
            TypeDef::class("game", "Util").with_method(static_method("helper", 0, &[1])),
            TypeDef::class("game", "App").with_method(static_method("main", 0, &[1, 2, 3])),
        ]),
        system(),
    ]);

    let assembly = vm.load_executable(&data)?;
    assert_eq!(assembly.execute(&vm)?, Value::Number(3.0));
    assert_eq!(*recorder.calls.lock().unwrap(), vec!["game.App:main/0"]);
    Ok(())
}

#[test]
fn execute_without_main() -> Result<()> {
    let (vm, _) = vm();
    let data = write(vec![
        game(vec![
            TypeDef::class("game", "App").with_method(MethodDef::new("main", 0)),
        ]),
        system(),
    ]);

    // an instance `main` is not an entry point
    let assembly = vm.load_executable(&data)?;
    assert!(matches!(
        assembly.execute(&vm),
        Err(Error::MissingEntryPoint { method, .. }) if method == "main"
    ));
    Ok(())
}

#[test]
fn bootstrap_runs_every_initializer() -> Result<()> {
    let (vm, recorder) = vm();
    let data = write(vec![
        game(vec![
            TypeDef::class("game", "Audio")
                .with_base("system.Bootstrap")
                .with_method(static_method("initialize", 0, &[0])),
            TypeDef::class("game", "Plain").with_method(static_method("initialize", 0, &[0])),
            TypeDef::class("game", "Video")
                .with_base("game.Audio")
                .with_method(static_method("initialize", 0, &[0])),
        ]),
        system(),
    ]);

    let assembly = vm.load_executable(&data)?;
    assembly.bootstrap(&vm)?;
    assert_eq!(
        *recorder.calls.lock().unwrap(),
        vec!["game.Audio:initialize/0", "game.Video:initialize/0"]
    );
    Ok(())
}

#[test]
fn bootstrap_type_without_initializer() -> Result<()> {
    let (vm, _) = vm();
    let data = write(vec![
        game(vec![TypeDef::class("game", "Broken").with_base("system.Bootstrap")]),
        system(),
    ]);

    let assembly = vm.load_executable(&data)?;
    assert!(matches!(
        assembly.bootstrap(&vm),
        Err(Error::MissingEntryPoint { method, .. }) if method == "game.Broken:initialize"
    ));
    Ok(())
}

#[test]
fn invoke_checks_argument_count() -> Result<()> {
    let (vm, recorder) = vm();
    let data = write(vec![
        game(vec![TypeDef::class("game", "Math").with_method(
            static_method("clamp", 0, &[5])
                .with_parameter(ParameterDef::new("value", "system.Number"))
                .with_parameter(ParameterDef::new("max", "system.Number").with_default()),
        )]),
        system(),
    ]);

    let assembly = vm.load_executable(&data)?;
    let clamp = assembly.static_method_info("clamp").unwrap();
    assert_eq!(clamp.required_arguments(), 1);

    assert!(matches!(vm.invoke(&clamp, &[]), Err(Error::Execution(_))));
    assert!(matches!(
        vm.invoke(&clamp, &[Value::from(1), Value::from(2), Value::from(3)]),
        Err(Error::Execution(_))
    ));
    vm.invoke(&clamp, &[Value::from(1)])?;
    vm.invoke(&clamp, &[Value::from(1), Value::from(2)])?;
    assert_eq!(
        *recorder.calls.lock().unwrap(),
        vec!["game.Math:clamp/1", "game.Math:clamp/2"]
    );
    Ok(())
}

#[test]
fn no_executor_installed() -> Result<()> {
    let vm = Vm::new();
    vm.register_core_types();
    let data = write(vec![
        game(vec![
            TypeDef::class("game", "App").with_method(static_method("main", 0, &[1])),
        ]),
        system(),
    ]);

    let assembly = vm.load_executable(&data)?;
    assert!(matches!(assembly.execute(&vm), Err(Error::Execution(_))));
    Ok(())
}
