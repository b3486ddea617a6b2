//! The VM session that owns loaded assemblies.

use std::{
    path::Path,
    sync::{Arc, RwLock},
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::{
    config::LoaderConfig,
    file::File,
    loader::{self, ExecutableHeader},
    reflection::{AssemblyRc, MethodBody, MethodInfo, Type, TypeKind, TypeRc},
    runtime::{NativeRegistry, Value},
    Error, Result,
};

/// Types every script closure expects the host to provide
pub const CORE_TYPES: [&str; 8] = [
    "system.Object",
    "system.String",
    "system.Number",
    "system.Boolean",
    "system.Null",
    "system.Function",
    "system.Void",
    "system.Vector",
];

/// Runs bytecode and intrinsic methods on behalf of the [`Vm`].
///
/// The loader never interprets bytecode itself; a host installs an executor with
/// [`Vm::set_executor`] to make script methods callable.
pub trait Executor: Send + Sync {
    /// Invoke `method` with `args`.
    ///
    /// # Errors
    /// Returns [`Error::Execution`] or any other error raised while running the method.
    fn invoke(&self, vm: &Vm, method: &MethodInfo, args: &[Value]) -> Result<Value>;
}

struct VmState {
    config: LoaderConfig,
    types: DashMap<String, TypeRc>,
    assemblies: SkipMap<String, AssemblyRc>,
    natives: NativeRegistry,
    executor: RwLock<Option<Arc<dyn Executor>>>,
}

/// A script VM session.
///
/// `Vm` is a cheap handle; clones share the same state. Loads into the same `Vm` see the
/// assemblies and types of earlier loads, so a dependency that is already loaded is not
/// deserialized again.
///
/// # Examples
///
/// ```rust,no_run
/// use loomscope::{runtime::NativeSignature, Vm};
///
/// let vm = Vm::new();
/// vm.register_core_types();
/// vm.natives().register(
///     "game.Console",
///     "print",
///     NativeSignature::new(&["char const*"], "void"),
///     |args| {
///         println!("{}", args[0]);
///         Ok(loomscope::runtime::Value::Null)
///     },
/// );
///
/// let assembly = vm.load_executable_file("game.loom")?;
/// assembly.execute(&vm)?;
/// # Ok::<(), loomscope::Error>(())
/// ```
#[derive(Clone)]
pub struct Vm {
    state: Arc<VmState>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Create a session with the default loader configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    /// Create a session with `config`
    #[must_use]
    pub fn with_config(config: LoaderConfig) -> Self {
        Vm {
            state: Arc::new(VmState {
                config,
                types: DashMap::new(),
                assemblies: SkipMap::new(),
                natives: NativeRegistry::new(),
                executor: RwLock::new(None),
            }),
        }
    }

    /// The loader configuration of this session
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.state.config
    }

    /// Registered host functions and host types
    #[must_use]
    pub fn natives(&self) -> &NativeRegistry {
        &self.state.natives
    }

    /// Look up a type by qualified name
    #[must_use]
    pub fn get_type(&self, full_name: &str) -> Option<TypeRc> {
        self.state
            .types
            .get(full_name)
            .map(|entry| entry.value().clone())
    }

    /// Register a host type, replacing any type of the same name
    pub fn register_type(&self, ty: TypeRc) {
        self.state.types.insert(ty.full_name.clone(), ty);
    }

    /// Register member-less definitions of [`CORE_TYPES`] that are not registered yet
    pub fn register_core_types(&self) {
        for name in CORE_TYPES {
            self.state
                .types
                .entry(name.to_string())
                .or_insert_with(|| Type::builtin(name, TypeKind::Class));
        }
    }

    /// Number of types known to this session
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.state.types.len()
    }

    /// Install the executor that runs bytecode methods
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the executor lock is poisoned.
    pub fn set_executor(&self, executor: Arc<dyn Executor>) -> Result<()> {
        let mut slot = write_lock!(self.state.executor);
        *slot = Some(executor);
        Ok(())
    }

    /// A loaded assembly by name
    #[must_use]
    pub fn assembly(&self, name: &str) -> Option<AssemblyRc> {
        self.state
            .assemblies
            .get(name)
            .map(|entry| entry.value().clone())
    }

    /// All loaded assemblies, ordered by name
    #[must_use]
    pub fn assemblies(&self) -> Vec<AssemblyRc> {
        self.state
            .assemblies
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Load an executable from an in-memory blob and return its entry assembly.
    ///
    /// # Errors
    /// Returns the first error met while reading; on error nothing is registered.
    pub fn load_executable(&self, data: &[u8]) -> Result<AssemblyRc> {
        loader::load_executable(self, data)
    }

    /// Read the header of an executable, deferring types and members to
    /// [`ExecutableHeader::load_body`].
    ///
    /// # Errors
    /// Returns an error if the tables or the entry assembly header are invalid.
    pub fn load_executable_header<'a>(&self, data: &'a [u8]) -> Result<ExecutableHeader<'a>> {
        loader::load_executable_header(self, data)
    }

    /// Load an executable file, either a raw blob or a compressed container.
    ///
    /// # Errors
    /// Returns [`Error::FileError`] if the file can not be mapped, or any load error.
    pub fn load_executable_file(&self, path: impl AsRef<Path>) -> Result<AssemblyRc> {
        let file = File::from_file(path.as_ref())?;
        let payload = file.payload()?;
        debug!(path = %path.as_ref().display(), bytes = payload.len(), "loading executable file");
        self.load_executable(&payload)
    }

    /// Drop the assembly named `name` and evict its types from the type cache.
    ///
    /// Returns false if no such assembly is loaded.
    pub fn close_assembly(&self, name: &str) -> bool {
        let Some(entry) = self.state.assemblies.remove(name) else {
            return false;
        };

        let assembly = entry.value();
        for ty in assembly.types() {
            self.state
                .types
                .remove_if(&ty.full_name, |_, cached| Arc::ptr_eq(cached, &ty));
        }
        info!(assembly = %name, "closed assembly");
        true
    }

    /// Publish the assemblies of a finished load. Types become visible before assemblies.
    pub(crate) fn commit(&self, assemblies: &[AssemblyRc]) {
        for assembly in assemblies {
            if self.state.assemblies.contains_key(assembly.name()) {
                self.close_assembly(assembly.name());
            }
            for ty in assembly.types() {
                self.state.types.insert(ty.full_name.clone(), ty);
            }
        }
        for assembly in assemblies {
            self.state
                .assemblies
                .insert(assembly.name().to_string(), assembly.clone());
        }
    }

    /// Call `method`.
    ///
    /// Native methods run their binding directly; bytecode and intrinsic methods go to the
    /// installed [`Executor`].
    ///
    /// # Errors
    /// Returns [`Error::Execution`] for a wrong argument count or when no executor is
    /// installed, or the error of the call itself.
    pub fn invoke(&self, method: &MethodInfo, args: &[Value]) -> Result<Value> {
        let var_args = method.parameters.last().is_some_and(|p| p.is_var_args());
        if args.len() < method.required_arguments()
            || (!var_args && args.len() > method.parameters.len())
        {
            return Err(Error::Execution(format!(
                "{} called with {} arguments, expects {}..={}",
                method.qualified_name(),
                args.len(),
                method.required_arguments(),
                method.parameters.len()
            )));
        }

        if let MethodBody::Native(binding) = &method.body {
            return binding.call(args);
        }

        let executor = read_lock!(self.state.executor).clone();
        match executor {
            Some(executor) => executor.invoke(self, method, args),
            None => Err(Error::Execution(format!(
                "No executor installed to run {}",
                method.qualified_name()
            ))),
        }
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("types", &self.state.types.len())
            .field("assemblies", &self.state.assemblies.len())
            .field("natives", &self.state.natives.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{
        ByteCode, MemberInfo, MethodAttributes, MethodBase, ParameterAttributes, ParameterInfo,
        TypeRef,
    };
    use crate::runtime::{NativeBinding, NativeKind, NativeSignature};

    struct Echo;

    impl Executor for Echo {
        fn invoke(&self, _vm: &Vm, method: &MethodInfo, _args: &[Value]) -> Result<Value> {
            Ok(Value::from(method.name()))
        }
    }

    fn method(owner: &TypeRc, body: MethodBody, parameters: usize) -> MethodInfo {
        MethodInfo::new(
            MethodBase {
                info: MemberInfo {
                    name: "run".to_string(),
                    ..MemberInfo::default()
                },
                attributes: MethodAttributes::STATIC,
                template: None,
                parameters: (0..parameters)
                    .map(|position| ParameterInfo {
                        name: format!("a{position}"),
                        position,
                        parameter_type: None,
                        attributes: ParameterAttributes::empty(),
                        template_types: Vec::new(),
                    })
                    .collect(),
                first_default_arg: None,
                body,
                declaring_type: TypeRef::new(owner),
            },
            None,
        )
    }

    #[test]
    fn core_types() {
        let vm = Vm::new();
        assert!(vm.get_type("system.Object").is_none());
        vm.register_core_types();
        assert_eq!(vm.type_count(), CORE_TYPES.len());
        assert!(vm.get_type("system.Number").unwrap().is_primitive());

        let shared = vm.clone();
        assert!(shared.get_type("system.Vector").is_some());
    }

    #[test]
    fn invoke_native() {
        let vm = Vm::new();
        let owner = Type::builtin("game.Math", TypeKind::Class);
        let signature = NativeSignature::new(&["double", "double"], "double");
        let binding = NativeBinding::new(NativeKind::Function, signature, |args| {
            Ok(Value::Number(args.iter().filter_map(Value::as_number).sum()))
        });
        let sum = method(&owner, MethodBody::Native(binding), 2);

        let result = vm
            .invoke(&sum, &[Value::from(1), Value::from(2)])
            .unwrap();
        assert_eq!(result, Value::Number(3.0));
        assert!(matches!(
            vm.invoke(&sum, &[Value::from(1)]),
            Err(Error::Execution(_))
        ));
    }

    #[test]
    fn invoke_bytecode() {
        let vm = Vm::new();
        let owner = Type::builtin("game.Main", TypeKind::Class);
        let run = method(&owner, MethodBody::ByteCode(ByteCode::new(vec![0x1b])), 0);

        assert!(matches!(vm.invoke(&run, &[]), Err(Error::Execution(_))));
        vm.set_executor(Arc::new(Echo)).unwrap();
        assert_eq!(vm.invoke(&run, &[]).unwrap(), Value::from("run"));
    }

    #[test]
    fn close_unknown_assembly() {
        let vm = Vm::new();
        assert!(!vm.close_assembly("Missing"));
        assert!(vm.assemblies().is_empty());
    }
}
