//! The header phase of a split load.

use tracing::info;

use crate::{
    config::AssemblyConfig,
    loader::{
        assembly::{begin_assembly, load_closure, load_remaining, Frame},
        context::LoaderContext,
    },
    reflection::AssemblyRc,
    Result,
};

/// An executable whose tables and entry assembly header have been read.
///
/// The embedding application can inspect the entry assembly's name, version and embedded
/// configuration here, before any type or member is materialized. Calling
/// [`ExecutableHeader::load_body`] consumes the header and finishes the load; dropping it
/// instead abandons the load without registering anything.
///
/// # Examples
///
/// ```rust,no_run
/// use loomscope::Vm;
///
/// let vm = Vm::new();
/// let data = std::fs::read("app.loom")?;
/// let header = vm.load_executable_header(&data)?;
/// for rule in header.config().log_rules() {
///     println!("log group '{}' level {:?}", rule.group, rule.level);
/// }
/// let assembly = header.load_body()?;
/// println!("loaded {}", assembly.name());
/// # Ok::<(), loomscope::Error>(())
/// ```
pub struct ExecutableHeader<'a> {
    ctx: LoaderContext<'a>,
    entry: Frame,
}

impl<'a> ExecutableHeader<'a> {
    pub(crate) fn read(ctx: LoaderContext<'a>) -> Result<Self> {
        let mut ctx = ctx;
        let entry = begin_assembly(&mut ctx, 0)?;
        Ok(ExecutableHeader { ctx, entry })
    }

    /// Name of the entry assembly
    #[must_use]
    pub fn name(&self) -> &str {
        self.entry.assembly.name()
    }

    /// Version of the entry assembly
    #[must_use]
    pub fn version(&self) -> &str {
        self.entry.assembly.version()
    }

    /// Configuration embedded in the entry assembly
    #[must_use]
    pub fn config(&self) -> &AssemblyConfig {
        self.entry.assembly.config()
    }

    /// Returns true if the entry assembly is a debug build
    #[must_use]
    pub fn is_debug_build(&self) -> bool {
        self.entry.assembly.is_debug_build()
    }

    /// Returns true if the entry assembly contains JIT bytecode
    #[must_use]
    pub fn is_jit(&self) -> bool {
        self.entry.assembly.is_jit()
    }

    /// Names of the assemblies the entry assembly references
    #[must_use]
    pub fn references(&self) -> &[String] {
        &self.entry.references
    }

    /// Read all modules, types and members, then publish the loaded assemblies to the VM.
    ///
    /// # Errors
    /// Returns the first error met; nothing is published in that case.
    pub fn load_body(self) -> Result<AssemblyRc> {
        let ExecutableHeader { mut ctx, entry } = self;
        let assembly = entry.assembly.clone();

        load_closure(&mut ctx, entry)?;
        load_remaining(&mut ctx)?;

        ctx.vm.commit(&ctx.session.loaded);
        info!(
            assembly = %assembly.name(),
            assemblies = ctx.session.loaded.len(),
            types = ctx.session.types.len(),
            "loaded executable"
        );
        Ok(assembly)
    }
}

impl std::fmt::Debug for ExecutableHeader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutableHeader")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("references", &self.entry.references)
            .finish_non_exhaustive()
    }
}
