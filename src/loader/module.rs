//! Module record reader.

use std::sync::Arc;

use tracing::debug;

use crate::{
    binary::format::{MODULE_KIND, TYPE_HEADER_SIZE},
    loader::{context::LoaderContext, typedef::read_type_record},
    reflection::{AssemblyRc, Module, ModuleRc},
    Result,
};

/// Read one module record with all its types and attach it to `assembly`.
pub(crate) fn read_module(ctx: &mut LoaderContext, assembly: &AssemblyRc) -> Result<ModuleRc> {
    let kind = ctx.read_string()?;
    if kind != MODULE_KIND {
        return Err(malformed_error!(
            "Expected a {} record in {}, found '{}'",
            MODULE_KIND,
            assembly.name(),
            kind
        ));
    }

    let name = ctx.read_string()?;
    let version = ctx.read_string()?;
    let module = Arc::new(Module::new(&name, &version, assembly));

    let count = ctx.read_count(TYPE_HEADER_SIZE)?;
    for _ in 0..count {
        let ty = read_type_record(ctx, &module)?;
        module.types.push(ty);
    }

    debug!(assembly = %assembly.name(), module = %name, types = count, "read module");
    assembly.modules.push(module.clone());
    Ok(module)
}
