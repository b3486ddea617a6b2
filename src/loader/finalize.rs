//! Checks and tables built once all records of an assembly were read.

use rayon::prelude::*;
use tracing::debug;

use crate::{
    loader::context::LoaderContext,
    reflection::{AssemblyRc, TypeRc},
    runtime::NativeRegistry,
    Error, Result,
};

fn validate_native_type(ty: &TypeRc, natives: &NativeRegistry) -> Result<()> {
    if !ty.is_native() {
        return Ok(());
    }

    match natives.native_type(&ty.full_name) {
        None => Err(Error::NativeTypeMismatch {
            type_name: ty.full_name.clone(),
            message: "no native type registered by the host".to_string(),
        }),
        Some(managed) if managed != ty.is_native_managed() => Err(Error::NativeTypeMismatch {
            type_name: ty.full_name.clone(),
            message: format!(
                "script declares managed={}, host registered managed={}",
                ty.is_native_managed(),
                managed
            ),
        }),
        Some(_) => Ok(()),
    }
}

/// Finish the assembly read from reference `reference`.
///
/// Every type the index assigns to the reference must have been defined by a record.
/// Then the id table and per-type dispatch tables are built, and native types checked
/// against the host.
pub(crate) fn finalize_assembly(
    ctx: &LoaderContext,
    assembly: &AssemblyRc,
    reference: usize,
) -> Result<()> {
    if let Some(missing) = ctx
        .session
        .types
        .owned_by(reference)
        .find(|entry| !entry.ty.is_defined())
    {
        return Err(malformed_error!(
            "Type {} is indexed but not declared in assembly {}",
            missing.ty.full_name,
            assembly.name()
        ));
    }

    assembly.build_type_table()?;

    let types = assembly.types();
    types.par_iter().try_for_each(|ty| ty.build_dispatch_table())?;

    if ctx.config().validate_native_types {
        let natives = ctx.vm.natives();
        types
            .par_iter()
            .try_for_each(|ty| validate_native_type(ty, natives))?;
    }

    debug!(assembly = %assembly.name(), types = types.len(), "finalized assembly");
    Ok(())
}
