//! Readers for methods, constructors and their parameters, including native binding.

use std::sync::Arc;

use tracing::trace;

use crate::{
    binary::format::PARAMETER_MIN_SIZE,
    loader::{
        context::LoaderContext,
        member::{read_member_info, read_template},
    },
    reflection::{
        ConstructorInfo, ConstructorRc, MethodAttributes, MethodBase, MethodBody, MethodInfo,
        MethodRc, ParameterAttributes, ParameterInfo, TypeRc, TypeRef,
    },
    runtime::{validate_signature, NativeKind},
    Error, Result,
};

fn read_parameter(ctx: &mut LoaderContext, position: usize) -> Result<ParameterInfo> {
    let name = ctx.read_string()?;
    let parameter_type = ctx.read_optional_type()?.map(|ty| TypeRef::new(&ty));

    let mut attributes = ParameterAttributes::empty();
    if ctx.read_bool()? {
        attributes |= ParameterAttributes::HAS_DEFAULT;
    }
    if ctx.read_bool()? {
        attributes |= ParameterAttributes::VAR_ARGS;
    }

    let count = ctx.read_count(4)?;
    let mut template_types = Vec::with_capacity(count);
    for _ in 0..count {
        if let Some(ty) = ctx.read_type()? {
            template_types.push(TypeRef::new(&ty));
        }
    }

    Ok(ParameterInfo {
        name,
        position,
        parameter_type,
        attributes,
        template_types,
    })
}

/// Pick the body of a `native` method from the host registry.
///
/// Instance methods of primitive types are implemented by the runtime itself and must not
/// be registered as regular natives; everything else needs a registration.
fn bind_native(ctx: &LoaderContext, declaring: &TypeRc, name: &str, is_static: bool) -> Result<MethodBody> {
    let binding = ctx.vm.natives().get(&declaring.full_name, name);
    let primitive_instance = declaring.is_primitive() && !is_static;

    match binding {
        Some(binding) if primitive_instance && binding.kind == NativeKind::Function => {
            Err(Error::UnnecessaryNative {
                type_name: declaring.full_name.clone(),
                member: name.to_string(),
            })
        }
        Some(binding) => Ok(MethodBody::Native(binding)),
        None if primitive_instance => Ok(MethodBody::Intrinsic),
        None => Err(Error::MissingNative {
            type_name: declaring.full_name.clone(),
            member: name.to_string(),
        }),
    }
}

/// Read the part shared by methods and constructors.
pub(crate) fn read_method_base(ctx: &mut LoaderContext, declaring: &TypeRc) -> Result<MethodBase> {
    let info = read_member_info(ctx)?;
    let attributes = ctx
        .read_keywords()?
        .into_iter()
        .filter_map(MethodAttributes::from_keyword)
        .fold(MethodAttributes::empty(), |acc, flag| acc | flag);

    let template = if ctx.read_bool()? {
        read_template(ctx)?
    } else {
        None
    };

    let count = ctx.read_count(PARAMETER_MIN_SIZE)?;
    let mut parameters = Vec::with_capacity(count);
    for position in 0..count {
        parameters.push(read_parameter(ctx, position)?);
    }
    let first_default_arg = parameters.iter().position(ParameterInfo::has_default);

    // Natives carry an empty placeholder blob
    let bytecode = ctx.read_bytecode()?;
    let body = if attributes.contains(MethodAttributes::NATIVE) {
        bind_native(
            ctx,
            declaring,
            &info.name,
            attributes.contains(MethodAttributes::STATIC),
        )?
    } else {
        MethodBody::ByteCode(bytecode)
    };

    trace!(method = %info.name, ordinal = info.ordinal, "read method");
    Ok(MethodBase {
        info,
        attributes,
        template,
        parameters,
        first_default_arg,
        body,
        declaring_type: TypeRef::new(declaring),
    })
}

fn check_native_signature(
    ctx: &LoaderContext,
    base: &MethodBase,
    return_type: Option<&TypeRef>,
) -> Result<()> {
    if !ctx.config().validate_native_signatures {
        return Ok(());
    }
    match &base.body {
        MethodBody::Native(binding) => validate_signature(
            base,
            return_type,
            &binding.signature,
            &ctx.config().conversions,
        ),
        _ => Ok(()),
    }
}

/// Read a method record: the shared part followed by the optional return type.
pub(crate) fn read_method_info(ctx: &mut LoaderContext, declaring: &TypeRc) -> Result<MethodRc> {
    let base = read_method_base(ctx, declaring)?;
    let return_type = ctx.read_optional_type()?.map(|ty| TypeRef::new(&ty));
    check_native_signature(ctx, &base, return_type.as_ref())?;

    Ok(Arc::new(MethodInfo::new(base, return_type)))
}

/// Read a constructor record: the shared part followed by the default-constructor flag.
pub(crate) fn read_constructor(ctx: &mut LoaderContext, declaring: &TypeRc) -> Result<ConstructorRc> {
    let base = read_method_base(ctx, declaring)?;
    let default_constructor = ctx.read_bool()?;
    check_native_signature(ctx, &base, None)?;

    Ok(Arc::new(ConstructorInfo {
        base,
        default_constructor,
    }))
}
