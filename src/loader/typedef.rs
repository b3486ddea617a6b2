//! Type record reader.
//!
//! A type record fills in the shell allocated for its name by the type index. Every type
//! name it mentions (base, interfaces, member types) is a table lookup, never a load.

use std::str::FromStr;

use tracing::{trace, warn};

use crate::{
    binary::format::{qualified_name, MEMBER_INFO_MIN_SIZE},
    loader::{
        context::LoaderContext,
        field::read_field,
        member::{read_member_info, MEMBER_MIN_SIZE},
        method::{read_constructor, read_method_info},
        property::read_property,
    },
    reflection::{ModuleRc, TypeAttributes, TypeDefinition, TypeKind, TypeRc, TypeRef},
    Error, Result,
};

/// Tag of the annotation marking host-backed types
const NATIVE_META: &str = "Native";
/// Key of the native annotation allowing script subclasses
const MANAGED_KEY: &str = "managed";

/// Read `[count][count × typeIdx]`, skipping absent names
fn read_type_list(ctx: &mut LoaderContext) -> Result<Vec<TypeRc>> {
    let count = ctx.read_count(4)?;
    let mut types = Vec::with_capacity(count);
    for _ in 0..count {
        if let Some(ty) = ctx.read_type()? {
            types.push(ty);
        }
    }
    Ok(types)
}

/// Read one type record of `module` and return the filled shell.
pub(crate) fn read_type_record(ctx: &mut LoaderContext, module: &ModuleRc) -> Result<TypeRc> {
    let start = ctx.parser.pos();

    let kind_name = ctx.read_string()?;
    let package = ctx.read_string()?;
    let name = ctx.read_string()?;
    let type_id = ctx.read_i32()?;
    let _source = ctx.read_string()?;
    let _line = ctx.read_i32()?;

    let full_name = qualified_name(&package, &name);
    let kind = TypeKind::from_str(&kind_name)
        .map_err(|_| malformed_error!("Type {} has unknown kind {}", full_name, kind_name))?;

    let Some(entry) = ctx.session.types.get(&full_name) else {
        return Err(malformed_error!("Type {} is not in the type index", full_name));
    };
    if entry.reference != ctx.reference {
        return Err(malformed_error!(
            "Type {} is indexed for reference {} but declared in reference {}",
            full_name,
            entry.reference,
            ctx.reference
        ));
    }
    if ctx.config().verify_type_positions && entry.position != start {
        return Err(malformed_error!(
            "Type {} starts at {} but is indexed at {}",
            full_name,
            start,
            entry.position
        ));
    }
    let ty = entry.ty.clone();
    let indexed_length = entry.length;

    let info = read_member_info(ctx)?;
    let mut flags = ctx
        .read_keywords()?
        .into_iter()
        .filter_map(TypeAttributes::from_keyword)
        .fold(TypeAttributes::empty(), |acc, flag| acc | flag);
    if let Some(native) = info.meta(NATIVE_META) {
        flags |= TypeAttributes::NATIVE;
        if native.has_key(MANAGED_KEY) {
            flags |= TypeAttributes::NATIVE_MANAGED;
        }
    }
    ty.define(TypeDefinition {
        kind,
        type_id,
        info,
        flags,
    })?;

    if let Some(base) = ctx.read_type()? {
        ty.set_base(&base);
    }
    for interface in read_type_list(ctx)? {
        ty.interfaces.push(TypeRef::new(&interface));
    }
    for delegate in read_type_list(ctx)? {
        ty.delegate_types.push(TypeRef::new(&delegate));
    }
    if let Some(ret) = ctx.read_type()? {
        ty.set_delegate_return_type(&ret);
    }

    // Imports may name types of assemblies that are not part of this load
    let imports = ctx.read_count(4)?;
    for _ in 0..imports {
        let import = ctx.read_string()?;
        match ctx.resolve_type(&import) {
            Ok(Some(resolved)) => {
                ty.imports.push(TypeRef::new(&resolved));
            }
            Ok(None) => {}
            Err(Error::UnresolvedType(_)) => {
                warn!(type_name = %full_name, import = %import, "skipping unresolved import");
            }
            Err(e) => return Err(e),
        }
    }

    if ctx.read_bool()? {
        let constructor = read_constructor(ctx, &ty)?;
        ty.set_constructor(constructor);
    }

    let fields = ctx.read_count(MEMBER_MIN_SIZE)?;
    for _ in 0..fields {
        let field = read_field(ctx, &ty)?;
        ty.fields.push(field);
    }

    let properties = ctx.read_count(MEMBER_MIN_SIZE)?;
    for _ in 0..properties {
        let property = read_property(ctx, &ty)?;
        ty.properties.push(property);
    }

    let methods = ctx.read_count(MEMBER_INFO_MIN_SIZE)?;
    for _ in 0..methods {
        let method = read_method_info(ctx, &ty)?;
        ty.methods.push(method);
    }

    let static_initializer = ctx.read_bytecode()?;
    let instance_initializer = ctx.read_bytecode()?;
    ty.set_initializers(static_initializer, instance_initializer);

    let consumed = ctx.parser.pos() - start;
    if ctx.config().verify_type_positions && consumed != indexed_length {
        return Err(malformed_error!(
            "Type {} spans {} bytes but is indexed with {}",
            full_name,
            consumed,
            indexed_length
        ));
    }

    ty.set_module(module);
    trace!(
        type_name = %full_name,
        fields = fields,
        properties = properties,
        methods = methods,
        "read type"
    );
    Ok(ty)
}
