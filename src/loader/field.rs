//! Field record reader.

use std::sync::Arc;

use crate::{
    loader::{
        context::LoaderContext,
        member::{read_member_info, read_template},
    },
    reflection::{FieldAttributes, FieldInfo, FieldRc, TypeRc, TypeRef},
    Result,
};

/// Read a field: member info, attributes, declared type and template tree.
pub(crate) fn read_field(ctx: &mut LoaderContext, declaring: &TypeRc) -> Result<FieldRc> {
    let info = read_member_info(ctx)?;
    let attributes = ctx
        .read_keywords()?
        .into_iter()
        .filter_map(FieldAttributes::from_keyword)
        .fold(FieldAttributes::empty(), |acc, flag| acc | flag);
    let field_type = ctx.read_optional_type()?.map(|ty| TypeRef::new(&ty));
    let template = if ctx.read_bool()? {
        read_template(ctx)?
    } else {
        None
    };

    Ok(Arc::new(FieldInfo {
        info,
        attributes,
        field_type,
        template,
        declaring_type: TypeRef::new(declaring),
    }))
}
