//! Property record reader.

use std::sync::Arc;

use crate::{
    loader::{context::LoaderContext, member::read_member_info, method::read_method_info},
    reflection::{PropertyAttributes, PropertyInfo, PropertyRc, TypeRc, TypeRef},
    Result,
};

/// Read a property with its optional getter and setter, linking both back to it.
pub(crate) fn read_property(ctx: &mut LoaderContext, declaring: &TypeRc) -> Result<PropertyRc> {
    let info = read_member_info(ctx)?;
    let attributes = ctx
        .read_keywords()?
        .into_iter()
        .filter_map(PropertyAttributes::from_keyword)
        .fold(PropertyAttributes::empty(), |acc, flag| acc | flag);
    let property_type = ctx.read_optional_type()?.map(|ty| TypeRef::new(&ty));

    let getter = if ctx.read_bool()? {
        Some(read_method_info(ctx, declaring)?)
    } else {
        None
    };
    let setter = if ctx.read_bool()? {
        Some(read_method_info(ctx, declaring)?)
    } else {
        None
    };

    let property = Arc::new(PropertyInfo {
        info,
        attributes,
        property_type,
        getter,
        setter,
        declaring_type: TypeRef::new(declaring),
    });
    for accessor in [&property.getter, &property.setter].into_iter().flatten() {
        accessor.set_property(&property);
    }
    Ok(property)
}
