//! Readers for the parts every member record shares.

use crate::{
    binary::format::{MAX_TEMPLATE_DEPTH, MEMBER_INFO_MIN_SIZE},
    loader::context::LoaderContext,
    reflection::{MemberInfo, MetaInfo, TemplateInfo, TypeRef},
    Error, Result,
};

/// Read the member info prefix: name, ordinal, source location and metadata.
///
/// Every instance of a metadata tag becomes its own [`MetaInfo`], in wire order.
pub(crate) fn read_member_info(ctx: &mut LoaderContext) -> Result<MemberInfo> {
    let name = ctx.read_string()?;
    let ordinal = ctx.read_i32()?;
    let ordinal = ctx.check_ordinal(ordinal, &name)?;
    let source = ctx.read_string()?;
    let line = ctx.read_i32()?;

    let mut metadata = Vec::new();
    let tags = ctx.read_count(8)?;
    for _ in 0..tags {
        let tag = ctx.read_string()?;
        let instances = ctx.read_count(4)?;
        for _ in 0..instances {
            let strings = ctx.read_count(4)?;
            if strings % 2 != 0 {
                return Err(malformed_error!(
                    "Metadata {} of {} has an odd number of key/value strings ({})",
                    tag,
                    name,
                    strings
                ));
            }

            let mut meta = MetaInfo::new(&tag);
            for _ in 0..strings / 2 {
                let key = ctx.read_string()?;
                let value = ctx.read_string()?;
                meta.keys.push((key, value));
            }
            metadata.push(meta);
        }
    }

    Ok(MemberInfo {
        name,
        ordinal,
        source,
        line,
        metadata,
    })
}

/// Read `[bool present]` and, if set, a template tree.
pub(crate) fn read_template(ctx: &mut LoaderContext) -> Result<Option<TemplateInfo>> {
    read_template_at(ctx, 0)
}

fn read_template_at(ctx: &mut LoaderContext, depth: usize) -> Result<Option<TemplateInfo>> {
    if !ctx.read_bool()? {
        return Ok(None);
    }
    if depth >= MAX_TEMPLATE_DEPTH {
        return Err(Error::RecursionLimit(MAX_TEMPLATE_DEPTH));
    }

    let mut node = read_template_leaf(ctx)?;
    let children = ctx.read_count(5)?;
    for _ in 0..children {
        let nested = ctx.read_bool()?;
        let child = if nested {
            read_template_at(ctx, depth + 1)?
        } else {
            Some(read_template_leaf(ctx)?)
        };
        node.types.extend(child);
    }
    Ok(Some(node))
}

fn read_template_leaf(ctx: &mut LoaderContext) -> Result<TemplateInfo> {
    let type_name = ctx.read_string()?;
    let resolved = ctx.resolve_type(&type_name)?.map(|ty| TypeRef::new(&ty));
    Ok(TemplateInfo {
        type_name,
        resolved,
        types: Vec::new(),
    })
}

/// Smallest size of any member record, for plausibility checks of member counts
pub(crate) const MEMBER_MIN_SIZE: usize = MEMBER_INFO_MIN_SIZE + 4;
