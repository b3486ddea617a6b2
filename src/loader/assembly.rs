//! Assembly records and the reference work-list.
//!
//! Reading an assembly happens in two steps. [`begin_assembly`] seeks to the record and reads
//! its header and reference names, creating the [`Assembly`]. The body, its modules and
//! types, is read by [`load_closure`] once every reference the assembly names has been
//! resolved. References are walked depth-first with an explicit stack of [`Frame`]s, so the
//! depth of a dependency chain costs heap, not call stack, and is bounded by
//! [`crate::config::LoaderConfig::max_reference_depth`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    binary::format::{ASSEMBLY_KIND, MODULE_RECORD_MIN_SIZE},
    config::{AssemblyConfig, BytecodeMode},
    loader::{
        context::LoaderContext, finalize::finalize_assembly, module::read_module,
        reference::ReferenceState,
    },
    reflection::{Assembly, AssemblyFlags, AssemblyRc},
    Error, Result,
};

/// An assembly whose header was read and whose body is pending
#[derive(Debug)]
pub(crate) struct Frame {
    /// Index in the reference table
    pub reference: usize,
    pub assembly: AssemblyRc,
    /// Names from the assembly's reference list
    pub references: Vec<String>,
    /// Next entry of `references` to visit
    pub next: usize,
    /// Where the module records start
    pub body_position: usize,
}

/// Seek to reference `index`, read its assembly header and mark the reference as loading.
pub(crate) fn begin_assembly(ctx: &mut LoaderContext, index: usize) -> Result<Frame> {
    let Some(entry) = ctx.session.references.get(index) else {
        return Err(malformed_error!("Reference {} does not exist", index));
    };
    let expected_name = entry.name.clone();
    ctx.parser.seek(entry.position)?;
    ctx.reference = index;

    let kind = ctx.read_string()?;
    if kind != ASSEMBLY_KIND {
        return Err(malformed_error!(
            "Expected an {} record for {}, found '{}'",
            ASSEMBLY_KIND,
            expected_name,
            kind
        ));
    }

    let name = ctx.read_string()?;
    if name != expected_name {
        return Err(malformed_error!(
            "Reference {} points at assembly {}",
            expected_name,
            name
        ));
    }
    let version = ctx.read_string()?;
    let config = AssemblyConfig::parse(&ctx.read_string()?)?;

    let mut flags = AssemblyFlags::empty();
    if ctx.read_bool()? {
        flags |= AssemblyFlags::EXECUTABLE;
    }
    let jit = ctx.read_bool()?;
    if jit {
        flags |= AssemblyFlags::JIT;
    }
    if ctx.read_bool()? {
        flags |= AssemblyFlags::DEBUG_BUILD;
    }

    let found = BytecodeMode::from_jit_flag(jit);
    let expected = ctx.config().bytecode_mode;
    if found != expected {
        return Err(Error::BytecodeModeMismatch {
            assembly: name,
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }

    let count = ctx.read_count(4)?;
    let mut references = Vec::with_capacity(count);
    for _ in 0..count {
        references.push(ctx.read_string()?);
    }

    let assembly = Arc::new(Assembly::new(&name, &version, config, flags));
    assembly.mark_loaded();
    if let Some(entry) = ctx.session.references.get_mut(index) {
        entry.state = ReferenceState::Loading;
        entry.assembly = Some(assembly.clone());
    }
    ctx.session.loaded.push(assembly.clone());

    debug!(
        assembly = %name,
        version = %version,
        references = count,
        debug_build = assembly.is_debug_build(),
        "read assembly header"
    );
    Ok(Frame {
        reference: index,
        assembly,
        references,
        next: 0,
        body_position: ctx.parser.pos(),
    })
}

/// Read the modules of a frame whose references are all resolved, then finalize it.
fn finish_assembly(ctx: &mut LoaderContext, frame: &Frame) -> Result<()> {
    ctx.reference = frame.reference;
    ctx.parser.seek(frame.body_position)?;

    let count = ctx.read_count(MODULE_RECORD_MIN_SIZE)?;
    for _ in 0..count {
        read_module(ctx, &frame.assembly)?;
    }

    finalize_assembly(ctx, &frame.assembly, frame.reference)?;
    if let Some(entry) = ctx.session.references.get_mut(frame.reference) {
        entry.state = ReferenceState::Loaded;
    }
    debug!(assembly = %frame.assembly.name(), modules = count, "loaded assembly");
    Ok(())
}

/// Load `root` and every assembly reachable from it that is not loaded yet.
///
/// A reference that is already loaded, or still loading further up the stack (a cycle),
/// is attached without being read again.
pub(crate) fn load_closure(ctx: &mut LoaderContext, root: Frame) -> Result<()> {
    let max_depth = ctx.config().max_reference_depth;
    let mut stack = vec![root];

    loop {
        let Some(frame) = stack.last_mut() else {
            break;
        };

        if frame.next >= frame.references.len() {
            if let Some(done) = stack.pop() {
                finish_assembly(ctx, &done)?;
            }
            continue;
        }

        let name = frame.references[frame.next].clone();
        frame.next += 1;
        let owner = frame.assembly.clone();

        let Some(index) = ctx.session.references.index_of(&name) else {
            match ctx.vm.assembly(&name) {
                Some(loaded) => {
                    owner.add_reference(&loaded);
                    continue;
                }
                None => {
                    return Err(malformed_error!(
                        "Assembly {} references {}, which is neither embedded nor loaded",
                        owner.name(),
                        name
                    ))
                }
            }
        };

        let Some(entry) = ctx.session.references.get(index) else {
            continue;
        };
        match (entry.state, entry.assembly.clone()) {
            (ReferenceState::Loaded, Some(loaded)) => owner.add_reference(&loaded),
            (ReferenceState::Loading, Some(loading)) => {
                warn!(
                    assembly = %owner.name(),
                    reference = %name,
                    "reference cycle, attaching assembly that is still loading"
                );
                owner.add_reference(&loading);
            }
            _ => {
                if stack.len() >= max_depth {
                    return Err(Error::RecursionLimit(max_depth));
                }
                let child = begin_assembly(ctx, index)?;
                owner.add_reference(&child.assembly);
                stack.push(child);
            }
        }
    }

    Ok(())
}

/// Load every reference the closure of the entry assembly did not reach.
pub(crate) fn load_remaining(ctx: &mut LoaderContext) -> Result<()> {
    for index in 0..ctx.session.references.len() {
        let unseen = ctx
            .session
            .references
            .get(index)
            .is_some_and(|entry| entry.state == ReferenceState::Unseen);
        if unseen {
            let frame = begin_assembly(ctx, index)?;
            load_closure(ctx, frame)?;
        }
    }
    Ok(())
}
