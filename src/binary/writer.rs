//! `ExecutableWriter` - serializes [`AssemblyDef`]s into the binary executable format.
//!
//! The writer is the inverse of the loader and is what compilers, tests and benchmarks use
//! to produce executables. Output is deterministic: the same definitions always produce the
//! same bytes.
//!
//! Every assembly is written into its own buffer first, collecting the relative position
//! and length of each type record. Only then is the size of the preamble known, which
//! fixes the absolute positions stored in the reference table.

use tracing::debug;

use crate::{
    binary::{
        def::{
            AssemblyDef, ConstructorDef, FieldDef, MemberDef, MethodDef, ModuleDef, PropertyDef,
            TemplateDef, TypeDef,
        },
        format::{ASSEMBLY_KIND, MODULE_KIND, REFERENCE_ENTRY_SIZE, TYPE_INDEX_ENTRY_SIZE},
        strings::StringPoolBuilder,
    },
    file::{container, io::write_le},
    reflection::ByteCode,
    Result,
};

/// Convert a length or position to its wire form
fn wire(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| malformed_error!("{} {} does not fit the format", what, value))
}

/// A located type record inside its assembly buffer
struct IndexedType {
    reference: usize,
    name: String,
    position: usize,
    length: usize,
}

/// Writes one assembly record, interning strings into the shared pool
struct RecordWriter<'a> {
    pool: &'a mut StringPoolBuilder,
    out: Vec<u8>,
}

impl RecordWriter<'_> {
    fn i32(&mut self, value: i32) {
        write_le(&mut self.out, value);
    }

    fn bool(&mut self, value: bool) {
        write_le(&mut self.out, u8::from(value));
    }

    fn count(&mut self, count: usize) -> Result<()> {
        let count = wire(count, "Element count")?;
        self.i32(count);
        Ok(())
    }

    fn string(&mut self, value: &str) {
        let index = self.pool.intern(value);
        self.i32(index);
    }

    fn strings(&mut self, values: &[String]) -> Result<()> {
        self.count(values.len())?;
        for value in values {
            self.string(value);
        }
        Ok(())
    }

    fn optional_type(&mut self, value: Option<&String>) {
        self.bool(value.is_some());
        if let Some(name) = value {
            self.string(name);
        }
    }

    fn bytecode(&mut self, data: &[u8]) -> Result<()> {
        let text = if data.is_empty() {
            String::new()
        } else {
            ByteCode::new(data.to_vec()).encode()
        };
        let length = wire(text.len(), "Bytecode length")?;
        self.i32(length);
        self.out.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn member(&mut self, member: &MemberDef) -> Result<()> {
        self.string(&member.name);
        self.i32(member.ordinal);
        self.string(&member.source);
        self.i32(member.line);

        self.count(member.metadata.len())?;
        for meta in &member.metadata {
            self.string(&meta.name);
            self.count(meta.instances.len())?;
            for keys in &meta.instances {
                self.count(keys.len() * 2)?;
                for (key, value) in keys {
                    self.string(key);
                    self.string(value);
                }
            }
        }
        Ok(())
    }

    /// `[bool hasTemplate]` followed by the tree
    fn template(&mut self, template: Option<&TemplateDef>) -> Result<()> {
        self.bool(template.is_some());
        if let Some(tree) = template {
            self.template_tree(tree)?;
        }
        Ok(())
    }

    fn template_tree(&mut self, tree: &TemplateDef) -> Result<()> {
        self.bool(true);
        self.string(&tree.type_name);
        self.count(tree.children.len())?;
        for child in &tree.children {
            let nested = !child.children.is_empty();
            self.bool(nested);
            if nested {
                self.template_tree(child)?;
            } else {
                self.string(&child.type_name);
            }
        }
        Ok(())
    }

    fn method_base(&mut self, method: &MethodDef) -> Result<()> {
        self.member(&method.member)?;
        self.strings(&method.attributes)?;
        self.template(method.template.as_ref())?;

        self.count(method.parameters.len())?;
        for parameter in &method.parameters {
            self.string(&parameter.name);
            self.optional_type(parameter.param_type.as_ref());
            self.bool(parameter.has_default);
            self.bool(parameter.var_args);
            self.strings(&parameter.template_types)?;
        }

        self.bytecode(&method.bytecode)
    }

    fn method(&mut self, method: &MethodDef) -> Result<()> {
        self.method_base(method)?;
        self.optional_type(method.return_type.as_ref());
        Ok(())
    }

    fn constructor(&mut self, constructor: &ConstructorDef) -> Result<()> {
        self.method_base(&constructor.method)?;
        self.bool(constructor.default_constructor);
        Ok(())
    }

    fn field(&mut self, field: &FieldDef) -> Result<()> {
        self.member(&field.member)?;
        self.strings(&field.attributes)?;
        self.optional_type(field.field_type.as_ref());
        self.template(field.template.as_ref())
    }

    fn property(&mut self, property: &PropertyDef) -> Result<()> {
        self.member(&property.member)?;
        self.strings(&property.attributes)?;
        self.optional_type(property.property_type.as_ref());
        for accessor in [&property.getter, &property.setter] {
            self.bool(accessor.is_some());
            if let Some(method) = accessor {
                self.method(method)?;
            }
        }
        Ok(())
    }

    fn type_record(&mut self, ty: &TypeDef, type_id: i32) -> Result<()> {
        self.string(&ty.kind.to_string());
        self.string(&ty.package);
        self.string(&ty.name);
        self.i32(type_id);
        self.string(&ty.member.source);
        self.i32(ty.member.line);

        self.member(&ty.member)?;
        self.strings(&ty.attributes)?;
        self.string(&ty.base);
        self.strings(&ty.interfaces)?;
        self.strings(&ty.delegate_types)?;
        self.string(&ty.delegate_return_type);
        self.strings(&ty.imports)?;

        self.bool(ty.constructor.is_some());
        if let Some(constructor) = &ty.constructor {
            self.constructor(constructor)?;
        }

        self.count(ty.fields.len())?;
        for field in &ty.fields {
            self.field(field)?;
        }
        self.count(ty.properties.len())?;
        for property in &ty.properties {
            self.property(property)?;
        }
        self.count(ty.methods.len())?;
        for method in &ty.methods {
            self.method(method)?;
        }

        self.bytecode(&ty.static_initializer)?;
        self.bytecode(&ty.instance_initializer)
    }

    fn module(
        &mut self,
        module: &ModuleDef,
        reference: usize,
        next_id: &mut i32,
        index: &mut Vec<IndexedType>,
    ) -> Result<()> {
        self.string(MODULE_KIND);
        self.string(&module.name);
        self.string(&module.version);
        self.count(module.types.len())?;

        for ty in &module.types {
            *next_id += 1;
            let type_id = if ty.type_id == 0 { *next_id } else { ty.type_id };
            let position = self.out.len();
            self.type_record(ty, type_id)?;
            index.push(IndexedType {
                reference,
                name: ty.full_name(),
                position,
                length: self.out.len() - position,
            });
        }
        Ok(())
    }

    fn assembly(
        &mut self,
        assembly: &AssemblyDef,
        reference: usize,
        index: &mut Vec<IndexedType>,
    ) -> Result<()> {
        self.string(ASSEMBLY_KIND);
        self.string(&assembly.name);
        self.string(&assembly.version);
        self.string(&assembly.config);
        self.bool(assembly.executable);
        self.bool(assembly.jit);
        self.bool(assembly.debug_build);
        self.strings(&assembly.references)?;

        self.count(assembly.modules.len())?;
        let mut next_id = 0;
        for module in &assembly.modules {
            self.module(module, reference, &mut next_id, index)?;
        }
        Ok(())
    }
}

/// Builds executables from assembly definitions.
///
/// The first assembly added is the entry assembly and is marked executable; all others
/// are embedded dependencies, written in the order they were added.
///
/// # Examples
///
/// ```rust
/// use loomscope::binary::{AssemblyDef, ExecutableWriter, ModuleDef, TypeDef};
///
/// let main = AssemblyDef::new("Main", "1.0")
///     .with_module(ModuleDef::new("Main", "1.0").with_type(TypeDef::class("game", "App")));
///
/// let mut writer = ExecutableWriter::new();
/// writer.add_assembly(main);
/// let bytes = writer.write()?;
/// assert!(!bytes.is_empty());
/// # Ok::<(), loomscope::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct ExecutableWriter {
    assemblies: Vec<AssemblyDef>,
}

impl ExecutableWriter {
    /// Create an empty writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an assembly. The first one added becomes the entry assembly.
    pub fn add_assembly(&mut self, assembly: AssemblyDef) -> &mut Self {
        self.assemblies.push(assembly);
        self
    }

    /// Number of assemblies added so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.assemblies.len()
    }

    /// Returns true if no assembly was added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assemblies.is_empty()
    }

    /// Serialize all assemblies into a raw executable blob.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no assembly was added, two assemblies share a
    /// name, or a size exceeds what the format can describe.
    pub fn write(&self) -> Result<Vec<u8>> {
        if self.assemblies.is_empty() {
            return Err(malformed_error!("An executable needs at least one assembly"));
        }

        let mut pool = StringPoolBuilder::new();
        let mut index = Vec::new();
        let mut bodies = Vec::with_capacity(self.assemblies.len());
        for (reference, assembly) in self.assemblies.iter().enumerate() {
            if self.assemblies[..reference]
                .iter()
                .any(|a| a.name == assembly.name)
            {
                return Err(malformed_error!("Assembly {} is added twice", assembly.name));
            }

            let mut entry = assembly.clone();
            entry.executable = reference == 0;
            let mut writer = RecordWriter {
                pool: &mut pool,
                out: Vec::new(),
            };
            writer.assembly(&entry, reference, &mut index)?;
            bodies.push(writer.out);
        }

        // Everything the preamble names must be pooled before the pool is serialized
        let type_names: Vec<i32> = index.iter().map(|t| pool.intern(&t.name)).collect();
        let reference_names: Vec<i32> = self
            .assemblies
            .iter()
            .map(|a| pool.intern(&a.name))
            .collect();

        let mut out = Vec::new();
        pool.write(&mut out);
        let header_len = out.len()
            + 4
            + TYPE_INDEX_ENTRY_SIZE * index.len()
            + 4
            + REFERENCE_ENTRY_SIZE * bodies.len();

        write_le(&mut out, wire(index.len(), "Type count")?);
        for (ty, name) in index.iter().zip(type_names) {
            write_le(&mut out, wire(ty.reference, "Reference ordinal")?);
            write_le(&mut out, name);
            write_le(&mut out, wire(ty.position, "Type position")?);
            write_le(&mut out, wire(ty.length, "Type length")?);
        }

        write_le(&mut out, wire(bodies.len(), "Reference count")?);
        let mut position = header_len;
        for (body, name) in bodies.iter().zip(reference_names) {
            write_le(&mut out, name);
            write_le(&mut out, wire(body.len(), "Assembly length")?);
            write_le(&mut out, wire(position, "Assembly position")?);
            position += body.len();
        }

        for body in &bodies {
            out.extend_from_slice(body);
        }

        debug!(
            assemblies = bodies.len(),
            types = index.len(),
            strings = pool.len(),
            bytes = out.len(),
            "wrote executable"
        );
        Ok(out)
    }

    /// Serialize all assemblies and wrap the blob in a compressed container.
    ///
    /// # Errors
    /// Returns the errors of [`ExecutableWriter::write`] and [`container::pack`].
    pub fn write_container(&self) -> Result<Vec<u8>> {
        container::pack(&self.write()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        binary::{def::ParameterDef, strings::StringPool},
        file::parser::Parser,
        Error,
    };

    fn sample() -> AssemblyDef {
        AssemblyDef::new("Main", "1.0").with_module(
            ModuleDef::new("Main", "1.0")
                .with_type(TypeDef::class("game", "App").with_method(
                    MethodDef::new("run", 1)
                        .with_parameter(ParameterDef::new("n", "system.Number"))
                        .with_bytecode(&[1, 2, 3]),
                ))
                .with_type(TypeDef::class("game", "Other")),
        )
    }

    #[test]
    fn empty_writer() {
        assert!(matches!(
            ExecutableWriter::new().write(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn duplicate_assembly() {
        let mut writer = ExecutableWriter::new();
        writer.add_assembly(sample()).add_assembly(sample());
        assert!(matches!(writer.write(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn preamble_layout() {
        let mut writer = ExecutableWriter::new();
        writer.add_assembly(sample());
        let bytes = writer.write().unwrap();

        let mut parser = Parser::new(&bytes);
        let pool = StringPool::read(&mut parser).unwrap();

        assert_eq!(parser.read_i32().unwrap(), 2);
        let mut ends = Vec::new();
        for expected in ["game.App", "game.Other"] {
            assert_eq!(parser.read_i32().unwrap(), 0);
            assert_eq!(pool.read_str(&mut parser).unwrap(), expected);
            let position = parser.read_i32().unwrap();
            let length = parser.read_i32().unwrap();
            assert!(position > 0 && length > 0);
            ends.push((position, length));
        }
        // records are contiguous
        assert_eq!(ends[0].0 + ends[0].1, ends[1].0);

        assert_eq!(parser.read_i32().unwrap(), 1);
        assert_eq!(pool.read_str(&mut parser).unwrap(), "Main");
        let length = parser.read_i32().unwrap();
        let position = parser.read_i32().unwrap();
        assert_eq!(position as usize, parser.pos());
        assert_eq!(position as usize + length as usize, bytes.len());

        parser.seek(position as usize).unwrap();
        assert_eq!(pool.read_str(&mut parser).unwrap(), ASSEMBLY_KIND);
        assert_eq!(pool.read_str(&mut parser).unwrap(), "Main");
    }

    #[test]
    fn deterministic() {
        let mut writer = ExecutableWriter::new();
        writer.add_assembly(sample());
        assert_eq!(writer.write().unwrap(), writer.write().unwrap());
    }

    #[test]
    fn container() {
        let mut writer = ExecutableWriter::new();
        writer.add_assembly(sample());
        let packed = writer.write_container().unwrap();
        assert!(container::is_container(&packed));
        assert_eq!(container::unpack(&packed).unwrap(), writer.write().unwrap());
    }
}
