//! `LoaderContext` - the cursor, session tables and VM handle shared by all readers.

use tracing::trace;

use crate::{
    binary::format::Keyword,
    config::LoaderConfig,
    file::parser::Parser,
    loader::session::LoadSession,
    reflection::{ByteCode, TypeRc},
    runtime::Vm,
    Error, Result,
};

/// Everything a record reader needs.
///
/// Created by the header phase, handed to the body phase, and dropped when the load
/// returns.
pub(crate) struct LoaderContext<'a> {
    pub parser: Parser<'a>,
    pub session: LoadSession,
    pub vm: Vm,
    /// Index of the reference whose records are being read
    pub reference: usize,
}

impl<'a> LoaderContext<'a> {
    /// Open `data` and read its preamble tables.
    pub fn new(vm: &Vm, data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Empty);
        }

        let mut parser = Parser::new(data).with_strict_booleans(vm.config().strict_booleans);
        let session = LoadSession::read(&mut parser, vm)?;
        Ok(LoaderContext {
            parser,
            session,
            vm: vm.clone(),
            reference: 0,
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        self.vm.config()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.parser.read_i32()
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        self.parser.read_bool()
    }

    pub fn read_count(&mut self, min_element_size: usize) -> Result<usize> {
        self.parser.read_count(min_element_size)
    }

    /// Read a pool index and return the string it names
    pub fn read_string(&mut self) -> Result<String> {
        Ok(self.session.strings.read_str(&mut self.parser)?.to_string())
    }

    /// Read a length-prefixed base64 bytecode blob
    pub fn read_bytecode(&mut self) -> Result<ByteCode> {
        let text = self.parser.read_string()?;
        ByteCode::decode(text)
    }

    /// Check a wire ordinal against the configured bound
    pub fn check_ordinal(&self, ordinal: i32, member: &str) -> Result<u32> {
        match u32::try_from(ordinal) {
            Ok(value) if value <= self.config().max_ordinal => Ok(value),
            _ => Err(malformed_error!(
                "Member {} has invalid ordinal {} (limit {})",
                member,
                ordinal,
                self.config().max_ordinal
            )),
        }
    }

    /// Resolve a type name against the session shells, then the VM.
    ///
    /// The empty name means "no type".
    pub fn resolve_type(&self, full_name: &str) -> Result<Option<TypeRc>> {
        if full_name.is_empty() {
            return Ok(None);
        }
        if let Some(shell) = self.session.types.shell(full_name) {
            return Ok(Some(shell));
        }
        match self.vm.get_type(full_name) {
            Some(ty) => Ok(Some(ty)),
            None => Err(Error::UnresolvedType(full_name.to_string())),
        }
    }

    /// Read a pool index naming a type and resolve it
    pub fn read_type(&mut self) -> Result<Option<TypeRc>> {
        let name = self.read_string()?;
        self.resolve_type(&name)
    }

    /// Read `[bool present][typeIdx?]`
    pub fn read_optional_type(&mut self) -> Result<Option<TypeRc>> {
        if self.read_bool()? {
            self.read_type()
        } else {
            Ok(None)
        }
    }

    /// Read an attribute keyword list; keywords outside the vocabulary are skipped
    pub fn read_keywords(&mut self) -> Result<Vec<Keyword>> {
        let count = self.read_count(4)?;
        let mut keywords = Vec::with_capacity(count);
        for _ in 0..count {
            let word = self.read_string()?;
            match word.parse::<Keyword>() {
                Ok(keyword) => keywords.push(keyword),
                Err(_) => trace!(keyword = %word, "ignoring attribute keyword"),
            }
        }
        Ok(keywords)
    }
}
