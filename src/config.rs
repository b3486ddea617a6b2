//! Loader settings and the configuration embedded in assemblies.
//!
//! [`LoaderConfig`] controls how strictly the loader checks an executable. It comes with a
//! set of presets, from [`LoaderConfig::strict`] for untrusted input down to
//! [`LoaderConfig::disabled`] for trusted blobs that are loaded often.
//!
//! [`AssemblyConfig`] is the JSON document the compiler embeds in every assembly header.
//! It is available after the header phase of a split load, before any type is read.
//!
//! # Examples
//!
//! ```rust,no_run
//! use loomscope::{config::LoaderConfig, Vm};
//!
//! let vm = Vm::with_config(LoaderConfig::production());
//! let data = std::fs::read("app.loom")?;
//! let header = vm.load_executable_header(&data)?;
//! if header.config().wait_for_debugger() {
//!     println!("waiting on {:?}", header.config().debugger_host());
//! }
//! let assembly = header.load_body()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{runtime::ConversionTable, Result};

/// The bytecode flavour a host executes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BytecodeMode {
    /// Bytecode for the interpreter
    #[default]
    Interpreted,
    /// Bytecode for the JIT
    Jit,
}

impl BytecodeMode {
    /// Mode matching an assembly's `jit` header flag
    #[must_use]
    pub fn from_jit_flag(jit: bool) -> Self {
        if jit {
            BytecodeMode::Jit
        } else {
            BytecodeMode::Interpreted
        }
    }
}

/// Configuration for loading executables
///
/// Structural reads are always checked: counts, string indices, type names and ordinals.
/// The switches here add the checks that cost extra work or that a trusted toolchain
/// makes redundant.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct LoaderConfig {
    /// The bytecode mode of this host; assemblies compiled for the other mode are rejected
    pub bytecode_mode: BytecodeMode,

    /// Compare native signatures against the script declarations of bound methods
    pub validate_native_signatures: bool,

    /// Require a host registration with matching `managed` flag for every `[Native]` type
    pub validate_native_types: bool,

    /// Check that each type record starts at its indexed position and spans its indexed length
    pub verify_type_positions: bool,

    /// Treat a wire boolean other than 0 or 1 as corruption
    pub strict_booleans: bool,

    /// Maximum depth of nested reference loading
    pub max_reference_depth: usize,

    /// Largest member ordinal accepted, bounds dispatch table allocation
    pub max_ordinal: u32,

    /// Native type names and their script categories
    pub conversions: ConversionTable,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            bytecode_mode: BytecodeMode::Interpreted,
            validate_native_signatures: true,
            validate_native_types: true,
            verify_type_positions: true,
            strict_booleans: true,
            max_reference_depth: 256,
            max_ordinal: 65_535,
            conversions: ConversionTable::default(),
        }
    }
}

impl LoaderConfig {
    /// Every check enabled with tight limits, for input from untrusted sources
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_reference_depth: 64,
            max_ordinal: 4_096,
            ..Self::default()
        }
    }

    /// Only the checks whose failure would make the graph unsafe to execute
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            validate_native_types: false,
            verify_type_positions: false,
            strict_booleans: false,
            ..Self::default()
        }
    }

    /// Checks a host depends on at run time, skipping layout checks of compiler output
    #[must_use]
    pub fn production() -> Self {
        Self {
            verify_type_positions: false,
            strict_booleans: false,
            ..Self::default()
        }
    }

    /// No optional checks at all
    ///
    /// **Warning**: native bindings are attached without comparing signatures, a mismatch
    /// surfaces only when the method is called.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            validate_native_signatures: false,
            validate_native_types: false,
            verify_type_positions: false,
            strict_booleans: false,
            ..Self::default()
        }
    }

    /// Same settings, for a host running `mode` bytecode
    #[must_use]
    pub fn with_bytecode_mode(mut self, mode: BytecodeMode) -> Self {
        self.bytecode_mode = mode;
        self
    }
}

/// A boolean that older compilers wrote as a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    /// `true` / `false`
    Bool(bool),
    /// Non-zero means set
    Int(i64),
}

impl Flag {
    /// The flag as a boolean
    #[must_use]
    pub fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

/// The `display` block of an application config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Window title
    pub title: Option<String>,
    /// Horizontal position, a number or a placement keyword
    pub x: Option<serde_json::Value>,
    /// Vertical position, a number or a placement keyword
    pub y: Option<serde_json::Value>,
    /// Window width in pixels
    pub width: Option<i64>,
    /// Window height in pixels
    pub height: Option<i64>,
    /// `landscape` or `portrait`
    pub orientation: Option<String>,
    /// Start maximized
    pub maximized: Option<bool>,
    /// Start minimized
    pub minimized: Option<bool>,
    /// Window can be resized
    pub resizable: Option<bool>,
    /// Window has no decorations
    pub borderless: Option<bool>,
    /// `window`, `fullscreen` or `borderless`
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ApplicationSettings {
    app_id: Option<String>,
    app_type: Option<String>,
    version: Option<String>,
    #[serde(rename = "waitForDebugger")]
    wait_for_debugger: Option<Flag>,
    #[serde(rename = "debuggerHost")]
    debugger_host: Option<String>,
    #[serde(rename = "debuggerPort")]
    debugger_port: Option<u16>,
    display: Option<DisplaySettings>,
}

/// One entry of the `log` block: the settings for a dotted logger group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRule {
    /// Dotted group name, empty for the root block
    pub group: String,
    /// Whether the group logs at all
    pub enabled: Option<bool>,
    /// Minimum level logged
    pub level: Option<i64>,
}

/// The JSON configuration embedded in an assembly header
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    raw: serde_json::Value,
    settings: ApplicationSettings,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        AssemblyConfig {
            raw: serde_json::Value::Object(serde_json::Map::new()),
            settings: ApplicationSettings::default(),
        }
    }
}

impl AssemblyConfig {
    /// Parse the embedded config text. An empty string is an empty config.
    ///
    /// # Errors
    /// Returns [`crate::Error::Config`] if the text is not JSON, or a well known key has
    /// the wrong type.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: serde_json::Value = serde_json::from_str(text)?;
        let settings = ApplicationSettings::deserialize(&raw)?;
        Ok(AssemblyConfig { raw, settings })
    }

    /// The whole document
    #[must_use]
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Top level value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.raw.get(key)
    }

    /// Returns true if the config has no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.as_object().map_or(true, serde_json::Map::is_empty)
    }

    /// Application identifier
    #[must_use]
    pub fn app_id(&self) -> Option<&str> {
        self.settings.app_id.as_deref()
    }

    /// Application type, e.g. `game` or `console`
    #[must_use]
    pub fn app_type(&self) -> Option<&str> {
        self.settings.app_type.as_deref()
    }

    /// Application version
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.settings.version.as_deref()
    }

    /// Whether the host should block until a debugger attaches
    #[must_use]
    pub fn wait_for_debugger(&self) -> bool {
        self.settings.wait_for_debugger.is_some_and(Flag::is_set)
    }

    /// Debugger host name
    #[must_use]
    pub fn debugger_host(&self) -> Option<&str> {
        self.settings.debugger_host.as_deref()
    }

    /// Debugger port
    #[must_use]
    pub fn debugger_port(&self) -> Option<u16> {
        self.settings.debugger_port
    }

    /// The `display` block
    #[must_use]
    pub fn display(&self) -> Option<&DisplaySettings> {
        self.settings.display.as_ref()
    }

    /// Flatten the `log` block into one rule per group.
    ///
    /// Nested objects name sub-groups, so `{"log": {"level": 1, "net": {"enabled": false}}}`
    /// yields a root rule with level 1 and a rule for group `net`.
    #[must_use]
    pub fn log_rules(&self) -> Vec<LogRule> {
        let mut rules = Vec::new();
        if let Some(block) = self.raw.get("log") {
            let mut pending = vec![(String::new(), block)];
            while let Some((group, block)) = pending.pop() {
                let Some(object) = block.as_object() else {
                    continue;
                };

                let enabled = object.get("enabled").and_then(|v| match v {
                    serde_json::Value::Bool(b) => Some(*b),
                    serde_json::Value::Number(n) => n.as_i64().map(|i| i != 0),
                    _ => None,
                });
                let level = object.get("level").and_then(serde_json::Value::as_i64);
                if enabled.is_some() || level.is_some() {
                    rules.push(LogRule {
                        group: group.clone(),
                        enabled,
                        level,
                    });
                }

                for (key, value) in object.iter().rev() {
                    if key != "enabled" && key != "level" && value.is_object() {
                        let child = if group.is_empty() {
                            key.clone()
                        } else {
                            format!("{group}.{key}")
                        };
                        pending.push((child, value));
                    }
                }
            }
        }
        rules
    }
}
