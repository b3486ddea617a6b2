use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    ($offset:expr, $len:expr) => {
        crate::Error::OutOfBounds {
            offset: $offset,
            len: $len,
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure while loading an executable is fatal for that load: a corrupt or mismatched
/// assembly is never partially materialized. The variants are grouped by the kind of fault.
///
/// # Error Categories
///
/// ## Corruption Errors
/// - [`Error::Malformed`] - Structurally invalid binary data
/// - [`Error::OutOfBounds`] - A read past the end of the buffer was attempted
/// - [`Error::StringIndexOutOfRange`] - A pool index outside the string pool
/// - [`Error::UnresolvedType`] - A type name that neither the closure nor the host knows
/// - [`Error::OrdinalCollision`] - Two members of one type share a dispatch ordinal
/// - [`Error::TypeIdOutOfRange`] - A type id outside its assembly's type table
///
/// ## Compatibility Errors
/// - [`Error::BytecodeModeMismatch`] - JIT and interpreted bytecode mixed
/// - [`Error::NotSupported`] - Unknown container version
///
/// ## Native Binding Errors
/// - [`Error::MissingNative`] - A native method without a registered implementation
/// - [`Error::UnnecessaryNative`] - A registered implementation the runtime must not use
/// - [`Error::SignatureMismatch`] - Script and native signatures disagree
/// - [`Error::NativeTypeMismatch`] - A native type annotation disagrees with the host
///
/// ## Runtime Errors
/// - [`Error::MissingEntryPoint`] - No static method of the requested name
/// - [`Error::TypeOutOfRange`] - Type index access beyond the assembly's types
/// - [`Error::Execution`] - Invocation failed or no executor is installed
///
/// # Examples
///
/// ```rust,no_run
/// use loomscope::{Error, Vm};
///
/// let vm = Vm::new();
/// match vm.load_executable_file("game.loom") {
///     Ok(assembly) => println!("Loaded {}", assembly.name()),
///     Err(Error::BytecodeModeMismatch { assembly, .. }) => {
///         eprintln!("{} was compiled for another bytecode mode", assembly);
///     }
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Corrupt executable: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // Corruption errors
    /// The binary is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading the binary.
    ///
    /// A truncated stream is always a corruption fault, never a short read.
    #[error("Out of bound read of {len} bytes at offset {offset}")]
    OutOfBounds {
        /// Offset at which the read started
        offset: usize,
        /// Number of bytes that were requested
        len: usize,
    },

    /// A string pool index does not name a pool entry.
    ///
    /// Only `-1` is reserved (the empty string); every other index must be in range.
    #[error("String pool index {index} is out of range (pool holds {count} strings)")]
    StringIndexOutOfRange {
        /// The offending wire index
        index: i32,
        /// Number of strings in the pool
        count: usize,
    },

    /// A type name could not be resolved against the load closure or the host.
    #[error("Unable to resolve type '{0}'")]
    UnresolvedType(String),

    /// Two members of the same type were written with the same ordinal.
    ///
    /// Ordinals are direct dispatch-table keys, so a collision can not be repaired.
    #[error("Ordinal {ordinal} of {type_name} is used by both '{existing}' and '{incoming}'")]
    OrdinalCollision {
        /// Full name of the declaring type
        type_name: String,
        /// The colliding ordinal
        ordinal: u32,
        /// Member that already occupies the slot
        existing: String,
        /// Member that tried to claim the slot
        incoming: String,
    },

    /// A type id is outside `1..=type_count` of its assembly, or is used twice.
    #[error("Type id {type_id} of {type_name} is invalid for assembly {assembly} ({count} types)")]
    TypeIdOutOfRange {
        /// Name of the declaring assembly
        assembly: String,
        /// Full name of the type
        type_name: String,
        /// The wire type id
        type_id: i32,
        /// Number of types in the assembly
        count: usize,
    },

    // Compatibility errors
    /// The assembly was compiled for a different bytecode mode than the host runs.
    #[error("Assembly {assembly}.loom has {found} bytecode, {expected} required")]
    BytecodeModeMismatch {
        /// Name of the rejected assembly
        assembly: String,
        /// The host's bytecode mode
        expected: String,
        /// The assembly's bytecode mode
        found: String,
    },

    /// This container format or version is not supported.
    #[error("This container format is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    // Native binding errors
    /// A method marked native has no registered implementation.
    #[error("Missing native function {type_name}:{member}")]
    MissingNative {
        /// Full name of the declaring type
        type_name: String,
        /// Name of the native member
        member: String,
    },

    /// A primitive instance method is handled by the runtime and must not be registered.
    #[error("Unnecessary primitive native instance function {type_name}:{member}")]
    UnnecessaryNative {
        /// Full name of the declaring type
        type_name: String,
        /// Name of the native member
        member: String,
    },

    /// The declared script signature does not match the bound native implementation.
    #[error("Signature mismatch for {member}: script ({script}) vs native ({native})")]
    SignatureMismatch {
        /// Qualified member name, `package.Type:member`
        member: String,
        /// Rendered script signature
        script: String,
        /// Rendered native signature
        native: String,
    },

    /// A `Native` annotated type disagrees with the host's native type registration.
    #[error("Native type {type_name}: {message}")]
    NativeTypeMismatch {
        /// Full name of the script type
        type_name: String,
        /// What did not match
        message: String,
    },

    // Runtime errors
    /// No static method with the requested name exists in the assembly.
    #[error("Unable to find {method} method in Assembly {assembly}")]
    MissingEntryPoint {
        /// Name of the assembly that was searched
        assembly: String,
        /// Name of the method that was requested
        method: String,
    },

    /// A type index access was outside the assembly's types.
    #[error("Type index {index} out of range ({count} types)")]
    TypeOutOfRange {
        /// Requested index
        index: usize,
        /// Number of available types
        count: usize,
    },

    /// A method invocation failed.
    #[error("{0}")]
    Execution(String),

    /// Recursion limit reached.
    ///
    /// Reference loading walks the dependency graph with an explicit work-list whose depth
    /// is bounded by configuration. The associated value shows the limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// Failed to lock target.
    #[error("Failed to lock target")]
    LockError,

    // External errors
    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The embedded assembly configuration is not valid JSON.
    #[error("Invalid assembly configuration - {0}")]
    Config(#[from] serde_json::Error),

    /// The container payload could not be decompressed.
    #[error("Decompression failed - {0}")]
    Decompress(String),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
