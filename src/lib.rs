// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # loomscope
//!
//! A loader and reflection runtime for compiled LoomScript executables. `loomscope` reads
//! the binary assembly format a LoomScript compiler emits, resolves every type across all
//! embedded assemblies, binds `native` methods to host functions and hands out a fully
//! linked reflection graph ready for a bytecode interpreter.
//!
//! ## Features
//!
//! - **📦 Efficient memory access** - Memory-mapped files and zlib containers
//! - **🔗 Forward-declared types** - Every type of the closure exists before any record is read
//! - **🧭 Reference closure** - Each embedded assembly is loaded at most once, cycles included
//! - **🛡️ Validation** - Ordinals, type positions, native signatures and bytecode modes
//! - **🧩 Host integration** - Native function registry and a pluggable bytecode executor
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loomscope::prelude::*;
//!
//! let vm = Vm::new();
//! vm.register_core_types();
//!
//! let assembly = vm.load_executable_file("game.loom")?;
//! for ty in assembly.types() {
//!     println!("{} ({} members)", ty.full_name, ty.members().len());
//! }
//! # Ok::<(), loomscope::Error>(())
//! ```
//!
//! ### Reading the header first
//!
//! A host can inspect the entry assembly's name, version and configuration before
//! committing to a full load:
//!
//! ```rust,no_run
//! use loomscope::Vm;
//!
//! let vm = Vm::new();
//! let data = std::fs::read("game.loom")?;
//! let header = vm.load_executable_header(&data)?;
//! println!("{} {} (debug: {})", header.name(), header.version(), header.is_debug_build());
//! let assembly = header.load_body()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`binary`] - Wire format, string pool, definition model and writer
//! - [`loader`] - Session tables, record readers and the reference work-list
//! - [`reflection`] - Assemblies, modules, types and members
//! - [`runtime`] - The [`Vm`], native registry, signature validation and invocation
//! - [`config`] - Loader options and the embedded assembly configuration
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Every load either returns a fully linked assembly or an [`Error`]; nothing is
//! registered with the [`Vm`] from a failed load.
//!
//! ```rust,no_run
//! use loomscope::{Error, Vm};
//!
//! match Vm::new().load_executable_file("game.loom") {
//!     Ok(assembly) => println!("Loaded {}", assembly.name()),
//!     Err(Error::MissingNative { type_name, member }) => {
//!         println!("Host does not implement {}:{}", type_name, member)
//!     }
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use loomscope::prelude::*;
///
/// let vm = Vm::with_config(LoaderConfig::production());
/// let assembly = vm.load_executable_file("game.loom")?;
/// assembly.bootstrap(&vm)?;
/// # Ok::<(), loomscope::Error>(())
/// ```
pub mod prelude;

/// The binary executable format: string pool, record layout and the writer
pub mod binary;

/// Loader options and the JSON configuration embedded in assemblies
pub mod config;

/// File access: memory-mapped and in-memory inputs, the compressed container, the cursor
pub mod file;

/// Deserialization of executables into the reflection graph
pub mod loader;

/// The reflection model: assemblies, modules, types and their members
///
/// # Key Types
///
/// - [`reflection::Assembly`] - A loaded assembly with its modules and type table
/// - [`reflection::Type`] - A type with its members and dispatch table
/// - [`reflection::MethodInfo`] - A method with its parameters and body
pub mod reflection;

/// The virtual machine a host embeds: type registry, natives and invocation
pub mod runtime;

/// `loomscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `loomscope` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Provides access to low-level file and memory parsing utilities.
///
/// The [`Parser`] is the bounds-checked little-endian cursor every reader uses; [`File`]
/// holds an executable from disk or memory.
pub use file::{parser::Parser, File};

/// The entry point for loading executables
pub use runtime::Vm;

/// An executable whose entry header was read and whose body is pending
pub use loader::ExecutableHeader;
