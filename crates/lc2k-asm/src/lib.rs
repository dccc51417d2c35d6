//! LC2K assembler and linker library.
//!
//! Source files are linked into one program text by [`linker::link`], then
//! turned into machine words by [`assembler::assemble`].

/// Program text to machine words.
pub mod assembler;
/// Structured link/assemble error types.
pub mod errors;
/// Multi-module linking and the source file collaborator.
pub mod linker;
/// Mnemonic resolution against the core opcode table.
pub mod mnemonic;
/// Per-file two-pass resolution.
pub mod module;
/// Source line parser for instructions, labels, and directives.
pub mod parser;
/// Symbol tables and label scoping.
pub mod symbols;

pub use assembler::{assemble, assemble_program};
pub use errors::{AsmError, ErrorClass, ErrorKind, SourceLoc};
pub use linker::{
    link, link_file, read_source_file, FsSources, MemorySources, Program, SourceProvider,
};

#[cfg(test)]
use rstest as _;
