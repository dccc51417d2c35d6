//! Structured error reporting for the link and assemble phases.
//!
//! Every error carries an [`ErrorKind`] and, when it can be attributed to a
//! source line, a [`SourceLoc`]. Errors render in the usual compiler style:
//!
//! ```text
//! lib.as:10: error: undefined label 'loop'
//! ```

use std::fmt;
use std::path::PathBuf;

use lc2k_core::FieldError;
use thiserror::Error;

/// A source location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    /// Module name (the file path for linked files).
    pub module: String,
    /// 1-indexed line number.
    pub line: usize,
}

impl SourceLoc {
    /// Creates a new source location.
    #[must_use]
    pub fn new(module: impl Into<String>, line: usize) -> Self {
        Self {
            module: module.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.line)
    }
}

/// Broad classification used by callers to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The source text is malformed or references something undefined.
    Resolution,
    /// A linked file could not be located or read.
    Io,
}

/// Classification of assembler and linker errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// A line has a label but no opcode.
    #[error("missing opcode")]
    MissingOpcode,
    /// Opcode field is not a known mnemonic.
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),
    /// Too few operands for the opcode.
    #[error("'{mnemonic}' expects {expected} operand(s), found {found}")]
    OperandCount {
        /// Mnemonic being parsed.
        mnemonic: String,
        /// Operands the mnemonic takes.
        expected: usize,
        /// Operands present on the line.
        found: usize,
    },
    /// Operand is neither a decimal integer nor a well-formed label.
    #[error("invalid operand '{0}'")]
    InvalidOperand(String),
    /// Register operand given as a symbol.
    #[error("register operand must be numeric, found '{0}'")]
    SymbolicRegister(String),
    /// Label contains characters other than ASCII letters.
    #[error("invalid label '{0}': labels must be alphabetic")]
    InvalidLabel(String),
    /// Label defined twice in one symbol table.
    #[error("duplicate label '{name}' (first defined at line {first_definition})")]
    DuplicateLabel {
        /// The label name.
        name: String,
        /// Line of the first definition.
        first_definition: usize,
    },
    /// A linked module defines a label the linker reserves.
    #[error("label '{0}' is reserved for the linker")]
    ReservedLabel(String),
    /// Operand references a label that is not defined.
    #[error("undefined label '{0}'")]
    UndefinedLabel(String),
    /// Resolved value does not fit the instruction field.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// `#` line that is not `#LINK`, `#RUN` or `#BREAK`.
    #[error("unknown directive '{0}'")]
    UnknownDirective(String),
    /// `#LINK` or `#RUN` without a path.
    #[error("directive '{0}' requires a path")]
    MissingDirectivePath(String),
    /// Directive outside the top-level source.
    #[error("directives are only allowed in the top-level source")]
    NestedDirective,
    /// Link target without the `.as` extension.
    #[error("linked file '{}' must have the .as extension", .0.display())]
    BadExtension(PathBuf),
    /// Link target not found as given nor relative to the base folder.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Link target exists but could not be read.
    #[error("failed to read {}: {message}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Operating-system error text.
        message: String,
    },
}

impl ErrorKind {
    /// Returns the class of this error kind.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound(_) | Self::Io { .. } => ErrorClass::Io,
            _ => ErrorClass::Resolution,
        }
    }
}

/// A link or assemble error with optional source context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmError {
    /// The kind of error.
    pub kind: ErrorKind,
    /// Source location if available.
    pub location: Option<SourceLoc>,
}

impl AsmError {
    /// Creates an error without location.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    /// Creates an error attributed to `module:line`.
    #[must_use]
    pub fn at(kind: ErrorKind, module: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            location: Some(SourceLoc::new(module, line)),
        }
    }

    /// Adds a source location to the error if it has none yet.
    #[must_use]
    pub fn or_location(mut self, loc: SourceLoc) -> Self {
        if self.location.is_none() {
            self.location = Some(loc);
        }
        self
    }

    /// Returns the error class.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// Formats the error for stderr output.
    #[must_use]
    pub fn format_for_stderr(&self) -> String {
        self.location.as_ref().map_or_else(
            || format!("error: {}", self.kind),
            |loc| format!("{loc}: error: {}", self.kind),
        )
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for AsmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Field(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ErrorKind> for AsmError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
