//! Source line parser for instructions, labels, and linker directives.
//!
//! Lines are tab-separated: `label \t opcode \t op0 \t op1 \t op2`. The label
//! field may be empty. Fields past the opcode's operand count are ignored,
//! which is how comments are written. A line whose first non-blank
//! character is `#` is a linker directive.

use std::fmt;
use std::path::PathBuf;

use lc2k_core::Opcode;

use crate::errors::ErrorKind;
use crate::mnemonic::{resolve_mnemonic, Mnemonic};

/// An operand: a decimal literal or a label reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Signed decimal integer.
    Literal(i32),
    /// Alphabetic label name.
    Symbol(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::Symbol(name) => f.write_str(name),
        }
    }
}

/// The opcode-and-operands part of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Machine instruction with exactly `opcode.operand_count()` operands.
    Instruction {
        /// The opcode.
        opcode: Opcode,
        /// Operands in source order.
        operands: Vec<Operand>,
    },
    /// `.fill` data word.
    Fill(Operand),
}

impl Statement {
    /// The mnemonic this statement was written with.
    #[must_use]
    pub const fn mnemonic(&self) -> Mnemonic {
        match self {
            Self::Instruction { opcode, .. } => Mnemonic::Instruction(*opcode),
            Self::Fill(_) => Mnemonic::Fill,
        }
    }

    /// Returns `true` for `.fill` lines.
    #[must_use]
    pub const fn is_fill(&self) -> bool {
        matches!(self, Self::Fill(_))
    }
}

/// A code or data line with its optional label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// 1-indexed source line number.
    pub line: usize,
    /// Label defined on this line.
    pub label: Option<String>,
    /// Opcode and operands.
    pub statement: Statement,
}

/// Linker directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `#LINK path`: lay the file out after this module.
    Link(PathBuf),
    /// `#RUN path`: lay the file out before everything else.
    Run(PathBuf),
    /// `#BREAK`: breakpoint at the next code line.
    Break,
}

/// Result of parsing one physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceItem {
    /// Empty or whitespace-only line.
    Blank,
    /// Linker directive.
    Directive(Directive),
    /// Code or data line.
    Line(ParsedLine),
}

/// Splits source text into `(line_number, text)` pairs.
///
/// Line numbers are 1-indexed. A trailing `\r` is stripped and a missing
/// final newline does not drop the last line.
pub fn source_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.strip_suffix('\r').unwrap_or(line)))
}

/// Returns `true` when `name` is non-empty and made only of ASCII letters.
#[must_use]
pub fn is_alphabetic_label(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic())
}

/// Parses one physical line.
///
/// # Errors
///
/// Returns the [`ErrorKind`] describing the first problem found on the
/// line: an unknown directive or mnemonic, an invalid label or operand, or
/// too few operands.
pub fn parse_line(text: &str, line: usize) -> Result<SourceItem, ErrorKind> {
    if text.trim().is_empty() {
        return Ok(SourceItem::Blank);
    }
    if text.trim_start().starts_with('#') {
        return parse_directive(text).map(SourceItem::Directive);
    }

    let mut fields = text.split('\t').map(str::trim);
    let label = match fields.next() {
        Some("") | None => None,
        Some(name) if is_alphabetic_label(name) => Some(name.to_owned()),
        Some(name) => return Err(ErrorKind::InvalidLabel(name.to_owned())),
    };

    let name = fields.next().unwrap_or("");
    if name.is_empty() {
        return Err(ErrorKind::MissingOpcode);
    }
    let mnemonic =
        resolve_mnemonic(name).ok_or_else(|| ErrorKind::UnknownOpcode(name.to_owned()))?;

    let expected = mnemonic.operand_count();
    let raw: Vec<&str> = fields.take(expected).take_while(|f| !f.is_empty()).collect();
    if raw.len() < expected {
        return Err(ErrorKind::OperandCount {
            mnemonic: name.to_owned(),
            expected,
            found: raw.len(),
        });
    }
    let mut operands = raw
        .into_iter()
        .map(parse_operand)
        .collect::<Result<Vec<_>, _>>()?;

    let statement = match mnemonic {
        Mnemonic::Instruction(opcode) => Statement::Instruction { opcode, operands },
        Mnemonic::Fill => match operands.pop() {
            Some(value) => Statement::Fill(value),
            None => {
                return Err(ErrorKind::OperandCount {
                    mnemonic: name.to_owned(),
                    expected,
                    found: 0,
                })
            }
        },
    };

    Ok(SourceItem::Line(ParsedLine {
        line,
        label,
        statement,
    }))
}

/// Parses an operand field.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidOperand`] for anything other than a decimal
/// `i32` or an alphabetic label.
pub fn parse_operand(text: &str) -> Result<Operand, ErrorKind> {
    if let Ok(value) = text.parse::<i32>() {
        return Ok(Operand::Literal(value));
    }
    if is_alphabetic_label(text) {
        return Ok(Operand::Symbol(text.to_owned()));
    }
    Err(ErrorKind::InvalidOperand(text.to_owned()))
}

/// Parses a `#` directive line.
///
/// # Errors
///
/// Returns [`ErrorKind::UnknownDirective`] for unrecognized names and
/// [`ErrorKind::MissingDirectivePath`] for `#LINK`/`#RUN` without a path.
pub fn parse_directive(text: &str) -> Result<Directive, ErrorKind> {
    let text = text.trim();
    let (name, rest) = text
        .split_once(char::is_whitespace)
        .map_or((text, ""), |(name, rest)| (name, rest.trim()));

    let path = || {
        if rest.is_empty() {
            Err(ErrorKind::MissingDirectivePath(name.to_owned()))
        } else {
            Ok(PathBuf::from(rest))
        }
    };

    match name {
        "#LINK" => path().map(Directive::Link),
        "#RUN" => path().map(Directive::Run),
        "#BREAK" => Ok(Directive::Break),
        other => Err(ErrorKind::UnknownDirective(other.to_owned())),
    }
}
