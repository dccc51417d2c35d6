//! Per-file two-pass resolution.
//!
//! A [`Module`] holds one source unit split into code lines and `.fill` data
//! lines. Pass 1 assigns every label an absolute address. Pass 2 rewrites
//! symbolic operands as numbers, turning `beq` targets into displacements.
//! Each module sees only its own labels.

use std::fmt;

use lc2k_core::{Instruction, Opcode};

use crate::errors::{AsmError, ErrorKind};
use crate::parser::{Operand, ParsedLine, Statement};
use crate::symbols::{is_builtin, label_scope, LabelScope, SymbolTable};

/// A line after resolution, ready to be rendered as program text.
///
/// Operands are numeric except for references to built-in symbols the
/// module does not define, which the assembler resolves later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    /// Exported label kept on the line.
    pub label: Option<String>,
    /// Opcode with resolved operands.
    pub statement: Statement,
}

impl fmt::Display for ResolvedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label.as_deref().unwrap_or(""))?;
        write!(f, "\t{}", self.statement.mnemonic().as_str())?;
        match &self.statement {
            Statement::Instruction { operands, .. } => {
                for operand in operands {
                    write!(f, "\t{operand}")?;
                }
            }
            Statement::Fill(value) => write!(f, "\t{value}")?,
        }
        Ok(())
    }
}

/// Output of [`Module::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Resolved code lines in order.
    pub code: Vec<ResolvedLine>,
    /// Resolved data lines in order.
    pub data: Vec<ResolvedLine>,
}

/// One source unit awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    name: String,
    code: Vec<ParsedLine>,
    data: Vec<ParsedLine>,
    code_start: i32,
}

/// Absolute address of the `index`-th line of a segment starting at `start`.
fn line_address(start: i32, index: usize) -> i32 {
    i32::try_from(index).map_or(i32::MAX, |index| start.saturating_add(index))
}

impl Module {
    /// Splits `lines` into code and data and places the code at `code_start`.
    #[must_use]
    pub fn new(name: impl Into<String>, lines: Vec<ParsedLine>, code_start: i32) -> Self {
        let (data, code) = lines
            .into_iter()
            .partition(|line| line.statement.is_fill());
        Self {
            name: name.into(),
            code,
            data,
            code_start,
        }
    }

    /// Module name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address of the first code line.
    #[must_use]
    pub const fn code_start(&self) -> i32 {
        self.code_start
    }

    /// Number of code lines.
    #[must_use]
    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Number of data lines.
    #[must_use]
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Total words this module contributes to the program.
    #[must_use]
    pub fn export_size(&self) -> usize {
        self.code.len() + self.data.len()
    }

    /// Pass 1: assigns every label its absolute address.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DuplicateLabel`] located at the second
    /// definition, or [`ErrorKind::ReservedLabel`] for a definition of a
    /// built-in name.
    pub fn collect_labels(&self, data_start: i32) -> Result<SymbolTable, AsmError> {
        let mut symbols = SymbolTable::new();
        let segments = [(&self.code, self.code_start), (&self.data, data_start)];
        for (lines, start) in segments {
            for (index, line) in lines.iter().enumerate() {
                if let Some(label) = &line.label {
                    if is_builtin(label) {
                        let kind = ErrorKind::ReservedLabel(label.clone());
                        return Err(AsmError::at(kind, &self.name, line.line));
                    }
                    symbols
                        .define(label, line_address(start, index), line.line)
                        .map_err(|kind| AsmError::at(kind, &self.name, line.line))?;
                }
            }
        }
        Ok(symbols)
    }

    /// Pass 2: resolves every line against this module's own labels.
    ///
    /// Consumes the module; resolution happens exactly once, after the
    /// linker has fixed the data start.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate or undefined label, symbolic register,
    /// or out-of-range field, located at its source line.
    pub fn resolve(self, data_start: i32) -> Result<ResolvedModule, AsmError> {
        let symbols = self.collect_labels(data_start)?;
        let resolver = Resolver {
            symbols: &symbols,
            code_start: self.code_start,
        };

        let code = self
            .code
            .into_iter()
            .enumerate()
            .map(|(index, line)| resolver.line(line, index))
            .collect::<Result<Vec<_>, _>>();
        let data = self
            .data
            .into_iter()
            .map(|line| resolver.line(line, 0))
            .collect::<Result<Vec<_>, _>>();

        let located = |(kind, line): (ErrorKind, usize)| AsmError::at(kind, &self.name, line);
        Ok(ResolvedModule {
            code: code.map_err(located)?,
            data: data.map_err(located)?,
        })
    }
}

struct Resolver<'a> {
    symbols: &'a SymbolTable,
    code_start: i32,
}

impl Resolver<'_> {
    fn line(&self, line: ParsedLine, index: usize) -> Result<ResolvedLine, (ErrorKind, usize)> {
        let number = line.line;
        let label = line
            .label
            .filter(|name| label_scope(name) == LabelScope::Exported);
        let statement = match line.statement {
            Statement::Instruction { opcode, operands } => {
                self.instruction(opcode, operands, index)
            }
            Statement::Fill(value) => self.operand(value, None).map(Statement::Fill),
        }
        .map_err(|kind| (kind, number))?;
        Ok(ResolvedLine { label, statement })
    }

    fn instruction(
        &self,
        opcode: Opcode,
        operands: Vec<Operand>,
        index: usize,
    ) -> Result<Statement, ErrorKind> {
        let mut operands = operands.into_iter();
        let mut registers = Vec::with_capacity(2);
        for operand in operands.by_ref().take(opcode.operand_count().min(2)) {
            match operand {
                Operand::Literal(value) => registers.push(value),
                Operand::Symbol(name) => return Err(ErrorKind::SymbolicRegister(name)),
            }
        }

        let third = match operands.next() {
            Some(operand) => {
                let next = (opcode == Opcode::Beq)
                    .then(|| line_address(self.code_start, index).saturating_add(1));
                Some(self.operand(operand, next)?)
            }
            None => None,
        };

        if let [a0, a1] = registers[..] {
            let a2 = match &third {
                Some(Operand::Literal(value)) => Some(*value),
                Some(Operand::Symbol(_)) => None,
                None => Some(0),
            };
            if let Some(a2) = a2 {
                Instruction::new(opcode, a0, a1, a2)?;
            }
        }

        let operands = registers
            .into_iter()
            .map(Operand::Literal)
            .chain(third)
            .collect();
        Ok(Statement::Instruction { opcode, operands })
    }

    /// Resolves a third operand or `.fill` value. With `relative_to`, a
    /// symbol becomes a displacement from that address.
    fn operand(&self, operand: Operand, relative_to: Option<i32>) -> Result<Operand, ErrorKind> {
        let Operand::Symbol(name) = operand else {
            return Ok(operand);
        };
        if is_builtin(&name) {
            return Ok(Operand::Symbol(name));
        }
        let target = self.symbols.address_of(&name)?;
        Ok(Operand::Literal(
            relative_to.map_or(target, |base| target.wrapping_sub(base)),
        ))
    }
}
