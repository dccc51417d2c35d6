//! Program text to machine words.
//!
//! Assembles linked output or any standalone source that uses no
//! directives. Every line occupies one word at its line index. Labels of
//! any case are global in program text, and `Stack` defaults to the address
//! just past the last line. A linked [`Program`] is encoded from its
//! resolved lines directly, so labels kept on those lines play no part.

use lc2k_core::{encode_fill, Instruction, MachineWord, Opcode};

use crate::errors::{AsmError, ErrorKind};
use crate::linker::Program;
use crate::parser::{parse_line, source_lines, Operand, ParsedLine, SourceItem, Statement};
use crate::symbols::{SymbolTable, STACK_SYMBOL};

/// Module name used in diagnostics for assembled program text.
pub const PROGRAM_MODULE: &str = "program";

/// Assembles program text into words.
///
/// # Errors
///
/// Returns the first parse, label, or field-range error, located at its
/// 1-indexed source line. Directives are rejected.
pub fn assemble(text: &str) -> Result<Vec<MachineWord>, AsmError> {
    let mut lines = Vec::new();
    for (number, raw) in source_lines(text) {
        let located = |kind| AsmError::at(kind, PROGRAM_MODULE, number);
        match parse_line(raw, number).map_err(located)? {
            SourceItem::Blank => {}
            SourceItem::Line(line) => lines.push(line),
            SourceItem::Directive(_) => return Err(located(ErrorKind::NestedDirective)),
        }
    }
    assemble_lines(&lines)
}

/// Assembles a linked program.
///
/// Operands are already numeric apart from `Stack`, which is bound to the
/// address of the trailing `Stack` line. Errors are located at the
/// 1-indexed line of the linked text.
///
/// # Errors
///
/// Returns the first field-range error, for example a `Stack` offset that
/// does not fit 16 bits.
pub fn assemble_program(program: &Program) -> Result<Vec<MachineWord>, AsmError> {
    let lines = program.code.iter().chain(&program.data);
    let mut symbols = SymbolTable::new();
    let stack_line = program.len();
    let stack_address = i32::try_from(stack_line - 1).unwrap_or(i32::MAX);
    symbols
        .define(STACK_SYMBOL, stack_address, stack_line)
        .map_err(AsmError::new)?;

    let mut words = lines
        .zip(0i32..)
        .enumerate()
        .map(|(index, (line, address))| {
            encode_statement(&line.statement, address, &symbols)
                .map_err(|kind| AsmError::at(kind, PROGRAM_MODULE, index + 1))
        })
        .collect::<Result<Vec<_>, _>>()?;
    words.push(encode_fill(0));
    Ok(words)
}

/// Assembles already-parsed lines; line `i` is placed at address `i`.
///
/// # Errors
///
/// See [`assemble`].
pub fn assemble_lines(lines: &[ParsedLine]) -> Result<Vec<MachineWord>, AsmError> {
    let symbols = collect_labels(lines)?;
    lines
        .iter()
        .zip(0i32..)
        .map(|(line, address)| {
            encode_statement(&line.statement, address, &symbols)
                .map_err(|kind| AsmError::at(kind, PROGRAM_MODULE, line.line))
        })
        .collect()
}

fn collect_labels(lines: &[ParsedLine]) -> Result<SymbolTable, AsmError> {
    let mut symbols = SymbolTable::new();
    let mut end = 0i32;
    for (line, address) in lines.iter().zip(0i32..) {
        if let Some(label) = &line.label {
            symbols
                .define(label, address, line.line)
                .map_err(|kind| AsmError::at(kind, PROGRAM_MODULE, line.line))?;
        }
        end = address.saturating_add(1);
    }
    if !symbols.contains(STACK_SYMBOL) {
        symbols
            .define(STACK_SYMBOL, end, 0)
            .map_err(AsmError::new)?;
    }
    Ok(symbols)
}

fn encode_statement(
    statement: &Statement,
    address: i32,
    symbols: &SymbolTable,
) -> Result<MachineWord, ErrorKind> {
    match statement {
        Statement::Fill(value) => Ok(encode_fill(resolve(value, symbols)?)),
        Statement::Instruction { opcode, operands } => {
            let mut fields = [0i32; 3];
            for (index, (slot, operand)) in fields.iter_mut().zip(operands).enumerate() {
                *slot = match operand {
                    Operand::Literal(value) => *value,
                    Operand::Symbol(name) if index < 2 => {
                        return Err(ErrorKind::SymbolicRegister(name.clone()))
                    }
                    Operand::Symbol(name) => symbols.address_of(name)?,
                };
            }
            let [a0, a1, mut a2] = fields;
            if *opcode == Opcode::Beq && matches!(operands.get(2), Some(Operand::Symbol(_))) {
                a2 = a2.wrapping_sub(address.saturating_add(1));
            }
            Ok(Instruction::new(*opcode, a0, a1, a2)?.encode())
        }
    }
}

fn resolve(operand: &Operand, symbols: &SymbolTable) -> Result<i32, ErrorKind> {
    match operand {
        Operand::Literal(value) => Ok(*value),
        Operand::Symbol(name) => symbols.address_of(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::{link, MemorySources};
    use lc2k_core::{decode, FieldError};

    #[test]
    fn encodes_standalone_program() {
        let words = assemble("\tadd\t0\t1\t2\n\thalt\n").expect("assembles");
        assert_eq!(words, vec![(1 << 16) | 2, 6 << 23]);
    }

    #[test]
    fn beq_label_two_lines_later_has_displacement_one() {
        let words = assemble("\tbeq\t0\t0\tdone\n\tnoop\ndone\thalt\n").expect("assembles");
        let beq = decode(words[0]).expect("valid word");
        assert_eq!(beq.a2(), 1);
    }

    #[test]
    fn backward_branch_encodes_twos_complement() {
        let words = assemble("loop\tnoop\n\tbeq\t0\t0\tloop\n").expect("assembles");
        assert_eq!(words[1] & 0xFFFF, 0xFFFE);
        assert_eq!(decode(words[1]).map(|i| i.a2()), Ok(-2));
    }

    #[test]
    fn stack_defaults_to_line_count() {
        let words = assemble("\tlw\t0\t1\tptr\n\thalt\nptr\t.fill\tStack\n").expect("assembles");
        assert_eq!(words[2], 3);
    }

    #[test]
    fn explicit_stack_label_wins() {
        let words = assemble("\tnoop\nStack\t.fill\t0\n\t.fill\tStack\n").expect("assembles");
        assert_eq!(words[2], 1);
    }

    #[test]
    fn fill_keeps_full_width_literals() {
        let words = assemble("\t.fill\t-1\n\t.fill\t2147483647\n").expect("assembles");
        assert_eq!(words, vec![-1, i32::MAX]);
    }

    #[test]
    fn blank_lines_do_not_take_addresses() {
        let words = assemble("\n\tnoop\n\n   \nx\t.fill\tx\n").expect("assembles");
        assert_eq!(words[1], 1);
    }

    #[test]
    fn jalr_ignores_trailing_fields() {
        let words = assemble("\tjalr\t4\t7\tsubroutine call\n").expect("assembles");
        assert_eq!(words[0], (5 << 23) | (4 << 19) | (7 << 16));
    }

    #[test]
    fn reports_undefined_label_with_line() {
        let err = assemble("\tnoop\n\n\tlw\t0\t1\tnowhere\n").expect_err("undefined");
        assert_eq!(err.kind, ErrorKind::UndefinedLabel("nowhere".into()));
        assert_eq!(err.location.map(|l| l.line), Some(3));
    }

    #[test]
    fn reports_field_range_errors() {
        let err = assemble("\tlw\t0\t1\t40000\n").expect_err("offset too large");
        assert_eq!(err.kind, ErrorKind::Field(FieldError::OffsetOutOfRange(40_000)));

        let err = assemble("\tadd\t0\t1\t8\n").expect_err("register too large");
        assert_eq!(err.kind, ErrorKind::Field(FieldError::RegisterOutOfRange(8)));
    }

    #[test]
    fn rejects_symbolic_registers() {
        let err = assemble("x\tadd\tx\t1\t2\n").expect_err("numeric registers only");
        assert_eq!(err.kind, ErrorKind::SymbolicRegister("x".into()));
    }

    #[test]
    fn rejects_duplicate_labels() {
        let err = assemble("a\tnoop\na\thalt\n").expect_err("duplicate");
        assert!(matches!(err.kind, ErrorKind::DuplicateLabel { .. }));
    }

    #[test]
    fn rejects_directives() {
        let err = assemble("#LINK lib.as\n").expect_err("directive");
        assert_eq!(err.kind, ErrorKind::NestedDirective);
    }

    #[test]
    fn linked_modules_may_export_the_same_label() {
        let sources = MemorySources::new().with_file("lib.as", "Entry\tnoop\n\thalt\n");
        let program = link("main", "Entry\tnoop\n#LINK lib.as\n", &sources).expect("links");
        assert_eq!(
            program.text(),
            "Entry\tnoop\nEntry\tnoop\n\thalt\nStack\t.fill\t0\n"
        );

        let words = assemble_program(&program).expect("assembles");
        assert_eq!(words, vec![7 << 23, 7 << 23, 6 << 23, 0]);
    }

    #[test]
    fn linked_stack_binds_to_trailing_line() {
        let source = "\tlw\t0\t1\tsp\n\tbeq\t0\t0\tStack\nsp\t.fill\tStack\n";
        let program = link("main", source, &MemorySources::new()).expect("links");
        let words = assemble_program(&program).expect("assembles");

        assert_eq!(words.len(), program.len());
        assert_eq!(words[2], 3);
        assert_eq!(decode(words[1]).map(|i| i.a2()), Ok(1));
        assert_eq!(words[3], 0);
    }

    #[test]
    fn linked_program_matches_text_assembly() {
        let source = "\tlw\t0\t1\tval\nloop\tbeq\t0\t1\tloop\n\thalt\nval\t.fill\t-7\n";
        let program = link("main", source, &MemorySources::new()).expect("links");
        assert_eq!(
            assemble_program(&program).expect("assembles"),
            assemble(&program.text()).expect("assembles")
        );
    }
}
