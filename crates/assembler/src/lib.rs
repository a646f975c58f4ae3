// --- PCODE ASSEMBLER ---
// One instruction per line, whitespace separated, mnemonics case-insensitive.
//
//   LIT 5      LOD 0      STO 3
//   ADD  SUB  MUL  DIV  WRT  ILL

use pcode_abi::{Instruction, Opcode, Word};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: cannot parse `{text}`")]
    InvalidLine { line: usize, text: String },
}

fn opcode_for(mnemonic: &str) -> Option<Opcode> {
    Opcode::ALL
        .into_iter()
        .find(|op| op.mnemonic().eq_ignore_ascii_case(mnemonic))
}

/// Parses a single line. Anything malformed yields `None`, never a partial instruction.
pub fn parse_instruction(line: &str) -> Option<Instruction> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [mnemonic] => {
            let op = opcode_for(mnemonic)?;
            (!op.takes_operand()).then(|| Instruction::from_parts(op, 0))
        }
        [mnemonic, operand] => {
            let op = opcode_for(mnemonic)?;
            if !op.takes_operand() {
                return None;
            }
            let x = operand.parse::<i32>().ok()?;
            Some(Instruction::from_parts(op, x))
        }
        _ => None,
    }
}

/// Parses every line, silently dropping the ones that do not parse.
pub fn parse_all(source: &str) -> Vec<Instruction> {
    source.lines().filter_map(parse_instruction).collect()
}

fn is_skippable(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#') || t.starts_with(';')
}

/// Strict assembly: blank and comment lines (`#`, `;`) are skipped, every
/// other line must parse.
pub fn assemble(source: &str) -> Result<Vec<Instruction>, AsmError> {
    let mut out = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        if is_skippable(line) {
            continue;
        }
        let instr = parse_instruction(line).ok_or_else(|| AsmError::InvalidLine {
            line: idx + 1,
            text: line.trim().to_string(),
        })?;
        out.push(instr);
    }
    debug!(count = out.len(), "assembled source");
    Ok(out)
}

/// One line per word, in the same syntax `assemble` accepts. Unknown tags render as `BAD`.
pub fn disassemble(words: &[Word]) -> String {
    let mut out = String::new();
    for word in words {
        out.push_str(&word.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_and_spacing() {
        let input = "
    ===== invalid lines will be ignored ======
    ILL
    LIT
    LOD
    STO 1
    add
    sUB
    MuL
    DiV
    wrt
    ADD
LIT                                                      1
                                     LOD            1
\t\t\t\t\tSTO 1
    ==== Below this line are invalid instructions====
    LIT 2147483648
    WRT WRT
";
        let expected = vec![
            Instruction::Ill,
            Instruction::Sto(1),
            Instruction::Add,
            Instruction::Sub,
            Instruction::Mul,
            Instruction::Div,
            Instruction::Wrt,
            Instruction::Add,
            Instruction::Lit(1),
            Instruction::Lod(1),
            Instruction::Sto(1),
        ];
        assert_eq!(parse_all(input), expected);
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in [
            "",
            "LIT",
            "LIT x",
            "LIT 1 2",
            "LIT 2147483648",
            "LIT -2147483649",
            "ADD 1",
            "WRT WRT",
            "NOP",
            "LIT 0x10",
        ] {
            assert_eq!(parse_instruction(line), None, "line {line:?}");
        }
    }

    #[test]
    fn accepts_signed_operands() {
        assert_eq!(parse_instruction("lit -2147483648"), Some(Instruction::Lit(i32::MIN)));
        assert_eq!(parse_instruction("LOD +7"), Some(Instruction::Lod(7)));
    }

    #[test]
    fn rendered_instructions_reparse() {
        let all = [
            Instruction::Ill,
            Instruction::Lit(i32::MIN),
            Instruction::Lod(0),
            Instruction::Sto(i32::MAX),
            Instruction::Add,
            Instruction::Sub,
            Instruction::Mul,
            Instruction::Div,
            Instruction::Wrt,
        ];
        for instr in all {
            assert_eq!(parse_instruction(&instr.to_string()), Some(instr));
        }
    }

    #[test]
    fn assemble_reports_first_bad_line() {
        let src = "# sum\nLIT 1\n\n; two\nLIT 2\nADDD\nWRT\n";
        let err = assemble(src).unwrap_err();
        assert_eq!(
            err,
            AsmError::InvalidLine { line: 6, text: "ADDD".to_string() }
        );
    }

    #[test]
    fn assemble_skips_comments_and_blanks() {
        let src = "# sum\nLIT 1\n\n  ; two\nLIT 2\nADD\nWRT\n";
        assert_eq!(
            assemble(src).unwrap(),
            vec![Instruction::Lit(1), Instruction::Lit(2), Instruction::Add, Instruction::Wrt]
        );
    }

    #[test]
    fn disassemble_roundtrips_through_assemble() {
        let program = vec![
            Instruction::Lit(3),
            Instruction::Sto(0),
            Instruction::Lod(0),
            Instruction::Wrt,
        ];
        let words: Vec<Word> = program.iter().copied().map(Word::from).collect();
        let text = disassemble(&words);
        assert_eq!(text, "LIT 3\nSTO 0\nLOD 0\nWRT\n");
        assert_eq!(assemble(&text).unwrap(), program);
    }

    #[test]
    fn disassemble_marks_unknown_tags() {
        assert_eq!(disassemble(&[Word::new(77, 1)]), "BAD\n");
    }
}
