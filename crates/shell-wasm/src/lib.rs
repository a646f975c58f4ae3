use pcode_abi::{Machine, MachineConfig, Word};
use wasm_bindgen::prelude::*;

/// Assembles `source`, runs it with the default stack size, and returns the
/// program output. Failures come back as a trailing `error: ...` line.
pub fn run_program(source: &str) -> String {
    let instructions = match pcode_asm::assemble(source) {
        Ok(i) => i,
        Err(e) => return format!("error: {}\n", e),
    };
    let words: Vec<Word> = instructions.into_iter().map(Word::from).collect();
    let config = MachineConfig { code_size: words.len(), ..MachineConfig::default() };
    let mut vm = Machine::new(config, Vec::new());
    let result = vm.load(&words).and_then(|_| vm.run());
    let mut report = String::from_utf8_lossy(vm.output()).into_owned();
    if let Err(e) = result {
        report.push_str(&format!("error: {}\n", e));
    }
    report
}

#[wasm_bindgen]
pub fn run_source(source: &str) -> String {
    run_program(source)
}

#[wasm_bindgen]
pub fn init_shell() -> String {
    "pcode: WASM Shell Online. Paste LIT/LOD/STO/ADD/SUB/MUL/DIV/WRT lines to run.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_source_to_output() {
        assert_eq!(run_program("LIT 7\nLIT 3\nDIV\nWRT\n"), "2\n");
    }

    #[test]
    fn output_before_failure_is_kept() {
        let out = run_program("LIT 1\nWRT\nLIT 2147483647\nLIT 1\nADD\n");
        assert_eq!(out, "1\nerror: arithmetic overflow in ADD\n");
    }

    #[test]
    fn assembly_errors_are_reported() {
        assert_eq!(run_program("LIT one\n"), "error: line 1: cannot parse `LIT one`\n");
    }
}
