use colored::*;
use pcode_abi::{Instruction, Machine, MachineConfig, Opcode, Program, VmError, Word};

const MANIFESTO: &str = r#"
================================================================================
PCODE STACK MACHINE // LIVING SPECIFICATION
================================================================================

[ COMPONENTS ]
  abi        ISA, EPF v1 container ("ZQLS"), stack machine
  assembler  one instruction per line, case-insensitive mnemonics
  shell-cli  pcode asm | run | step | dump
  shell-wasm run_source() for the browser

================================================================================
UNIT TEST SUITE
================================================================================
"#;

fn main() {
    println!("{}", MANIFESTO);
    let mut passed = 0;
    let mut failed = 0;

    run_test("ISA_OPCODE_TAGS", test_opcode_tags, &mut passed, &mut failed);
    run_test("VM_ARITHMETIC_ADD", test_vm_add, &mut passed, &mut failed);
    run_test("VM_ARITHMETIC_SUB_ORDER", test_vm_sub, &mut passed, &mut failed);
    run_test("VM_ARITHMETIC_DIV_ORDER", test_vm_div, &mut passed, &mut failed);
    run_test("VM_OVERFLOW_TRAPS", test_vm_overflow, &mut passed, &mut failed);
    run_test("VM_IP_MONOTONIC", test_ip_monotonic, &mut passed, &mut failed);
    run_test("EPF_ROUNDTRIP", test_epf_roundtrip, &mut passed, &mut failed);
    run_test("ASM_ROUNDTRIP", test_asm_roundtrip, &mut passed, &mut failed);

    println!("\n--------------------------------------------------------------------------------");
    println!("{} passed, {} failed", passed, failed);
    if failed == 0 {
        println!("{}", "ALL SYSTEMS NOMINAL.".green().bold());
    } else {
        std::process::exit(1);
    }
}

// --- TEST INFRASTRUCTURE ---

fn run_test<F>(name: &str, test_fn: F, passed: &mut i32, failed: &mut i32)
where F: Fn() -> Result<(), String> {
    print!("TEST: {:<30} ... ", name);
    match test_fn() {
        Ok(_) => { println!("{}", "PASS".green()); *passed += 1; }
        Err(e) => { println!("{}", "FAIL".red()); println!("  -> {}", e); *failed += 1; }
    }
}

fn execute(source: &str) -> Result<String, VmError> {
    let words: Vec<Word> = pcode_asm::parse_all(source).into_iter().map(Word::from).collect();
    let config = MachineConfig { stack_size: 1024, code_size: words.len(), entry: 0 };
    let mut vm = Machine::new(config, Vec::new());
    vm.load(&words)?;
    vm.run()?;
    Ok(String::from_utf8_lossy(&vm.into_output()).into_owned())
}

fn expect_output(source: &str, expected: &str) -> Result<(), String> {
    match execute(source) {
        Ok(out) if out == expected => Ok(()),
        Ok(out) => Err(format!("{:?}: wanted {:?}, got {:?}", source, expected, out)),
        Err(e) => Err(format!("{:?}: {}", source, e)),
    }
}

fn test_opcode_tags() -> Result<(), String> {
    if (Opcode::Ill as i32) != 0 { return Err("ILL != 0".into()); }
    if (Opcode::Wrt as i32) != 8 { return Err("WRT != 8".into()); }
    if Opcode::try_from(9).is_ok() { return Err("tag 9 accepted".into()); }
    Ok(())
}

fn test_vm_add() -> Result<(), String> {
    expect_output("LIT 0\nLIT 1\nADD\nWRT", "1\n")?;
    expect_output("LIT 1\nLIT 0\nADD\nWRT", "1\n")
}

fn test_vm_sub() -> Result<(), String> {
    expect_output("LIT 0\nLIT 1\nSUB\nWRT", "-1\n")?;
    expect_output("LIT 1\nLIT 0\nSUB\nWRT", "1\n")
}

fn test_vm_div() -> Result<(), String> {
    expect_output("LIT 3\nLIT 7\nDIV\nWRT", "0\n")?;
    expect_output("LIT 7\nLIT 3\nDIV\nWRT", "2\n")
}

fn test_vm_overflow() -> Result<(), String> {
    for source in [
        "LIT 2147483647\nLIT 1\nADD",
        "LIT -2\nLIT 2147483647\nSUB",
        "LIT -2147483648\nLIT -1\nDIV",
        "LIT -2147483648\nLIT -1\nMUL",
        "LIT 2147483640\nLIT 5\nMUL",
    ] {
        match execute(source) {
            Err(VmError::ArithmeticOverflow { .. }) => {}
            other => return Err(format!("{:?}: expected overflow, got {:?}", source, other)),
        }
    }
    Ok(())
}

fn test_ip_monotonic() -> Result<(), String> {
    let words: Vec<Word> = pcode_asm::parse_all("LIT 4\nSTO 9\nLOD 9\nWRT")
        .into_iter()
        .map(Word::from)
        .collect();
    let config = MachineConfig { stack_size: 16, code_size: words.len(), entry: 0 };
    let mut vm = Machine::new(config, Vec::new());
    vm.load(&words).map_err(|e| e.to_string())?;
    for n in 1..=words.len() as i32 {
        vm.step().map_err(|e| e.to_string())?;
        if vm.ip() != n { return Err(format!("ip {} after {} cycles", vm.ip(), n)); }
    }
    Ok(())
}

fn test_epf_roundtrip() -> Result<(), String> {
    let program = Program::new(
        vec![Word::new(1, i32::MIN), Word::new(-9, 3), Word::new(8, 0)],
        1234,
    );
    let bytes = program.to_bytes().map_err(|e| e.to_string())?;
    if bytes.len() != 16 + 8 * 3 { return Err(format!("encoded {} bytes", bytes.len())); }
    let decoded = Program::from_bytes(&bytes).map_err(|e| e.to_string())?;
    if decoded != program { return Err("decoded program differs".into()); }
    Ok(())
}

fn test_asm_roundtrip() -> Result<(), String> {
    let samples = [Instruction::Lit(-1), Instruction::Sto(12), Instruction::Mul, Instruction::Ill];
    for instr in samples {
        if pcode_asm::parse_instruction(&instr.to_string()) != Some(instr) {
            return Err(format!("{} did not reparse", instr));
        }
    }
    for bad in ["LIT", "WRT WRT", "JMP 3", "LIT 2147483648"] {
        if pcode_asm::parse_instruction(bad).is_some() {
            return Err(format!("{:?} parsed", bad));
        }
    }
    Ok(())
}
