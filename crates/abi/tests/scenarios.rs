use pcode_abi::{Instruction, Machine, MachineConfig, Opcode, Program, VmError, Word};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

fn run(program: &[Instruction]) -> Result<String, VmError> {
    let config = MachineConfig {
        stack_size: 1024,
        code_size: program.len(),
        entry: 0,
    };
    let words: Vec<Word> = program.iter().copied().map(Word::from).collect();
    let mut vm = Machine::new(config, Vec::new());
    vm.load(&words)?;
    vm.run()?;
    Ok(String::from_utf8(vm.into_output()).unwrap())
}

fn binary(p: i32, q: i32, op: Instruction) -> Vec<Instruction> {
    vec![Instruction::Lit(p), Instruction::Lit(q), op, Instruction::Wrt]
}

#[test]
fn add() {
    assert_eq!(run(&binary(0, 1, Instruction::Add)).unwrap(), "1\n");
    assert_eq!(run(&binary(1, 0, Instruction::Add)).unwrap(), "1\n");
}

#[test]
fn sub_is_earlier_minus_later() {
    assert_eq!(run(&binary(0, 1, Instruction::Sub)).unwrap(), "-1\n");
    assert_eq!(run(&binary(1, 0, Instruction::Sub)).unwrap(), "1\n");
}

#[test]
fn mul() {
    assert_eq!(run(&binary(2, 5, Instruction::Mul)).unwrap(), "10\n");
    assert_eq!(run(&binary(5, 2, Instruction::Mul)).unwrap(), "10\n");
}

#[test]
fn div_is_earlier_over_later() {
    assert_eq!(run(&binary(3, 7, Instruction::Div)).unwrap(), "0\n");
    assert_eq!(run(&binary(7, 3, Instruction::Div)).unwrap(), "2\n");
}

#[test]
fn add_and_mul_commute() {
    for (p, q) in [(3, -9), (1000, 77), (-5, -6), (0, i32::MAX)] {
        for op in [Instruction::Add, Instruction::Mul] {
            let forward = run(&binary(p, q, op));
            let backward = run(&binary(q, p, op));
            match (forward, backward) {
                (Ok(f), Ok(b)) => assert_eq!(f, b),
                (Err(_), Err(_)) => {}
                other => panic!("asymmetric result for {op} on ({p}, {q}): {other:?}"),
            }
        }
    }
}

#[test]
fn overflow() {
    let cases = [
        (vec![Instruction::Lit(i32::MAX), Instruction::Lit(1), Instruction::Add], Opcode::Add),
        (vec![Instruction::Lit(-2), Instruction::Lit(i32::MAX), Instruction::Sub], Opcode::Sub),
        (vec![Instruction::Lit(i32::MIN), Instruction::Lit(-1), Instruction::Div], Opcode::Div),
        (vec![Instruction::Lit(i32::MIN), Instruction::Lit(-1), Instruction::Mul], Opcode::Mul),
        (vec![Instruction::Lit(2147483640), Instruction::Lit(5), Instruction::Mul], Opcode::Mul),
    ];
    for (program, expected) in cases {
        match run(&program) {
            Err(VmError::ArithmeticOverflow { opcode }) => assert_eq!(opcode, expected),
            other => panic!("expected overflow for {expected}, got {other:?}"),
        }
    }
}

#[test]
fn ip_advances_by_one_per_cycle() {
    let program = [
        Instruction::Lit(1),
        Instruction::Lit(2),
        Instruction::Add,
        Instruction::Sto(10),
        Instruction::Lod(10),
        Instruction::Wrt,
    ];
    let words: Vec<Word> = program.iter().copied().map(Word::from).collect();
    let config = MachineConfig { stack_size: 32, code_size: words.len(), entry: 0 };
    let mut vm = Machine::new(config, Vec::new());
    vm.load(&words).unwrap();
    for n in 1..=words.len() as i32 {
        vm.step().unwrap();
        assert_eq!(vm.ip(), n);
    }
    assert_eq!(vm.output().as_slice(), b"3\n");
}

#[test]
fn file_backed_container_runs() {
    let program = Program::from_instructions(&binary(6, 7, Instruction::Mul), 0);
    let mut file: File = tempfile::tempfile().unwrap();
    program.write_to(&mut file).unwrap();
    file.flush().unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let decoded = Program::read_from(&mut file).unwrap();
    assert_eq!(decoded, program);

    let (words, entry) = decoded.into_parts();
    let config = MachineConfig { stack_size: 16, code_size: words.len(), entry };
    let mut vm = Machine::new(config, Vec::new());
    vm.load(&words).unwrap();
    vm.run().unwrap();
    assert_eq!(vm.into_output(), b"42\n");
}
