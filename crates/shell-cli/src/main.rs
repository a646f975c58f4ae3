//! `pcode`: assemble, inspect, and run EPF programs.
//!
//! Usage:
//!   pcode asm prog.pc -o prog.epf
//!   pcode run prog.epf
//!   pcode step prog.pc --source
//!   pcode dump prog.epf --json

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pcode_abi::{Machine, MachineConfig, Program};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pcode")]
#[command(about = "Assemble and run programs for the pcode stack machine")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble a text program into an EPF container
    Asm {
        source: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Entry point recorded in the header
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        entry: i32,
    },
    /// Run a program to completion
    Run(MachineArgs),
    /// Run one cycle at a time, dumping machine state after each
    Step(MachineArgs),
    /// Print the header and disassembly of a program
    Dump {
        file: PathBuf,
        /// Treat the input as assembly text instead of EPF
        #[arg(long)]
        source: bool,
        /// Print the program as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct MachineArgs {
    file: PathBuf,
    /// Treat the input as assembly text instead of EPF
    #[arg(long)]
    source: bool,
    /// JSON file with a machine config (stack_size, entry)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    stack_size: Option<usize>,
    /// Override the program's entry point
    #[arg(long, allow_hyphen_values = true)]
    entry: Option<i32>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn,pcode=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_program(path: &Path, source: bool) -> Result<Program> {
    if source {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let instructions = pcode_asm::assemble(&text)
            .with_context(|| format!("assembling {}", path.display()))?;
        return Ok(Program::from_instructions(&instructions, 0));
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Program::read_from(&mut BufReader::new(file))
        .with_context(|| format!("decoding {}", path.display()))
}

/// Config file first, then command-line overrides. Code size always follows the program.
fn machine_config(args: &MachineArgs, program: &Program) -> Result<MachineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw =
                fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let value: serde_json::Value =
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
            let has_entry = value.get("entry").is_some();
            let mut config: MachineConfig = serde_json::from_value(value)
                .with_context(|| format!("parsing {}", path.display()))?;
            if !has_entry {
                config.entry = program.entry();
            }
            config
        }
        None => MachineConfig { entry: program.entry(), ..MachineConfig::default() },
    };
    if let Some(stack_size) = args.stack_size {
        config.stack_size = stack_size;
    }
    if let Some(entry) = args.entry {
        config.entry = entry;
    }
    config.code_size = program.len();
    Ok(config)
}

fn boot<W: Write>(args: &MachineArgs, out: W) -> Result<Machine<W>> {
    let program = load_program(&args.file, args.source)?;
    let config = machine_config(args, &program)?;
    info!(
        file = %args.file.display(),
        instructions = program.len(),
        entry = config.entry,
        stack_size = config.stack_size,
        "booting machine"
    );
    let mut vm = Machine::new(config, out);
    vm.load(program.words())?;
    Ok(vm)
}

fn run(args: &MachineArgs) -> Result<()> {
    let stdout = io::stdout().lock();
    let mut vm = boot(args, BufWriter::new(stdout))?;
    let result = vm.run();
    vm.output_mut().flush()?;
    if let Err(e) = result {
        error!("machine state at failure:\n{}", vm);
        return Err(e.into());
    }
    Ok(())
}

/// Program output and state dumps share `out`, so WRT lines appear in cycle order.
fn step<W: Write>(args: &MachineArgs, out: &mut W) -> Result<()> {
    let mut vm = boot(args, out)?;
    let cycles = vm.code().len();
    let state = vm.to_string();
    writeln!(vm.output_mut(), "{}", state)?;
    for n in 1..=cycles {
        let result = vm.step();
        let state = vm.to_string();
        writeln!(vm.output_mut(), "--- cycle {} ---\n{}", n, state)?;
        result?;
    }
    Ok(())
}

fn dump<W: Write>(file: &Path, source: bool, json: bool, out: &mut W) -> Result<()> {
    let program = load_program(file, source)?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &program)?;
        writeln!(out)?;
        return Ok(());
    }
    let header = program.header()?;
    writeln!(
        out,
        "magic={} version={} instructions={} entry={}",
        String::from_utf8_lossy(&header.magic),
        header.version,
        header.instruction_count,
        header.entry_point
    )?;
    write!(out, "{}", pcode_asm::disassemble(program.words()))?;
    Ok(())
}

fn assemble_file(source: &Path, output: &Path, entry: i32) -> Result<()> {
    let text =
        fs::read_to_string(source).with_context(|| format!("reading {}", source.display()))?;
    let instructions = pcode_asm::assemble(&text)
        .with_context(|| format!("assembling {}", source.display()))?;
    let program = Program::from_instructions(&instructions, entry);
    let file =
        File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut out = BufWriter::new(file);
    program.write_to(&mut out)?;
    out.flush()?;
    info!(instructions = program.len(), output = %output.display(), "wrote EPF program");
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Command::Asm { source, output, entry } => assemble_file(source, output, *entry),
        Command::Run(args) => run(args),
        Command::Step(args) => step(args, &mut io::stdout().lock()),
        Command::Dump { file, source, json } => {
            dump(file, *source, *json, &mut io::stdout().lock())
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}
