//! Intcode program runner.
//!
//! Loads a program file (comma-separated integers), optionally patches memory,
//! and runs it on the Intcode VM.
//!
//! # Usage
//! ```text
//! intcode run <program> [--set ADDR=VALUE]... [--input V,V,...] [--trace]
//! intcode search <program> --target <N> [--max 99] [--noun-addr 1] [--verb-addr 2]
//! ```
//!
//! Without `--input`, `IN` instructions prompt on the terminal. The log level
//! can also be set through `INTCODE_LOG` (`trace`, `info`, `warn`, `error`).

use clap::{Args, Parser, Subcommand};
use intcode::harness::{self, Patch, SearchSpace};
use intcode::utils::log::{self, Level};
use intcode::{ConsolePort, Fault, IoPort, QueuePort, Status, VMError, error, info, trace, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser, Debug)]
#[command(name = "intcode", version, about = "Run Intcode programs", long_about = None)]
struct Cli {
    /// Only log warnings and errors (`run --trace` takes precedence)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Hide the uptime prefix on log lines
    #[arg(long, global = true)]
    no_timestamp: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program until it halts or faults
    Run(RunArgs),
    /// Find the noun/verb pair that leaves a target value in memory[0]
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Program file
    program: PathBuf,

    /// Patch memory before running (repeatable)
    #[arg(long = "set", value_name = "ADDR=VALUE", value_parser = parse_patch)]
    patches: Vec<Patch>,

    /// Comma-separated input values; prompts interactively when omitted
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    input: Option<Vec<i64>>,

    /// Log every instruction before it executes; overrides `--quiet`
    #[arg(long)]
    trace: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Program file
    program: PathBuf,

    /// Value memory[0] must hold after the program halts
    #[arg(long, allow_negative_numbers = true)]
    target: i64,

    /// Largest noun and verb tried
    #[arg(long, default_value_t = 99)]
    max: i64,

    /// Address patched with the noun
    #[arg(long, default_value_t = 1)]
    noun_addr: i64,

    /// Address patched with the verb
    #[arg(long, default_value_t = 2)]
    verb_addr: i64,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = log::init_from_env() {
        warn!("{e}");
    }
    let trace = matches!(&cli.command, Command::Run(args) if args.trace);
    if let Some(level) = log_level(cli.quiet, trace) {
        log::set_level(level);
    }
    log::set_timestamps(!cli.no_timestamp);

    match cli.command {
        Command::Run(args) => run(args),
        Command::Search(args) => search(args),
    }
}

fn run(args: RunArgs) {
    let source = read_program(&args.program).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1)
    });

    let result = match args.input {
        Some(values) => {
            let mut port = QueuePort::new(values);
            let result = execute(&source, &args.patches, &mut port, args.trace);
            for value in port.output() {
                println!("output: {value}");
            }
            if port.remaining_input() > 0 {
                warn!("{} input value(s) left unread", port.remaining_input());
            }
            result
        }
        None => execute(&source, &args.patches, ConsolePort::stdio(), args.trace),
    };

    match result {
        Ok(memory) => {
            info!("halted");
            println!("final: {}", memory.first().copied().unwrap_or_default());
        }
        Err(fault) => {
            error!("{fault}");
            process::exit(1);
        }
    }
}

fn search(args: SearchArgs) {
    let source = read_program(&args.program).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1)
    });
    let space = SearchSpace {
        max: args.max,
        noun_addr: args.noun_addr,
        verb_addr: args.verb_addr,
    };

    info!(
        "searching nouns and verbs in 0..={} for {}",
        space.max, args.target
    );
    match harness::find_noun_verb(&source, args.target, space) {
        Ok(Some((noun, verb))) => {
            info!("noun {noun}, verb {verb}");
            println!("{}", 100 * noun + verb);
        }
        Ok(None) => {
            error!("no noun/verb pair produces {}", args.target);
            process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}

/// Level requested on the command line, if any. Tracing wins over `--quiet`.
fn log_level(quiet: bool, trace: bool) -> Option<Level> {
    match (quiet, trace) {
        (_, true) => Some(Level::Trace),
        (true, false) => Some(Level::Warn),
        (false, false) => None,
    }
}

/// Reads program text from `path`.
fn read_program(path: &Path) -> Result<String, VMError> {
    fs::read_to_string(path).map_err(|e| VMError::Io(format!("{}: {e}", path.display())))
}

/// Parses an `ADDR=VALUE` memory patch.
fn parse_patch(s: &str) -> Result<Patch, String> {
    let (addr, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=VALUE, got {s:?}"))?;
    let addr = addr
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid address {addr:?}: {e}"))?;
    let value = value
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid value {value:?}: {e}"))?;
    Ok((addr, value))
}

/// Runs `source` to completion and returns final memory.
///
/// With `trace` set, each instruction is logged before it executes.
fn execute<P: IoPort>(
    source: &str,
    patches: &[Patch],
    port: P,
    trace: bool,
) -> Result<Vec<i64>, Fault> {
    if !trace {
        let vm = harness::run_with_patches(source, patches, port)?;
        return Ok(vm.memory().to_vec());
    }

    let mut vm = harness::prepare(source, patches, port)?;
    let mut steps = 0u64;
    while *vm.status() == Status::Running {
        match vm.describe_current() {
            Ok(text) => trace!("{:>6}: {text}", vm.pc()),
            Err(e) => trace!("{:>6}: <{e}>", vm.pc()),
        }
        if let Err(reason) = vm.step() {
            return Err(Fault {
                reason,
                pc: vm.pc(),
                memory: vm.memory().to_vec(),
            });
        }
        steps += 1;
    }
    trace!("{steps} instruction(s) executed");
    Ok(vm.memory().to_vec())
}
