//! CLI entry point for the `lc2k` toolchain binary.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use lc2k_asm::{assemble_program, link, read_source_file, AsmError, FsSources, Program};
use lc2k_core::{
    disassemble_program, disassemble_word, render_state_dump, run_until, MachineConfig,
    MachineState, MachineWord, StopReason, TraceEvent, TraceSink, DEFAULT_STEP_LIMIT,
    REGISTER_COUNT,
};
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;

const USAGE_TEXT: &str = "\
Usage: lc2k <command> [options]

Commands:
  link  <input> [--base <dir>]                 Print the linked program text
  build <input> [-o <output>] [-v] [--base <dir>]
                                               Assemble to decimal words
  run   <input> [--regs v0,...] [--max-steps N] [--trace] [--break] [--base <dir>]
                                               Link, assemble, execute, dump state

Options:
  -o, --output <file>  Output file path (default: input stem + .mc)
  -v, --verbose        Print listing to stderr (build only)
  --base <dir>         Folder for relative #LINK/#RUN paths (default: input folder)
  --regs <list>        Initial register values, comma-separated, missing ones are 0
  --max-steps <N>      Step limit (default 10000000, 0 disables it)
  --trace              Print one line per execution event to stderr
  --break              Dump state at every #BREAK address
  -h, --help           Show this help message

Examples:
  lc2k link main.as
  lc2k build main.as -o main.mc
  lc2k run main.as --regs 0,1,2,3,4,5,6,7
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Link(LinkArgs),
    Build(BuildArgs),
    Run(RunArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct LinkArgs {
    input: PathBuf,
    base: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
struct BuildArgs {
    link: LinkArgs,
    output: Option<PathBuf>,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    link: LinkArgs,
    registers: [MachineWord; REGISTER_COUNT],
    step_limit: Option<u64>,
    trace: bool,
    breakpoints: bool,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "link" => parse_link_args(args)
            .map(Command::Link)
            .map(ParseResult::Command),
        "build" => parse_build_args(args)
            .map(Command::Build)
            .map(ParseResult::Command),
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

/// Collects the input path and `--base`, handing every other flag to
/// `extra`. `extra` returns `Ok(false)` for flags it does not know.
#[allow(clippy::while_let_on_iterator)]
fn parse_common<I, F>(mut args: I, mut extra: F) -> Result<LinkArgs, String>
where
    I: Iterator<Item = OsString>,
    F: FnMut(&str, &mut I) -> Result<bool, String>,
{
    let mut input: Option<PathBuf> = None;
    let mut base: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--base" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --base".to_string())?;
            base = Some(PathBuf::from(value));
            continue;
        }

        let text = arg.to_string_lossy().to_string();
        if text.starts_with('-') {
            if extra(&text, &mut args)? {
                continue;
            }
            return Err(format!("unknown option: {text}"));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(LinkArgs { input, base })
}

fn flag_value(flag: &str, args: &mut impl Iterator<Item = OsString>) -> Result<String, String> {
    args.next()
        .map(|value| value.to_string_lossy().to_string())
        .ok_or_else(|| format!("missing value for {flag}"))
}

fn parse_link_args(args: impl Iterator<Item = OsString>) -> Result<LinkArgs, String> {
    parse_common(args, |_, _| Ok(false))
}

fn parse_build_args(args: impl Iterator<Item = OsString>) -> Result<BuildArgs, String> {
    let mut output: Option<PathBuf> = None;
    let mut verbose = false;

    let link = parse_common(args, |flag, rest| match flag {
        "-v" | "--verbose" => {
            verbose = true;
            Ok(true)
        }
        "-o" | "--output" => {
            output = Some(PathBuf::from(flag_value("-o", rest)?));
            Ok(true)
        }
        _ => Ok(false),
    })?;

    Ok(BuildArgs {
        link,
        output,
        verbose,
    })
}

fn parse_run_args(args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut registers = [0; REGISTER_COUNT];
    let mut step_limit = Some(DEFAULT_STEP_LIMIT);
    let mut trace = false;
    let mut breakpoints = false;

    let link = parse_common(args, |flag, rest| match flag {
        "--regs" => {
            registers = parse_registers(&flag_value(flag, rest)?)?;
            Ok(true)
        }
        "--max-steps" => {
            let value = flag_value(flag, rest)?;
            let limit: u64 = value
                .parse()
                .map_err(|_| format!("invalid step limit: {value}"))?;
            step_limit = (limit > 0).then_some(limit);
            Ok(true)
        }
        "--trace" => {
            trace = true;
            Ok(true)
        }
        "--break" => {
            breakpoints = true;
            Ok(true)
        }
        _ => Ok(false),
    })?;

    Ok(RunArgs {
        link,
        registers,
        step_limit,
        trace,
        breakpoints,
    })
}

fn parse_registers(list: &str) -> Result<[MachineWord; REGISTER_COUNT], String> {
    let mut registers = [0; REGISTER_COUNT];
    let values: Vec<&str> = list.split(',').map(str::trim).collect();
    if values.len() > REGISTER_COUNT {
        return Err(format!(
            "too many register values: {} (at most {REGISTER_COUNT})",
            values.len()
        ));
    }
    for (slot, value) in registers.iter_mut().zip(values) {
        *slot = value
            .parse()
            .map_err(|_| format!("invalid register value: {value}"))?;
    }
    Ok(registers)
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");

    let parent = input.parent().unwrap_or_else(|| Path::new(""));

    parent.join(format!("{stem}.mc"))
}

fn link_input(args: &LinkArgs) -> Result<Program, i32> {
    let base = args.base.clone().unwrap_or_else(|| {
        args.input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });
    let source = read_source_file(&args.input).map_err(|e| report_error(&e))?;
    let name = args.input.display().to_string();
    link(&name, &source, &FsSources::new(base)).map_err(|e| report_error(&e))
}

fn assemble_input(args: &LinkArgs) -> Result<(Program, Vec<MachineWord>), i32> {
    let program = link_input(args)?;
    let words = assemble_program(&program).map_err(|e| report_error(&e))?;
    Ok((program, words))
}

fn report_error(e: &AsmError) -> i32 {
    eprintln!("{}", e.format_for_stderr());
    1
}

fn run_link(args: &LinkArgs) -> Result<(), i32> {
    let program = link_input(args)?;
    print!("{program}");
    Ok(())
}

fn run_build(args: BuildArgs) -> Result<(), i32> {
    let (_, words) = assemble_input(&args.link)?;

    let output_path = args
        .output
        .unwrap_or_else(|| default_output_path(&args.link.input));

    let text: String = words.iter().map(|word| word.to_string() + "\n").collect();
    if let Err(e) = fs::write(&output_path, text) {
        eprintln!("error: failed to write output: {e}");
        return Err(1);
    }

    if args.verbose {
        print_listing(&words);
    }

    println!(
        "Assembled {} ({} words) -> {}",
        args.link.input.display(),
        words.len(),
        output_path.display()
    );

    Ok(())
}

fn print_listing(words: &[MachineWord]) {
    for row in disassemble_program(words) {
        eprintln!("{:>5}: {:>11}  {}", row.addr, row.word, row.text());
    }
}

/// Writes one line per trace event to stderr.
struct StderrTrace;

impl TraceSink for StderrTrace {
    fn on_event(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::InstructionStart { pc, word } => {
                eprintln!("trace: pc={pc} word={word} {}", disassemble_word(word));
            }
            TraceEvent::MemoryAccess {
                addr,
                value,
                is_write,
            } => {
                let op = if is_write { "store" } else { "load" };
                eprintln!("trace: {op} [{addr}] = {value}");
            }
            TraceEvent::Halted { pc } => eprintln!("trace: halt at pc={pc}"),
            TraceEvent::FaultRaised { cause, pc } => {
                eprintln!("trace: fault at pc={pc}: {cause}");
            }
        }
    }
}

fn print_break(state: &MachineState) {
    println!("break at pc={}", state.pc);
    print!("{}", render_state_dump(state));
    println!();
}

fn run_run(args: &RunArgs) -> Result<(), i32> {
    let (program, words) = assemble_input(&args.link)?;

    let config = MachineConfig {
        step_limit: args.step_limit,
        tracing_enabled: args.trace,
        ..MachineConfig::default()
    };
    let mut state = MachineState::with_registers(words, args.registers);
    let mut sink = StderrTrace;
    let at_breakpoint =
        |s: &MachineState| args.breakpoints && program.breakpoints.contains(&s.pc);

    // The stop predicate only runs after a retired step.
    if at_breakpoint(&state) {
        print_break(&state);
    }
    let stop = loop {
        let outcome = run_until(&mut state, &config, &mut sink, at_breakpoint);
        if outcome.stop != StopReason::Stopped {
            break outcome.stop;
        }
        print_break(&state);
    };

    print!("{}", render_state_dump(&state));

    match stop {
        StopReason::Halted => Ok(()),
        StopReason::Fault { cause, pc } => {
            eprintln!("error: {cause} at pc={pc}");
            Err(1)
        }
        StopReason::StepLimit => {
            eprintln!(
                "error: step limit reached after {} instructions without halt",
                state.steps
            );
            Err(1)
        }
        StopReason::Stopped => Err(1),
    }
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(command)) => {
            let result = match command {
                Command::Link(args) => run_link(&args),
                Command::Build(args) => run_build(args),
                Command::Run(args) => run_run(&args),
            };
            match result {
                Ok(()) => 0,
                Err(code) => code,
            }
        }
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
