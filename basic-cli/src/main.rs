use anyhow::{Context, Result};
use basic_compiler::frontend::lexer::{get_error_context, tokenize};
use basic_compiler::{compile_to_ir_with, parse_program, CompileError, CompileOptions, ParseError};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "basicc")]
#[command(about = "A compiler from a small BASIC dialect to an LLVM-style IR")]
struct Args {
    /// Path to the source file to compile
    file: Option<PathBuf>,

    /// What to print
    #[arg(long, value_enum, default_value_t = Emit::Ir)]
    emit: Emit,

    /// Write the output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with compile options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the emitted module (overrides the config file)
    #[arg(long)]
    module_name: Option<String>,

    /// Name of the entry routine (overrides the config file)
    #[arg(long)]
    entry: Option<String>,

    /// Log pipeline stages to stderr. RUST_LOG takes precedence.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// IR text
    Ir,
    /// IR text, one numbered line per instruction
    Lines,
    /// Parsed program
    Ast,
    /// Token stream with byte spans
    Tokens,
    /// IR module as JSON
    Json,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "basic_compiler=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let src = match &args.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading source file '{}'", path.display()))?,
        None => DEFAULT_SAMPLE.trim().to_string(),
    };
    let options = load_options(args)?;
    tracing::debug!(?options, emit = ?args.emit, "compiling");

    let out = match emit(&src, args.emit, &options) {
        Ok(out) => out,
        Err(e) => match e.downcast_ref::<CompileError>() {
            Some(compile_error) => {
                report(&src, compile_error);
                std::process::exit(1);
            }
            None => return Err(e),
        },
    };

    match &args.output {
        Some(path) => fs::write(path, out)
            .with_context(|| format!("writing output to '{}'", path.display()))?,
        None => print!("{out}"),
    }
    Ok(())
}

fn load_options(args: &Args) -> Result<CompileOptions> {
    let mut options = match &args.config {
        Some(path) => read_config(path)?,
        None => CompileOptions::default(),
    };
    if let Some(name) = &args.module_name {
        options.module_name = name.clone();
    }
    if let Some(entry) = &args.entry {
        options.entry_name = entry.clone();
    }
    Ok(options)
}

fn read_config(path: &Path) -> Result<CompileOptions> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config file '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("parsing config file '{}'", path.display()))
}

/// Produce the requested output. Compile failures come back as `CompileError`.
fn emit(src: &str, what: Emit, options: &CompileOptions) -> Result<String> {
    let out = match what {
        Emit::Tokens => tokenize(src)
            .map_err(CompileError::from)?
            .iter()
            .map(|t| format!("{:>4}..{:<4} {}\n", t.span.start, t.span.end, t.token))
            .collect(),
        Emit::Ast => format!("{:#?}\n", parse_program(src)?),
        Emit::Ir => compile_to_ir_with(src, options)?.to_string(),
        Emit::Lines => compile_to_ir_with(src, options)?
            .to_lines()
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>4}  {line}\n", i + 1))
            .collect(),
        Emit::Json => {
            let module = compile_to_ir_with(src, options)?;
            serde_json::to_string_pretty(&module).context("serializing module to JSON")? + "\n"
        }
    };
    Ok(out)
}

/// Print a compile error with the offending source line when it has one.
fn report(src: &str, e: &CompileError) {
    eprintln!("Compilation error: {e}");
    let location = match e {
        CompileError::Lex(lex) => Some(lex.location()),
        CompileError::Parse(
            ParseError::UnexpectedToken { location, .. }
            | ParseError::NestingTooDeep { location, .. },
        ) => Some(*location),
        _ => None,
    };
    if let Some(location) = location {
        eprintln!("  | {}", get_error_context(src, location.offset));
    }
}

const DEFAULT_SAMPLE: &str = r#"
DIM TOTAL
FOR I = 1 TO 5
    IF I - 3 THEN
        PRINT I * I
    ELSE
        PRINT TOTAL
    END
NEXT
PRINT I
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sample_compiles_for_every_emit() {
        let options = CompileOptions::default();
        for what in [Emit::Ir, Emit::Lines, Emit::Ast, Emit::Tokens, Emit::Json] {
            let out = emit(DEFAULT_SAMPLE, what, &options).unwrap();
            assert!(!out.is_empty(), "{what:?} output should not be empty");
        }
    }

    #[test]
    fn json_output_is_the_module() {
        let out = emit("PRINT 1", Emit::Json, &CompileOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["name"], "main");
    }

    #[test]
    fn compile_failures_stay_compile_errors() {
        let options = CompileOptions::default();
        for (what, src) in [
            (Emit::Tokens, "PRINT $"),
            (Emit::Ast, "PRINT )"),
            (Emit::Json, "PRINT X"),
        ] {
            let err = emit(src, what, &options).unwrap_err();
            assert!(
                err.downcast_ref::<CompileError>().is_some(),
                "{what:?}: {err:#}"
            );
        }
    }

    #[test]
    fn rejected_options_are_compile_errors() {
        let options = CompileOptions {
            entry_name: "printf".to_string(),
            ..CompileOptions::default()
        };
        let err = emit("PRINT 1", Emit::Ir, &options).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompileError>(),
            Some(CompileError::InvalidOptions { .. })
        ));
    }
}
