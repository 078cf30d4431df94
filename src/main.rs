use clap::Parser;
use clap::error::ErrorKind;
use ember_lang::language::ast::ExprId;
use ember_lang::language::parser;
use ember_lang::language::printer;
use ember_lang::language::resolver::Resolver;
use ember_lang::project::Manifest;
use ember_lang::runtime::Interpreter;
use ember_lang::tools::diagnostics::{self, ReportMode};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

const EXIT_USAGE: i32 = 64;
const EXIT_STATIC: i32 = 65;
const EXIT_RUNTIME: i32 = 70;

#[derive(Debug, Parser)]
#[command(
    name = "ember",
    version,
    about = "Tree-walking interpreter for the Ember language"
)]
struct Cli {
    /// Script to run; with no script, runs the manifest entry or starts a REPL
    script: Option<PathBuf>,
    /// Print the parsed syntax tree instead of executing
    #[arg(long)]
    ast: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE,
            };
            let _ = err.print();
            exit(code);
        }
    };

    let manifest = match Manifest::discover(Path::new(".")) {
        Ok(manifest) => manifest,
        Err(err) => {
            eprintln!("{err}");
            exit(EXIT_USAGE);
        }
    };

    let entry = cli
        .script
        .clone()
        .or_else(|| manifest.as_ref().and_then(|m| m.entry.clone()));
    match entry {
        Some(path) => run_file(&path, cli.ast),
        None => {
            let prompt = manifest
                .as_ref()
                .map(|m| m.prompt().to_string())
                .unwrap_or_else(|| "> ".to_string());
            run_prompt(&prompt);
        }
    }
}

fn run_file(path: &Path, ast_only: bool) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            diagnostics::report_io_error(path, &err);
            exit(EXIT_USAGE);
        }
    };
    let name = path.display().to_string();

    if ast_only {
        match parser::parse_source(&source, 0) {
            Ok(parse) => print!("{}", printer::print_program(&parse.statements)),
            Err(errors) => {
                diagnostics::emit_syntax_errors(ReportMode::File, &name, &source, &errors);
                exit(EXIT_STATIC);
            }
        }
        return;
    }

    let mut interpreter = Interpreter::new();
    let mut next_id: ExprId = 0;
    match run_source(&mut interpreter, &name, &source, &mut next_id, ReportMode::File) {
        Ok(()) => {}
        Err(RunError::Static) => exit(EXIT_STATIC),
        Err(RunError::Runtime) => exit(EXIT_RUNTIME),
    }
}

enum RunError {
    Static,
    Runtime,
}

/// Scan, parse, resolve, interpret. `next_id` advances as soon as parsing
/// succeeds so expression ids stay unique across REPL lines.
fn run_source(
    interpreter: &mut Interpreter,
    name: &str,
    source: &str,
    next_id: &mut ExprId,
    mode: ReportMode,
) -> Result<(), RunError> {
    let parse = match parser::parse_source(source, *next_id) {
        Ok(parse) => parse,
        Err(errors) => {
            diagnostics::emit_syntax_errors(mode, name, source, &errors);
            return Err(RunError::Static);
        }
    };
    *next_id = parse.next_id;

    if let Err(errors) = Resolver::new(interpreter).resolve(&parse.statements) {
        diagnostics::emit_syntax_errors(mode, name, source, &errors);
        return Err(RunError::Static);
    }

    if let Err(err) = interpreter.interpret(&parse.statements) {
        diagnostics::emit_runtime_error(mode, name, source, &err);
        return Err(RunError::Runtime);
    }
    Ok(())
}

fn run_prompt(prompt: &str) {
    let mut interpreter = Interpreter::new();
    let mut next_id: ExprId = 0;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        print!("{prompt}");
        let _ = io::stdout().flush();
        line.clear();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if line.trim().is_empty() {
            continue;
        }
        // Errors were already reported; the prompt just keeps going.
        let _ = run_source(&mut interpreter, "repl", &line, &mut next_id, ReportMode::Repl);
    }
}
