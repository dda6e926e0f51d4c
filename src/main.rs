mod analyzer;
mod ast;
mod class;
mod config;
mod diagnostic;
mod env;
mod error;
mod interpreter;
mod lexer;
mod native;
mod parser;
mod token;
mod value;

use clap::Parser as ClapParser;
use diagnostic::Diagnostic;
use native::NativeModuleTable;
use std::path::PathBuf;
use std::process::ExitCode;

/// A small dynamically-typed scripting language: lexer, parser, static
/// analyzer, and tree-walking interpreter.
#[derive(ClapParser, Debug)]
#[command(name = "willow")]
#[command(version = config::VERSION)]
#[command(about = "Run a willow script")]
struct CliArgs {
    /// Script file to execute
    #[arg(value_name = "FILE")]
    script: PathBuf,

    /// Lex, parse, and analyze the script without running it
    #[arg(long = "check")]
    check_only: bool,

    /// Emit diagnostics as a JSON array instead of one line per diagnostic
    /// (only meaningful together with `--check`; see [`diagnostic::Diagnostic`]'s
    /// `Serialize` impl, which exists precisely so a host driver can consume
    /// this without the core knowing anything about presentation).
    #[arg(long = "json", requires = "check_only")]
    json: bool,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let source = match std::fs::read_to_string(&args.script) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cannot read '{}': {e}", args.script.display());
            return ExitCode::FAILURE;
        }
    };

    let native_modules = NativeModuleTable::new();

    if args.check_only {
        let diagnostics = lib_check(&source, &args.script, &native_modules);
        if diagnostics.is_empty() {
            if args.json {
                println!("[]");
            }
            return ExitCode::SUCCESS;
        }
        if args.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("failed to serialize diagnostics: {e}"),
            }
        } else {
            for d in &diagnostics {
                print_diagnostic(d);
            }
        }
        return ExitCode::FAILURE;
    }

    let tokens = lexer::Lexer::new(&source).tokenize();
    let (program, mut diagnostics) = parser::Parser::new(&tokens, &args.script).parse();
    if diagnostics.is_empty() {
        diagnostics.extend(analyzer::StaticAnalyzer::new(&native_modules).analyze(&program, &args.script));
    }
    if !diagnostics.is_empty() {
        for d in &diagnostics {
            print_diagnostic(d);
        }
        return ExitCode::FAILURE;
    }

    let interp = interpreter::Interpreter::new(&native_modules);
    match interp.run(&program, &args.script) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            for frame in e.trace() {
                eprintln!("  at {} line {} ({})", frame.file.display(), frame.line, frame.context);
            }
            ExitCode::FAILURE
        }
    }
}

fn lib_check(source: &str, path: &PathBuf, native_modules: &NativeModuleTable) -> Vec<Diagnostic> {
    let tokens = lexer::Lexer::new(source).tokenize();
    let (program, mut diagnostics) = parser::Parser::new(&tokens, path).parse();
    if diagnostics.is_empty() {
        diagnostics.extend(analyzer::StaticAnalyzer::new(native_modules).analyze(&program, path));
    }
    diagnostics
}

fn print_diagnostic(d: &Diagnostic) {
    eprintln!("{}:{}:{}: {:?}: {}", d.path.display(), d.line, d.column, d.kind, d.message);
}
