use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rill_runtime::{compile_source, disassemble, run_source, Diagnostic, ExecError};
use std::io::Write;
use std::process::ExitCode;
use termcolor::{ColorChoice, StandardStream};

// Exit codes follow sysexits: 65 for bad input, 70 for a runtime fault
const EXIT_DIAGNOSTICS: u8 = 65;
const EXIT_FAULT: u8 = 70;

/// Rill programming language compiler and virtual machine.
///
/// EXAMPLES:
///     rill run main.rill           Compile and execute a program
///     rill check main.rill         Report errors without running
///     rill disasm main.rill        Print the compiled bytecode listing
#[derive(Parser)]
#[command(name = "rill")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Rill source file
    #[command(visible_alias = "r")]
    Run {
        /// Path to the Rill source file
        file: String,
        /// Output diagnostics in JSON format
        #[arg(long, env = "RILL_JSON")]
        json: bool,
    },

    /// Check a Rill source file without running it
    #[command(visible_alias = "c")]
    Check {
        /// Path to the Rill source file
        file: String,
        /// Output diagnostics in JSON format
        #[arg(long, env = "RILL_JSON")]
        json: bool,
    },

    /// Print the compiled bytecode of a Rill source file
    Disasm {
        /// Path to the Rill source file
        file: String,
    },
}

fn main() -> ExitCode {
    match dispatch() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn dispatch() -> Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { file, json } => {
            let source = read_source(&file)?;
            let mut stdout = std::io::stdout();
            match run_source(&source, &mut stdout) {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(ExecError::Compile(diags)) => {
                    report_diagnostics(&diags, json)?;
                    Ok(ExitCode::from(EXIT_DIAGNOSTICS))
                }
                Err(ExecError::Runtime(fault)) => {
                    stdout.flush().ok();
                    match fault.line() {
                        Some(line) => eprintln!("runtime error [line {}]: {}", line, fault),
                        None => eprintln!("runtime error: {}", fault),
                    }
                    Ok(ExitCode::from(EXIT_FAULT))
                }
            }
        }
        Commands::Check { file, json } => {
            let source = read_source(&file)?;
            match compile_source(&source) {
                Ok(_) => {
                    println!("no errors found in {}", file);
                    Ok(ExitCode::SUCCESS)
                }
                Err(diags) => {
                    report_diagnostics(&diags, json)?;
                    Ok(ExitCode::from(EXIT_DIAGNOSTICS))
                }
            }
        }
        Commands::Disasm { file } => {
            let source = read_source(&file)?;
            match compile_source(&source) {
                Ok(bytecode) => {
                    print!("{}", disassemble(&bytecode));
                    Ok(ExitCode::SUCCESS)
                }
                Err(diags) => {
                    report_diagnostics(&diags, false)?;
                    Ok(ExitCode::from(EXIT_DIAGNOSTICS))
                }
            }
        }
    }
}

fn read_source(file: &str) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file))
}

fn report_diagnostics(diags: &[Diagnostic], json: bool) -> Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(diags)?;
        eprintln!("{}", rendered);
        return Ok(());
    }
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    for diag in diags {
        diag.emit_colored(&mut stderr)
            .context("failed to write diagnostic")?;
    }
    Ok(())
}
