//! Schema validation CLI
//!
//! Validates JSON sample files against a schema written as record types,
//! fluent-DSL or JSON Schema.
//!
//! Usage:
//!   wiretwin-schema <schema_file> <sample_file_or_directory>... [OPTIONS]

use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use wiretwin_schema::{Format, ValidationResult, Validator};

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Validate JSON samples against a schema
#[derive(Parser, Debug)]
#[command(name = "wiretwin-schema")]
#[command(author, version, about = "Validate JSON samples against a schema")]
struct Args {
    /// Schema file
    #[arg(required = true)]
    schema: PathBuf,

    /// Sample files or directories containing `.json` samples
    #[arg(required = true)]
    samples: Vec<PathBuf>,

    /// Schema format: record-type, fluent-dsl, json-schema (guessed from the
    /// file extension when omitted)
    #[arg(short, long)]
    format: Option<String>,

    /// Output format: text (default), json
    #[arg(short, long, default_value = "text")]
    output: String,

    /// Strict mode - treat schema warnings as errors
    #[arg(short, long)]
    strict: bool,
}

#[derive(Debug, Serialize)]
struct SampleReport {
    file: String,
    #[serde(flatten)]
    result: ValidationResult,
}

#[derive(Debug, Serialize)]
struct Report {
    schema: String,
    format: Format,
    warnings: Vec<String>,
    samples: Vec<SampleReport>,
    invalid: usize,
}

fn main() {
    let args = Args::parse();

    let format = match resolve_format(&args) {
        Ok(f) => f,
        Err(e) => fail(&e),
    };
    let text = match std::fs::read_to_string(&args.schema) {
        Ok(t) => t,
        Err(e) => fail(&format!("failed to read {}: {e}", args.schema.display())),
    };
    let validator = match Validator::new(&text, format) {
        Ok(v) => v,
        Err(e) => fail(&format!("{}: {e}", args.schema.display())),
    };

    let files = collect_sample_files(&args.samples);
    let mut report = Report {
        schema: args.schema.display().to_string(),
        format,
        warnings: validator.warnings().to_vec(),
        samples: Vec::with_capacity(files.len()),
        invalid: 0,
    };

    for file in &files {
        let result = match std::fs::read(file) {
            Ok(bytes) => validator
                .validate(&bytes)
                .unwrap_or_else(|e| ValidationResult {
                    valid: false,
                    errors: vec![e.to_string()],
                }),
            Err(e) => ValidationResult {
                valid: false,
                errors: vec![format!("failed to read file: {e}")],
            },
        };
        if !result.valid {
            report.invalid += 1;
        }
        report.samples.push(SampleReport {
            file: file.display().to_string(),
            result,
        });
    }

    if args.output == "json" {
        match serde_json::to_string_pretty(&report) {
            Ok(output) => println!("{output}"),
            Err(e) => fail(&e.to_string()),
        }
    } else {
        print_report(&report);
    }

    let failed = report.invalid > 0 || (args.strict && !report.warnings.is_empty());
    std::process::exit(if failed { 1 } else { 0 });
}

fn fail(message: &str) -> ! {
    eprintln!("{RED}{BOLD}error:{RESET} {message}");
    std::process::exit(2);
}

fn resolve_format(args: &Args) -> Result<Format, String> {
    if let Some(format) = &args.format {
        return format.parse().map_err(|e: wiretwin_schema::SchemaError| e.to_string());
    }
    Format::from_extension(&args.schema).ok_or_else(|| {
        format!(
            "cannot guess the schema format of {}; pass --format",
            args.schema.display()
        )
    })
}

fn collect_sample_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            if let Ok(entries) = std::fs::read_dir(path) {
                for entry in entries.flatten() {
                    let entry_path = entry.path();
                    if is_json_file(&entry_path) {
                        files.push(entry_path);
                    }
                }
            }
        } else {
            files.push(path.clone());
        }
    }

    files.sort();
    files
}

fn is_json_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}

fn print_report(report: &Report) {
    println!("{BOLD}{CYAN}Schema Validation{RESET}");
    println!("{DIM}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{RESET}");
    println!(
        "{DIM}Schema:{RESET}  {CYAN}{}{RESET} {DIM}({}){RESET}",
        report.schema, report.format
    );
    for warning in &report.warnings {
        println!("{YELLOW}warning:{RESET} {warning}");
    }
    println!();

    for sample in &report.samples {
        if sample.result.valid {
            println!("{GREEN}PASS{RESET} {BOLD}{}{RESET}", sample.file);
            continue;
        }
        println!("{RED}FAIL{RESET} {BOLD}{}{RESET}", sample.file);
        for error in &sample.result.errors {
            println!("  {RED}|{RESET} {error}");
        }
    }

    println!();
    println!("{DIM}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{RESET}");
    println!(
        "  {DIM}Samples checked:{RESET} {BOLD}{}{RESET}",
        report.samples.len()
    );
    if report.invalid > 0 {
        println!("  {RED}Invalid:{RESET}         {BOLD}{RED}{}{RESET}", report.invalid);
        println!("\n{RED}{BOLD}Validation failed{RESET}");
    } else {
        println!("  {GREEN}Invalid:{RESET}         {BOLD}{GREEN}0{RESET}");
        println!("\n{GREEN}{BOLD}All samples valid!{RESET}");
    }
}
