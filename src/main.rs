use anyhow::{Context, Result};
use clap::Parser;
use classview::cli::{Cli, Commands, LineQuery, OutputFormat};
use classview::config::{LOG_ENV, Settings, resolve_engine_jar, resolve_java, resolve_options};
use classview::decompiler::Decompiler;
use classview::error::SkipReason;
use classview::fernflower::FernflowerProcess;
use classview::inspect::{ClassHeader, Verdict, classify, parse_class_header};
use classview::report::{DecompileReport, render_text};
use classview::source::{ClassLocation, ClassUnit, CompilationUnitSet};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let cli = parse_cli();

    match cli.command.clone() {
        Commands::Decompile {
            targets,
            format,
            output,
        } => {
            let decompiler = build_decompiler(&cli)?;
            let reports: Vec<DecompileReport> = targets
                .par_iter()
                .map(|target| {
                    DecompileReport::new(target.as_str(), decompiler.decompile(&ClassLocation::parse(target)))
                })
                .collect();
            let content = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&reports)?,
                OutputFormat::Text => render_text(&reports),
            };
            write_output(&content, output.as_deref())?;
        }
        Commands::Inspect { target } => {
            let location = ClassLocation::parse(&target);
            let unit = ClassUnit::read(location)?;
            let output = inspect_unit(&unit);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Units { target } => {
            let unit = ClassUnit::read(ClassLocation::parse(&target))?;
            let units = CompilationUnitSet::discover(unit)?;
            let listing: Vec<UnitEntry> = units
                .units()
                .iter()
                .map(|u| UnitEntry {
                    path: u.key().to_string(),
                    size: u.bytes().len(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Commands::Map { target, line } => {
            let decompiler = build_decompiler(&cli)?;
            let result = decompiler.decompile(&ClassLocation::parse(&target));
            let mapping = result
                .mapping
                .with_context(|| format!("No line mapping available for {target}"))?;
            let answer = match line {
                LineQuery {
                    bytecode: Some(b), ..
                } => mapping.bytecode_to_source(b),
                LineQuery {
                    source: Some(s), ..
                } => mapping.source_to_bytecode(s),
                LineQuery { .. } => None,
            };
            match answer {
                Some(l) => println!("{l}"),
                None => println!("none"),
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_cli() -> Cli {
    let args: Vec<String> = std::env::args().collect();
    Cli::parse_from(rewrite_args_for_implicit_decompile(args))
}

const GLOBAL_OPTIONS_WITH_VALUE: [&str; 3] = ["--engine-jar", "--indent", "--config"];

/// `decompile` flags; the implied subcommand has to precede them.
const DECOMPILE_OPTIONS: [&str; 4] = ["-f", "--format", "-o", "--output"];

fn is_decompile_option(arg: &str) -> bool {
    DECOMPILE_OPTIONS.contains(&arg) || arg.starts_with("--format=") || arg.starts_with("--output=")
}

fn rewrite_args_for_implicit_decompile(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = ["decompile", "inspect", "units", "map", "help"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if GLOBAL_OPTIONS_WITH_VALUE.contains(&a) {
            idx += 2;
            continue;
        }

        if is_decompile_option(a) {
            break;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "decompile".to_string());
        }
    }

    args
}

fn build_decompiler(cli: &Cli) -> Result<Decompiler<FernflowerProcess>> {
    let settings = Settings::resolve(cli)?;
    let engine = FernflowerProcess::new(resolve_engine_jar(cli, &settings)?, resolve_java(&settings));
    Ok(Decompiler::new(engine, resolve_options(cli, &settings)))
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    target: String,
    header: Option<ClassHeader>,
    header_error: Option<String>,
    groovy: bool,
    verdict: Verdict,
}

fn inspect_unit(unit: &ClassUnit) -> InspectOutput {
    let verdict = classify(unit.file_name(), unit.bytes());
    let (header, header_error) = match parse_class_header(unit.bytes()) {
        Ok(h) => (Some(h), None),
        Err(e) => (None, Some(format!("{e:#}"))),
    };
    InspectOutput {
        target: unit.key().to_string(),
        groovy: verdict == Verdict::Skip(SkipReason::Groovy),
        header,
        header_error,
        verdict,
    }
}

#[derive(Debug, Serialize)]
struct UnitEntry {
    path: String,
    size: usize,
}

fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write output: {}", path.display()))?;
    } else {
        print!("{content}");
        if !content.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
