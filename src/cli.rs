use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "classview")]
#[command(about = "Decompile Java class files with their nested classes and map bytecode lines to source lines")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_name = "FILE", global = true)]
    pub engine_jar: Option<PathBuf>,

    #[arg(long, value_name = "N", global = true)]
    pub indent: Option<usize>,

    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Decompile class files; `lib.jar!/a/B.class` addresses a jar entry.
    Decompile {
        #[arg(required = true, value_name = "TARGET")]
        targets: Vec<String>,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Show the parsed class header and the decompilation verdict.
    Inspect {
        #[arg(value_name = "TARGET")]
        target: String,
    },
    /// List the class files decompiled together with TARGET.
    Units {
        #[arg(value_name = "TARGET")]
        target: String,
    },
    /// Decompile TARGET and translate one line number.
    Map {
        #[arg(value_name = "TARGET")]
        target: String,

        #[command(flatten)]
        line: LineQuery,
    },
}

#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct LineQuery {
    #[arg(long, value_name = "LINE")]
    pub bytecode: Option<u32>,

    #[arg(long, value_name = "LINE")]
    pub source: Option<u32>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
