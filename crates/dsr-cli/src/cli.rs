//! CLI argument definitions for the report populator.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "dsr",
    version,
    about = "Brochure-to-report populator - resolve template fields from an indexed source document",
    long_about = "Populate a drug safety report template from an investigator brochure.\n\n\
                  Indexes the extracted source document into sections, matches every\n\
                  template field through the declarative mapping table, and copies,\n\
                  synthesizes, or explicitly declines each field."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline: index, resolve, and populate the template.
    Populate(PopulateArgs),

    /// Build or refresh the section index for a document.
    Index(IndexArgs),

    /// Parse a mapping table and show the rule breakdown.
    Mapping(MappingArgs),
}

#[derive(Parser)]
pub struct PopulateArgs {
    /// Path to the extracted document JSON (page-tagged text and table blocks).
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Path to the mapping table (markdown).
    #[arg(long = "mapping", value_name = "PATH")]
    pub mapping: PathBuf,

    /// Path to the report template with [INSERT_...] placeholders.
    #[arg(long = "template", value_name = "PATH")]
    pub template: PathBuf,

    /// Output directory for the populated report and run artifacts
    /// (default: <DOCUMENT dir>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory for the section index and synthesis caches
    /// (default: <output dir>/cache).
    #[arg(long = "cache-dir", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Rebuild the section index even if a cached one matches.
    #[arg(long = "force-reindex")]
    pub force_reindex: bool,

    /// Skip the completion service; synthesize fields resolve as
    /// unavailable with an explicit reason.
    #[arg(long = "no-synthesis")]
    pub no_synthesis: bool,

    /// API key for the completion service (or set DSR_API_KEY).
    #[arg(long = "api-key", value_name = "KEY")]
    pub api_key: Option<String>,

    /// Worker pool size for the synthesize path.
    #[arg(long = "synthesis-workers", value_name = "N")]
    pub synthesis_workers: Option<usize>,
}

#[derive(Parser)]
pub struct IndexArgs {
    /// Path to the extracted document JSON.
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Directory for the section index cache
    /// (default: <DOCUMENT dir>/cache).
    #[arg(long = "cache-dir", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Rebuild even if a cached index matches.
    #[arg(long = "force-reindex")]
    pub force_reindex: bool,
}

#[derive(Parser)]
pub struct MappingArgs {
    /// Path to the mapping table (markdown).
    #[arg(value_name = "MAPPING")]
    pub mapping: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
