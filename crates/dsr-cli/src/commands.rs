//! Subcommand implementations.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::Table;
use tracing::warn;

use dsr_index::IndexCache;
use dsr_map::load_rules;
use dsr_model::Strategy;

use crate::cli::{IndexArgs, MappingArgs, PopulateArgs};
use crate::pipeline::{
    PipelineOptions, PipelineResult, SynthesisMode, load_extracted_document, run_pipeline,
};
use crate::summary::{apply_table_style, header_cell, strategy_cell};

/// Environment variable consulted for the completion service key.
const API_KEY_ENV: &str = "DSR_API_KEY";

pub fn run_populate(args: &PopulateArgs) -> Result<PipelineResult> {
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_sibling(&args.document, "output"));
    let cache_dir = args
        .cache_dir
        .clone()
        .unwrap_or_else(|| output_dir.join("cache"));

    let synthesis = if args.no_synthesis {
        SynthesisMode::Disabled
    } else {
        match args
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
        {
            Some(api_key) => SynthesisMode::Api { api_key },
            None => {
                warn!(
                    "no API key provided ({API_KEY_ENV} unset); \
                     synthesize fields will resolve as unavailable"
                );
                SynthesisMode::Disabled
            }
        }
    };

    run_pipeline(&PipelineOptions {
        document: args.document.clone(),
        mapping: args.mapping.clone(),
        template: args.template.clone(),
        output_dir,
        cache_dir,
        force_reindex: args.force_reindex,
        synthesis,
        synthesis_workers: args.synthesis_workers,
    })
}

pub fn run_index(args: &IndexArgs) -> Result<()> {
    let cache_dir = args
        .cache_dir
        .clone()
        .unwrap_or_else(|| default_sibling(&args.document, "cache"));
    let doc = load_extracted_document(&args.document)?;
    let cache = IndexCache::new(&cache_dir)?;
    let (index, rebuilt) = cache
        .load_or_build(&doc, args.force_reindex)
        .context("build section index")?;

    println!(
        "Index: {} sections over pages {}-{} ({})",
        index.len(),
        index.page_start,
        index.page_end,
        if rebuilt { "rebuilt" } else { "cached" }
    );
    println!("Cache: {}", cache.path_for(&index.source_hash).display());
    Ok(())
}

pub fn run_mapping(args: &MappingArgs) -> Result<()> {
    let mapping_text = std::fs::read_to_string(&args.mapping)
        .with_context(|| format!("failed to read mapping: {}", args.mapping.display()))?;
    let rules = load_rules(&mapping_text).context("parse mapping specification")?;

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Strategy"),
        header_cell("Sources"),
        header_cell("Notes"),
    ]);
    apply_table_style(&mut table);
    for rule in &rules {
        let sources: Vec<&str> = rule.source_refs.iter().map(|r| r.key.as_str()).collect();
        table.add_row(vec![
            comfy_table::Cell::new(&rule.field_id),
            strategy_cell(rule.strategy_hint),
            comfy_table::Cell::new(sources.join(", ")),
            comfy_table::Cell::new(&rule.notes),
        ]);
    }
    println!("{table}");

    let count = |strategy: Strategy| {
        rules
            .iter()
            .filter(|r| r.strategy_hint == strategy)
            .count()
    };
    println!(
        "{} rules: {} direct, {} synthesize, {} unavailable",
        rules.len(),
        count(Strategy::Direct),
        count(Strategy::Synthesize),
        count(Strategy::Unavailable)
    );
    Ok(())
}

/// A directory next to the given file, falling back to the current
/// directory for bare filenames.
fn default_sibling(file: &std::path::Path, name: &str) -> PathBuf {
    file.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from(name), |p| p.join(name))
}
