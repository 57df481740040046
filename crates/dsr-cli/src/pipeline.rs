//! Pipeline orchestration: index, load rules, resolve, populate.
//!
//! Stage failures that abort the run (unreadable inputs, malformed
//! mapping) surface as errors; per-field failures never do, they end as
//! `unavailable` records in the output.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, info_span};

use dsr_index::IndexCache;
use dsr_map::load_rules;
use dsr_model::{ExtractedDocument, ResolutionRecord};
use dsr_report::{PopulationReport, populate};
use dsr_resolve::{
    CancelFlag, DisabledSynthesis, HttpSynthesisClient, Resolver, ResolverConfig, SynthesisCache,
    SynthesisConfig, SynthesisService,
};

/// How synthesize fields reach the completion service.
pub enum SynthesisMode {
    /// No service; synthesize fields resolve as unavailable.
    Disabled,
    /// Call the HTTP completion service with this key.
    Api {
        /// Bearer token for the service.
        api_key: String,
    },
}

/// Everything a full pipeline run needs.
pub struct PipelineOptions {
    /// Extracted document JSON path.
    pub document: PathBuf,
    /// Mapping table path.
    pub mapping: PathBuf,
    /// Report template path.
    pub template: PathBuf,
    /// Directory receiving the populated report and run artifacts.
    pub output_dir: PathBuf,
    /// Directory holding the index and synthesis caches.
    pub cache_dir: PathBuf,
    /// Rebuild the section index even on a cache hit.
    pub force_reindex: bool,
    /// Completion service mode.
    pub synthesis: SynthesisMode,
    /// Override for the synthesize-path worker pool size.
    pub synthesis_workers: Option<usize>,
}

/// Outcome of a full pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    /// Sections in the index the run resolved against.
    pub sections: usize,
    /// Whether the index was rebuilt rather than loaded from cache.
    pub index_rebuilt: bool,
    /// Field rules parsed from the mapping.
    pub rules: usize,
    /// Per-field resolution records, in mapping order.
    pub records: Vec<ResolutionRecord>,
    /// Population accounting.
    pub report: PopulationReport,
    /// Path of the populated report.
    pub document_path: PathBuf,
    /// Path of the resolution records artifact.
    pub records_path: PathBuf,
    /// Path of the population report artifact.
    pub report_path: PathBuf,
}

/// Reads and parses an extracted-document JSON file.
///
/// # Errors
///
/// Fails when the file is unreadable or not valid extraction JSON.
pub fn load_extracted_document(path: &Path) -> Result<ExtractedDocument> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read document: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse extracted document: {}", path.display()))
}

/// Runs the full pipeline and writes the run artifacts.
///
/// # Errors
///
/// Fails on unreadable inputs, a malformed mapping, an empty document,
/// or unwritable outputs. Per-field resolution failures do not abort.
pub fn run_pipeline(options: &PipelineOptions) -> Result<PipelineResult> {
    let doc = load_extracted_document(&options.document)?;
    let cache = IndexCache::new(&options.cache_dir)?;
    let (index, index_rebuilt) = info_span!("index")
        .in_scope(|| cache.load_or_build(&doc, options.force_reindex))
        .context("build section index")?;
    info!(
        sections = index.len(),
        rebuilt = index_rebuilt,
        "section index ready"
    );

    let mapping_text = fs::read_to_string(&options.mapping)
        .with_context(|| format!("failed to read mapping: {}", options.mapping.display()))?;
    let rules = load_rules(&mapping_text).context("parse mapping specification")?;
    info!(rules = rules.len(), "mapping rules loaded");

    let service: Box<dyn SynthesisService> = match &options.synthesis {
        SynthesisMode::Disabled => Box::new(DisabledSynthesis),
        SynthesisMode::Api { api_key } => Box::new(
            HttpSynthesisClient::new(SynthesisConfig::new(api_key.clone()))
                .context("build synthesis client")?,
        ),
    };
    let synthesis_cache = SynthesisCache::new(options.cache_dir.join("synthesis"))?;
    let mut resolver_config = ResolverConfig::default();
    if let Some(workers) = options.synthesis_workers {
        resolver_config.synthesis_workers = workers.max(1);
    }
    let resolver = Resolver::new(&index, service.as_ref())
        .with_cache(&synthesis_cache)
        .with_config(resolver_config);
    let records =
        info_span!("resolve").in_scope(|| resolver.resolve_all(&rules, &CancelFlag::new()));

    let template = fs::read_to_string(&options.template)
        .with_context(|| format!("failed to read template: {}", options.template.display()))?;
    let populated = info_span!("populate").in_scope(|| populate(&template, &records));

    fs::create_dir_all(&options.output_dir).with_context(|| {
        format!(
            "failed to create output directory: {}",
            options.output_dir.display()
        )
    })?;
    let document_path = options.output_dir.join(populated_name(&options.template));
    fs::write(&document_path, &populated.text)
        .with_context(|| format!("failed to write report: {}", document_path.display()))?;

    let records_path = options.output_dir.join("resolution_records.json");
    fs::write(&records_path, serde_json::to_string_pretty(&records)?)
        .with_context(|| format!("failed to write records: {}", records_path.display()))?;

    let report_path = options.output_dir.join("population_report.json");
    fs::write(&report_path, serde_json::to_string_pretty(&populated.report)?)
        .with_context(|| format!("failed to write report: {}", report_path.display()))?;

    info!(
        report = %document_path.display(),
        populated = populated.report.populated_count(),
        unavailable = populated.report.unavailable_count(),
        "pipeline complete"
    );

    Ok(PipelineResult {
        sections: index.len(),
        index_rebuilt,
        rules: rules.len(),
        records,
        report: populated.report,
        document_path,
        records_path,
        report_path,
    })
}

/// Output filename derived from the template: `report.md` becomes
/// `report_populated.md`.
fn populated_name(template: &Path) -> String {
    let stem = template
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    let ext = template
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("md");
    format!("{stem}_populated.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populated_name_keeps_the_template_extension() {
        assert_eq!(
            populated_name(Path::new("/tmp/safety_report.md")),
            "safety_report_populated.md"
        );
        assert_eq!(populated_name(Path::new("template.txt")), "template_populated.txt");
    }
}
