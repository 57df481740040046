//! Field resolution engine.
//!
//! Each field rule resolves independently against a frozen section index,
//! so resolution is pure per field and safe to run concurrently. Direct
//! and unavailable fields are cheap and resolve inline; synthesize fields
//! go through a bounded worker pool because the completion service is
//! rate-limited. Per-field failures never abort a run: they become
//! `unavailable` records with a reason.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use dsr_model::{FieldRule, ResolutionRecord, Section, SectionIndex, Strategy};

use crate::bundle::build_bundle;
use crate::error::SynthesisError;
use crate::repository::{SynthesisCache, bundle_hash};
use crate::synthesis::{SynthesisRequest, SynthesisService};

/// Upper bound on sections collected per prefix reference, so a shallow
/// reference cannot swallow half the document.
const MAX_PREFIX_MATCHES: usize = 8;

/// Direct extractions longer than this keep only their first paragraph.
const DIRECT_FULL_TEXT_LIMIT: usize = 1200;

/// Character budget for an assembled synthesis bundle.
const DEFAULT_BUNDLE_CHAR_BUDGET: usize = 10_000;

/// Completion token budget per synthesis call.
const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 2_000;

/// Synthesize-path worker pool size.
const DEFAULT_SYNTHESIS_WORKERS: usize = 4;

/// Extra attempts after the first failed synthesis call.
const DEFAULT_SYNTHESIS_RETRIES: u32 = 2;

/// Base backoff between synthesis retries; doubles per attempt.
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Tunables for the resolution engine.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Cap on sections matched by one prefix reference.
    pub prefix_match_cap: usize,
    /// Length bound above which direct extractions keep only the first
    /// paragraph.
    pub direct_full_text_limit: usize,
    /// Character budget for synthesis bundles.
    pub bundle_char_budget: usize,
    /// Completion token budget per synthesis call.
    pub max_completion_tokens: u32,
    /// Worker pool size for the synthesize path.
    pub synthesis_workers: usize,
    /// Retry budget for transient synthesis failures.
    pub synthesis_retries: u32,
    /// Base backoff between retries; doubles per attempt.
    pub retry_backoff: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            prefix_match_cap: MAX_PREFIX_MATCHES,
            direct_full_text_limit: DIRECT_FULL_TEXT_LIMIT,
            bundle_char_budget: DEFAULT_BUNDLE_CHAR_BUDGET,
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            synthesis_workers: DEFAULT_SYNTHESIS_WORKERS,
            synthesis_retries: DEFAULT_SYNTHESIS_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Cooperative run-level cancellation.
///
/// Cancelling stops new synthesis submissions; in-flight calls complete
/// or time out normally, and every remaining field still ends in an
/// explicit record.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Resolves field rules against a frozen section index.
pub struct Resolver<'a> {
    index: &'a SectionIndex,
    service: &'a dyn SynthesisService,
    cache: Option<&'a SynthesisCache>,
    config: ResolverConfig,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over a fully built index.
    #[must_use]
    pub fn new(index: &'a SectionIndex, service: &'a dyn SynthesisService) -> Self {
        Self {
            index,
            service,
            cache: None,
            config: ResolverConfig::default(),
        }
    }

    /// Attaches a synthesis side-cache.
    #[must_use]
    pub fn with_cache(mut self, cache: &'a SynthesisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Overrides the engine tunables.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolves a single field rule. Pure per field: the outcome depends
    /// only on the rule and the index.
    #[must_use]
    pub fn resolve(&self, rule: &FieldRule) -> ResolutionRecord {
        match rule.strategy_hint {
            Strategy::Unavailable => {
                let reason = rule
                    .declared_reason()
                    .unwrap_or("marked unavailable in mapping");
                ResolutionRecord::unavailable(&rule.field_id, Vec::new(), reason)
            }
            Strategy::Direct => self.resolve_direct(rule),
            Strategy::Synthesize => self.resolve_synthesize(rule),
        }
    }

    /// Resolves all rules, preserving input order in the output.
    ///
    /// Direct and unavailable fields resolve inline; synthesize fields
    /// run on the bounded worker pool. Cancellation converts not-yet
    /// started synthesize fields into explicit `unavailable` records.
    #[must_use]
    pub fn resolve_all(&self, rules: &[FieldRule], cancel: &CancelFlag) -> Vec<ResolutionRecord> {
        let mut records: Vec<Option<ResolutionRecord>> = Vec::with_capacity(rules.len());
        records.resize_with(rules.len(), || None);

        let mut synthesis_jobs: VecDeque<usize> = VecDeque::new();
        for (i, rule) in rules.iter().enumerate() {
            if rule.strategy_hint == Strategy::Synthesize {
                synthesis_jobs.push_back(i);
            } else {
                records[i] = Some(self.resolve(rule));
            }
        }

        if !synthesis_jobs.is_empty() {
            let workers = self.config.synthesis_workers.clamp(1, synthesis_jobs.len());
            let queue = Mutex::new(synthesis_jobs);
            let results: Mutex<Vec<(usize, ResolutionRecord)>> = Mutex::new(Vec::new());

            thread::scope(|scope| {
                for _ in 0..workers {
                    scope.spawn(|| {
                        loop {
                            let job = queue.lock().expect("job queue lock").pop_front();
                            let Some(i) = job else { break };
                            let rule = &rules[i];
                            let record = if cancel.is_cancelled() {
                                ResolutionRecord::unavailable(
                                    &rule.field_id,
                                    Vec::new(),
                                    "run cancelled before synthesis",
                                )
                            } else {
                                self.resolve(rule)
                            };
                            results.lock().expect("results lock").push((i, record));
                        }
                    });
                }
            });

            for (i, record) in results.into_inner().expect("results lock") {
                records[i] = Some(record);
            }
        }

        let records: Vec<ResolutionRecord> = records
            .into_iter()
            .map(|r| r.expect("every field ends in a record"))
            .collect();

        let count = |strategy: Strategy| {
            records
                .iter()
                .filter(|r| r.strategy == strategy)
                .count()
        };
        info!(
            fields = records.len(),
            direct = count(Strategy::Direct),
            synthesized = count(Strategy::Synthesize),
            unavailable = count(Strategy::Unavailable),
            "field resolution complete"
        );
        records
    }

    /// Collects the sections a rule's references resolve to, in priority
    /// order: exact key match first, then prefix matches in document
    /// order, capped per reference.
    fn lookup_sections(&self, rule: &FieldRule) -> Vec<&'a Section> {
        let mut found: Vec<&Section> = Vec::new();
        for source_ref in &rule.source_refs {
            if let Some(section) = self.index.get(&source_ref.key) {
                push_unique(&mut found, section);
                continue;
            }
            for section in self
                .index
                .with_prefix(&source_ref.key)
                .into_iter()
                .take(self.config.prefix_match_cap)
            {
                push_unique(&mut found, section);
            }
        }
        found
    }

    fn resolve_direct(&self, rule: &FieldRule) -> ResolutionRecord {
        let sections = self.lookup_sections(rule);
        let Some(section) = sections.first() else {
            return self.not_found(rule);
        };
        let text = direct_text(&section.text, self.config.direct_full_text_limit);
        debug!(field = %rule.field_id, source = %section.key, chars = text.len(), "direct extraction");
        ResolutionRecord::direct(&rule.field_id, section.key.clone(), text)
    }

    fn resolve_synthesize(&self, rule: &FieldRule) -> ResolutionRecord {
        let sections = self.lookup_sections(rule);
        if sections.is_empty() {
            return self.not_found(rule);
        }

        let bundle = build_bundle(&sections, self.config.bundle_char_budget);
        let hash = bundle_hash(&bundle.text);
        if let Some(cache) = self.cache
            && let Some(text) = cache.load(&rule.field_id, &hash)
        {
            return ResolutionRecord::synthesized(&rule.field_id, bundle.sources, text);
        }

        let request = SynthesisRequest {
            bundle: bundle.text,
            instructions: build_instructions(rule),
            max_tokens: self.config.max_completion_tokens,
        };
        match self.synthesize_with_retry(&request) {
            Ok(text) => {
                if let Some(cache) = self.cache
                    && let Err(error) = cache.store(&rule.field_id, &hash, &text)
                {
                    warn!(field = %rule.field_id, %error, "failed to persist synthesis cache entry");
                }
                ResolutionRecord::synthesized(&rule.field_id, bundle.sources, text)
            }
            Err(error) => ResolutionRecord::unavailable(
                &rule.field_id,
                bundle.sources,
                format!("synthesis failed: {error}"),
            ),
        }
    }

    /// Calls the service with the configured retry budget. Only
    /// transient failures are retried; rate limits and rejections
    /// surface immediately.
    fn synthesize_with_retry(
        &self,
        request: &SynthesisRequest,
    ) -> Result<String, SynthesisError> {
        let mut attempt = 0u32;
        loop {
            match self.service.synthesize(request) {
                Ok(text) => return Ok(text),
                Err(error) if error.is_retryable() && attempt < self.config.synthesis_retries => {
                    attempt += 1;
                    let backoff = self.config.retry_backoff * (1u32 << (attempt - 1));
                    warn!(attempt, %error, "synthesis attempt failed, backing off");
                    thread::sleep(backoff);
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn not_found(&self, rule: &FieldRule) -> ResolutionRecord {
        let keys: Vec<&str> = rule.source_refs.iter().map(|r| r.key.as_str()).collect();
        let reason = if keys.is_empty() {
            "source section not found".to_string()
        } else {
            format!("source section not found: {}", keys.join(", "))
        };
        ResolutionRecord::unavailable(&rule.field_id, Vec::new(), reason)
    }
}

fn push_unique<'s>(found: &mut Vec<&'s Section>, section: &'s Section) {
    if !found.iter().any(|s| s.key == section.key) {
        found.push(section);
    }
}

/// Direct extractions are lossless copies: the full trimmed text, or the
/// first paragraph alone when the section runs long.
fn direct_text(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= limit {
        return trimmed.to_string();
    }
    trimmed
        .split("\n\n")
        .next()
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Instructions handed to the completion service alongside the bundle.
fn build_instructions(rule: &FieldRule) -> String {
    let mut out = format!("Synthesize the content for report field {}", rule.field_id);
    if !rule.description.is_empty() {
        out.push_str(&format!(" ({})", rule.description));
    }
    out.push('.');
    if !rule.notes.trim().is_empty() {
        out.push_str(&format!(" Mapping notes: {}.", rule.notes.trim()));
    }
    out.push_str(
        " Write formal scientific prose suitable for a regulatory safety report. \
         Be concise, stay faithful to the sources, and do not add citations.",
    );
    out
}
