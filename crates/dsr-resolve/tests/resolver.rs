//! Integration tests for the resolution engine.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dsr_model::{FieldRule, Section, SectionIndex, SourceRef, Strategy, UNAVAILABLE_MARKER};
use dsr_resolve::{
    CancelFlag, FixedSynthesis, Resolver, ResolverConfig, SynthesisCache, SynthesisError,
    SynthesisRequest, SynthesisService,
};
use tempfile::TempDir;

fn section(key: &str, text: &str) -> Section {
    Section {
        key: key.to_string(),
        title: format!("Title {key}"),
        level: key.split('.').count(),
        page_start: 1,
        page_end: 1,
        text: text.to_string(),
        tables: Vec::new(),
        parent_key: None,
    }
}

fn index() -> SectionIndex {
    SectionIndex {
        source_hash: "test".to_string(),
        page_start: 1,
        page_end: 1,
        sections: vec![
            section("6.1", "Approved for X"),
            section("6.4", "Risk A; Risk B"),
        ],
    }
}

fn rule(field: &str, refs: &[&str], strategy: Strategy, notes: &str) -> FieldRule {
    FieldRule {
        field_id: field.to_string(),
        description: String::new(),
        source_refs: refs.iter().map(|k| SourceRef::new(*k)).collect(),
        strategy_hint: strategy,
        notes: notes.to_string(),
    }
}

fn fast_config() -> ResolverConfig {
    ResolverConfig {
        retry_backoff: Duration::ZERO,
        ..ResolverConfig::default()
    }
}

/// Records every request; completes with a fixed string.
#[derive(Default)]
struct CapturingStub {
    calls: AtomicUsize,
    last_bundle: Mutex<Option<String>>,
}

impl SynthesisService for CapturingStub {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<String, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_bundle.lock().unwrap() = Some(request.bundle.clone());
        Ok("synthesized output".to_string())
    }
}

/// Fails every call with the given error constructor.
struct FailingStub {
    calls: AtomicUsize,
    make_error: fn() -> SynthesisError,
}

impl FailingStub {
    fn new(make_error: fn() -> SynthesisError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            make_error,
        }
    }
}

impl SynthesisService for FailingStub {
    fn synthesize(&self, _request: &SynthesisRequest) -> Result<String, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.make_error)())
    }
}

/// Proves a path never contacts the service.
struct PanickingStub;

impl SynthesisService for PanickingStub {
    fn synthesize(&self, _request: &SynthesisRequest) -> Result<String, SynthesisError> {
        panic!("synthesis service must not be contacted");
    }
}

#[test]
fn direct_field_copies_section_text_verbatim() {
    let index = index();
    let service = PanickingStub;
    let resolver = Resolver::new(&index, &service);

    let record = resolver.resolve(&rule("[INSERT_INDICATIONS]", &["6.1"], Strategy::Direct, ""));

    assert_eq!(record.strategy, Strategy::Direct);
    assert_eq!(record.text.as_deref(), Some("Approved for X"));
    assert_eq!(record.sources, vec!["6.1"]);
    assert_eq!(record.reason, None);
}

#[test]
fn synthesize_field_bundles_sources_and_returns_completion() {
    let index = index();
    let service = CapturingStub::default();
    let resolver = Resolver::new(&index, &service);

    let record = resolver.resolve(&rule("[INSERT_RISKS]", &["6.4"], Strategy::Synthesize, ""));

    assert_eq!(record.strategy, Strategy::Synthesize);
    assert_eq!(record.text.as_deref(), Some("synthesized output"));
    assert_eq!(record.sources, vec!["6.4"]);
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    let bundle = service.last_bundle.lock().unwrap().clone().unwrap();
    assert!(bundle.contains("Risk A; Risk B"));
}

#[test]
fn unresolvable_reference_is_unavailable_with_not_found_reason() {
    let index = index();
    let service = PanickingStub;
    let resolver = Resolver::new(&index, &service);

    for strategy in [Strategy::Direct, Strategy::Synthesize] {
        let record = resolver.resolve(&rule("[INSERT_MISSING]", &["9.9"], strategy, ""));
        assert_eq!(record.strategy, Strategy::Unavailable);
        let reason = record.reason.as_deref().unwrap();
        assert!(!reason.is_empty());
        assert!(reason.contains("not found"), "reason was: {reason}");
        assert!(reason.contains("9.9"));
    }
}

#[test]
fn unavailable_rule_never_contacts_the_service() {
    let index = index();
    let service = PanickingStub;
    let resolver = Resolver::new(&index, &service);

    let record = resolver.resolve(&rule(
        "[INSERT_EXPOSURE]",
        &[],
        Strategy::Unavailable,
        "Requires safety database query",
    ));

    assert_eq!(record.strategy, Strategy::Unavailable);
    assert_eq!(record.reason.as_deref(), Some("Requires safety database query"));
    assert!(record.text.as_deref().unwrap().starts_with(UNAVAILABLE_MARKER));
}

#[test]
fn transport_failures_exhaust_the_retry_budget_then_fall_back() {
    let index = index();
    let service = FailingStub::new(|| SynthesisError::Transport("connection reset".to_string()));
    let resolver = Resolver::new(&index, &service).with_config(fast_config());

    let record = resolver.resolve(&rule("[INSERT_RISKS]", &["6.4"], Strategy::Synthesize, ""));

    // One initial attempt plus the two-retry budget.
    assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    assert_eq!(record.strategy, Strategy::Unavailable);
    let reason = record.reason.as_deref().unwrap();
    assert!(reason.starts_with("synthesis failed:"), "reason was: {reason}");
    assert!(reason.contains("connection reset"));
}

#[test]
fn rate_limits_surface_immediately_without_retry() {
    let index = index();
    let service = FailingStub::new(|| SynthesisError::RateLimited { retry_after_secs: 60 });
    let resolver = Resolver::new(&index, &service).with_config(fast_config());

    let record = resolver.resolve(&rule("[INSERT_RISKS]", &["6.4"], Strategy::Synthesize, ""));

    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    assert_eq!(record.strategy, Strategy::Unavailable);
    assert!(record.reason.as_deref().unwrap().starts_with("synthesis failed:"));
}

#[test]
fn prefix_reference_collects_subsections_in_document_order() {
    let mut idx = index();
    idx.sections.push(section("7.2.1", "first sub"));
    idx.sections.push(section("7.2.2", "second sub"));
    let service = CapturingStub::default();
    let resolver = Resolver::new(&idx, &service);

    let record = resolver.resolve(&rule("[INSERT_SUBS]", &["7.2"], Strategy::Synthesize, ""));

    assert_eq!(record.sources, vec!["7.2.1", "7.2.2"]);
    let bundle = service.last_bundle.lock().unwrap().clone().unwrap();
    assert!(bundle.find("first sub").unwrap() < bundle.find("second sub").unwrap());
}

#[test]
fn resolve_all_preserves_input_order() {
    let index = index();
    let service = FixedSynthesis::new("combined");
    let resolver = Resolver::new(&index, &service);

    let rules = vec![
        rule("[INSERT_RISKS]", &["6.4"], Strategy::Synthesize, ""),
        rule("[INSERT_INDICATIONS]", &["6.1"], Strategy::Direct, ""),
        rule("[INSERT_EXPOSURE]", &[], Strategy::Unavailable, "external"),
        rule("[INSERT_RISKS_2]", &["6.4"], Strategy::Synthesize, ""),
    ];
    let records = resolver.resolve_all(&rules, &CancelFlag::new());

    let ids: Vec<&str> = records.iter().map(|r| r.field_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "[INSERT_RISKS]",
            "[INSERT_INDICATIONS]",
            "[INSERT_EXPOSURE]",
            "[INSERT_RISKS_2]",
        ]
    );
    assert!(records.iter().all(|r| r.text.is_some()));
}

#[test]
fn resolution_is_deterministic_for_a_frozen_index() {
    let index = index();
    let service = FixedSynthesis::new("combined");
    let resolver = Resolver::new(&index, &service);

    let rules = vec![
        rule("[INSERT_INDICATIONS]", &["6.1"], Strategy::Direct, ""),
        rule("[INSERT_RISKS]", &["6.4"], Strategy::Synthesize, ""),
    ];
    let first = resolver.resolve_all(&rules, &CancelFlag::new());
    let second = resolver.resolve_all(&rules, &CancelFlag::new());
    assert_eq!(first, second);
}

#[test]
fn cancellation_stops_new_synthesis_but_keeps_explicit_records() {
    let index = index();
    let service = PanickingStub;
    let resolver = Resolver::new(&index, &service);

    let cancel = CancelFlag::new();
    cancel.cancel();
    let rules = vec![
        rule("[INSERT_INDICATIONS]", &["6.1"], Strategy::Direct, ""),
        rule("[INSERT_RISKS]", &["6.4"], Strategy::Synthesize, ""),
    ];
    let records = resolver.resolve_all(&rules, &cancel);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].strategy, Strategy::Direct);
    assert_eq!(records[1].strategy, Strategy::Unavailable);
    assert!(records[1].reason.as_deref().unwrap().contains("cancelled"));
}

#[test]
fn synthesis_cache_skips_repeat_calls_for_unchanged_bundles() {
    let dir = TempDir::new().unwrap();
    let cache = SynthesisCache::new(dir.path()).unwrap();
    let index = index();
    let risks = rule("[INSERT_RISKS]", &["6.4"], Strategy::Synthesize, "");

    let service = CapturingStub::default();
    let resolver = Resolver::new(&index, &service).with_cache(&cache);
    let first = resolver.resolve(&risks);
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);

    // Same index, same rule: the cached completion answers without a call.
    let silent = PanickingStub;
    let resolver = Resolver::new(&index, &silent).with_cache(&cache);
    let second = resolver.resolve(&risks);
    assert_eq!(first.text, second.text);
    assert_eq!(second.text.as_deref(), Some("synthesized output"));
}
