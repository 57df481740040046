//! Integration tests for mapping table parsing.

use dsr_map::{MappingError, load_rules};
use dsr_model::Strategy;

const MAPPING: &str = "\
# Brochure to Report Mapping

| Report Field | Source Sections | Pages | Notes |
|---|---|---|---|
| [INSERT_INDICATIONS] - Approved indications | 6.1 | 89 | copy verbatim |
| [INSERT_RISKS] Key identified risks | 6.4 + 6.5 | 92-94 | Summarize both sections |
| [INSERT_EXPOSURE] Cumulative exposure | N/A | - | Requires safety database query |
| [INSERT_PK_SUMMARY] Pharmacokinetics | 5.3 | 41, 44 | |
| [INSERT_RISKS] Key identified risks (table) | 6.4 | 92 | |
| [INSERT_UNREFERENCED] Orphan field | | | awaiting source assignment |
";

#[test]
fn parses_rules_in_row_order() {
    let rules = load_rules(MAPPING).unwrap();
    let ids: Vec<&str> = rules.iter().map(|r| r.field_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "[INSERT_INDICATIONS]",
            "[INSERT_RISKS]",
            "[INSERT_EXPOSURE]",
            "[INSERT_PK_SUMMARY]",
            "[INSERT_RISKS]",
            "[INSERT_UNREFERENCED]",
        ]
    );
}

#[test]
fn verbatim_note_forces_direct() {
    let rules = load_rules(MAPPING).unwrap();
    let rule = &rules[0];
    assert_eq!(rule.strategy_hint, Strategy::Direct);
    assert_eq!(rule.source_refs.len(), 1);
    assert_eq!(rule.source_refs[0].key, "6.1");
    assert_eq!(rule.source_refs[0].pages, vec![89]);
    assert_eq!(rule.description, "Approved indications");
}

#[test]
fn multi_reference_rule_defaults_to_synthesize() {
    let rules = load_rules(MAPPING).unwrap();
    let rule = &rules[1];
    assert_eq!(rule.strategy_hint, Strategy::Synthesize);
    let keys: Vec<&str> = rule.source_refs.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["6.4", "6.5"]);
    assert_eq!(rule.source_refs[0].pages, vec![92, 93, 94]);
}

#[test]
fn explicit_na_yields_unavailable_with_verbatim_notes() {
    let rules = load_rules(MAPPING).unwrap();
    let rule = &rules[2];
    assert_eq!(rule.strategy_hint, Strategy::Unavailable);
    assert!(rule.source_refs.is_empty());
    assert_eq!(rule.notes, "Requires safety database query");
    assert_eq!(rule.declared_reason(), Some("Requires safety database query"));
}

#[test]
fn single_reference_with_plain_notes_is_direct() {
    let rules = load_rules(MAPPING).unwrap();
    let rule = &rules[3];
    assert_eq!(rule.strategy_hint, Strategy::Direct);
    assert_eq!(rule.source_refs[0].pages, vec![41, 44]);
}

#[test]
fn duplicate_placeholders_stay_independent_rules() {
    let rules = load_rules(MAPPING).unwrap();
    let risks: Vec<_> = rules
        .iter()
        .filter(|r| r.field_id == "[INSERT_RISKS]")
        .collect();
    assert_eq!(risks.len(), 2);
    assert_eq!(risks[0].strategy_hint, Strategy::Synthesize);
    assert_eq!(risks[1].strategy_hint, Strategy::Direct);
}

#[test]
fn missing_reference_yields_unavailable() {
    let rules = load_rules(MAPPING).unwrap();
    let rule = &rules[5];
    assert_eq!(rule.strategy_hint, Strategy::Unavailable);
    assert!(rule.source_refs.is_empty());
}

#[test]
fn mapping_without_any_rules_is_fatal() {
    let err = load_rules("# just prose\n\nno table here\n").unwrap_err();
    assert_eq!(err, MappingError::NoRules);

    let header_only = "| Report Field | Source Sections | Pages | Notes |\n|---|---|---|---|\n";
    assert_eq!(load_rules(header_only).unwrap_err(), MappingError::NoRules);
}
