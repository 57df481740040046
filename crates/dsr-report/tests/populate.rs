//! Integration tests for template population.

use dsr_model::ResolutionRecord;
use dsr_report::populate;

fn records() -> Vec<ResolutionRecord> {
    vec![
        ResolutionRecord::direct("[INSERT_INDICATIONS]", "6.1", "Approved for X".to_string()),
        ResolutionRecord::synthesized(
            "[INSERT_RISKS]",
            vec!["6.4".to_string(), "6.5".to_string()],
            "Risks A and B were identified.".to_string(),
        ),
        ResolutionRecord::unavailable(
            "[INSERT_EXPOSURE]",
            Vec::new(),
            "requires safety database query",
        ),
    ]
}

#[test]
fn populated_document_renders_all_three_outcomes() {
    let template = "\
# Drug Safety Report

## Indications
[INSERT_INDICATIONS]

## Key Risks
[INSERT_RISKS]

## Cumulative Exposure
[INSERT_EXPOSURE]";

    let doc = populate(template, &records());

    insta::assert_snapshot!(doc.text, @r"
    # Drug Safety Report

    ## Indications
    Approved for X

    ## Key Risks
    Risks A and B were identified.

    ## Cumulative Exposure
    [DATA NOT AVAILABLE - requires safety database query]
    ");
}

#[test]
fn report_accounts_for_every_placeholder_and_record() {
    let template = "[INSERT_INDICATIONS] [INSERT_EXPOSURE] [INSERT_UNKNOWN]";
    let doc = populate(template, &records());

    assert_eq!(doc.report.populated, vec!["[INSERT_INDICATIONS]"]);
    assert_eq!(doc.report.unavailable, vec!["[INSERT_EXPOSURE]"]);
    assert_eq!(doc.report.unmatched_placeholders, vec!["[INSERT_UNKNOWN]"]);
    assert_eq!(doc.report.missing_in_template, vec!["[INSERT_RISKS]"]);
    assert!(!doc.report.is_complete());
    assert_eq!(doc.report.populated_count(), 1);
    assert_eq!(doc.report.unavailable_count(), 1);

    // Unknown placeholders stay visibly in place.
    assert!(doc.text.contains("[INSERT_UNKNOWN]"));
}

#[test]
fn report_serializes_for_the_run_artifact() {
    let doc = populate("[INSERT_INDICATIONS]", &records());
    let json = serde_json::to_string_pretty(&doc.report).unwrap();
    let round: dsr_report::PopulationReport = serde_json::from_str(&json).unwrap();
    assert_eq!(round, doc.report);
}
