use super::common::*;
use serde_json::json;

use crate::error::EngineError;
use crate::rubric::Rubric;
use crate::scoring::{BuildingRecord, Eligibility, ScoringEngine};

fn gated_engine() -> ScoringEngine {
    let mut document = waste_document();
    document["eligibility_criteria"]["floor_area_m2"] = json!({ "$gt": 500 });
    let rubric = Rubric::from_value(document).expect("gated rubric parses");
    ScoringEngine::new(rubric).expect("index builds")
}

#[test]
fn eligible_record_passes_the_gate() {
    let engine = waste_engine();

    let verdict = engine
        .check_eligibility(&eligible_record())
        .expect("gate runs");

    assert_eq!(verdict, Eligibility::eligible());
}

#[test]
fn unknown_building_type_names_the_allowed_set() {
    let engine = waste_engine();
    let record = BuildingRecord::new()
        .with("building_type", "Residential")
        .with("operational_years", 3);

    let verdict = engine.check_eligibility(&record).expect("gate runs");

    assert!(!verdict.eligible);
    let reason = verdict.reason.expect("reason present");
    assert!(reason.contains("building_type"), "reason was {reason}");
    assert!(reason.contains("Commercial, Institutional"), "reason was {reason}");
    assert!(reason.contains("Residential"), "reason was {reason}");
}

#[test]
fn operational_years_below_minimum_is_ineligible() {
    let engine = waste_engine();
    let record = BuildingRecord::new()
        .with("building_type", "Institutional")
        .with("operational_years", 0);

    let verdict = engine.check_eligibility(&record).expect("gate runs");

    assert_eq!(
        verdict.reason.as_deref(),
        Some("operational_years must be at least 1, found 0")
    );
}

#[test]
fn missing_numeric_field_counts_as_zero() {
    let engine = waste_engine();
    let record = BuildingRecord::new().with("building_type", "Commercial");

    let verdict = engine.check_eligibility(&record).expect("gate runs");

    assert!(!verdict.eligible);
    assert!(verdict
        .reason
        .as_deref()
        .is_some_and(|reason| reason.contains("operational_years")));
}

#[test]
fn first_failure_wins_while_check_all_collects_every_reason() {
    let engine = gated_engine();
    let record = BuildingRecord::new()
        .with("building_type", "Warehouse")
        .with("floor_area_m2", 500);

    let verdict = engine.check_eligibility(&record).expect("gate runs");
    let failures = engine.eligibility_failures(&record).expect("gate runs");

    assert!(verdict
        .reason
        .as_deref()
        .is_some_and(|reason| reason.starts_with("building_type")));
    assert_eq!(failures.len(), 3);
    assert!(failures[1].starts_with("operational_years"));
    assert_eq!(failures[2], "floor_area_m2 must be greater than 500, found 500");
}

#[test]
fn strict_bound_admits_values_above_it() {
    let engine = gated_engine();
    let record = eligible_record().with("floor_area_m2", 500.5);

    let failures = engine.eligibility_failures(&record).expect("gate runs");

    assert!(failures.is_empty());
}

#[test]
fn non_text_building_type_is_invalid_input() {
    let engine = waste_engine();
    let record = BuildingRecord::new()
        .with("building_type", 7)
        .with("operational_years", 2);

    let error = engine
        .check_eligibility(&record)
        .expect_err("building type must be text");

    assert!(matches!(
        error,
        EngineError::InvalidInputValue { ref input, .. } if input == "building_type"
    ));
}

#[test]
fn ineligible_records_skip_scoring() {
    let engine = waste_engine();
    let record = BuildingRecord::new()
        .with("building_type", "Residential")
        .with("operational_years", 5)
        .with("p1", 90);

    let result = engine.evaluate(&record).expect("evaluation runs");

    assert!(!result.eligible);
    assert!(result.scores.is_none());
    assert!(result.reason.is_some());
}
