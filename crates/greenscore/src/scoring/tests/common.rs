use serde_json::{json, Value};

use crate::rubric::{CalculationSpec, Credit, Rubric};
use crate::scoring::{BuildingRecord, ScoringEngine};

/// Two-credit rubric: a conditional sum on p1/p2 and a banded credit on p3.
pub(super) fn waste_document() -> Value {
    json!({
        "eligibility_criteria": {
            "building_type": ["Commercial", "Institutional"],
            "operational_years": { "$gte": 1 }
        },
        "categories": [{
            "id": "SF",
            "name": "Sustainable Facility",
            "max_points": 8,
            "credits": [{
                "sub_id": "SF1",
                "name": "Waste Management",
                "max_points": 8,
                "calculation": {
                    "type": "conditional_sum",
                    "conditions": [
                        { "name": "dry_waste_reduction", "param": "p1", "threshold": 20, "points": 5 },
                        { "name": "dry_waste_recycled", "param": "p2", "threshold": 50, "points": 3 }
                    ]
                }
            }]
        }, {
            "id": "WC",
            "name": "Water Conservation",
            "max_points": 5,
            "credits": [{
                "sub_id": "WC1",
                "name": "Water Efficiency",
                "max_points": 5,
                "calculation": {
                    "type": "range_based",
                    "name": "water_savings",
                    "param": "p3",
                    "ranges": [
                        { "min": 0, "max": 20, "points": 1 },
                        { "min": 20, "max": 50, "points": 3 },
                        { "min": 50, "points": 5 }
                    ]
                }
            }]
        }],
        "scoring_info": {
            "certification_levels": [
                { "name": "Certified", "min_points": 4, "max_points": 7 },
                { "name": "Gold", "min_points": 8, "max_points": 13 }
            ]
        }
    })
}

pub(super) fn waste_engine() -> ScoringEngine {
    let rubric = Rubric::from_value(waste_document()).expect("fixture rubric parses");
    ScoringEngine::new(rubric).expect("fixture index builds")
}

pub(super) fn bundled_engine() -> ScoringEngine {
    let rubric = Rubric::bundled().expect("bundled standard parses");
    ScoringEngine::new(rubric).expect("bundled index builds")
}

pub(super) fn eligible_record() -> BuildingRecord {
    BuildingRecord::new()
        .with("building_type", "Commercial")
        .with("operational_years", 2)
}

/// Standalone credit wrapping `calculation` with the given cap.
pub(super) fn credit(max_points: f64, calculation: Value) -> Credit {
    let document = json!({
        "eligibility_criteria": {},
        "categories": [{
            "id": "X",
            "max_points": 100,
            "credits": [{ "sub_id": "X1", "max_points": max_points, "calculation": calculation }]
        }],
        "scoring_info": { "certification_levels": [] }
    });
    let rubric = Rubric::from_value(document).expect("credit fixture parses");
    rubric.credit("X1").cloned().expect("credit present")
}

pub(super) fn calculation(credit: &Credit) -> &CalculationSpec {
    &credit.calculation
}
