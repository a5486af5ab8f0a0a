use serde::{Deserialize, Serialize};
use tracing::debug;

use super::record::BuildingRecord;
use crate::error::EngineError;
use crate::rubric::{
    AdditionalRequirement, CalculationSpec, ConditionTest, Credit, EitherOrOption, RangeBand,
    RangeInput, ThresholdCondition,
};

/// One line of evidence explaining how a credit was scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionOutcome {
    #[serde(rename = "condition")]
    pub label: String,
    #[serde(rename = "result")]
    pub satisfied: bool,
    /// Points this line contributed.
    pub points: f64,
    /// What the input had to satisfy, e.g. "at least 20".
    pub requirement: String,
    /// Most points this line can award.
    #[serde(rename = "available_points")]
    pub available: f64,
}

impl ConditionOutcome {
    fn met(label: impl Into<String>, requirement: String, points: f64, available: f64) -> Self {
        Self {
            label: label.into(),
            satisfied: true,
            points,
            requirement,
            available,
        }
    }

    fn unmet(label: impl Into<String>, requirement: String, available: f64) -> Self {
        Self {
            label: label.into(),
            satisfied: false,
            points: 0.0,
            requirement,
            available,
        }
    }
}

/// Points awarded to a credit plus the evidence trail, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditResult {
    pub points: f64,
    pub conditions: Vec<ConditionOutcome>,
}

/// Score a credit and clamp the result to `[0, credit.max_points]`.
pub fn score_credit(credit: &Credit, record: &BuildingRecord) -> Result<CreditResult, EngineError> {
    let (raw, conditions) = evaluate(&credit.calculation, record)?;
    let points = raw.min(credit.max_points).max(0.0);

    debug!(
        credit = %credit.id,
        kind = credit.calculation.kind().label(),
        raw,
        points,
        "credit scored"
    );

    Ok(CreditResult { points, conditions })
}

/// Unclamped points and evidence for a calculation.
pub fn evaluate(
    spec: &CalculationSpec,
    record: &BuildingRecord,
) -> Result<(f64, Vec<ConditionOutcome>), EngineError> {
    let mut evidence = Vec::new();
    let points = match spec {
        CalculationSpec::ConditionalSum { conditions } => {
            conditional_sum(conditions, record, &mut evidence)?
        }
        CalculationSpec::EitherOr { options } => either_or(options, record, &mut evidence)?,
        CalculationSpec::RangeBased(range) => range_based(range, record, &mut evidence)?,
        CalculationSpec::CompositeSum { parts } => {
            let mut total = 0.0;
            for part in parts {
                total += range_based(part, record, &mut evidence)?;
            }
            total
        }
        CalculationSpec::SingleCondition {
            condition,
            additional_requirement,
        } => single_condition(
            condition,
            additional_requirement.as_ref(),
            record,
            &mut evidence,
        )?,
    };
    Ok((points, evidence))
}

fn conditional_sum(
    conditions: &[ThresholdCondition],
    record: &BuildingRecord,
    evidence: &mut Vec<ConditionOutcome>,
) -> Result<f64, EngineError> {
    let mut total = 0.0;
    for condition in conditions {
        let requirement = at_least(condition.threshold);
        if record.number(&condition.input.param)? >= condition.threshold {
            total += condition.points;
            evidence.push(ConditionOutcome::met(
                &condition.input.name,
                requirement,
                condition.points,
                condition.points,
            ));
        } else {
            evidence.push(ConditionOutcome::unmet(
                &condition.input.name,
                requirement,
                condition.points,
            ));
        }
    }
    Ok(total)
}

fn either_or(
    options: &[EitherOrOption],
    record: &BuildingRecord,
    evidence: &mut Vec<ConditionOutcome>,
) -> Result<f64, EngineError> {
    let mut total = 0.0;
    for option in options {
        for condition in &option.conditions {
            let label = format!("{}: {}", option.group_label, condition.input.name);
            let (held, requirement) = match &condition.test {
                ConditionTest::Threshold(threshold) => (
                    record.number(&condition.input.param)? >= *threshold,
                    at_least(*threshold),
                ),
                ConditionTest::Equals(expected) => (
                    record.matches(&condition.input.param, expected)?,
                    format!("equal to {expected}"),
                ),
            };

            let points = option.points_if_any_met;
            if held {
                total += points;
                evidence.push(ConditionOutcome::met(label, requirement, points, points));
                break;
            }
            evidence.push(ConditionOutcome::unmet(label, requirement, points));
        }
    }
    Ok(total)
}

// Ranges are neither sorted nor disjoint; the first band in declaration order wins.
fn range_based(
    range: &RangeInput,
    record: &BuildingRecord,
    evidence: &mut Vec<ConditionOutcome>,
) -> Result<f64, EngineError> {
    let value = record.number(&range.input.param)?;
    let available = range
        .ranges
        .iter()
        .map(|band| band.points)
        .fold(0.0, f64::max);

    match range.ranges.iter().find(|band| band.contains(value)) {
        Some(band) => {
            evidence.push(ConditionOutcome::met(
                &range.input.name,
                band.describe(),
                band.points,
                available,
            ));
            Ok(band.points)
        }
        None => {
            let bands = range
                .ranges
                .iter()
                .map(RangeBand::describe)
                .collect::<Vec<_>>()
                .join("; ");
            evidence.push(ConditionOutcome::unmet(&range.input.name, bands, available));
            Ok(0.0)
        }
    }
}

fn single_condition(
    condition: &ThresholdCondition,
    requirement: Option<&AdditionalRequirement>,
    record: &BuildingRecord,
    evidence: &mut Vec<ConditionOutcome>,
) -> Result<f64, EngineError> {
    let primary = record.number(&condition.input.param)? >= condition.threshold;
    let secondary = match requirement {
        Some(requirement) => {
            Some(record.number(&requirement.input.param)? >= requirement.min_required)
        }
        None => None,
    };

    let awarded = primary && secondary.unwrap_or(true);
    let points = if awarded { condition.points } else { 0.0 };

    evidence.push(ConditionOutcome {
        label: condition.input.name.clone(),
        satisfied: primary,
        points,
        requirement: at_least(condition.threshold),
        available: condition.points,
    });
    if let (Some(requirement), Some(satisfied)) = (requirement, secondary) {
        evidence.push(ConditionOutcome {
            label: format!("{} (additional requirement)", requirement.input.name),
            satisfied,
            points: 0.0,
            requirement: at_least(requirement.min_required),
            available: 0.0,
        });
    }

    Ok(points)
}

fn at_least(threshold: f64) -> String {
    format!("at least {threshold}")
}
