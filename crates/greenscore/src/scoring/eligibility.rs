use serde::{Deserialize, Serialize};

use super::record::{invalid, BuildingRecord, InputValue};
use crate::error::EngineError;
use crate::rubric::{Criterion, EligibilityCriteria, InputKind};

/// Gate verdict; an ineligible record is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Eligibility {
    pub fn eligible() -> Self {
        Self {
            eligible: true,
            reason: None,
        }
    }

    pub fn ineligible(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.into()),
        }
    }
}

pub(crate) struct EligibilityGate<'a> {
    criteria: &'a EligibilityCriteria,
}

impl<'a> EligibilityGate<'a> {
    pub(crate) fn new(criteria: &'a EligibilityCriteria) -> Self {
        Self { criteria }
    }

    /// First failing criterion in document order decides the verdict.
    pub(crate) fn check(&self, record: &BuildingRecord) -> Result<Eligibility, EngineError> {
        for criterion in &self.criteria.criteria {
            if let Some(reason) = failure(criterion, record)? {
                return Ok(Eligibility::ineligible(reason));
            }
        }
        Ok(Eligibility::eligible())
    }

    pub(crate) fn check_all(&self, record: &BuildingRecord) -> Result<Vec<String>, EngineError> {
        let mut reasons = Vec::new();
        for criterion in &self.criteria.criteria {
            if let Some(reason) = failure(criterion, record)? {
                reasons.push(reason);
            }
        }
        Ok(reasons)
    }
}

fn failure(criterion: &Criterion, record: &BuildingRecord) -> Result<Option<String>, EngineError> {
    match criterion {
        Criterion::OneOf { field, allowed } => {
            let actual = match record.get(field) {
                None => None,
                Some(InputValue::Text(text)) => Some(text.as_str()),
                Some(other) => return Err(invalid(field, InputKind::Enum, other)),
            };

            if actual.is_some_and(|value| allowed.iter().any(|candidate| candidate == value)) {
                Ok(None)
            } else {
                Ok(Some(format!(
                    "{} must be one of [{}], found {}",
                    field,
                    allowed.join(", "),
                    actual.unwrap_or("nothing")
                )))
            }
        }
        Criterion::Numeric { field, bound } => {
            let value = record.number(field)?;
            if bound.admits(value) {
                Ok(None)
            } else {
                Ok(Some(format!(
                    "{} must be {}, found {}",
                    field,
                    bound.describe(),
                    value
                )))
            }
        }
    }
}
