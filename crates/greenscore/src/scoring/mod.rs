//! Evaluation pipeline: eligibility gate, credit rules, aggregation, certification.

mod aggregate;
mod certification;
mod eligibility;
pub mod record;
mod rules;

#[cfg(test)]
mod tests;

pub use certification::NO_CERTIFICATION;
pub use eligibility::Eligibility;
pub use record::{BuildingRecord, InputValue};
pub use rules::{evaluate as evaluate_calculation, score_credit, ConditionOutcome, CreditResult};

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::rubric::{InputSchema, NameParamIndex, Rubric};
use eligibility::EligibilityGate;

/// Stateless evaluator over a shared, read-only rubric.
///
/// The engine is `Send + Sync`; wrap it in an `Arc` to serve concurrent requests.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    rubric: Arc<Rubric>,
    index: Arc<NameParamIndex>,
}

impl ScoringEngine {
    pub fn new(rubric: Rubric) -> Result<Self, EngineError> {
        Self::from_shared(Arc::new(rubric))
    }

    pub fn from_shared(rubric: Arc<Rubric>) -> Result<Self, EngineError> {
        let index = Arc::new(NameParamIndex::build(&rubric)?);
        Ok(Self { rubric, index })
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    pub fn index(&self) -> &NameParamIndex {
        &self.index
    }

    pub fn schema(&self) -> InputSchema {
        self.index.schema()
    }

    pub fn check_eligibility(&self, record: &BuildingRecord) -> Result<Eligibility, EngineError> {
        EligibilityGate::new(&self.rubric.eligibility).check(record)
    }

    /// Every failing eligibility reason, in criteria order.
    pub fn eligibility_failures(&self, record: &BuildingRecord) -> Result<Vec<String>, EngineError> {
        EligibilityGate::new(&self.rubric.eligibility).check_all(record)
    }

    pub fn certification_for(&self, total: f64) -> &str {
        certification::resolve(&self.rubric.certification_levels, total)
            .map(|level| level.name.as_str())
            .unwrap_or(NO_CERTIFICATION)
    }

    /// Evaluate a param-keyed record.
    pub fn evaluate(&self, record: &BuildingRecord) -> Result<EvaluationResult, EngineError> {
        let eligibility = self.check_eligibility(record)?;
        if !eligibility.eligible {
            info!(
                reason = eligibility.reason.as_deref().unwrap_or_default(),
                "building is not eligible for scoring"
            );
            return Ok(EvaluationResult {
                eligible: false,
                reason: eligibility.reason,
                scores: None,
            });
        }

        let mut credit_scores = BTreeMap::new();
        for (category, credit) in self.rubric.credits() {
            let result = score_credit(credit, record)?;
            debug!(category = %category.id, credit = %credit.id, points = result.points, "credit evaluated");
            credit_scores.insert(credit.id.clone(), result);
        }

        let totals = aggregate::aggregate(&self.rubric.categories, &credit_scores);
        let certification_level = self.certification_for(totals.total).to_string();

        info!(
            total_score = totals.total,
            certification = %certification_level,
            "building evaluated"
        );

        Ok(EvaluationResult {
            eligible: true,
            reason: None,
            scores: Some(ScoreSheet {
                total_score: totals.total,
                category_scores: totals.category_scores,
                credit_scores,
                certification_level,
            }),
        })
    }

    /// Evaluate answers keyed by human-readable input names.
    pub fn evaluate_named(&self, answers: &BuildingRecord) -> Result<EvaluationResult, EngineError> {
        let record = self.index.translate_named_record(answers)?;
        self.evaluate(&record)
    }

    /// Evaluate independent records in parallel; results keep input order.
    pub fn evaluate_batch(
        &self,
        records: &[BuildingRecord],
    ) -> Vec<Result<EvaluationResult, EngineError>> {
        records
            .par_iter()
            .map(|record| self.evaluate(record))
            .collect()
    }
}

/// Outcome of one evaluation. Score fields are present only for eligible buildings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub scores: Option<ScoreSheet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSheet {
    pub total_score: f64,
    pub category_scores: BTreeMap<String, f64>,
    pub credit_scores: BTreeMap<String, CreditResult>,
    pub certification_level: String,
}
