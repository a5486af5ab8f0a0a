//! Met and unmet criteria summary for an evaluated building.

use std::fmt::Write as _;
use std::io;

use serde::Serialize;

use crate::rubric::Rubric;
use crate::scoring::EvaluationResult;

const CSV_HEADER: [&str; 7] = [
    "credit_id",
    "credit_name",
    "condition",
    "requirement",
    "met",
    "points",
    "available_points",
];

/// One evidence line attributed to its credit. Unmet lines still carry the
/// requirement and the points the condition could have earned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionLine {
    pub credit_id: String,
    pub credit_name: String,
    pub condition: String,
    pub requirement: String,
    pub met: bool,
    pub points: f64,
    #[serde(rename = "available_points")]
    pub available: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriteriaReport {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub total_score: f64,
    pub certification_level: Option<String>,
    pub met: Vec<CriterionLine>,
    pub unmet: Vec<CriterionLine>,
}

impl CriteriaReport {
    /// Split every credit's evidence into met and unmet lines, in rubric order.
    pub fn build(rubric: &Rubric, result: &EvaluationResult) -> Self {
        let mut met = Vec::new();
        let mut unmet = Vec::new();

        if let Some(scores) = &result.scores {
            for (_, credit) in rubric.credits() {
                let Some(credit_result) = scores.credit_scores.get(&credit.id) else {
                    continue;
                };
                for outcome in &credit_result.conditions {
                    let line = CriterionLine {
                        credit_id: credit.id.clone(),
                        credit_name: credit.name.clone(),
                        condition: outcome.label.clone(),
                        requirement: outcome.requirement.clone(),
                        met: outcome.satisfied,
                        points: outcome.points,
                        available: outcome.available,
                    };
                    if outcome.satisfied {
                        met.push(line);
                    } else {
                        unmet.push(line);
                    }
                }
            }
        }

        Self {
            eligible: result.eligible,
            reason: result.reason.clone(),
            total_score: result
                .scores
                .as_ref()
                .map(|scores| scores.total_score)
                .unwrap_or_default(),
            certification_level: result
                .scores
                .as_ref()
                .map(|scores| scores.certification_level.clone()),
            met,
            unmet,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Eligible: {}", self.eligible);
        if let Some(reason) = &self.reason {
            let _ = writeln!(out, "Reason: {reason}");
            return out;
        }

        let _ = writeln!(out, "Total score: {}", self.total_score);
        if let Some(level) = &self.certification_level {
            let _ = writeln!(out, "Certification level: {level}");
        }

        let _ = writeln!(out, "\nUnmet criteria");
        if self.unmet.is_empty() {
            let _ = writeln!(out, "- none");
        }
        for line in &self.unmet {
            let _ = writeln!(
                out,
                "- {} {}: {} (needs {}, worth {} points)",
                line.credit_id, line.credit_name, line.condition, line.requirement, line.available
            );
        }

        let _ = writeln!(out, "\nMet criteria");
        if self.met.is_empty() {
            let _ = writeln!(out, "- none");
        }
        for line in &self.met {
            let _ = writeln!(
                out,
                "- {} {}: {} ({} points)",
                line.credit_id, line.credit_name, line.condition, line.points
            );
        }

        out
    }

    /// Write met lines then unmet lines as CSV. The header is written even
    /// when there are no lines.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv.write_record(CSV_HEADER)?;
        for line in self.met.iter().chain(&self.unmet) {
            csv.serialize(line)?;
        }
        csv.flush()?;
        Ok(())
    }
}
