//! Typed representation of a green building standard.
//!
//! A [`Rubric`] is parsed once from the standard document with [`Rubric::from_value`] and is
//! read-only afterwards. Engines and indexes borrow or share it through an `Arc`.

mod document;
pub mod index;
mod loader;

pub use index::{
    EligibilityQuestion, EligibilitySchema, InputDescriptor, InputSchema, NameParamIndex,
};
pub use loader::{LoadError, BUNDLED_STANDARD};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Parsed standard: eligibility criteria, capped categories, and certification tiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rubric {
    pub eligibility: EligibilityCriteria,
    pub categories: Vec<Category>,
    pub certification_levels: Vec<CertificationLevel>,
}

impl Rubric {
    /// Sum of the declared category caps.
    pub fn max_total(&self) -> f64 {
        self.categories.iter().map(|category| category.max_points).sum()
    }

    pub fn credits(&self) -> impl Iterator<Item = (&Category, &Credit)> {
        self.categories
            .iter()
            .flat_map(|category| category.credits.iter().map(move |credit| (category, credit)))
    }

    pub fn credit(&self, credit_id: &str) -> Option<&Credit> {
        self.credits()
            .map(|(_, credit)| credit)
            .find(|credit| credit.id == credit_id)
    }
}

/// Ordered list of criteria a building must satisfy before it is scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityCriteria {
    pub criteria: Vec<Criterion>,
}

/// Single eligibility check against one record field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criterion {
    OneOf { field: String, allowed: Vec<String> },
    Numeric { field: String, bound: NumericBound },
}

impl Criterion {
    pub fn field(&self) -> &str {
        match self {
            Criterion::OneOf { field, .. } | Criterion::Numeric { field, .. } => field,
        }
    }
}

/// Numeric comparison used by eligibility criteria.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum NumericBound {
    AtLeast(f64),
    GreaterThan(f64),
    AtMost(f64),
    LessThan(f64),
}

impl NumericBound {
    pub fn admits(self, value: f64) -> bool {
        match self {
            NumericBound::AtLeast(bound) => value >= bound,
            NumericBound::GreaterThan(bound) => value > bound,
            NumericBound::AtMost(bound) => value <= bound,
            NumericBound::LessThan(bound) => value < bound,
        }
    }

    pub fn describe(self) -> String {
        match self {
            NumericBound::AtLeast(bound) => format!("at least {bound}"),
            NumericBound::GreaterThan(bound) => format!("greater than {bound}"),
            NumericBound::AtMost(bound) => format!("at most {bound}"),
            NumericBound::LessThan(bound) => format!("less than {bound}"),
        }
    }
}

/// Capped group of credits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub max_points: f64,
    pub credits: Vec<Credit>,
}

/// Single scorable line item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credit {
    pub id: String,
    pub name: String,
    pub max_points: f64,
    pub calculation: CalculationSpec,
}

/// Closed set of scoring strategies a credit can use.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalculationSpec {
    ConditionalSum {
        conditions: Vec<ThresholdCondition>,
    },
    EitherOr {
        options: Vec<EitherOrOption>,
    },
    RangeBased(RangeInput),
    CompositeSum {
        parts: Vec<RangeInput>,
    },
    SingleCondition {
        condition: ThresholdCondition,
        additional_requirement: Option<AdditionalRequirement>,
    },
}

impl CalculationSpec {
    pub fn kind(&self) -> CalculationKind {
        match self {
            CalculationSpec::ConditionalSum { .. } => CalculationKind::ConditionalSum,
            CalculationSpec::EitherOr { .. } => CalculationKind::EitherOr,
            CalculationSpec::RangeBased(_) => CalculationKind::RangeBased,
            CalculationSpec::CompositeSum { .. } => CalculationKind::CompositeSum,
            CalculationSpec::SingleCondition { .. } => CalculationKind::SingleCondition,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationKind {
    ConditionalSum,
    EitherOr,
    RangeBased,
    CompositeSum,
    SingleCondition,
}

impl CalculationKind {
    pub const fn label(self) -> &'static str {
        match self {
            CalculationKind::ConditionalSum => "conditional_sum",
            CalculationKind::EitherOr => "either_or",
            CalculationKind::RangeBased => "range_based",
            CalculationKind::CompositeSum => "composite_sum",
            CalculationKind::SingleCondition => "single_condition",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "conditional_sum" => Some(CalculationKind::ConditionalSum),
            "either_or" => Some(CalculationKind::EitherOr),
            "range_based" => Some(CalculationKind::RangeBased),
            "composite_sum" => Some(CalculationKind::CompositeSum),
            "single_condition" => Some(CalculationKind::SingleCondition),
            _ => None,
        }
    }
}

/// `record[param] >= threshold` awards `points`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdCondition {
    pub input: InputRef,
    pub threshold: f64,
    pub points: f64,
}

/// Option group of an `either_or` credit, awarded once when any condition holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EitherOrOption {
    pub group_label: String,
    pub points_if_any_met: f64,
    pub conditions: Vec<OptionCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionCondition {
    pub input: InputRef,
    pub test: ConditionTest,
}

/// How an option condition is judged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionTest {
    Threshold(f64),
    Equals(ExpectedValue),
}

/// Scalar an equality condition expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExpectedValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for ExpectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedValue::Boolean(flag) => write!(f, "{flag}"),
            ExpectedValue::Number(number) => write!(f, "{number}"),
            ExpectedValue::Text(text) => write!(f, "{text}"),
        }
    }
}

/// Parameter read by `range_based` and by each `composite_sum` part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeInput {
    pub input: InputRef,
    pub ranges: Vec<RangeBand>,
}

/// Numeric band, inclusive on both ends; a missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeBand {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub points: f64,
}

impl RangeBand {
    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    pub fn describe(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("{min} to {max}"),
            (Some(min), None) => format!("at least {min}"),
            (None, Some(max)) => format!("at most {max}"),
            (None, None) => "any value".to_string(),
        }
    }
}

/// Secondary minimum gating a `single_condition` credit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdditionalRequirement {
    pub input: InputRef,
    pub min_required: f64,
}

/// Leaf input referenced by a calculation, with the metadata used for schema introspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputRef {
    pub name: String,
    pub param: String,
    pub kind: InputKind,
    pub meta: InputMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputMeta {
    pub label: Option<String>,
    pub description: Option<String>,
    pub units: Option<String>,
    pub options: Vec<String>,
    pub validation: Option<Validation>,
}

/// Declared bounds for an input value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Shape of value an input expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Number,
    Boolean,
    Enum,
}

/// Named tier covering an inclusive total-score range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificationLevel {
    pub name: String,
    pub min_points: f64,
    pub max_points: f64,
}

impl CertificationLevel {
    pub fn contains(&self, score: f64) -> bool {
        self.min_points <= score && score <= self.max_points
    }
}
