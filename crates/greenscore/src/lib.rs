//! Scoring engine for declarative green building standards.
//!
//! A standard document is parsed into a [`rubric::Rubric`], from which a
//! [`scoring::ScoringEngine`] evaluates building records: eligibility first, then every
//! credit's calculation, capped category totals and a certification tier.

pub mod config;
pub mod error;
pub mod report;
pub mod rubric;
pub mod scoring;
pub mod telemetry;

pub use error::{AppError, EngineError};
pub use rubric::{NameParamIndex, Rubric};
pub use scoring::{BuildingRecord, EvaluationResult, InputValue, ScoringEngine};
