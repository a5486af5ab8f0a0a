use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{
    AdditionalRequirement, CalculationKind, CalculationSpec, Category, CertificationLevel,
    ConditionTest, Credit, Criterion, EitherOrOption, EligibilityCriteria, ExpectedValue,
    InputKind, InputMeta, InputRef, NumericBound, OptionCondition, RangeBand, RangeInput, Rubric,
    ThresholdCondition, Validation,
};
use crate::error::EngineError;

#[derive(Debug, Deserialize)]
struct RubricDocument {
    eligibility_criteria: Map<String, Value>,
    categories: Vec<CategoryDocument>,
    scoring_info: ScoringInfoDocument,
}

#[derive(Debug, Deserialize)]
struct ScoringInfoDocument {
    certification_levels: Vec<CertificationLevelDocument>,
}

#[derive(Debug, Deserialize)]
struct CertificationLevelDocument {
    name: String,
    min_points: f64,
    max_points: f64,
}

#[derive(Debug, Deserialize)]
struct CategoryDocument {
    id: String,
    name: Option<String>,
    max_points: f64,
    #[serde(default)]
    credits: Vec<CreditDocument>,
}

#[derive(Debug, Deserialize)]
struct CreditDocument {
    id: Option<String>,
    sub_id: Option<String>,
    name: Option<String>,
    max_points: f64,
    calculation: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct InputDocument {
    name: Option<String>,
    param: String,
    label: Option<String>,
    description: Option<String>,
    units: Option<String>,
    input_type: Option<InputKind>,
    #[serde(default)]
    options: Vec<String>,
    validation: Option<Validation>,
}

#[derive(Debug, Deserialize)]
struct ThresholdDocument {
    #[serde(flatten)]
    input: InputDocument,
    threshold: f64,
    points: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionalSumDocument {
    conditions: Vec<ThresholdDocument>,
}

#[derive(Debug, Deserialize)]
struct EitherOrDocument {
    options: Vec<OptionDocument>,
}

#[derive(Debug, Deserialize)]
struct OptionDocument {
    #[serde(alias = "group_label")]
    group: Option<String>,
    #[serde(alias = "points_if_any_met")]
    points: Option<f64>,
    #[serde(default)]
    conditions: Vec<OptionConditionDocument>,
}

#[derive(Debug, Deserialize)]
struct OptionConditionDocument {
    #[serde(flatten)]
    input: InputDocument,
    threshold: Option<f64>,
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RangeInputDocument {
    #[serde(flatten)]
    input: InputDocument,
    ranges: Vec<RangeDocument>,
}

#[derive(Debug, Deserialize)]
struct RangeDocument {
    min: Option<f64>,
    max: Option<f64>,
    points: f64,
}

#[derive(Debug, Deserialize)]
struct CompositeSumDocument {
    parts: Vec<RangeInputDocument>,
}

#[derive(Debug, Deserialize)]
struct SingleConditionDocument {
    condition: ThresholdDocument,
    #[serde(alias = "additional_requirements")]
    additional_requirement: Option<RequirementDocument>,
}

#[derive(Debug, Deserialize)]
struct RequirementDocument {
    name: Option<String>,
    param: Option<String>,
    min_required: Option<f64>,
    label: Option<String>,
    description: Option<String>,
    units: Option<String>,
    validation: Option<Validation>,
}

/// Points awarded by an option group that omits `points`.
const DEFAULT_OPTION_POINTS: f64 = 1.0;

impl Rubric {
    /// Parse and validate a standard document.
    pub fn from_value(document: Value) -> Result<Self, EngineError> {
        let document: RubricDocument = serde_json::from_value(document)
            .map_err(|err| EngineError::malformed(format!("standard document: {err}")))?;

        let eligibility = parse_eligibility(&document.eligibility_criteria)?;

        let mut seen_categories = HashSet::new();
        let mut seen_credits = HashSet::new();
        let mut categories = Vec::with_capacity(document.categories.len());
        for category in document.categories {
            let category = parse_category(category, &mut seen_credits)?;
            if !seen_categories.insert(category.id.clone()) {
                return Err(EngineError::malformed(format!(
                    "category id {} is declared more than once",
                    category.id
                )));
            }
            categories.push(category);
        }

        let certification_levels = document
            .scoring_info
            .certification_levels
            .into_iter()
            .map(parse_certification_level)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            eligibility,
            categories,
            certification_levels,
        })
    }
}

impl TryFrom<Value> for Rubric {
    type Error = EngineError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn parse_eligibility(criteria: &Map<String, Value>) -> Result<EligibilityCriteria, EngineError> {
    let mut parsed = Vec::new();

    for (field, rule) in criteria {
        match rule {
            Value::Array(values) => {
                let allowed = values
                    .iter()
                    .map(|value| {
                        value.as_str().map(str::to_string).ok_or_else(|| {
                            EngineError::malformed(format!(
                                "eligibility criterion '{field}' lists a non-string value {value}"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                parsed.push(Criterion::OneOf {
                    field: field.clone(),
                    allowed,
                });
            }
            Value::Object(operators) => {
                for (operator, bound) in operators {
                    let bound = bound.as_f64().ok_or_else(|| {
                        EngineError::malformed(format!(
                            "eligibility criterion '{field}' operator {operator} needs a number"
                        ))
                    })?;
                    let bound = match operator.as_str() {
                        "$gte" => NumericBound::AtLeast(bound),
                        "$gt" => NumericBound::GreaterThan(bound),
                        "$lte" => NumericBound::AtMost(bound),
                        "$lt" => NumericBound::LessThan(bound),
                        other => {
                            return Err(EngineError::malformed(format!(
                                "eligibility criterion '{field}' uses unknown operator {other}"
                            )))
                        }
                    };
                    parsed.push(Criterion::Numeric {
                        field: field.clone(),
                        bound,
                    });
                }
            }
            other => {
                return Err(EngineError::malformed(format!(
                    "eligibility criterion '{field}' must be a list or an operator object, found {other}"
                )))
            }
        }
    }

    Ok(EligibilityCriteria { criteria: parsed })
}

fn parse_category(
    category: CategoryDocument,
    seen_credits: &mut HashSet<String>,
) -> Result<Category, EngineError> {
    if category.id.trim().is_empty() {
        return Err(EngineError::malformed("category is missing an id"));
    }

    let mut credits = Vec::with_capacity(category.credits.len());
    for credit in category.credits {
        let credit = parse_credit(credit, &category.id)?;
        if !seen_credits.insert(credit.id.clone()) {
            return Err(EngineError::malformed(format!(
                "credit id {} is declared more than once",
                credit.id
            )));
        }
        credits.push(credit);
    }

    Ok(Category {
        name: category.name.unwrap_or_else(|| category.id.clone()),
        id: category.id,
        max_points: category.max_points,
        credits,
    })
}

fn parse_credit(credit: CreditDocument, category_id: &str) -> Result<Credit, EngineError> {
    let id = credit.sub_id.or(credit.id).ok_or_else(|| {
        EngineError::malformed(format!("a credit in category {category_id} has no sub_id"))
    })?;

    let calculation = parse_calculation(&id, credit.calculation)?;

    Ok(Credit {
        name: credit.name.unwrap_or_else(|| id.clone()),
        id,
        max_points: credit.max_points,
        calculation,
    })
}

fn parse_calculation(
    credit_id: &str,
    calculation: Map<String, Value>,
) -> Result<CalculationSpec, EngineError> {
    let kind = match calculation.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(other) => {
            return Err(EngineError::malformed(format!(
                "credit {credit_id} has a non-string calculation type {other}"
            )))
        }
        None => {
            return Err(EngineError::malformed(format!(
                "credit {credit_id} calculation is missing its type"
            )))
        }
    };

    let kind = CalculationKind::from_label(&kind).ok_or_else(|| {
        EngineError::UnsupportedCalculationKind {
            credit: credit_id.to_string(),
            kind: kind.clone(),
        }
    })?;

    let body = Value::Object(calculation);
    let spec = match kind {
        CalculationKind::ConditionalSum => {
            let doc: ConditionalSumDocument = decode(credit_id, kind, body)?;
            CalculationSpec::ConditionalSum {
                conditions: doc.conditions.into_iter().map(threshold_condition).collect(),
            }
        }
        CalculationKind::EitherOr => {
            let doc: EitherOrDocument = decode(credit_id, kind, body)?;
            let options = doc
                .options
                .into_iter()
                .enumerate()
                .map(|(position, option)| either_or_option(credit_id, position, option))
                .collect::<Result<Vec<_>, _>>()?;
            CalculationSpec::EitherOr { options }
        }
        CalculationKind::RangeBased => {
            let doc: RangeInputDocument = decode(credit_id, kind, body)?;
            CalculationSpec::RangeBased(range_input(doc))
        }
        CalculationKind::CompositeSum => {
            let doc: CompositeSumDocument = decode(credit_id, kind, body)?;
            CalculationSpec::CompositeSum {
                parts: doc.parts.into_iter().map(range_input).collect(),
            }
        }
        CalculationKind::SingleCondition => {
            let doc: SingleConditionDocument = decode(credit_id, kind, body)?;
            let additional_requirement = match doc.additional_requirement {
                Some(requirement_doc) => requirement(credit_id, requirement_doc)?,
                None => None,
            };
            CalculationSpec::SingleCondition {
                condition: threshold_condition(doc.condition),
                additional_requirement,
            }
        }
    };

    Ok(spec)
}

fn decode<T: DeserializeOwned>(
    credit_id: &str,
    kind: CalculationKind,
    body: Value,
) -> Result<T, EngineError> {
    serde_json::from_value(body).map_err(|err| {
        EngineError::malformed(format!(
            "credit {credit_id} has an invalid {} calculation: {err}",
            kind.label()
        ))
    })
}

fn input_ref(input: InputDocument, inferred: InputKind) -> InputRef {
    let kind = match input.input_type {
        Some(kind) => kind,
        None if !input.options.is_empty() => InputKind::Enum,
        None => inferred,
    };

    InputRef {
        name: input.name.unwrap_or_else(|| input.param.clone()),
        param: input.param,
        kind,
        meta: InputMeta {
            label: input.label,
            description: input.description,
            units: input.units,
            options: input.options,
            validation: input.validation,
        },
    }
}

fn threshold_condition(doc: ThresholdDocument) -> ThresholdCondition {
    ThresholdCondition {
        input: input_ref(doc.input, InputKind::Number),
        threshold: doc.threshold,
        points: doc.points,
    }
}

fn either_or_option(
    credit_id: &str,
    position: usize,
    option: OptionDocument,
) -> Result<EitherOrOption, EngineError> {
    let conditions = option
        .conditions
        .into_iter()
        .map(|condition| option_condition(credit_id, condition))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EitherOrOption {
        group_label: option
            .group
            .unwrap_or_else(|| format!("Option {}", position + 1)),
        points_if_any_met: option.points.unwrap_or(DEFAULT_OPTION_POINTS),
        conditions,
    })
}

fn option_condition(
    credit_id: &str,
    condition: OptionConditionDocument,
) -> Result<OptionCondition, EngineError> {
    let (test, inferred) = match (condition.threshold, condition.value) {
        (Some(_), Some(_)) => {
            return Err(EngineError::malformed(format!(
                "credit {credit_id} condition on {} declares both a threshold and a value",
                condition.input.param
            )))
        }
        (Some(threshold), None) => (ConditionTest::Threshold(threshold), InputKind::Number),
        (None, Some(value)) => {
            let expected = expected_value(credit_id, &condition.input.param, value)?;
            let inferred = match expected {
                ExpectedValue::Boolean(_) => InputKind::Boolean,
                ExpectedValue::Number(_) => InputKind::Number,
                ExpectedValue::Text(_) => InputKind::Enum,
            };
            (ConditionTest::Equals(expected), inferred)
        }
        (None, None) => {
            return Err(EngineError::malformed(format!(
                "credit {credit_id} condition on {} needs a threshold or a value",
                condition.input.param
            )))
        }
    };

    Ok(OptionCondition {
        input: input_ref(condition.input, inferred),
        test,
    })
}

fn expected_value(credit_id: &str, param: &str, value: Value) -> Result<ExpectedValue, EngineError> {
    match value {
        Value::Bool(flag) => Ok(ExpectedValue::Boolean(flag)),
        Value::String(text) => Ok(ExpectedValue::Text(text)),
        Value::Number(number) => number.as_f64().map(ExpectedValue::Number).ok_or_else(|| {
            EngineError::malformed(format!("credit {credit_id} value for {param} is out of range"))
        }),
        other => Err(EngineError::malformed(format!(
            "credit {credit_id} value for {param} must be a scalar, found {other}"
        ))),
    }
}

fn range_input(doc: RangeInputDocument) -> RangeInput {
    RangeInput {
        input: input_ref(doc.input, InputKind::Number),
        ranges: doc
            .ranges
            .into_iter()
            .map(|range| RangeBand {
                min: range.min,
                max: range.max,
                points: range.points,
            })
            .collect(),
    }
}

// Only an empty `additional_requirements` object imposes nothing.
fn requirement(
    credit_id: &str,
    doc: RequirementDocument,
) -> Result<Option<AdditionalRequirement>, EngineError> {
    let param = match doc.param {
        Some(param) => param,
        None if doc.is_empty() => return Ok(None),
        None => {
            return Err(EngineError::malformed(format!(
                "credit {credit_id} additional requirement is missing its param"
            )))
        }
    };
    Ok(Some(AdditionalRequirement {
        input: InputRef {
            name: doc.name.unwrap_or_else(|| param.clone()),
            param,
            kind: InputKind::Number,
            meta: InputMeta {
                label: doc.label,
                description: doc.description,
                units: doc.units,
                options: Vec::new(),
                validation: doc.validation,
            },
        },
        min_required: doc.min_required.unwrap_or_default(),
    }))
}

impl RequirementDocument {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.param.is_none()
            && self.min_required.is_none()
            && self.label.is_none()
            && self.description.is_none()
            && self.units.is_none()
            && self.validation.is_none()
    }
}

fn parse_certification_level(
    level: CertificationLevelDocument,
) -> Result<CertificationLevel, EngineError> {
    if level.min_points > level.max_points {
        return Err(EngineError::malformed(format!(
            "certification level {} has min_points {} above max_points {}",
            level.name, level.min_points, level.max_points
        )));
    }

    Ok(CertificationLevel {
        name: level.name,
        min_points: level.min_points,
        max_points: level.max_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document_with_calculation(calculation: Value) -> Value {
        json!({
            "eligibility_criteria": {
                "building_type": ["Commercial", "Institutional"],
                "operational_years": { "$gte": 1 }
            },
            "categories": [{
                "id": "SF",
                "name": "Sustainable Facility",
                "max_points": 10,
                "credits": [{
                    "sub_id": "SF1",
                    "name": "Waste",
                    "max_points": 8,
                    "calculation": calculation
                }]
            }],
            "scoring_info": {
                "certification_levels": [
                    { "name": "Certified", "min_points": 1, "max_points": 10 }
                ]
            }
        })
    }

    #[test]
    fn eligibility_criteria_keep_document_order() {
        let rubric = Rubric::from_value(document_with_calculation(json!({
            "type": "conditional_sum",
            "conditions": []
        })))
        .expect("rubric parses");

        let fields: Vec<_> = rubric
            .eligibility
            .criteria
            .iter()
            .map(Criterion::field)
            .collect();
        assert_eq!(fields, vec!["building_type", "operational_years"]);
        assert_eq!(
            rubric.eligibility.criteria[1],
            Criterion::Numeric {
                field: "operational_years".to_string(),
                bound: NumericBound::AtLeast(1.0),
            }
        );
    }

    #[test]
    fn missing_calculation_type_is_malformed() {
        let error = Rubric::from_value(document_with_calculation(json!({
            "conditions": []
        })))
        .expect_err("type is required");

        match error {
            EngineError::MalformedRubric(detail) => assert!(detail.contains("SF1")),
            other => panic!("expected malformed rubric, got {other:?}"),
        }
    }

    #[test]
    fn unknown_calculation_type_is_rejected() {
        let error = Rubric::from_value(document_with_calculation(json!({
            "type": "weighted_average",
            "inputs": []
        })))
        .expect_err("unknown kinds fail loudly");

        assert_eq!(
            error,
            EngineError::UnsupportedCalculationKind {
                credit: "SF1".to_string(),
                kind: "weighted_average".to_string(),
            }
        );
    }

    #[test]
    fn either_or_defaults_and_value_kinds() {
        let rubric = Rubric::from_value(document_with_calculation(json!({
            "type": "either_or",
            "options": [
                {
                    "group": "Products",
                    "conditions": [
                        { "name": "eco_cost", "param": "param4", "threshold": 10 },
                        { "name": "policy", "param": "param6", "value": true }
                    ]
                }
            ]
        })))
        .expect("rubric parses");

        let credit = rubric.credit("SF1").expect("credit present");
        let CalculationSpec::EitherOr { options } = &credit.calculation else {
            panic!("expected either_or, got {:?}", credit.calculation);
        };
        assert_eq!(options[0].points_if_any_met, DEFAULT_OPTION_POINTS);
        assert_eq!(options[0].conditions[0].input.kind, InputKind::Number);
        assert_eq!(options[0].conditions[1].input.kind, InputKind::Boolean);
        assert_eq!(
            options[0].conditions[1].test,
            ConditionTest::Equals(ExpectedValue::Boolean(true))
        );
    }

    #[test]
    fn option_condition_without_threshold_or_value_is_malformed() {
        let error = Rubric::from_value(document_with_calculation(json!({
            "type": "either_or",
            "options": [{ "group": "A", "points": 1, "conditions": [{ "param": "param4" }] }]
        })))
        .expect_err("condition needs a test");

        assert!(matches!(error, EngineError::MalformedRubric(_)));
    }

    #[test]
    fn single_condition_accepts_plural_requirement_key() {
        let rubric = Rubric::from_value(document_with_calculation(json!({
            "type": "single_condition",
            "condition": { "name": "organic", "param": "param9", "threshold": 50, "points": 2 },
            "additional_requirements": { "name": "landscape", "param": "param10", "min_required": 15 }
        })))
        .expect("rubric parses");

        let credit = rubric.credit("SF1").expect("credit present");
        let CalculationSpec::SingleCondition {
            additional_requirement,
            ..
        } = &credit.calculation
        else {
            panic!("expected single_condition");
        };
        let requirement = additional_requirement.as_ref().expect("requirement parsed");
        assert_eq!(requirement.input.param, "param10");
        assert_eq!(requirement.min_required, 15.0);
    }

    #[test]
    fn names_default_to_param_keys() {
        let rubric = Rubric::from_value(document_with_calculation(json!({
            "type": "range_based",
            "param": "param13",
            "ranges": [{ "min": 20, "points": 2 }]
        })))
        .expect("rubric parses");

        let credit = rubric.credit("SF1").expect("credit present");
        let CalculationSpec::RangeBased(range) = &credit.calculation else {
            panic!("expected range_based");
        };
        assert_eq!(range.input.name, "param13");
        assert_eq!(range.ranges[0].max, None);
    }

    #[test]
    fn duplicate_credit_ids_are_malformed() {
        let mut document = document_with_calculation(json!({
            "type": "conditional_sum",
            "conditions": []
        }));
        let credit = document["categories"][0]["credits"][0].clone();
        document["categories"][0]["credits"]
            .as_array_mut()
            .expect("credits array")
            .push(credit);

        let error = Rubric::from_value(document).expect_err("ids must be unique");
        assert!(error.to_string().contains("more than once"));
    }

    #[test]
    fn duplicate_category_ids_are_malformed() {
        let mut document = document_with_calculation(json!({
            "type": "conditional_sum",
            "conditions": []
        }));
        let mut category = document["categories"][0].clone();
        category["credits"][0]["sub_id"] = json!("SF2");
        document["categories"]
            .as_array_mut()
            .expect("categories array")
            .push(category);

        let error = Rubric::from_value(document).expect_err("category ids must be unique");

        assert_eq!(
            error,
            EngineError::MalformedRubric("category id SF is declared more than once".to_string())
        );
    }

    #[test]
    fn requirement_without_param_is_malformed() {
        let error = Rubric::from_value(document_with_calculation(json!({
            "type": "single_condition",
            "condition": { "name": "organic", "param": "param9", "threshold": 50, "points": 2 },
            "additional_requirement": { "name": "landscape", "min_required": 15 }
        })))
        .expect_err("requirement needs a param");

        assert!(matches!(error, EngineError::MalformedRubric(ref detail) if detail.contains("SF1")));
    }

    #[test]
    fn empty_requirement_object_imposes_nothing() {
        let rubric = Rubric::from_value(document_with_calculation(json!({
            "type": "single_condition",
            "condition": { "param": "param9", "threshold": 50, "points": 2 },
            "additional_requirements": {}
        })))
        .expect("rubric parses");

        let credit = rubric.credit("SF1").expect("credit present");
        assert!(matches!(
            credit.calculation,
            CalculationSpec::SingleCondition {
                additional_requirement: None,
                ..
            }
        ));
    }

    #[test]
    fn option_condition_with_threshold_and_value_is_malformed() {
        let error = Rubric::from_value(document_with_calculation(json!({
            "type": "either_or",
            "options": [{
                "group": "A",
                "points": 1,
                "conditions": [{ "param": "param4", "threshold": 10, "value": true }]
            }]
        })))
        .expect_err("one test per condition");

        assert!(matches!(error, EngineError::MalformedRubric(ref detail) if detail.contains("param4")));
    }

    #[test]
    fn inverted_certification_level_is_malformed() {
        let mut document = document_with_calculation(json!({
            "type": "conditional_sum",
            "conditions": []
        }));
        document["scoring_info"]["certification_levels"] =
            json!([{ "name": "Gold", "min_points": 20, "max_points": 10 }]);

        assert!(matches!(
            Rubric::from_value(document),
            Err(EngineError::MalformedRubric(_))
        ));
    }

    #[test]
    fn unknown_eligibility_operator_is_malformed() {
        let mut document = document_with_calculation(json!({
            "type": "conditional_sum",
            "conditions": []
        }));
        document["eligibility_criteria"]["floor_area_m2"] = json!({ "$between": 10 });

        assert!(matches!(
            Rubric::from_value(document),
            Err(EngineError::MalformedRubric(_))
        ));
    }
}
