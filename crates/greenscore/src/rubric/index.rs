//! Bidirectional addressing of rubric inputs.
//!
//! Rubric documents key their inputs by opaque parameter keys (`param1`, `param2`, ...)
//! while people and agents answer questions by readable names. [`NameParamIndex`] is
//! derived once per rubric and translates between the two, and exposes the flattened
//! question list used to drive intake.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::{
    CalculationSpec, Category, ConditionTest, Credit, Criterion, InputKind, InputRef, RangeBand,
    Rubric, Validation,
};
use crate::error::EngineError;
use crate::scoring::record::{invalid, BuildingRecord, InputValue};

/// Question describing one leaf input of the rubric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputDescriptor {
    pub name: String,
    pub param: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_type: InputKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Vec<RangeBand>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_required: Option<f64>,
    pub category_id: String,
    pub credit_sub_id: String,
}

/// Eligibility field a caller must answer before scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityQuestion {
    pub name: String,
    pub input_type: InputKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilitySchema {
    pub questions: Vec<EligibilityQuestion>,
}

/// Schema introspection payload: eligibility questions followed by credit inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSchema {
    pub eligibility: EligibilitySchema,
    pub questions: Vec<InputDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameParamIndex {
    params: BTreeMap<String, String>,
    kinds: BTreeMap<String, InputKind>,
    descriptors: Vec<InputDescriptor>,
    eligibility: EligibilitySchema,
}

impl NameParamIndex {
    /// Walk every calculation descriptor and collect its leaf inputs.
    ///
    /// A name reused for the same param is indexed once; a name bound to two
    /// different params is a malformed rubric.
    pub fn build(rubric: &Rubric) -> Result<Self, EngineError> {
        let mut index = Self {
            params: BTreeMap::new(),
            kinds: BTreeMap::new(),
            descriptors: Vec::new(),
            eligibility: eligibility_schema(rubric),
        };

        for (category, credit) in rubric.credits() {
            for leaf in leaves(&credit.calculation) {
                index.register(category, credit, leaf)?;
            }
        }

        Ok(index)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn kind(&self, name: &str) -> Option<InputKind> {
        self.kinds.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|descriptor| descriptor.name.as_str())
    }

    pub fn descriptors(&self) -> &[InputDescriptor] {
        &self.descriptors
    }

    pub fn schema(&self) -> InputSchema {
        InputSchema {
            eligibility: self.eligibility.clone(),
            questions: self.descriptors.clone(),
        }
    }

    /// Re-key name-addressed answers by param, defaulting every unanswered input.
    ///
    /// Eligibility fields pass through under their own names, answers keyed by a param
    /// are accepted as-is, and keys the rubric does not know are dropped.
    pub fn translate_named_record(
        &self,
        answers: &BuildingRecord,
    ) -> Result<BuildingRecord, EngineError> {
        let mut record = BuildingRecord::new();

        for question in &self.eligibility.questions {
            if let Some(value) = answers.get(&question.name) {
                record.insert(question.name.clone(), value.clone());
            }
        }

        let mut answered = HashSet::new();
        for descriptor in &self.descriptors {
            let supplied = answers
                .get(&descriptor.name)
                .map(|value| (descriptor.name.as_str(), value))
                .or_else(|| {
                    answers
                        .get(&descriptor.param)
                        .map(|value| (descriptor.param.as_str(), value))
                });

            if let Some((key, value)) = supplied {
                check_shape(key, descriptor, value)?;
                record.insert(descriptor.param.clone(), value.clone());
                answered.insert(descriptor.param.as_str());
            }
        }

        for descriptor in &self.descriptors {
            if answered.contains(descriptor.param.as_str()) {
                continue;
            }
            let default = descriptor.input_type.default_value();
            if !default.is_null() {
                record.insert(descriptor.param.clone(), default);
            }
        }

        Ok(record)
    }

    fn register(
        &mut self,
        category: &Category,
        credit: &Credit,
        leaf: Leaf<'_>,
    ) -> Result<(), EngineError> {
        let input = leaf.input;
        if let Some(existing) = self.params.get(&input.name) {
            if existing != &input.param {
                return Err(EngineError::malformed(format!(
                    "input name {} is bound to both {} and {}",
                    input.name, existing, input.param
                )));
            }
            return Ok(());
        }

        self.params.insert(input.name.clone(), input.param.clone());
        self.kinds.insert(input.name.clone(), input.kind);
        self.descriptors.push(InputDescriptor {
            name: input.name.clone(),
            param: input.param.clone(),
            label: input
                .meta
                .label
                .clone()
                .unwrap_or_else(|| humanize(&input.name)),
            description: input.meta.description.clone(),
            input_type: input.kind,
            units: input.meta.units.clone(),
            options: input.meta.options.clone(),
            validation: input.meta.validation,
            threshold: leaf.threshold,
            ranges: leaf.ranges.map(<[RangeBand]>::to_vec),
            min_required: leaf.min_required,
            category_id: category.id.clone(),
            credit_sub_id: credit.id.clone(),
        });
        Ok(())
    }
}

struct Leaf<'a> {
    input: &'a InputRef,
    threshold: Option<f64>,
    ranges: Option<&'a [RangeBand]>,
    min_required: Option<f64>,
}

impl<'a> Leaf<'a> {
    fn plain(input: &'a InputRef) -> Self {
        Self {
            input,
            threshold: None,
            ranges: None,
            min_required: None,
        }
    }
}

fn leaves(spec: &CalculationSpec) -> Vec<Leaf<'_>> {
    match spec {
        CalculationSpec::ConditionalSum { conditions } => conditions
            .iter()
            .map(|condition| Leaf {
                threshold: Some(condition.threshold),
                ..Leaf::plain(&condition.input)
            })
            .collect(),
        CalculationSpec::EitherOr { options } => options
            .iter()
            .flat_map(|option| option.conditions.iter())
            .map(|condition| Leaf {
                threshold: match condition.test {
                    ConditionTest::Threshold(threshold) => Some(threshold),
                    ConditionTest::Equals(_) => None,
                },
                ..Leaf::plain(&condition.input)
            })
            .collect(),
        CalculationSpec::RangeBased(range) => vec![Leaf {
            ranges: Some(&range.ranges),
            ..Leaf::plain(&range.input)
        }],
        CalculationSpec::CompositeSum { parts } => parts
            .iter()
            .map(|part| Leaf {
                ranges: Some(&part.ranges),
                ..Leaf::plain(&part.input)
            })
            .collect(),
        CalculationSpec::SingleCondition {
            condition,
            additional_requirement,
        } => {
            let mut leaves = vec![Leaf {
                threshold: Some(condition.threshold),
                ..Leaf::plain(&condition.input)
            }];
            if let Some(requirement) = additional_requirement {
                leaves.push(Leaf {
                    min_required: Some(requirement.min_required),
                    ..Leaf::plain(&requirement.input)
                });
            }
            leaves
        }
    }
}

fn eligibility_schema(rubric: &Rubric) -> EligibilitySchema {
    let mut questions: Vec<EligibilityQuestion> = Vec::new();

    for criterion in &rubric.eligibility.criteria {
        let position = match questions
            .iter()
            .position(|question| question.name == criterion.field())
        {
            Some(position) => position,
            None => {
                let input_type = match criterion {
                    Criterion::OneOf { .. } => InputKind::Enum,
                    Criterion::Numeric { .. } => InputKind::Number,
                };
                questions.push(EligibilityQuestion {
                    name: criterion.field().to_string(),
                    input_type,
                    options: Vec::new(),
                    requirements: Vec::new(),
                });
                questions.len() - 1
            }
        };

        let question = &mut questions[position];
        match criterion {
            Criterion::OneOf { allowed, .. } => question.options.extend(allowed.iter().cloned()),
            Criterion::Numeric { bound, .. } => question.requirements.push(bound.describe()),
        }
    }

    EligibilitySchema { questions }
}

fn check_shape(key: &str, descriptor: &InputDescriptor, value: &InputValue) -> Result<(), EngineError> {
    let valid = match (descriptor.input_type, value) {
        (InputKind::Number, InputValue::Number(_)) => true,
        (InputKind::Boolean, InputValue::Boolean(_)) => true,
        (InputKind::Enum, InputValue::Text(text)) => {
            descriptor.options.is_empty() || descriptor.options.iter().any(|option| option == text)
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(invalid(key, descriptor.input_type, value))
    }
}

fn humanize(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}
