use std::collections::BTreeMap;

use super::rules::CreditResult;
use crate::rubric::Category;

/// Category and overall totals derived from per-credit results.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Aggregate {
    pub total: f64,
    pub category_scores: BTreeMap<String, f64>,
}

/// Sum each category's credits, clamp to the category cap, then sum the clamped scores.
/// Credits missing from `credit_scores` count as zero.
pub(crate) fn aggregate(
    categories: &[Category],
    credit_scores: &BTreeMap<String, CreditResult>,
) -> Aggregate {
    let mut category_scores = BTreeMap::new();
    let mut total = 0.0;

    for category in categories {
        let sum: f64 = category
            .credits
            .iter()
            .filter_map(|credit| credit_scores.get(&credit.id))
            .map(|result| result.points)
            .sum();
        let clamped = sum.min(category.max_points);
        category_scores.insert(category.id.clone(), clamped);
        total += clamped;
    }

    Aggregate {
        total,
        category_scores,
    }
}
