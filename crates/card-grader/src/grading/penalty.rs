use serde::{Deserialize, Serialize};

use super::categories::CategoryDeduction;
use super::rubric::CumulativePenaltyRule;

/// Extra deduction for wear spread across many categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativePenalty {
    pub categories_with_defects: usize,
    pub penalty: f64,
    pub note: Option<String>,
}

pub fn cumulative_penalty(
    categories: [&CategoryDeduction; 4],
    rules: &[CumulativePenaltyRule],
) -> CumulativePenalty {
    let categories_with_defects = categories
        .iter()
        .filter(|category| category.has_deduction())
        .count();

    let rule = rules
        .iter()
        .filter(|rule| categories_with_defects >= rule.min_categories)
        .max_by_key(|rule| rule.min_categories);

    match rule {
        Some(rule) if rule.penalty > 0.0 => CumulativePenalty {
            categories_with_defects,
            penalty: rule.penalty,
            note: Some(format!(
                "Cumulative penalty (-{:.1}) applied for defects in {categories_with_defects} categories.",
                rule.penalty
            )),
        },
        _ => CumulativePenalty {
            categories_with_defects,
            penalty: 0.0,
            note: None,
        },
    }
}
