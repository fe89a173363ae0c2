use serde::{Deserialize, Serialize};

use super::categories::CategoryDeduction;
use super::domain::DefectCategory;
use super::penalty::CumulativePenalty;
use super::structural::SevereDamageAssessment;

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 10;

/// Results of the four category calculators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryResults {
    pub corners: CategoryDeduction,
    pub edges: CategoryDeduction,
    pub surface: CategoryDeduction,
    pub centering: CategoryDeduction,
}

impl CategoryResults {
    pub fn get(&self, category: DefectCategory) -> &CategoryDeduction {
        match category {
            DefectCategory::Corners => &self.corners,
            DefectCategory::Edges => &self.edges,
            DefectCategory::Surface => &self.surface,
            DefectCategory::Centering => &self.centering,
        }
    }

    pub fn as_array(&self) -> [&CategoryDeduction; 4] {
        [&self.corners, &self.edges, &self.surface, &self.centering]
    }

    fn sum(&self) -> f64 {
        self.as_array()
            .iter()
            .map(|category| category.deductions)
            .sum()
    }
}

/// Auditable record of how a grade was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringBreakdown {
    pub base_score: f64,
    #[serde(flatten)]
    pub categories: CategoryResults,
    pub categories_with_defects: usize,
    pub cumulative_penalty: f64,
    pub structural_damage: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural_damage_type: Option<String>,
    pub severe_damage: SevereDamageAssessment,
    pub total_deductions: f64,
    pub calculated_grade: f64,
    pub final_grade: u8,
    pub explanation: String,
}

impl ScoringBreakdown {
    pub fn category(&self, category: DefectCategory) -> &CategoryDeduction {
        self.categories.get(category)
    }

    pub fn has_any_deduction(&self) -> bool {
        self.categories
            .as_array()
            .iter()
            .any(|category| category.has_deduction())
            || self.cumulative_penalty > 0.0
    }
}

/// Merges category deductions, the cumulative penalty and the strictest severe damage
/// cap into the final integer grade. A severe damage cap only ever lowers the grade.
pub fn compose(
    base_score: f64,
    categories: CategoryResults,
    penalty: CumulativePenalty,
    severe_damage: SevereDamageAssessment,
) -> ScoringBreakdown {
    let total_deductions = round_hundredths(categories.sum() + penalty.penalty);
    let raw = base_score - total_deductions;

    let mut notes = Vec::new();
    let calculated_grade = if raw.is_finite() {
        round_hundredths(raw.clamp(f64::from(MIN_GRADE), f64::from(MAX_GRADE)))
    } else {
        notes.push(format!(
            "Non-finite score encountered (base {base_score}, deductions {total_deductions}); clamped to {MIN_GRADE}."
        ));
        f64::from(MIN_GRADE)
    };

    let mut final_grade = whole_grade(calculated_grade);

    if let Some(finding) = &severe_damage.governing {
        let cap = whole_grade(finding.grade_cap);
        if final_grade > cap {
            notes.push(format!(
                "SEVERE DAMAGE (Tier {}): {}. Grade capped at {:.1}.",
                finding.tier, finding.damage_type, finding.grade_cap
            ));
            final_grade = cap;
        } else {
            notes.push(format!(
                "Severe damage (Tier {}) noted: {}. Cap {:.1} not binding.",
                finding.tier, finding.damage_type, finding.grade_cap
            ));
        }
    }

    let mut explanation = format!(
        "Grade calculated from base {base_score:.1} with {total_deductions:.2} points in deductions: \
         Corners (-{:.2}), Edges (-{:.2}), Surface (-{:.2}), Centering (-{:.2}).",
        categories.corners.deductions,
        categories.edges.deductions,
        categories.surface.deductions,
        categories.centering.deductions,
    );
    if let Some(note) = &penalty.note {
        explanation.push(' ');
        explanation.push_str(note);
    }
    for note in &notes {
        explanation.push(' ');
        explanation.push_str(note);
    }
    explanation.push_str(&format!(
        " Calculated: {calculated_grade:.2}, Final: {final_grade}."
    ));

    let governing = severe_damage.governing.as_ref();
    ScoringBreakdown {
        base_score,
        categories,
        categories_with_defects: penalty.categories_with_defects,
        cumulative_penalty: penalty.penalty,
        structural_damage: governing.is_some(),
        structural_damage_type: governing.map(|finding| finding.damage_type.clone()),
        severe_damage,
        total_deductions,
        calculated_grade,
        final_grade,
        explanation,
    }
}

/// Floors a decimal grade onto the 1..=10 whole-number scale. Non-finite input maps
/// to the minimum grade.
pub fn whole_grade(value: f64) -> u8 {
    if !value.is_finite() {
        return MIN_GRADE;
    }
    value
        .floor()
        .clamp(f64::from(MIN_GRADE), f64::from(MAX_GRADE)) as u8
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
