//! Deterministic defect-to-grade scoring.
//!
//! An assessment flows through normalization, the four category calculators, the
//! cumulative penalty and the severe damage classifier into the composer; the
//! validator then re-checks the composed grade and can only lower it.

pub mod categories;
pub mod centering;
pub mod composer;
pub mod domain;
pub mod normalizer;
pub mod penalty;
pub mod router;
pub mod rubric;
pub mod structural;
pub mod subgrades;
pub mod validator;

mod text;

#[cfg(test)]
mod tests;

pub use categories::CategoryDeduction;
pub use composer::{CategoryResults, ScoringBreakdown};
pub use domain::{
    CardAssessment, CenteringMeasurement, CornerLocation, DefectCategory, DefectObservation,
    DefectReport, EdgeLocation, GateChecks, MicroFindings, Severity, Side, SurfaceKind,
};
pub use router::grading_router;
pub use rubric::ScoringRubric;
pub use structural::{DamageKind, SevereDamageAssessment, SevereDamageFinding};
pub use subgrades::{SubScore, SubScores};
pub use validator::{GradeCapResult, GradeValidator, ValidatorConfig};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use normalizer::normalize;
use structural::SevereDamageClassifier;

/// Everything tunable about grading: the deduction rubric and the validator switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub rubric: ScoringRubric,
    pub validator: ValidatorConfig,
}

/// Stateless grader that applies the configured rubric to an assessment.
pub struct GradingEngine {
    config: GradingConfig,
    classifier: SevereDamageClassifier,
    validator: GradeValidator,
}

impl GradingEngine {
    pub fn new(config: GradingConfig) -> Self {
        let classifier = SevereDamageClassifier::new(&config.rubric.severe_damage);
        let validator = GradeValidator::new(config.validator.clone());
        Self {
            config,
            classifier,
            validator,
        }
    }

    pub fn config(&self) -> &GradingConfig {
        &self.config
    }

    pub fn validator(&self) -> &GradeValidator {
        &self.validator
    }

    /// Composes the deterministic grade without running the validator.
    pub fn score(&self, assessment: &CardAssessment) -> ScoringBreakdown {
        let rubric = &self.config.rubric;
        let report = normalize(assessment);

        let categories = CategoryResults {
            corners: categories::corner_deductions(&report, &rubric.corners),
            edges: categories::edge_deductions(&report, &rubric.edges),
            surface: categories::surface_deductions(&report, &rubric.surface),
            centering: centering::centering_deductions(&report, &rubric.centering),
        };
        let penalty = penalty::cumulative_penalty(categories.as_array(), &rubric.cumulative_penalties);
        let severe_damage = self.classifier.classify(&report);

        let breakdown = composer::compose(rubric.base_score, categories, penalty, severe_damage);
        debug!(
            calculated = breakdown.calculated_grade,
            final_grade = breakdown.final_grade,
            structural = breakdown.structural_damage,
            "assessment scored"
        );
        breakdown
    }

    /// Scores the assessment, validates the composed grade and adjusts any supplied
    /// sub-scores for structural damage.
    pub fn grade(&self, assessment: &CardAssessment) -> GradeResult {
        let breakdown = self.score(assessment);
        let validation = self
            .validator
            .validate(breakdown.final_grade, assessment, Some(&breakdown));
        let sub_scores = assessment
            .sub_scores
            .as_ref()
            .map(|scores| subgrades::adjust_for_structural_damage(scores, &breakdown));

        GradeResult {
            final_grade: validation.capped_grade,
            breakdown,
            validation,
            sub_scores,
        }
    }

    /// Grades an arbitrary JSON document; unexpected shapes grade as an empty report.
    pub fn grade_json(&self, document: Value) -> GradeResult {
        self.grade(&CardAssessment::from_json_value(document))
    }

    /// Validates a grade proposed elsewhere against this assessment. `None` passes
    /// through as `None`.
    pub fn validate_proposed(
        &self,
        proposed: Option<f64>,
        assessment: &CardAssessment,
    ) -> Option<GradeCapResult> {
        let breakdown = self.score(assessment);
        self.validator
            .validate_decimal(proposed, assessment, Some(&breakdown))
    }
}

impl Default for GradingEngine {
    fn default() -> Self {
        Self::new(GradingConfig::default())
    }
}

/// Composed breakdown plus the validator's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub final_grade: u8,
    pub breakdown: ScoringBreakdown,
    pub validation: GradeCapResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_scores: Option<SubScores>,
}
