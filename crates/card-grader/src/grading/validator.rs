//! Downward-only safety net applied after composition.
//!
//! Each check proposes a ceiling; the lowest ceiling below the proposed grade wins.
//! Checks only ever lower a grade, and a ceiling at or above the proposed grade is
//! not recorded, so validating an already validated grade is a no-op.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::composer::{whole_grade, ScoringBreakdown, MAX_GRADE, MIN_GRADE};
use super::domain::{CardAssessment, CornerLocation, EdgeLocation, Side, SurfaceKind};
use super::normalizer::{normalize, NormalizedReport};
use super::text::affirms_phrase;

const BENT_CORNER_PHRASES: [&str; 4] = ["bent", "folded", "does not lie flat", "raised"];

/// Validator switches. Both flags are off in production by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Compute and log would-be caps without changing the grade.
    pub log_only: bool,
    /// Block every 10 regardless of findings.
    pub statistical_hard_cap: bool,
    pub structural_cap: u8,
    pub safety_cap: u8,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            log_only: false,
            statistical_hard_cap: false,
            structural_cap: 4,
            safety_cap: 9,
        }
    }
}

/// Validator outcome for one proposed grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeCapResult {
    pub original_grade: u8,
    pub capped_grade: u8,
    pub cap_applied: bool,
    pub cap_reasons: Vec<String>,
    pub log_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_cap_to: Option<u8>,
}

/// Running ceiling for a single validation pass.
struct Ceiling {
    original: u8,
    grade: u8,
    reasons: Vec<String>,
}

impl Ceiling {
    fn new(original: u8) -> Self {
        Self {
            original,
            grade: original,
            reasons: Vec::new(),
        }
    }

    fn cap(&mut self, limit: u8, reason: String) {
        if limit < self.original {
            debug!(limit, reason = %reason, "validator check triggered");
            self.grade = self.grade.min(limit);
            self.reasons.push(reason);
        }
    }
}

pub struct GradeValidator {
    config: ValidatorConfig,
}

impl GradeValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Re-checks a proposed whole grade against the raw assessment and, when present,
    /// the breakdown that produced it.
    pub fn validate(
        &self,
        proposed: u8,
        assessment: &CardAssessment,
        breakdown: Option<&ScoringBreakdown>,
    ) -> GradeCapResult {
        let original = proposed.clamp(MIN_GRADE, MAX_GRADE);
        let report = normalize(assessment);
        let mut ceiling = Ceiling::new(original);

        self.structural_recheck(&report, &mut ceiling);
        if self.config.statistical_hard_cap && original == MAX_GRADE {
            ceiling.cap(
                self.config.safety_cap,
                "Statistical rarity enforcement - Grade 10 blocked (occurs in <1% of cards)"
                    .to_string(),
            );
        }
        self.gate_checks(assessment, &mut ceiling);
        self.micro_findings(assessment, &mut ceiling);
        self.category_breadth(&report, &mut ceiling);
        if original == MAX_GRADE && ceiling.grade == MAX_GRADE {
            self.perfect_grade_safety(&report, breakdown, &mut ceiling);
        }

        self.finish(ceiling)
    }

    /// Entry point for externally proposed decimal grades. `None` marks an ungradable
    /// card and passes through untouched.
    pub fn validate_decimal(
        &self,
        proposed: Option<f64>,
        assessment: &CardAssessment,
        breakdown: Option<&ScoringBreakdown>,
    ) -> Option<GradeCapResult> {
        let Some(proposed) = proposed else {
            debug!("no proposed grade, skipping validation");
            return None;
        };

        let mut result = self.validate(whole_grade(proposed), assessment, breakdown);
        if !proposed.is_finite() {
            warn!(proposed, "non-finite proposed grade clamped to minimum");
            result.cap_reasons.insert(
                0,
                format!("Proposed grade {proposed} is not a finite number; clamped to {MIN_GRADE}"),
            );
        }
        Some(result)
    }

    fn structural_recheck(&self, report: &NormalizedReport, ceiling: &mut Ceiling) {
        let cap = self.config.structural_cap;
        let creased = Side::ALL.into_iter().any(|side| {
            report
                .side(side)
                .surface(SurfaceKind::Creases)
                .severity
                .is_defect()
        });
        if creased {
            ceiling.cap(
                cap,
                format!("STRUCTURAL DAMAGE: Crease detected - automatic {cap} grade cap"),
            );
        }

        let bent = Side::ALL.into_iter().any(|side| {
            CornerLocation::ALL.into_iter().any(|location| {
                let description = &report.side(side).corner(location).description;
                BENT_CORNER_PHRASES
                    .iter()
                    .any(|phrase| affirms_phrase(description, phrase))
            })
        });
        if bent {
            ceiling.cap(
                cap,
                format!("STRUCTURAL DAMAGE: Bent/folded corner detected - automatic {cap} grade cap"),
            );
        }
    }

    fn gate_checks(&self, assessment: &CardAssessment, ceiling: &mut Ceiling) {
        let Some(gates) = &assessment.gate_checks else {
            return;
        };
        let checks = [
            (
                gates.corners8_pass,
                "8-corner audit incomplete or found defects (perfect_gate_checks.corners8_pass = false)",
            ),
            (
                gates.edges4_pass,
                "Edge audit incomplete or found defects (perfect_gate_checks.edges4_pass = false)",
            ),
            (
                gates.centering_two_axis_pass,
                "Centering outside 50/50-55/45 range (perfect_gate_checks.centering_two_axis_pass = false)",
            ),
            (
                gates.cross_side_pass,
                "Cross-side verification incomplete or failed (perfect_gate_checks.cross_side_pass = false)",
            ),
            (
                gates.image_quality_sufficient,
                "Image quality insufficient for micro-defect detection (perfect_gate_checks.image_quality_sufficient = false)",
            ),
        ];
        for (passed, reason) in checks {
            if passed == Some(false) {
                ceiling.cap(self.config.safety_cap, reason.to_string());
            }
        }
    }

    fn micro_findings(&self, assessment: &CardAssessment, ceiling: &mut Ceiling) {
        let Some(findings) = &assessment.micro_findings else {
            return;
        };
        let count = |value: Option<f64>| value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0);
        let cap = self.config.safety_cap;

        let whitening = count(findings.corner_whitening_mm_sum_front)
            + count(findings.corner_whitening_mm_sum_back);
        if whitening > 0.0 {
            ceiling.cap(cap, format!("Corner whitening detected ({whitening:.2}mm total)"));
        }

        let chips = count(findings.edge_chips_total);
        let dots = count(findings.edge_whitening_dots_total);
        if chips > 0.0 || dots > 0.0 {
            ceiling.cap(
                cap,
                format!("Edge defects detected ({chips} chips, {dots} white dots)"),
            );
        }

        let hairlines = count(findings.hairline_count_front) + count(findings.hairline_count_back);
        if hairlines > 0.0 {
            ceiling.cap(cap, format!("Hairline scratches detected ({hairlines} total)"));
        }

        let print_dots =
            count(findings.print_dots_count_front) + count(findings.print_dots_count_back);
        if print_dots > 0.0 {
            ceiling.cap(cap, format!("Print dots detected ({print_dots} total)"));
        }
    }

    /// Counts side-level groups (front corners, back edges, ...) with any defect.
    fn category_breadth(&self, report: &NormalizedReport, ceiling: &mut Ceiling) {
        let affected: usize = Side::ALL
            .into_iter()
            .map(|side| {
                let normalized = report.side(side);
                let corners = CornerLocation::ALL
                    .into_iter()
                    .any(|location| normalized.corner(location).severity.is_defect());
                let edges = EdgeLocation::ALL
                    .into_iter()
                    .any(|location| normalized.edge(location).severity.is_defect());
                let surface = SurfaceKind::ALL
                    .into_iter()
                    .any(|kind| normalized.surface(kind).severity.is_defect());
                [corners, edges, surface].into_iter().filter(|hit| *hit).count()
            })
            .sum();

        if affected >= 2 {
            ceiling.cap(
                self.config.safety_cap,
                format!("Multiple defect categories affected ({affected} categories have defects)"),
            );
        }
    }

    fn perfect_grade_safety(
        &self,
        report: &NormalizedReport,
        breakdown: Option<&ScoringBreakdown>,
        ceiling: &mut Ceiling,
    ) {
        let raw_defect = report
            .observations()
            .any(|(_, _, observation)| observation.severity.is_defect());
        let deducted = breakdown.is_some_and(ScoringBreakdown::has_any_deduction);

        if raw_defect || deducted {
            ceiling.cap(
                self.config.safety_cap,
                "Grade 10 proposed but defects were reported - safety cap applied".to_string(),
            );
        }
    }

    fn finish(&self, ceiling: Ceiling) -> GradeCapResult {
        let Ceiling {
            original,
            grade,
            reasons,
        } = ceiling;

        if grade >= original {
            debug!(grade = original, "grade validated without caps");
            return GradeCapResult {
                original_grade: original,
                capped_grade: original,
                cap_applied: false,
                cap_reasons: reasons,
                log_only: self.config.log_only,
                would_cap_to: None,
            };
        }

        let joined = reasons.join("; ");
        if self.config.log_only {
            info!(
                original,
                would_cap_to = grade,
                reasons = %joined,
                "log-only mode, grade cap not applied"
            );
            GradeCapResult {
                original_grade: original,
                capped_grade: original,
                cap_applied: false,
                cap_reasons: reasons,
                log_only: true,
                would_cap_to: Some(grade),
            }
        } else {
            warn!(original, capped = grade, reasons = %joined, "grade cap applied");
            GradeCapResult {
                original_grade: original,
                capped_grade: grade,
                cap_applied: true,
                cap_reasons: reasons,
                log_only: false,
                would_cap_to: None,
            }
        }
    }
}
