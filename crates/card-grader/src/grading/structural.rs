//! Tiered severe-damage detection.
//!
//! Every rule in the table is evaluated against every card; the strictest grade cap
//! among the matches governs, so rule order never affects the outcome.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::debug;

use super::domain::{DefectCategory, Severity, Side, SurfaceKind};
use super::normalizer::{NormalizedReport, Zone};
use super::rubric::SevereDamageRubric;
use super::text::{affirms, cached, max_millimetres, max_percentage};

/// Cap reported when no rule matches.
pub const NO_CAP: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    Crease,
    Tear,
    Bend,
    CoreExposure,
    CoatingBreach,
    CoatingLoss,
    ExtensiveChipping,
    ChippingCoverage,
    FiberExposure,
    HeavyCorners,
    HeavyAcrossCategories,
    HeavyDefectCount,
    HeavyBothSides,
}

impl DamageKind {
    pub fn tier(self) -> u8 {
        match self {
            DamageKind::Crease | DamageKind::Tear | DamageKind::Bend => 1,
            DamageKind::CoreExposure | DamageKind::CoatingBreach | DamageKind::CoatingLoss => 2,
            DamageKind::ExtensiveChipping
            | DamageKind::ChippingCoverage
            | DamageKind::FiberExposure
            | DamageKind::HeavyCorners => 3,
            DamageKind::HeavyAcrossCategories
            | DamageKind::HeavyDefectCount
            | DamageKind::HeavyBothSides => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SevereDamageFinding {
    pub tier: u8,
    pub kind: DamageKind,
    pub damage_type: String,
    pub grade_cap: f64,
}

/// All matched findings plus the one that governs the grade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SevereDamageAssessment {
    pub findings: Vec<SevereDamageFinding>,
    pub governing: Option<SevereDamageFinding>,
}

impl SevereDamageAssessment {
    pub fn grade_cap(&self) -> f64 {
        self.governing
            .as_ref()
            .map_or(NO_CAP, |finding| finding.grade_cap)
    }

    pub fn has_kind(&self, kind: DamageKind) -> bool {
        self.findings.iter().any(|finding| finding.kind == kind)
    }

    fn resolve(findings: Vec<SevereDamageFinding>) -> Self {
        let strictest = findings
            .iter()
            .map(|finding| finding.grade_cap)
            .fold(None, |best: Option<f64>, cap| {
                Some(best.map_or(cap, |current| current.min(cap)))
            });

        let governing = strictest.map(|cap| {
            let binding: Vec<&SevereDamageFinding> = findings
                .iter()
                .filter(|finding| finding.grade_cap == cap)
                .collect();
            SevereDamageFinding {
                tier: binding.iter().map(|finding| finding.tier).min().unwrap_or(1),
                kind: binding[0].kind,
                damage_type: binding
                    .iter()
                    .map(|finding| finding.damage_type.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
                grade_cap: cap,
            }
        });

        Self {
            findings,
            governing,
        }
    }
}

type EvidenceCheck = fn(&DamageEvidence<'_>, &SevereDamageRubric) -> Option<String>;

enum Predicate {
    Text(Regex),
    Evidence(EvidenceCheck),
}

struct DamageRule {
    kind: DamageKind,
    label: &'static str,
    grade_cap: f64,
    predicate: Predicate,
}

/// Facts gathered once per report that the evidence rules read.
struct DamageEvidence<'a> {
    descriptions: Vec<(Side, Zone, &'a str)>,
    crease_sides: Vec<Side>,
    heavy_corners: usize,
    heavy_total: usize,
    heavy_categories: BTreeSet<DefectCategory>,
    heavy_sides: BTreeSet<Side>,
    chipping_percent: Option<f64>,
    fiber_mm: Option<f64>,
}

impl<'a> DamageEvidence<'a> {
    fn gather(report: &'a NormalizedReport) -> Self {
        let heavy_corner_wording = heavy_corner_pattern();
        let chipping = chipping_pattern();
        let fiber = fiber_pattern();

        let mut evidence = Self {
            descriptions: Vec::new(),
            crease_sides: Vec::new(),
            heavy_corners: 0,
            heavy_total: 0,
            heavy_categories: BTreeSet::new(),
            heavy_sides: BTreeSet::new(),
            chipping_percent: None,
            fiber_mm: None,
        };

        for (side, zone, observation) in report.observations() {
            let description = observation.description.as_str();
            let heavy = observation.severity == Severity::Heavy;

            if zone == Zone::Surface(SurfaceKind::Creases) && observation.severity.is_defect() {
                evidence.crease_sides.push(side);
            }
            if heavy {
                evidence.heavy_total += 1;
                evidence.heavy_sides.insert(side);
                evidence.heavy_categories.insert(match zone {
                    Zone::Corner(_) => DefectCategory::Corners,
                    Zone::Edge(_) => DefectCategory::Edges,
                    Zone::Surface(_) => DefectCategory::Surface,
                });
            }
            if let Zone::Corner(_) = zone {
                if heavy || affirms(heavy_corner_wording, description) {
                    evidence.heavy_corners += 1;
                }
            }

            if description.is_empty() {
                continue;
            }
            if affirms(chipping, description) {
                evidence.chipping_percent =
                    max_option(evidence.chipping_percent, max_percentage(description));
            }
            if affirms(fiber, description) {
                let measured = max_option(max_millimetres(description), observation.size_mm);
                evidence.fiber_mm = max_option(evidence.fiber_mm, measured);
            }
            evidence.descriptions.push((side, zone, description));
        }

        evidence
    }
}

fn max_option(left: Option<f64>, right: Option<f64>) -> Option<f64> {
    match (left, right) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn heavy_corner_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    cached(
        &PATTERN,
        r"(?i)\b(heavy|severe|significant|major)\s+(wear|whitening|rounding|damage)\b|\bheavily\s+(worn|rounded|damaged)\b",
    )
}

fn chipping_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    cached(&PATTERN, r"(?i)\bchip(s|ped|ping)?\b")
}

fn fiber_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    cached(&PATTERN, r"(?i)\bfib(er|re)s?\b")
}

/// Table-driven evaluator for the four severe damage tiers.
pub struct SevereDamageClassifier {
    rubric: SevereDamageRubric,
    rules: Vec<DamageRule>,
}

impl SevereDamageClassifier {
    pub fn new(rubric: &SevereDamageRubric) -> Self {
        // Rule patterns are literals; a pattern that fails to compile is a bug, not input.
        let text = |kind, label, grade_cap, source: &str| DamageRule {
            kind,
            label,
            grade_cap,
            predicate: Predicate::Text(Regex::new(source).expect("literal pattern compiles")),
        };
        let evidence = |kind, label, grade_cap, check: EvidenceCheck| DamageRule {
            kind,
            label,
            grade_cap,
            predicate: Predicate::Evidence(check),
        };

        let rules = [
            evidence(
                DamageKind::Crease,
                "Crease detected",
                rubric.crease_cap,
                crease_reported,
            ),
            text(
                DamageKind::Tear,
                "Tear or paper loss",
                rubric.tear_cap,
                r"(?i)\b(tears?|torn|rips?|ripped)\b|\bpaper\s+loss\b|\bmissing\s+paper\b",
            ),
            text(
                DamageKind::Bend,
                "Bent/folded/warped card",
                rubric.bend_cap,
                r"(?i)\b(bent|folded|warped|warping)\b|\bdoes\s+not\s+lie\s+flat\b|\bdoesn't\s+lie\s+flat\b",
            ),
            text(
                DamageKind::CoreExposure,
                "Cardstock/core exposure",
                rubric.tier2_cap,
                r"(?i)\b(core|cardstock|card\s+stock)\s+exposure\b|\bexposed\s+(core|cardstock|card\s+stock)\b|\b(core|cardstock)\s+(is\s+)?(exposed|showing|visible)\b",
            ),
            text(
                DamageKind::CoatingBreach,
                "Deep scratch through coating",
                rubric.tier2_cap,
                r"(?i)\bdeep\s+scratch(es)?\b|\bscratch(es)?\s+(through|into|penetrating)\s+(the\s+)?(coating|gloss|foil|surface\s+layer)\b|\bthrough\s+the\s+coating\b",
            ),
            text(
                DamageKind::CoatingLoss,
                "Ink/coating loss or delamination",
                rubric.tier2_cap,
                r"(?i)\b(ink|coating|gloss|foil)\s+(loss|lifting|missing|flaking)\b|\bdelaminat\w*|\blayer\s+separation\b|\bpeeling\b",
            ),
            text(
                DamageKind::ExtensiveChipping,
                "Continuous/extensive chipping",
                rubric.tier3_cap,
                r"(?i)\b(continuous|extensive|widespread|heavy)\s+chipping\b|\bchipping\s+(along|across)\s+(the\s+)?(entire|full|whole)\b",
            ),
            evidence(
                DamageKind::ChippingCoverage,
                "Chipping coverage",
                rubric.tier3_cap,
                chipping_coverage,
            ),
            evidence(
                DamageKind::FiberExposure,
                "Fiber exposure",
                rubric.tier3_cap,
                fiber_exposure,
            ),
            evidence(
                DamageKind::HeavyCorners,
                "Multiple heavily worn corners",
                rubric.tier3_cap,
                heavy_corners,
            ),
            evidence(
                DamageKind::HeavyAcrossCategories,
                "Heavy defects across categories",
                rubric.tier4_cap,
                heavy_across_categories,
            ),
            evidence(
                DamageKind::HeavyDefectCount,
                "Numerous heavy defects",
                rubric.tier4_cap,
                heavy_defect_count,
            ),
            evidence(
                DamageKind::HeavyBothSides,
                "Heavy defects on both sides",
                rubric.tier4_cap,
                heavy_both_sides,
            ),
        ];

        Self {
            rubric: rubric.clone(),
            rules: rules.into(),
        }
    }

    pub fn classify(&self, report: &NormalizedReport) -> SevereDamageAssessment {
        let evidence = DamageEvidence::gather(report);
        let mut findings = Vec::new();

        for rule in &self.rules {
            let matched = match &rule.predicate {
                Predicate::Text(regex) => evidence
                    .descriptions
                    .iter()
                    .find(|(_, _, description)| affirms(regex, description))
                    .map(|(side, zone, _)| format!("{} {}", side.label(), zone.label())),
                Predicate::Evidence(check) => check(&evidence, &self.rubric),
            };

            if let Some(detail) = matched {
                let finding = SevereDamageFinding {
                    tier: rule.kind.tier(),
                    kind: rule.kind,
                    damage_type: format!("{} ({detail})", rule.label),
                    grade_cap: rule.grade_cap,
                };
                debug!(
                    tier = finding.tier,
                    cap = finding.grade_cap,
                    damage = %finding.damage_type,
                    "severe damage rule matched"
                );
                findings.push(finding);
            }
        }

        SevereDamageAssessment::resolve(findings)
    }
}

fn crease_reported(evidence: &DamageEvidence<'_>, _: &SevereDamageRubric) -> Option<String> {
    if evidence.crease_sides.is_empty() {
        return None;
    }
    let sides: Vec<&str> = evidence.crease_sides.iter().map(|side| side.label()).collect();
    Some(format!("{} surface", sides.join(" and ")))
}

fn chipping_coverage(evidence: &DamageEvidence<'_>, rubric: &SevereDamageRubric) -> Option<String> {
    evidence
        .chipping_percent
        .filter(|percent| *percent >= rubric.chipping_percent_threshold)
        .map(|percent| format!("{percent:.0}% of edge"))
}

fn fiber_exposure(evidence: &DamageEvidence<'_>, rubric: &SevereDamageRubric) -> Option<String> {
    evidence
        .fiber_mm
        .filter(|size| *size >= rubric.fiber_exposure_mm_threshold)
        .map(|size| format!("{size:.1}mm"))
}

fn heavy_corners(evidence: &DamageEvidence<'_>, rubric: &SevereDamageRubric) -> Option<String> {
    (evidence.heavy_corners >= rubric.heavy_corner_threshold)
        .then(|| format!("{} corners", evidence.heavy_corners))
}

fn heavy_across_categories(
    evidence: &DamageEvidence<'_>,
    rubric: &SevereDamageRubric,
) -> Option<String> {
    (evidence.heavy_categories.len() >= rubric.heavy_category_threshold).then(|| {
        let categories: Vec<&str> = evidence
            .heavy_categories
            .iter()
            .map(|category| category.label())
            .collect();
        categories.join(", ")
    })
}

fn heavy_defect_count(evidence: &DamageEvidence<'_>, rubric: &SevereDamageRubric) -> Option<String> {
    (evidence.heavy_total >= rubric.heavy_defect_threshold)
        .then(|| format!("{} heavy defects", evidence.heavy_total))
}

fn heavy_both_sides(evidence: &DamageEvidence<'_>, _: &SevereDamageRubric) -> Option<String> {
    (evidence.heavy_sides.len() == Side::ALL.len()).then(|| "front and back".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::domain::{
        CardAssessment, CenteringMeasurement, CornerLocation, DefectObservation, DefectReport,
        EdgeLocation,
    };
    use crate::grading::normalizer::normalize;

    fn classify(defects: DefectReport) -> SevereDamageAssessment {
        let report = normalize(&CardAssessment::new(
            defects,
            CenteringMeasurement::uniform("50/50"),
        ));
        SevereDamageClassifier::new(&SevereDamageRubric::default()).classify(&report)
    }

    #[test]
    fn clean_card_has_no_findings() {
        let assessment = classify(DefectReport::default());
        assert!(assessment.findings.is_empty());
        assert!(assessment.governing.is_none());
        assert_eq!(assessment.grade_cap(), NO_CAP);
    }

    #[test]
    fn crease_severity_caps_at_four() {
        let assessment = classify(DefectReport::default().with_surface(
            Side::Back,
            SurfaceKind::Creases,
            DefectObservation::new("minor", ""),
        ));

        let governing = assessment.governing.expect("crease finding");
        assert_eq!(governing.tier, 1);
        assert_eq!(governing.kind, DamageKind::Crease);
        assert_eq!(governing.grade_cap, 4.0);
        assert_eq!(governing.damage_type, "Crease detected (Back surface)");
    }

    #[test]
    fn tear_wording_is_strictest() {
        let defects = DefectReport::default()
            .with_edge(
                Side::Front,
                EdgeLocation::Top,
                DefectObservation::new("heavy", "Small tear at top edge"),
            )
            .with_corner(
                Side::Front,
                CornerLocation::TopLeft,
                DefectObservation::new("moderate", "corner bent upward"),
            );

        let assessment = classify(defects);

        assert_eq!(assessment.grade_cap(), 3.0);
        assert_eq!(assessment.findings.len(), 2);
        let governing = assessment.governing.expect("governing finding");
        assert_eq!(governing.kind, DamageKind::Tear);
        assert_eq!(governing.damage_type, "Tear or paper loss (Front Top edge)");
    }

    #[test]
    fn negated_wording_does_not_trigger() {
        let defects = DefectReport::default().with_corner(
            Side::Front,
            CornerLocation::TopLeft,
            DefectObservation::new("minor", "No creases, no tears, not bent"),
        );
        assert!(classify(defects).findings.is_empty());
    }

    #[test]
    fn negation_does_not_carry_across_clauses() {
        let torn = DefectReport::default().with_edge(
            Side::Front,
            EdgeLocation::Top,
            DefectObservation::new("moderate", "No whitening, small tear at top edge"),
        );
        let bent = DefectReport::default().with_corner(
            Side::Front,
            CornerLocation::TopRight,
            DefectObservation::new("minor", "No creases, corner bent"),
        );

        let torn = classify(torn);
        assert!(torn.has_kind(DamageKind::Tear));
        assert_eq!(torn.grade_cap(), 3.0);

        let bent = classify(bent);
        assert!(bent.has_kind(DamageKind::Bend));
        assert_eq!(bent.grade_cap(), 4.0);
    }

    fn surface_note(description: &str) -> DefectReport {
        DefectReport::default().with_surface(
            Side::Front,
            SurfaceKind::Other,
            DefectObservation::new("moderate", description),
        )
    }

    #[test]
    fn core_exposure_reaches_tier_two() {
        for description in ["core exposed at the tip", "white core showing through"] {
            let assessment = classify(surface_note(description));
            assert!(assessment.has_kind(DamageKind::CoreExposure), "{description}");
            assert_eq!(assessment.grade_cap(), 5.0);
        }
        assert!(classify(surface_note("no exposed core")).findings.is_empty());
    }

    #[test]
    fn coating_breach_reaches_tier_two() {
        let assessment = classify(surface_note("deep scratch through coating"));
        let governing = assessment.governing.expect("coating breach");
        assert_eq!(governing.tier, 2);
        assert_eq!(governing.kind, DamageKind::CoatingBreach);
        assert_eq!(governing.grade_cap, 5.0);

        assert!(classify(surface_note("no deep scratches")).findings.is_empty());
    }

    #[test]
    fn coating_loss_reaches_tier_two() {
        let assessment = classify(surface_note("ink loss along the border"));
        assert!(assessment.has_kind(DamageKind::CoatingLoss));
        assert_eq!(assessment.grade_cap(), 5.0);
        assert_eq!(classify(surface_note("minor delamination")).grade_cap(), 5.0);

        assert!(classify(surface_note("without any delamination"))
            .findings
            .is_empty());
    }

    #[test]
    fn extensive_chipping_wording_reaches_tier_three() {
        let edge = |description: &str| {
            DefectReport::default().with_edge(
                Side::Back,
                EdgeLocation::Bottom,
                DefectObservation::new("moderate", description),
            )
        };

        let assessment = classify(edge("extensive chipping on bottom edge"));
        let governing = assessment.governing.expect("chipping finding");
        assert_eq!(governing.tier, 3);
        assert_eq!(governing.kind, DamageKind::ExtensiveChipping);
        assert_eq!(governing.grade_cap, 5.5);

        assert!(classify(edge("no extensive chipping")).findings.is_empty());
    }

    #[test]
    fn heavy_defects_in_three_categories_reach_tier_four() {
        let defects = DefectReport::default()
            .with_corner(Side::Front, CornerLocation::TopLeft, DefectObservation::new("heavy", ""))
            .with_edge(Side::Front, EdgeLocation::Left, DefectObservation::new("heavy", ""))
            .with_surface(Side::Front, SurfaceKind::Stains, DefectObservation::new("heavy", ""));

        let assessment = classify(defects);

        assert!(assessment.has_kind(DamageKind::HeavyAcrossCategories));
        assert!(!assessment.has_kind(DamageKind::HeavyDefectCount));
        assert!(!assessment.has_kind(DamageKind::HeavyBothSides));
        assert_eq!(assessment.grade_cap(), 6.0);
    }

    #[test]
    fn heavy_defects_in_two_categories_stay_below_tier_four() {
        let defects = DefectReport::default()
            .with_corner(Side::Front, CornerLocation::TopLeft, DefectObservation::new("heavy", ""))
            .with_edge(Side::Front, EdgeLocation::Left, DefectObservation::new("heavy", ""))
            .with_edge(Side::Front, EdgeLocation::Right, DefectObservation::new("moderate", ""));

        assert!(classify(defects).findings.is_empty());
    }

    #[test]
    fn four_heavy_defects_reach_tier_four() {
        let defects = DefectReport::default()
            .with_corner(Side::Front, CornerLocation::TopLeft, DefectObservation::new("heavy", ""))
            .with_edge(Side::Front, EdgeLocation::Top, DefectObservation::new("heavy", ""))
            .with_edge(Side::Front, EdgeLocation::Bottom, DefectObservation::new("heavy", ""))
            .with_edge(Side::Front, EdgeLocation::Left, DefectObservation::new("heavy", ""));

        let assessment = classify(defects);

        let kinds: Vec<DamageKind> = assessment.findings.iter().map(|finding| finding.kind).collect();
        assert_eq!(kinds, vec![DamageKind::HeavyDefectCount]);
        assert_eq!(assessment.grade_cap(), 6.0);
    }

    #[test]
    fn three_heavy_defects_stay_below_count_threshold() {
        let defects = DefectReport::default()
            .with_edge(Side::Front, EdgeLocation::Top, DefectObservation::new("heavy", ""))
            .with_edge(Side::Front, EdgeLocation::Bottom, DefectObservation::new("heavy", ""))
            .with_edge(Side::Front, EdgeLocation::Left, DefectObservation::new("heavy", ""));

        assert!(!classify(defects).has_kind(DamageKind::HeavyDefectCount));
    }

    #[test]
    fn every_rule_is_built() {
        let classifier = SevereDamageClassifier::new(&SevereDamageRubric::default());
        assert_eq!(classifier.rules.len(), 13);
    }

    #[test]
    fn chipping_percentage_and_fiber_size_reach_tier_three() {
        let chipping = DefectReport::default().with_edge(
            Side::Back,
            EdgeLocation::Bottom,
            DefectObservation::new("moderate", "Chipping along roughly 30% of the edge"),
        );
        let fiber = DefectReport::default().with_corner(
            Side::Front,
            CornerLocation::BottomLeft,
            DefectObservation {
                severity: Some("moderate".to_string()),
                description: Some("white fiber visible at tip".to_string()),
                size_mm: Some(0.6),
            },
        );
        let small_fiber = DefectReport::default().with_corner(
            Side::Front,
            CornerLocation::BottomLeft,
            DefectObservation::new("minor", "fiber visible, ~0.2mm"),
        );

        assert_eq!(classify(chipping).grade_cap(), 5.5);
        assert_eq!(classify(fiber).grade_cap(), 5.5);
        assert!(classify(small_fiber).findings.is_empty());
    }

    #[test]
    fn three_heavy_corners_reach_tier_three() {
        let defects = DefectReport::default()
            .with_corner(Side::Front, CornerLocation::TopLeft, DefectObservation::new("heavy", ""))
            .with_corner(Side::Front, CornerLocation::TopRight, DefectObservation::new("heavy", ""))
            .with_corner(
                Side::Front,
                CornerLocation::BottomLeft,
                DefectObservation::new("moderate", "heavily rounded tip"),
            );

        let assessment = classify(defects);

        assert!(assessment.has_kind(DamageKind::HeavyCorners));
        assert_eq!(assessment.grade_cap(), 5.5);
    }

    #[test]
    fn heavy_defects_on_both_sides_reach_tier_four() {
        let defects = DefectReport::default()
            .with_edge(Side::Front, EdgeLocation::Left, DefectObservation::new("heavy", ""))
            .with_surface(Side::Back, SurfaceKind::Stains, DefectObservation::new("heavy", ""));

        let assessment = classify(defects);

        assert!(assessment.has_kind(DamageKind::HeavyBothSides));
        assert!(!assessment.has_kind(DamageKind::HeavyDefectCount));
        assert_eq!(assessment.grade_cap(), 6.0);
    }

    #[test]
    fn equal_caps_are_joined() {
        let defects = DefectReport::default()
            .with_surface(Side::Front, SurfaceKind::Creases, DefectObservation::new("minor", ""))
            .with_surface(
                Side::Front,
                SurfaceKind::Other,
                DefectObservation::new("moderate", "card is warped"),
            );

        let governing = classify(defects).governing.expect("governing");

        assert_eq!(governing.grade_cap, 4.0);
        assert_eq!(
            governing.damage_type,
            "Crease detected (Front surface); Bent/folded/warped card (Front surface other)"
        );
    }
}
