use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::domain::{CornerLocation, EdgeLocation, Severity, Side, SurfaceKind};
use super::normalizer::{NormalizedObservation, NormalizedReport};
use super::rubric::{CountedScale, LocationRubric, SeverityScale, SurfaceRubric};
use super::text::cached;

/// Capped deduction total for one category plus the audit lines explaining it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDeduction {
    pub deductions: f64,
    pub details: Vec<String>,
}

impl CategoryDeduction {
    fn add(&mut self, amount: f64, detail: String) {
        self.deductions += amount;
        self.details.push(detail);
    }

    /// Clamps the total into `[0, cap]`, noting any truncation.
    pub(crate) fn apply_cap(&mut self, category: &str, cap: f64) {
        let cap = cap.max(0.0);
        if self.deductions > cap {
            self.details.push(format!(
                "{category} deductions capped at -{cap:.1} (was -{:.2})",
                self.deductions
            ));
            self.deductions = cap;
        }
        if self.deductions.is_nan() || self.deductions < 0.0 {
            self.deductions = 0.0;
        }
    }

    pub fn has_deduction(&self) -> bool {
        self.deductions > 0.0
    }
}

pub fn corner_deductions(report: &NormalizedReport, rubric: &LocationRubric) -> CategoryDeduction {
    let mut result = CategoryDeduction::default();
    for side in Side::ALL {
        for location in CornerLocation::ALL {
            let observation = report.side(side).corner(location);
            let wording = match observation.severity {
                Severity::None => continue,
                Severity::Minor => "Minor whitening",
                Severity::Moderate => "Moderate whitening",
                Severity::Heavy => "Heavy wear",
            };
            let amount = rubric.scale.amount(observation.severity);
            result.add(
                amount,
                format!("{} {}: {wording} (-{amount:.2})", side.label(), location.label()),
            );
        }
    }
    result.apply_cap("Corner", rubric.cap);
    result
}

pub fn edge_deductions(report: &NormalizedReport, rubric: &LocationRubric) -> CategoryDeduction {
    let mut result = CategoryDeduction::default();
    for side in Side::ALL {
        for location in EdgeLocation::ALL {
            let observation = report.side(side).edge(location);
            let wording = match observation.severity {
                Severity::None => continue,
                Severity::Minor => "Minor roughness",
                Severity::Moderate => "Moderate chipping/dots",
                Severity::Heavy => "Heavy wear",
            };
            let amount = rubric.scale.amount(observation.severity);
            result.add(
                amount,
                format!(
                    "{} {} Edge: {wording} (-{amount:.2})",
                    side.label(),
                    location.label()
                ),
            );
        }
    }
    result.apply_cap("Edge", rubric.cap);
    result
}

/// Surface deductions per kind. Creases are listed but never deducted here; they are
/// handled by the severe damage classifier.
pub fn surface_deductions(report: &NormalizedReport, rubric: &SurfaceRubric) -> CategoryDeduction {
    let mut result = CategoryDeduction::default();
    for side in Side::ALL {
        let surface = report.side(side);
        let label = side.label();

        scratches(&mut result, label, surface.surface(SurfaceKind::Scratches), &rubric.scratches);
        print_defects(
            &mut result,
            label,
            surface.surface(SurfaceKind::PrintDefects),
            &rubric.print_defects,
        );
        if surface.surface(SurfaceKind::Creases).severity.is_defect() {
            result
                .details
                .push(format!("{label}: CREASE DETECTED (handled by structural damage cap)"));
        }
        flat(
            &mut result,
            label,
            surface.surface(SurfaceKind::Stains),
            &rubric.stains,
            ["Minor stain/discoloration", "Moderate stain", "Heavy stain"],
        );
        flat(
            &mut result,
            label,
            surface.surface(SurfaceKind::Other),
            &rubric.other,
            [
                "Other minor surface issue",
                "Other moderate surface issue",
                "Other heavy surface issue",
            ],
        );
    }
    result.apply_cap("Surface", rubric.cap);
    result
}

fn scratches(
    result: &mut CategoryDeduction,
    side: &str,
    observation: &NormalizedObservation,
    scale: &CountedScale,
) {
    let (amount, wording) = match observation.severity {
        Severity::None => return,
        Severity::Minor => match hairline_count(&observation.description) {
            Count::Single => (scale.minor_single, "1 hairline scratch"),
            Count::Few => (scale.minor_few, "2-3 hairline scratches"),
            Count::Unspecified => (scale.minor_unspecified, "Minor scratch"),
        },
        Severity::Moderate => (scale.moderate, "Moderate scratches"),
        Severity::Heavy => (scale.heavy, "Heavy scratches"),
    };
    result.add(amount, format!("{side}: {wording} (-{amount:.2})"));
}

fn print_defects(
    result: &mut CategoryDeduction,
    side: &str,
    observation: &NormalizedObservation,
    scale: &CountedScale,
) {
    let (amount, wording) = match observation.severity {
        Severity::None => return,
        Severity::Minor => match print_dot_count(&observation.description) {
            Count::Single => (scale.minor_single, "1-3 print dots"),
            Count::Few => (scale.minor_few, "4-10 print dots"),
            Count::Unspecified => (scale.minor_unspecified, "Minor print defects"),
        },
        Severity::Moderate => (scale.moderate, "10+ print dots"),
        Severity::Heavy => (scale.heavy, "Heavy print defects"),
    };
    result.add(amount, format!("{side}: {wording} (-{amount:.2})"));
}

fn flat(
    result: &mut CategoryDeduction,
    side: &str,
    observation: &NormalizedObservation,
    scale: &SeverityScale,
    wording: [&str; 3],
) {
    let wording = match observation.severity {
        Severity::None => return,
        Severity::Minor => wording[0],
        Severity::Moderate => wording[1],
        Severity::Heavy => wording[2],
    };
    let amount = scale.amount(observation.severity);
    result.add(amount, format!("{side}: {wording} (-{amount:.2})"));
}

#[derive(Debug, PartialEq, Eq)]
enum Count {
    Single,
    Few,
    Unspecified,
}

fn hairline_count(description: &str) -> Count {
    static SINGLE: OnceLock<Regex> = OnceLock::new();
    static FEW: OnceLock<Regex> = OnceLock::new();
    classify_count(
        description,
        cached(&SINGLE, r"(?i)\b(1|one|single)\b"),
        cached(&FEW, r"(?i)\b(2\s*-\s*3|2|3|two|three|few|couple)\b"),
    )
}

fn print_dot_count(description: &str) -> Count {
    static SINGLE: OnceLock<Regex> = OnceLock::new();
    static FEW: OnceLock<Regex> = OnceLock::new();
    classify_count(
        description,
        cached(&SINGLE, r"(?i)\b(1|one|single)\b"),
        cached(&FEW, r"(?i)\b[4-9]\b|\b(few|several)\b"),
    )
}

fn classify_count(description: &str, single: &Regex, few: &Regex) -> Count {
    if single.is_match(description) {
        Count::Single
    } else if few.is_match(description) {
        Count::Few
    } else {
        Count::Unspecified
    }
}
