use serde::{Deserialize, Serialize};

use super::domain::Severity;

/// Deduction per severity level for a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityScale {
    pub minor: f64,
    pub moderate: f64,
    pub heavy: f64,
}

impl SeverityScale {
    pub fn amount(&self, severity: Severity) -> f64 {
        match severity {
            Severity::None => 0.0,
            Severity::Minor => self.minor,
            Severity::Moderate => self.moderate,
            Severity::Heavy => self.heavy,
        }
    }
}

impl Default for SeverityScale {
    fn default() -> Self {
        Self {
            minor: 0.25,
            moderate: 0.50,
            heavy: 1.00,
        }
    }
}

/// Location-based category (corners, edges): per-location severity amounts with a
/// ceiling on the category total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRubric {
    pub scale: SeverityScale,
    pub cap: f64,
}

impl LocationRubric {
    fn with_cap(cap: f64) -> Self {
        Self {
            scale: SeverityScale::default(),
            cap,
        }
    }
}

impl Default for LocationRubric {
    fn default() -> Self {
        Self::with_cap(3.0)
    }
}

/// Surface kinds whose minor deduction depends on how many instances the description
/// mentions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountedScale {
    pub minor_single: f64,
    pub minor_few: f64,
    pub minor_unspecified: f64,
    pub moderate: f64,
    pub heavy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceRubric {
    pub scratches: CountedScale,
    pub print_defects: CountedScale,
    pub stains: SeverityScale,
    pub other: SeverityScale,
    pub cap: f64,
}

impl Default for SurfaceRubric {
    fn default() -> Self {
        Self {
            scratches: CountedScale {
                minor_single: 0.1,
                minor_few: 0.25,
                minor_unspecified: 0.1,
                moderate: 0.5,
                heavy: 0.75,
            },
            print_defects: CountedScale {
                minor_single: 0.1,
                minor_few: 0.25,
                minor_unspecified: 0.1,
                moderate: 0.5,
                heavy: 0.5,
            },
            stains: SeverityScale::default(),
            other: SeverityScale::default(),
            cap: 2.5,
        }
    }
}

/// Upper bound (inclusive) on the larger margin percentage and the deduction it earns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenteringBand {
    pub max_percent: f64,
    pub deduction: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenteringRubric {
    /// Ordered from best to worst.
    pub bands: Vec<CenteringBand>,
    pub beyond_bands: f64,
    pub cap: f64,
}

impl Default for CenteringRubric {
    fn default() -> Self {
        let band = |max_percent: f64, deduction: f64, label: &str| CenteringBand {
            max_percent,
            deduction,
            label: label.to_string(),
        };
        Self {
            bands: vec![
                band(55.0, 0.0, "excellent"),
                band(60.0, 0.25, "slightly off"),
                band(70.0, 0.5, "noticeably off"),
                band(75.0, 0.75, "heavily off"),
            ],
            beyond_bands: 1.0,
            cap: 1.0,
        }
    }
}

/// Grade caps and detection thresholds for the severe damage tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SevereDamageRubric {
    pub crease_cap: f64,
    pub tear_cap: f64,
    pub bend_cap: f64,
    pub tier2_cap: f64,
    pub tier3_cap: f64,
    pub tier4_cap: f64,
    pub chipping_percent_threshold: f64,
    pub fiber_exposure_mm_threshold: f64,
    pub heavy_corner_threshold: usize,
    pub heavy_category_threshold: usize,
    pub heavy_defect_threshold: usize,
}

impl Default for SevereDamageRubric {
    fn default() -> Self {
        Self {
            crease_cap: 4.0,
            tear_cap: 3.0,
            bend_cap: 4.0,
            tier2_cap: 5.0,
            tier3_cap: 5.5,
            tier4_cap: 6.0,
            chipping_percent_threshold: 25.0,
            fiber_exposure_mm_threshold: 0.5,
            heavy_corner_threshold: 3,
            heavy_category_threshold: 3,
            heavy_defect_threshold: 4,
        }
    }
}

/// Extra deduction once defects span at least `min_categories` categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativePenaltyRule {
    pub min_categories: usize,
    pub penalty: f64,
}

/// Complete set of numbers driving the deterministic scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRubric {
    pub base_score: f64,
    pub corners: LocationRubric,
    pub edges: LocationRubric,
    pub surface: SurfaceRubric,
    pub centering: CenteringRubric,
    pub severe_damage: SevereDamageRubric,
    pub cumulative_penalties: Vec<CumulativePenaltyRule>,
}

impl Default for ScoringRubric {
    fn default() -> Self {
        Self {
            base_score: 10.0,
            corners: LocationRubric::with_cap(3.0),
            edges: LocationRubric::with_cap(2.5),
            surface: SurfaceRubric::default(),
            centering: CenteringRubric::default(),
            severe_damage: SevereDamageRubric::default(),
            cumulative_penalties: vec![
                CumulativePenaltyRule {
                    min_categories: 3,
                    penalty: 0.5,
                },
                CumulativePenaltyRule {
                    min_categories: 4,
                    penalty: 1.0,
                },
            ],
        }
    }
}
