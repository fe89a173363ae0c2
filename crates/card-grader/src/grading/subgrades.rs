use serde::{Deserialize, Serialize};
use tracing::debug;

use super::composer::ScoringBreakdown;
use super::domain::lenient;
use super::structural::DamageKind;

/// Ceiling for sub-scores in a category carrying structural damage.
pub const STRUCTURAL_SUB_SCORE_CAP: f64 = 4.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    #[serde(default, deserialize_with = "lenient")]
    pub front_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub back_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub weighted_score: Option<f64>,
}

impl SubScore {
    pub fn new(front: f64, back: f64, weighted: f64) -> Self {
        Self {
            front_score: Some(front),
            back_score: Some(back),
            weighted_score: Some(weighted),
        }
    }

    fn capped(&self, cap: f64) -> Self {
        let limit = |score: Option<f64>| score.map(|value| value.min(cap));
        Self {
            front_score: limit(self.front_score),
            back_score: limit(self.back_score),
            weighted_score: limit(self.weighted_score),
        }
    }
}

/// Per-category sub-scores supplied alongside an assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    #[serde(default, deserialize_with = "lenient")]
    pub centering: Option<SubScore>,
    #[serde(default, deserialize_with = "lenient")]
    pub corners: Option<SubScore>,
    #[serde(default, deserialize_with = "lenient")]
    pub edges: Option<SubScore>,
    #[serde(default, deserialize_with = "lenient")]
    pub surface: Option<SubScore>,
}

/// Caps surface sub-scores for a crease and corner sub-scores for a bent or folded
/// card. Centering and edges are returned unchanged.
pub fn adjust_for_structural_damage(
    sub_scores: &SubScores,
    breakdown: &ScoringBreakdown,
) -> SubScores {
    let mut adjusted = sub_scores.clone();
    if !breakdown.structural_damage {
        return adjusted;
    }

    let damage = &breakdown.severe_damage;
    if damage.has_kind(DamageKind::Crease) {
        if let Some(surface) = &sub_scores.surface {
            debug!("capping surface sub-scores for crease");
            adjusted.surface = Some(surface.capped(STRUCTURAL_SUB_SCORE_CAP));
        }
    }
    if damage.has_kind(DamageKind::Bend) {
        if let Some(corners) = &sub_scores.corners {
            debug!("capping corner sub-scores for bent or folded card");
            adjusted.corners = Some(corners.capped(STRUCTURAL_SUB_SCORE_CAP));
        }
    }
    adjusted
}
