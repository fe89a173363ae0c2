use super::common::*;
use serde_json::json;

use crate::grading::{
    CardAssessment, CenteringMeasurement, CornerLocation, DamageKind, DefectObservation,
    DefectReport, EdgeLocation, Side, SubScore, SubScores, SurfaceKind,
};

#[test]
fn pristine_card_grades_ten() {
    let result = engine().grade(&centered(pristine_report()));

    assert_eq!(result.final_grade, 10);
    assert_eq!(result.breakdown.total_deductions, 0.0);
    assert_eq!(result.breakdown.calculated_grade, 10.0);
    assert!(!result.breakdown.structural_damage);
    assert!(!result.validation.cap_applied);
    assert!(result.validation.cap_reasons.is_empty());
}

#[test]
fn single_heavy_corner_grades_nine() {
    let defects = DefectReport::default().with_corner(
        Side::Front,
        CornerLocation::TopLeft,
        DefectObservation::new("heavy", ""),
    );

    let result = engine().grade(&centered(defects));
    let breakdown = &result.breakdown;

    assert_eq!(breakdown.categories.corners.deductions, 1.0);
    assert_eq!(breakdown.categories_with_defects, 1);
    assert_eq!(breakdown.cumulative_penalty, 0.0);
    assert_eq!(breakdown.calculated_grade, 9.0);
    assert_eq!(breakdown.final_grade, 9);
    assert_eq!(result.final_grade, 9);
}

#[test]
fn moderate_front_crease_grades_four() {
    let defects = DefectReport::default().with_surface(
        Side::Front,
        SurfaceKind::Creases,
        DefectObservation::new("moderate", ""),
    );

    let result = engine().grade(&centered(defects));

    assert!(result.breakdown.structural_damage);
    assert_eq!(result.breakdown.final_grade, 4);
    assert_eq!(result.final_grade, 4);
    assert!(result
        .breakdown
        .structural_damage_type
        .as_deref()
        .is_some_and(|damage| damage.starts_with("Crease detected")));
    assert!(!result.validation.cap_applied);
}

#[test]
fn half_point_in_every_category_grades_seven() {
    let defects = DefectReport::default()
        .with_corner(Side::Front, CornerLocation::TopLeft, DefectObservation::new("moderate", ""))
        .with_edge(Side::Back, EdgeLocation::Bottom, DefectObservation::new("moderate", ""))
        .with_surface(Side::Front, SurfaceKind::Scratches, DefectObservation::new("moderate", ""));
    let assessment = CardAssessment::new(defects, CenteringMeasurement::uniform("65/35"));

    let result = engine().grade(&assessment);
    let breakdown = &result.breakdown;

    for category in breakdown.categories.as_array() {
        assert_eq!(category.deductions, 0.5);
    }
    assert_eq!(breakdown.categories_with_defects, 4);
    assert_eq!(breakdown.cumulative_penalty, 1.0);
    assert_eq!(breakdown.total_deductions, 3.0);
    assert_eq!(breakdown.calculated_grade, 7.0);
    assert_eq!(result.final_grade, 7);
    assert!(breakdown
        .explanation
        .contains("Cumulative penalty (-1.0) applied for defects in 4 categories."));
}

#[test]
fn tier_one_beats_tier_three() {
    let defects = DefectReport::default()
        .with_edge(
            Side::Front,
            EdgeLocation::Top,
            DefectObservation::new("moderate", "chipping along 40% of edge"),
        )
        .with_edge(
            Side::Back,
            EdgeLocation::Left,
            DefectObservation::new("minor", "small tear at the edge"),
        );

    let result = engine().grade(&centered(defects));
    let severe = &result.breakdown.severe_damage;

    assert!(severe.has_kind(DamageKind::ChippingCoverage));
    assert!(severe.has_kind(DamageKind::Tear));
    assert_eq!(severe.governing.as_ref().map(|finding| finding.tier), Some(1));
    assert_eq!(result.final_grade, 3);
}

#[test]
fn tear_after_negated_clause_caps_grade() {
    let result = engine().grade_json(json!({
        "defects": {
            "front": {
                "edges": {
                    "top": { "severity": "moderate", "description": "No whitening, small tear at top edge" }
                }
            }
        }
    }));

    assert!(result.breakdown.structural_damage);
    assert!(result
        .breakdown
        .structural_damage_type
        .as_deref()
        .is_some_and(|damage| damage.starts_with("Tear or paper loss")));
    assert_eq!(result.final_grade, 3);
}

#[test]
fn unexpected_json_shapes_still_grade() {
    let result = engine().grade_json(json!({
        "defects": {
            "front": {
                "corners": { "top_left": { "severity": "HEAVY", "description": 12 } },
                "edges": [],
            },
            "back": "missing",
        },
        "centering": "unknown",
    }));

    assert_eq!(result.breakdown.categories.corners.deductions, 1.0);
    assert_eq!(result.breakdown.categories.centering.deductions, 0.0);
    assert_eq!(result.final_grade, 9);
}

#[test]
fn grade_adjusts_supplied_sub_scores() {
    let defects = DefectReport::default().with_surface(
        Side::Back,
        SurfaceKind::Creases,
        DefectObservation::new("minor", ""),
    );
    let mut assessment = centered(defects);
    assessment.sub_scores = Some(SubScores {
        surface: Some(SubScore::new(8.0, 8.0, 8.0)),
        ..SubScores::default()
    });

    let result = engine().grade(&assessment);

    let surface = result
        .sub_scores
        .and_then(|scores| scores.surface)
        .expect("surface sub-score");
    assert_eq!(surface.weighted_score, Some(4.0));
}

#[test]
fn validator_catches_what_composer_lets_through() {
    let defects = DefectReport::default()
        .with_corner(Side::Front, CornerLocation::TopLeft, DefectObservation::new("minor", ""))
        .with_edge(Side::Back, EdgeLocation::Top, DefectObservation::new("minor", ""));
    let assessment = centered(defects);

    let proposed = engine()
        .validate_proposed(Some(10.0), &assessment)
        .expect("validation result");

    assert_eq!(proposed.original_grade, 10);
    assert_eq!(proposed.capped_grade, 9);
    assert!(proposed.cap_applied);
    assert!(engine().validate_proposed(None, &assessment).is_none());
}
