use axum::response::Response;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

use crate::grading::{
    CardAssessment, CenteringMeasurement, CornerLocation, DefectObservation, DefectReport,
    EdgeLocation, GradingConfig, GradingEngine, Side, SurfaceKind,
};

const SEVERITIES: [&str; 5] = ["none", "minor", "moderate", "heavy", "unclear"];

const DESCRIPTIONS: [&str; 10] = [
    "",
    "light whitening",
    "no creases or tears",
    "small tear near border",
    "corner bent upward",
    "white fiber visible 0.7mm",
    "chipping along 30% of edge",
    "one hairline scratch",
    "several print dots",
    "heavily worn tip",
];

pub(super) fn engine() -> GradingEngine {
    GradingEngine::new(GradingConfig::default())
}

pub(super) fn centered(defects: DefectReport) -> CardAssessment {
    CardAssessment::new(defects, CenteringMeasurement::uniform("50/50"))
}

/// Every slot on both sides explicitly reported with severity "none".
pub(super) fn pristine_report() -> DefectReport {
    let none = || DefectObservation::new("none", "");
    let mut report = DefectReport::default();
    for side in Side::ALL {
        for location in CornerLocation::ALL {
            report = report.with_corner(side, location, none());
        }
        for location in EdgeLocation::ALL {
            report = report.with_edge(side, location, none());
        }
        for kind in SurfaceKind::ALL {
            report = report.with_surface(side, kind, none());
        }
    }
    report
}

pub(super) fn random_observation(rng: &mut StdRng) -> DefectObservation {
    let severity = SEVERITIES.choose(rng).copied().unwrap_or("none");
    let description = if rng.gen_bool(0.3) {
        DESCRIPTIONS.choose(rng).copied().unwrap_or("")
    } else {
        ""
    };
    DefectObservation::new(severity, description)
}

pub(super) fn random_assessment(rng: &mut StdRng) -> CardAssessment {
    let mut report = DefectReport::default();
    for side in Side::ALL {
        for location in CornerLocation::ALL {
            report = report.with_corner(side, location, random_observation(rng));
        }
        for location in EdgeLocation::ALL {
            report = report.with_edge(side, location, random_observation(rng));
        }
        for kind in SurfaceKind::ALL {
            report = report.with_surface(side, kind, random_observation(rng));
        }
    }

    let ratio = |rng: &mut StdRng| {
        let larger = rng.gen_range(50..=90);
        format!("{larger}/{}", 100 - larger)
    };
    let centering = CenteringMeasurement {
        front_left_right_ratio_text: Some(ratio(rng)),
        front_top_bottom_ratio_text: Some(ratio(rng)),
        back_left_right_ratio_text: Some(ratio(rng)),
        back_top_bottom_ratio_text: Some(ratio(rng)),
        worst_axis: None,
        worst_ratio: None,
    };
    CardAssessment::new(report, centering)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
