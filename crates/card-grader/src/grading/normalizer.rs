use serde::Serialize;

use super::centering::{parse_ratio, CenteringRatio};
use super::domain::{
    CardAssessment, CornerLocation, DefectObservation, EdgeLocation, Severity, Side,
    SideDefects, SurfaceKind,
};

/// Observation with every field resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedObservation {
    pub severity: Severity,
    pub description: String,
    pub size_mm: Option<f64>,
}

impl NormalizedObservation {
    fn from_raw(raw: Option<&DefectObservation>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        Self {
            severity: raw.recognized_severity().unwrap_or_default(),
            description: raw
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            size_mm: raw.size_mm.filter(|size| size.is_finite() && *size >= 0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedSide {
    corners: [NormalizedObservation; 4],
    edges: [NormalizedObservation; 4],
    surface: [NormalizedObservation; 5],
}

impl NormalizedSide {
    fn from_raw(raw: Option<&SideDefects>) -> Self {
        let mut side = Self::default();
        if let Some(raw) = raw {
            for location in CornerLocation::ALL {
                side.corners[location.index()] =
                    NormalizedObservation::from_raw(raw.corner(location));
            }
            for location in EdgeLocation::ALL {
                side.edges[location.index()] = NormalizedObservation::from_raw(raw.edge(location));
            }
            for kind in SurfaceKind::ALL {
                side.surface[kind.index()] = NormalizedObservation::from_raw(raw.surface(kind));
            }
        }
        side
    }

    pub fn corner(&self, location: CornerLocation) -> &NormalizedObservation {
        &self.corners[location.index()]
    }

    pub fn edge(&self, location: EdgeLocation) -> &NormalizedObservation {
        &self.edges[location.index()]
    }

    pub fn surface(&self, kind: SurfaceKind) -> &NormalizedObservation {
        &self.surface[kind.index()]
    }
}

/// Which location inside a side an observation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Corner(CornerLocation),
    Edge(EdgeLocation),
    Surface(SurfaceKind),
}

impl Zone {
    pub fn label(self) -> String {
        match self {
            Zone::Corner(location) => format!("{} corner", location.label()),
            Zone::Edge(location) => format!("{} edge", location.label()),
            Zone::Surface(kind) => format!("surface {}", kind.label()),
        }
    }
}

/// All four centering ratios resolved to numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedCentering {
    pub front_left_right: CenteringRatio,
    pub front_top_bottom: CenteringRatio,
    pub back_left_right: CenteringRatio,
    pub back_top_bottom: CenteringRatio,
    pub worst_axis: Option<String>,
    pub worst_ratio: Option<String>,
    /// False when the assessment carried no centering block at all.
    pub reported: bool,
}

impl NormalizedCentering {
    /// Ratios in fixed order with their display names.
    pub fn axes(&self) -> [(&'static str, &CenteringRatio); 4] {
        [
            ("Front left/right", &self.front_left_right),
            ("Front top/bottom", &self.front_top_bottom),
            ("Back left/right", &self.back_left_right),
            ("Back top/bottom", &self.back_top_bottom),
        ]
    }
}

/// Fully populated view over a [`CardAssessment`]; calculators read only this.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedReport {
    pub front: NormalizedSide,
    pub back: NormalizedSide,
    pub centering: NormalizedCentering,
}

impl NormalizedReport {
    pub fn side(&self, side: Side) -> &NormalizedSide {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }

    /// Every observation in deterministic order: front before back, then corners,
    /// edges and surface kinds in their declared order.
    pub fn observations(&self) -> impl Iterator<Item = (Side, Zone, &NormalizedObservation)> {
        Side::ALL.into_iter().flat_map(move |side| {
            let normalized = self.side(side);
            let corners = CornerLocation::ALL
                .into_iter()
                .map(move |location| (side, Zone::Corner(location), normalized.corner(location)));
            let edges = EdgeLocation::ALL
                .into_iter()
                .map(move |location| (side, Zone::Edge(location), normalized.edge(location)));
            let surface = SurfaceKind::ALL
                .into_iter()
                .map(move |kind| (side, Zone::Surface(kind), normalized.surface(kind)));
            corners.chain(edges).chain(surface)
        })
    }
}

pub fn normalize(assessment: &CardAssessment) -> NormalizedReport {
    let centering = assessment.centering.as_ref();
    let ratio = |text: Option<&String>| parse_ratio(text.map(String::as_str));

    NormalizedReport {
        front: NormalizedSide::from_raw(assessment.side(Side::Front)),
        back: NormalizedSide::from_raw(assessment.side(Side::Back)),
        centering: NormalizedCentering {
            front_left_right: ratio(centering.and_then(|c| c.front_left_right_ratio_text.as_ref())),
            front_top_bottom: ratio(centering.and_then(|c| c.front_top_bottom_ratio_text.as_ref())),
            back_left_right: ratio(centering.and_then(|c| c.back_left_right_ratio_text.as_ref())),
            back_top_bottom: ratio(centering.and_then(|c| c.back_top_bottom_ratio_text.as_ref())),
            worst_axis: centering.and_then(|c| c.worst_axis.clone()),
            worst_ratio: centering.and_then(|c| c.worst_ratio.clone()),
            reported: centering.is_some(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::centering::RatioSource;
    use crate::grading::domain::{CenteringMeasurement, DefectReport};

    #[test]
    fn empty_assessment_normalizes_to_no_defects() {
        let report = normalize(&CardAssessment::default());

        assert!(report
            .observations()
            .all(|(_, _, observation)| observation.severity == Severity::None));
        assert_eq!(report.observations().count(), 26);
        assert!(!report.centering.reported);
        for (_, ratio) in report.centering.axes() {
            assert_eq!(ratio.larger_percent, 50.0);
            assert_eq!(ratio.source, RatioSource::Defaulted);
        }
    }

    #[test]
    fn unrecognized_severity_is_ignored() {
        let defects = DefectReport::default().with_corner(
            Side::Back,
            CornerLocation::BottomRight,
            DefectObservation::new("catastrophic", "  odd wording  "),
        );
        let report = normalize(&CardAssessment::new(
            defects,
            CenteringMeasurement::uniform("50/50"),
        ));

        let corner = report.back.corner(CornerLocation::BottomRight);
        assert_eq!(corner.severity, Severity::None);
        assert_eq!(corner.description, "odd wording");
    }

    #[test]
    fn observation_order_is_front_then_back() {
        let report = normalize(&CardAssessment::default());
        let zones: Vec<_> = report
            .observations()
            .map(|(side, zone, _)| (side, zone))
            .collect();

        assert_eq!(zones[0], (Side::Front, Zone::Corner(CornerLocation::TopLeft)));
        assert_eq!(zones[4], (Side::Front, Zone::Edge(EdgeLocation::Top)));
        assert_eq!(zones[8], (Side::Front, Zone::Surface(SurfaceKind::Scratches)));
        assert_eq!(zones[13], (Side::Back, Zone::Corner(CornerLocation::TopLeft)));
    }
}
