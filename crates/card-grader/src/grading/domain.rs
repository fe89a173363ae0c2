use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use super::subgrades::SubScores;

/// Qualitative defect intensity reported by the vision pass.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Minor,
    Moderate,
    Heavy,
}

impl Severity {
    /// Parses a raw severity string. Unrecognized values yield `None` so callers can
    /// ignore them instead of rejecting the report.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "minor" => Some(Self::Minor),
            "moderate" => Some(Self::Moderate),
            "heavy" => Some(Self::Heavy),
            _ => None,
        }
    }

    pub fn is_defect(self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Minor => "Minor",
            Self::Moderate => "Moderate",
            Self::Heavy => "Heavy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Front, Side::Back];

    pub fn label(self) -> &'static str {
        match self {
            Side::Front => "Front",
            Side::Back => "Back",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerLocation {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CornerLocation {
    pub const ALL: [CornerLocation; 4] = [
        CornerLocation::TopLeft,
        CornerLocation::TopRight,
        CornerLocation::BottomLeft,
        CornerLocation::BottomRight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CornerLocation::TopLeft => "Top-Left",
            CornerLocation::TopRight => "Top-Right",
            CornerLocation::BottomLeft => "Bottom-Left",
            CornerLocation::BottomRight => "Bottom-Right",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeLocation {
    Top,
    Bottom,
    Left,
    Right,
}

impl EdgeLocation {
    pub const ALL: [EdgeLocation; 4] = [
        EdgeLocation::Top,
        EdgeLocation::Bottom,
        EdgeLocation::Left,
        EdgeLocation::Right,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EdgeLocation::Top => "Top",
            EdgeLocation::Bottom => "Bottom",
            EdgeLocation::Left => "Left",
            EdgeLocation::Right => "Right",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Scratches,
    Creases,
    PrintDefects,
    Stains,
    Other,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 5] = [
        SurfaceKind::Scratches,
        SurfaceKind::Creases,
        SurfaceKind::PrintDefects,
        SurfaceKind::Stains,
        SurfaceKind::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SurfaceKind::Scratches => "scratches",
            SurfaceKind::Creases => "creases",
            SurfaceKind::PrintDefects => "print defects",
            SurfaceKind::Stains => "stains",
            SurfaceKind::Other => "other",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// The four deduction categories of the rubric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectCategory {
    Corners,
    Edges,
    Surface,
    Centering,
}

impl DefectCategory {
    pub fn label(self) -> &'static str {
        match self {
            DefectCategory::Corners => "Corners",
            DefectCategory::Edges => "Edges",
            DefectCategory::Surface => "Surface",
            DefectCategory::Centering => "Centering",
        }
    }
}

/// A single observation as emitted upstream. Every field is optional and tolerant of
/// the wrong JSON type; normalization turns it into a fully populated record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectObservation {
    #[serde(default, deserialize_with = "lenient")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub size_mm: Option<f64>,
}

impl DefectObservation {
    pub fn new(severity: &str, description: &str) -> Self {
        Self {
            severity: Some(severity.to_string()),
            description: Some(description.to_string()),
            size_mm: None,
        }
    }

    /// Severity if it is one of the recognized values.
    pub fn recognized_severity(&self) -> Option<Severity> {
        self.severity.as_deref().and_then(Severity::parse)
    }

    pub fn has_defect(&self) -> bool {
        self.recognized_severity()
            .map(Severity::is_defect)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerObservations {
    #[serde(default, deserialize_with = "lenient")]
    pub top_left: Option<DefectObservation>,
    #[serde(default, deserialize_with = "lenient")]
    pub top_right: Option<DefectObservation>,
    #[serde(default, deserialize_with = "lenient")]
    pub bottom_left: Option<DefectObservation>,
    #[serde(default, deserialize_with = "lenient")]
    pub bottom_right: Option<DefectObservation>,
}

impl CornerObservations {
    pub fn get(&self, location: CornerLocation) -> Option<&DefectObservation> {
        match location {
            CornerLocation::TopLeft => self.top_left.as_ref(),
            CornerLocation::TopRight => self.top_right.as_ref(),
            CornerLocation::BottomLeft => self.bottom_left.as_ref(),
            CornerLocation::BottomRight => self.bottom_right.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, location: CornerLocation) -> &mut Option<DefectObservation> {
        match location {
            CornerLocation::TopLeft => &mut self.top_left,
            CornerLocation::TopRight => &mut self.top_right,
            CornerLocation::BottomLeft => &mut self.bottom_left,
            CornerLocation::BottomRight => &mut self.bottom_right,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeObservations {
    #[serde(default, deserialize_with = "lenient")]
    pub top: Option<DefectObservation>,
    #[serde(default, deserialize_with = "lenient")]
    pub bottom: Option<DefectObservation>,
    #[serde(default, deserialize_with = "lenient")]
    pub left: Option<DefectObservation>,
    #[serde(default, deserialize_with = "lenient")]
    pub right: Option<DefectObservation>,
}

impl EdgeObservations {
    pub fn get(&self, location: EdgeLocation) -> Option<&DefectObservation> {
        match location {
            EdgeLocation::Top => self.top.as_ref(),
            EdgeLocation::Bottom => self.bottom.as_ref(),
            EdgeLocation::Left => self.left.as_ref(),
            EdgeLocation::Right => self.right.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, location: EdgeLocation) -> &mut Option<DefectObservation> {
        match location {
            EdgeLocation::Top => &mut self.top,
            EdgeLocation::Bottom => &mut self.bottom,
            EdgeLocation::Left => &mut self.left,
            EdgeLocation::Right => &mut self.right,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceObservations {
    #[serde(default, deserialize_with = "lenient")]
    pub scratches: Option<DefectObservation>,
    #[serde(default, deserialize_with = "lenient")]
    pub creases: Option<DefectObservation>,
    #[serde(default, deserialize_with = "lenient")]
    pub print_defects: Option<DefectObservation>,
    #[serde(default, deserialize_with = "lenient")]
    pub stains: Option<DefectObservation>,
    #[serde(default, deserialize_with = "lenient")]
    pub other: Option<DefectObservation>,
}

impl SurfaceObservations {
    pub fn get(&self, kind: SurfaceKind) -> Option<&DefectObservation> {
        match kind {
            SurfaceKind::Scratches => self.scratches.as_ref(),
            SurfaceKind::Creases => self.creases.as_ref(),
            SurfaceKind::PrintDefects => self.print_defects.as_ref(),
            SurfaceKind::Stains => self.stains.as_ref(),
            SurfaceKind::Other => self.other.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, kind: SurfaceKind) -> &mut Option<DefectObservation> {
        match kind {
            SurfaceKind::Scratches => &mut self.scratches,
            SurfaceKind::Creases => &mut self.creases,
            SurfaceKind::PrintDefects => &mut self.print_defects,
            SurfaceKind::Stains => &mut self.stains,
            SurfaceKind::Other => &mut self.other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideDefects {
    #[serde(default, deserialize_with = "lenient")]
    pub corners: Option<CornerObservations>,
    #[serde(default, deserialize_with = "lenient")]
    pub edges: Option<EdgeObservations>,
    #[serde(default, deserialize_with = "lenient")]
    pub surface: Option<SurfaceObservations>,
}

impl SideDefects {
    pub fn corner(&self, location: CornerLocation) -> Option<&DefectObservation> {
        self.corners.as_ref().and_then(|corners| corners.get(location))
    }

    pub fn edge(&self, location: EdgeLocation) -> Option<&DefectObservation> {
        self.edges.as_ref().and_then(|edges| edges.get(location))
    }

    pub fn surface(&self, kind: SurfaceKind) -> Option<&DefectObservation> {
        self.surface.as_ref().and_then(|surface| surface.get(kind))
    }
}

/// Per-side corner, edge and surface observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectReport {
    #[serde(default, deserialize_with = "lenient")]
    pub front: Option<SideDefects>,
    #[serde(default, deserialize_with = "lenient")]
    pub back: Option<SideDefects>,
}

impl DefectReport {
    pub fn side(&self, side: Side) -> Option<&SideDefects> {
        match side {
            Side::Front => self.front.as_ref(),
            Side::Back => self.back.as_ref(),
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideDefects {
        let slot = match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
        };
        slot.get_or_insert_with(SideDefects::default)
    }

    /// Sets a corner observation, creating intermediate records as needed.
    pub fn with_corner(
        mut self,
        side: Side,
        location: CornerLocation,
        observation: DefectObservation,
    ) -> Self {
        let corners = self
            .side_mut(side)
            .corners
            .get_or_insert_with(CornerObservations::default);
        *corners.slot_mut(location) = Some(observation);
        self
    }

    pub fn with_edge(
        mut self,
        side: Side,
        location: EdgeLocation,
        observation: DefectObservation,
    ) -> Self {
        let edges = self
            .side_mut(side)
            .edges
            .get_or_insert_with(EdgeObservations::default);
        *edges.slot_mut(location) = Some(observation);
        self
    }

    pub fn with_surface(
        mut self,
        side: Side,
        kind: SurfaceKind,
        observation: DefectObservation,
    ) -> Self {
        let surface = self
            .side_mut(side)
            .surface
            .get_or_insert_with(SurfaceObservations::default);
        *surface.slot_mut(kind) = Some(observation);
        self
    }
}

/// Centering ratios as text ("55/45") or qualitative descriptors per side and axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CenteringMeasurement {
    #[serde(default, deserialize_with = "lenient")]
    pub front_left_right_ratio_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub front_top_bottom_ratio_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub back_left_right_ratio_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub back_top_bottom_ratio_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub worst_axis: Option<String>,
    #[serde(default, alias = "worst_ratio_value", deserialize_with = "lenient")]
    pub worst_ratio: Option<String>,
}

impl CenteringMeasurement {
    pub fn uniform(ratio: &str) -> Self {
        Self {
            front_left_right_ratio_text: Some(ratio.to_string()),
            front_top_bottom_ratio_text: Some(ratio.to_string()),
            back_left_right_ratio_text: Some(ratio.to_string()),
            back_top_bottom_ratio_text: Some(ratio.to_string()),
            worst_axis: None,
            worst_ratio: None,
        }
    }
}

/// Pass/fail gates reported by an alternate upstream path. Only an explicit `false`
/// counts as a failed gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateChecks {
    #[serde(default, deserialize_with = "lenient")]
    pub corners8_pass: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub edges4_pass: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub centering_two_axis_pass: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub cross_side_pass: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub image_quality_sufficient: Option<bool>,
}

/// Micro-defect counters; absent counters read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MicroFindings {
    #[serde(default, deserialize_with = "lenient")]
    pub corner_whitening_mm_sum_front: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub corner_whitening_mm_sum_back: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub edge_chips_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub edge_whitening_dots_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub hairline_count_front: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub hairline_count_back: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub print_dots_count_front: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub print_dots_count_back: Option<f64>,
}

/// Everything the upstream vision pass hands to the grading engine for one card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardAssessment {
    #[serde(default, deserialize_with = "lenient")]
    pub defects: Option<DefectReport>,
    #[serde(default, deserialize_with = "lenient")]
    pub centering: Option<CenteringMeasurement>,
    #[serde(
        default,
        rename = "perfect_gate_checks",
        alias = "gate_checks",
        deserialize_with = "lenient"
    )]
    pub gate_checks: Option<GateChecks>,
    #[serde(
        default,
        rename = "micro_findings_summary",
        alias = "micro_findings",
        deserialize_with = "lenient"
    )]
    pub micro_findings: Option<MicroFindings>,
    #[serde(default, deserialize_with = "lenient")]
    pub sub_scores: Option<SubScores>,
}

impl CardAssessment {
    pub fn new(defects: DefectReport, centering: CenteringMeasurement) -> Self {
        Self {
            defects: Some(defects),
            centering: Some(centering),
            ..Self::default()
        }
    }

    /// Builds an assessment from arbitrary JSON. A document of the wrong shape degrades
    /// to an empty assessment instead of failing.
    pub fn from_json_value(value: Value) -> Self {
        if value.is_null() {
            return Self::default();
        }
        match serde_json::from_value(value) {
            Ok(assessment) => assessment,
            Err(err) => {
                warn!(error = %err, "assessment document has unexpected shape, grading as empty");
                Self::default()
            }
        }
    }

    pub fn side(&self, side: Side) -> Option<&SideDefects> {
        self.defects.as_ref().and_then(|defects| defects.side(side))
    }
}

/// Accepts any JSON value for an optional field; values that do not fit `T` are
/// logged and treated as absent.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value::<T>(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            warn!(error = %err, "ignoring malformed assessment field");
            Ok(None)
        }
    }
}
