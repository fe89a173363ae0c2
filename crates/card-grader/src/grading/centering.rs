use serde::{Deserialize, Serialize};

use super::categories::CategoryDeduction;
use super::normalizer::NormalizedReport;
use super::rubric::CenteringRubric;
use super::text::ratio_pair;

const CENTERED: f64 = 50.0;

/// How a ratio value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioSource {
    Measured,
    Qualitative,
    Defaulted,
}

/// A centering ratio reduced to the percentage held by the larger margin, so 55/45
/// becomes 55 and perfectly centered is 50.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenteringRatio {
    pub larger_percent: f64,
    pub source: RatioSource,
}

impl CenteringRatio {
    fn defaulted() -> Self {
        Self {
            larger_percent: CENTERED,
            source: RatioSource::Defaulted,
        }
    }
}

/// Resolves ratio text. Accepts "NN/MM" pairs (rescaled when they do not sum to 100)
/// and a few qualitative descriptors; anything else is treated as centered.
pub fn parse_ratio(text: Option<&str>) -> CenteringRatio {
    let Some(text) = text.map(str::trim).filter(|text| !text.is_empty()) else {
        return CenteringRatio::defaulted();
    };

    if let Some((first, second)) = ratio_pair(text) {
        let total = first + second;
        if total > 0.0 && total.is_finite() {
            return CenteringRatio {
                larger_percent: first.max(second) * 100.0 / total,
                source: RatioSource::Measured,
            };
        }
        return CenteringRatio::defaulted();
    }

    let lowered = text.to_lowercase();
    let qualitative = if lowered.contains("slightly") {
        Some(57.0)
    } else if lowered.contains("noticeably") {
        Some(65.0)
    } else if lowered.contains("centered") || lowered.contains("centred") {
        Some(CENTERED)
    } else {
        None
    };

    match qualitative {
        Some(larger_percent) => CenteringRatio {
            larger_percent,
            source: RatioSource::Qualitative,
        },
        None => CenteringRatio::defaulted(),
    }
}

/// Deduction from the worst of the four measured ratios.
pub fn centering_deductions(report: &NormalizedReport, rubric: &CenteringRubric) -> CategoryDeduction {
    let mut result = CategoryDeduction::default();
    let centering = &report.centering;

    if !centering.reported {
        result.details.push("No centering data available, treated as 50/50".to_string());
        return result;
    }

    for (axis, ratio) in centering.axes() {
        if ratio.source == RatioSource::Defaulted {
            result
                .details
                .push(format!("{axis} ratio unreadable, treated as 50/50"));
        }
    }

    let worst = centering
        .axes()
        .iter()
        .map(|(_, ratio)| ratio.larger_percent)
        .fold(CENTERED, f64::max);
    let display = format!("{:.0}/{:.0}", worst, 100.0 - worst);

    let band = rubric.bands.iter().find(|band| worst <= band.max_percent);
    let (amount, label) = match band {
        Some(band) => (band.deduction, band.label.as_str()),
        None => (rubric.beyond_bands, "extremely off"),
    };

    if amount > 0.0 {
        result.details.push(format!(
            "Centering {label} ({display}): -{amount:.2} points"
        ));
    } else {
        result
            .details
            .push(format!("Centering {label} ({display}): No deduction"));
    }
    if let (Some(axis), Some(ratio)) = (&centering.worst_axis, &centering.worst_ratio) {
        result
            .details
            .push(format!("Reported worst axis: {axis} at {ratio}"));
    }

    result.deductions = amount;
    result.apply_cap("Centering", rubric.cap);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::domain::{CardAssessment, CenteringMeasurement, DefectReport};
    use crate::grading::normalizer::normalize;

    fn deductions_for(measurement: CenteringMeasurement) -> CategoryDeduction {
        let report = normalize(&CardAssessment::new(DefectReport::default(), measurement));
        centering_deductions(&report, &CenteringRubric::default())
    }

    #[test]
    fn parses_numeric_and_qualitative_ratios() {
        assert_eq!(parse_ratio(Some("55/45")).larger_percent, 55.0);
        assert_eq!(parse_ratio(Some("40/60")).larger_percent, 60.0);
        assert_eq!(parse_ratio(Some("Slightly off-centered")).larger_percent, 57.0);
        assert_eq!(parse_ratio(Some("noticeably left")).larger_percent, 65.0);
        assert_eq!(parse_ratio(Some("well centered")).larger_percent, 50.0);

        let unreadable = parse_ratio(Some("???"));
        assert_eq!(unreadable.larger_percent, 50.0);
        assert_eq!(unreadable.source, RatioSource::Defaulted);
        assert_eq!(parse_ratio(Some("0/0")).source, RatioSource::Defaulted);
    }

    #[test]
    fn buckets_follow_band_boundaries() {
        let cases = [
            ("50/50", 0.0),
            ("55/45", 0.0),
            ("60/40", 0.25),
            ("65/35", 0.5),
            ("70/30", 0.5),
            ("75/25", 0.75),
            ("80/20", 1.0),
            ("95/5", 1.0),
        ];
        for (ratio, expected) in cases {
            let result = deductions_for(CenteringMeasurement::uniform(ratio));
            assert_eq!(result.deductions, expected, "ratio {ratio}");
        }
    }

    #[test]
    fn worst_axis_drives_deduction() {
        let measurement = CenteringMeasurement {
            back_top_bottom_ratio_text: Some("72/28".to_string()),
            ..CenteringMeasurement::uniform("50/50")
        };
        let result = deductions_for(measurement);
        assert_eq!(result.deductions, 0.75);
        assert!(result.details.iter().any(|detail| detail.contains("72/28")));
    }

    #[test]
    fn unreadable_ratio_is_noted_in_details() {
        let measurement = CenteringMeasurement {
            front_left_right_ratio_text: Some("blurry".to_string()),
            ..CenteringMeasurement::uniform("50/50")
        };
        let result = deductions_for(measurement);
        assert_eq!(result.deductions, 0.0);
        assert!(result
            .details
            .iter()
            .any(|detail| detail.starts_with("Front left/right ratio unreadable")));
    }
}
