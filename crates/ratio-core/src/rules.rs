//! Shared classification rules for the comparison engines.
//!
//! Threshold constants and the ordered decision tables live here so the
//! benchmark and peer engines cannot drift apart on band boundaries or
//! polarity handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Values whose magnitude falls below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Deviations under this percentage count as "practically equal".
pub const NEUTRAL_BAND_PCT: f64 = 2.0;

/// Band around the peer average that still reads as "At average".
pub const AT_AVERAGE_BAND_PCT: f64 = 5.0;

/// Deviations beyond this percentage are strong (success/danger).
pub const STRONG_DEVIATION_PCT: f64 = 15.0;

/// Peer deviations beyond this percentage are "Far above"/"Far below".
pub const FAR_FROM_AVERAGE_PCT: f64 = 20.0;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Absolute and percentage difference between a company value and a
/// reference value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub absolute: f64,
    pub percent: f64,
}

/// Difference of `value` against `reference`.
///
/// The percentage is defined as 0 when the reference is zero, so a
/// division by zero can never surface from a comparison.
pub fn diff_against(value: f64, reference: f64) -> Diff {
    let absolute = round4(value - reference);
    let percent = if reference.abs() < EPSILON {
        0.0
    } else {
        round2(absolute / reference.abs() * 100.0)
    };
    Diff { absolute, percent }
}

/// Whether `value` meets `reference` under the ratio's polarity.
pub fn meets_reference(value: f64, reference: f64, lower_is_better: bool) -> bool {
    if lower_is_better {
        value <= reference
    } else {
        value >= reference
    }
}

/// Severity bucket for a deviation from a reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonState {
    Neutral,
    Success,
    Info,
    Warning,
    Danger,
}

impl fmt::Display for ComparisonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComparisonState::Neutral => "neutral",
            ComparisonState::Success => "success",
            ComparisonState::Info => "info",
            ComparisonState::Warning => "warning",
            ComparisonState::Danger => "danger",
        };
        write!(f, "{}", label)
    }
}

/// A deviation from a reference, normalized for classification.
#[derive(Debug, Clone, Copy)]
pub struct Deviation {
    /// Magnitude of the percentage difference.
    pub abs_pct: f64,
    /// The company value sits above the reference.
    pub above: bool,
    pub lower_is_better: bool,
}

impl Deviation {
    pub fn new(diff: Diff, lower_is_better: bool) -> Self {
        Self {
            abs_pct: diff.percent.abs(),
            above: diff.absolute > 0.0,
            lower_is_better,
        }
    }

    /// The deviation points in the favorable direction for this ratio.
    pub fn favorable(&self) -> bool {
        self.above != self.lower_is_better
    }
}

fn within_neutral_band(d: &Deviation) -> bool {
    d.abs_pct < NEUTRAL_BAND_PCT
}

fn strongly_favorable(d: &Deviation) -> bool {
    d.favorable() && d.abs_pct > STRONG_DEVIATION_PCT
}

fn mildly_favorable(d: &Deviation) -> bool {
    d.favorable()
}

fn strongly_unfavorable(d: &Deviation) -> bool {
    d.abs_pct > STRONG_DEVIATION_PCT
}

fn any_deviation(_d: &Deviation) -> bool {
    true
}

type StateRule = (fn(&Deviation) -> bool, ComparisonState);

/// Ordered decision table for state classification. First match wins.
const STATE_RULES: &[StateRule] = &[
    (within_neutral_band, ComparisonState::Neutral),
    (strongly_favorable, ComparisonState::Success),
    (mildly_favorable, ComparisonState::Info),
    (strongly_unfavorable, ComparisonState::Danger),
    (any_deviation, ComparisonState::Warning),
];

/// Classify a deviation into its severity bucket.
pub fn classify_deviation(deviation: &Deviation) -> ComparisonState {
    STATE_RULES
        .iter()
        .find(|(applies, _)| applies(deviation))
        .map(|(_, state)| *state)
        .unwrap_or(ComparisonState::Neutral)
}

/// Position of a company value relative to its peer-sector average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelativePosition {
    #[serde(rename = "At average")]
    AtAverage,
    #[serde(rename = "Above")]
    Above,
    #[serde(rename = "Far above")]
    FarAbove,
    #[serde(rename = "Below")]
    Below,
    #[serde(rename = "Far below")]
    FarBelow,
}

impl fmt::Display for RelativePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RelativePosition::AtAverage => "At average",
            RelativePosition::Above => "Above",
            RelativePosition::FarAbove => "Far above",
            RelativePosition::Below => "Below",
            RelativePosition::FarBelow => "Far below",
        };
        write!(f, "{}", label)
    }
}

/// Inputs to the relative-position decision table.
#[derive(Debug, Clone, Copy)]
struct PeerDeviation {
    value: f64,
    average: f64,
    /// Signed percentage difference against the average.
    percent: f64,
}

impl PeerDeviation {
    fn zero_average(&self) -> bool {
        self.average.abs() < EPSILON
    }
}

type PositionRule = (fn(&PeerDeviation) -> bool, RelativePosition);

/// Ordered decision table for relative position. First match wins. The
/// zero-average rows must come first: the percentage is defined as 0 in
/// that case and would otherwise read as "At average".
const POSITION_RULES: &[PositionRule] = &[
    (
        |d| d.zero_average() && d.value.abs() < EPSILON,
        RelativePosition::AtAverage,
    ),
    (
        |d| d.zero_average() && d.value > 0.0,
        RelativePosition::Above,
    ),
    (|d| d.zero_average(), RelativePosition::Below),
    (
        |d| d.percent.abs() < AT_AVERAGE_BAND_PCT,
        RelativePosition::AtAverage,
    ),
    (
        |d| d.percent > FAR_FROM_AVERAGE_PCT,
        RelativePosition::FarAbove,
    ),
    (|d| d.percent > AT_AVERAGE_BAND_PCT, RelativePosition::Above),
    (
        |d| d.percent < -FAR_FROM_AVERAGE_PCT,
        RelativePosition::FarBelow,
    ),
    (|d| d.percent < -AT_AVERAGE_BAND_PCT, RelativePosition::Below),
    (|_| true, RelativePosition::AtAverage),
];

/// Position of `value` relative to the peer `average`, given the signed
/// percentage difference already computed for the diff section.
pub fn relative_position(value: f64, average: f64, percent: f64) -> RelativePosition {
    let deviation = PeerDeviation {
        value,
        average,
        percent,
    };
    POSITION_RULES
        .iter()
        .find(|(applies, _)| applies(&deviation))
        .map(|(_, position)| *position)
        .unwrap_or(RelativePosition::AtAverage)
}

/// Direction of a multi-year ratio series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
    NoData,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Flat => "flat",
            TrendDirection::NoData => "no_data",
        };
        write!(f, "{}", label)
    }
}

/// Percentage change from the first to the last point of a series.
/// Defined as 0 when the first value is exactly zero.
pub fn series_change_pct(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        0.0
    } else {
        round2((last - first) / first.abs() * 100.0)
    }
}

/// Direction for a computed change percentage.
pub fn trend_direction(change_pct: f64) -> TrendDirection {
    if change_pct > AT_AVERAGE_BAND_PCT {
        TrendDirection::Up
    } else if change_pct < -AT_AVERAGE_BAND_PCT {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_uses_absolute_reference_for_percent() {
        let diff = diff_against(15.0, 12.0);
        assert_eq!(diff.absolute, 3.0);
        assert_eq!(diff.percent, 25.0);

        // Negative reference: percent keeps the sign of the difference.
        let diff = diff_against(-5.0, -10.0);
        assert_eq!(diff.absolute, 5.0);
        assert_eq!(diff.percent, 50.0);
    }

    #[test]
    fn zero_reference_yields_zero_percent() {
        let diff = diff_against(3.5, 0.0);
        assert_eq!(diff.absolute, 3.5);
        assert_eq!(diff.percent, 0.0);
    }

    #[test]
    fn polarity_inverts_meets() {
        assert!(meets_reference(15.0, 12.0, false));
        assert!(!meets_reference(10.0, 12.0, false));
        assert!(meets_reference(0.4, 0.5, true));
        assert!(!meets_reference(0.7, 0.5, true));
        // Equal values meet under both polarities.
        assert!(meets_reference(1.0, 1.0, true));
        assert!(meets_reference(1.0, 1.0, false));
    }

    #[test]
    fn state_band_boundaries() {
        // Just under 2% is neutral regardless of direction or polarity.
        let d = Deviation {
            abs_pct: 1.99,
            above: true,
            lower_is_better: false,
        };
        assert_eq!(classify_deviation(&d), ComparisonState::Neutral);

        // Exactly 15% is the mild bucket, not the strong one.
        let d = Deviation {
            abs_pct: 15.0,
            above: true,
            lower_is_better: false,
        };
        assert_eq!(classify_deviation(&d), ComparisonState::Info);

        let d = Deviation {
            abs_pct: 15.01,
            above: true,
            lower_is_better: false,
        };
        assert_eq!(classify_deviation(&d), ComparisonState::Success);
    }

    #[test]
    fn lower_is_better_flips_state() {
        // 40% above a lower-is-better reference is danger.
        let d = Deviation {
            abs_pct: 40.0,
            above: true,
            lower_is_better: true,
        };
        assert_eq!(classify_deviation(&d), ComparisonState::Danger);

        // 40% below it is success.
        let d = Deviation {
            abs_pct: 40.0,
            above: false,
            lower_is_better: true,
        };
        assert_eq!(classify_deviation(&d), ComparisonState::Success);

        // Mild unfavorable deviation is a warning.
        let d = Deviation {
            abs_pct: 8.0,
            above: true,
            lower_is_better: true,
        };
        assert_eq!(classify_deviation(&d), ComparisonState::Warning);
    }

    #[test]
    fn relative_position_bands() {
        assert_eq!(relative_position(10.0, 10.2, 2.0), RelativePosition::AtAverage);
        assert_eq!(relative_position(11.0, 10.0, 10.0), RelativePosition::Above);
        assert_eq!(relative_position(13.0, 10.0, 30.0), RelativePosition::FarAbove);
        assert_eq!(relative_position(9.0, 10.0, -10.0), RelativePosition::Below);
        assert_eq!(relative_position(10.0, 15.0, -33.33), RelativePosition::FarBelow);
    }

    #[test]
    fn relative_position_with_zero_average() {
        assert_eq!(relative_position(0.0, 0.0, 0.0), RelativePosition::AtAverage);
        assert_eq!(relative_position(1.5, 0.0, 0.0), RelativePosition::Above);
        assert_eq!(relative_position(-1.5, 0.0, 0.0), RelativePosition::Below);
    }

    #[test]
    fn series_change_handles_zero_and_negative_start() {
        assert_eq!(series_change_pct(10.0, 15.0), 50.0);
        assert_eq!(series_change_pct(0.0, 15.0), 0.0);
        // Negative starting point: improvement is still positive change.
        assert_eq!(series_change_pct(-10.0, -5.0), 50.0);
    }

    #[test]
    fn trend_direction_bands() {
        assert_eq!(trend_direction(50.0), TrendDirection::Up);
        assert_eq!(trend_direction(5.0), TrendDirection::Flat);
        assert_eq!(trend_direction(-5.0), TrendDirection::Flat);
        assert_eq!(trend_direction(-5.01), TrendDirection::Down);
    }

    #[test]
    fn state_serializes_lowercase() {
        let json = serde_json::to_string(&ComparisonState::Danger).unwrap();
        assert_eq!(json, "\"danger\"");
        let json = serde_json::to_string(&RelativePosition::FarBelow).unwrap();
        assert_eq!(json, "\"Far below\"");
        let json = serde_json::to_string(&TrendDirection::NoData).unwrap();
        assert_eq!(json, "\"no_data\"");
    }
}
