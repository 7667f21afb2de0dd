//! Oversize classification from a size label and/or custom measurements.

use super::MeasurementThresholds;
use crate::order::Measurements;

/// Whether a line is oversize.
///
/// Either signal is enough: an oversize label, or any provided measurement
/// strictly above its threshold. Measurements that do not parse as a number
/// are ignored.
///
/// ```
/// use atelier_core::pricing::{MeasurementThresholds, is_oversize};
///
/// let limits = MeasurementThresholds::default();
/// assert!(is_oversize(Some(" 3xl"), None, &limits));
/// assert!(!is_oversize(Some("M"), None, &limits));
/// ```
#[must_use]
pub fn is_oversize(
    size: Option<&str>,
    measurements: Option<&Measurements>,
    thresholds: &MeasurementThresholds,
) -> bool {
    size.is_some_and(is_oversize_label)
        || measurements.is_some_and(|m| exceeds_thresholds(m, thresholds))
}

/// `XL`, `XXL`, or a numeric multiple `<N>XL` / `<N>X` with N of at least 2.
///
/// Case and whitespace are ignored.
#[must_use]
pub fn is_oversize_label(label: &str) -> bool {
    let label: String = label
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    if label == "XL" || label == "XXL" {
        return true;
    }

    let multiple = label
        .strip_suffix("XL")
        .or_else(|| label.strip_suffix('X'))
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));

    multiple.is_some_and(|n| at_least_two(n.trim_start_matches('0')))
}

/// `digits` is a run of ASCII digits without leading zeros, of any length.
fn at_least_two(digits: &str) -> bool {
    match digits.as_bytes() {
        [] => false,
        [single] => *single >= b'2',
        _ => true,
    }
}

fn exceeds_thresholds(measurements: &Measurements, thresholds: &MeasurementThresholds) -> bool {
    measurements.dimensions().any(|(dimension, raw)| {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .is_some_and(|value| value > thresholds.limit(dimension))
    })
}
