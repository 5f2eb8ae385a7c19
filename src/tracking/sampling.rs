//! Sampling policy: which fixes become vertices

use super::config::{CaptureMode, DEFAULT_THRESHOLD};
use super::fix::Fix;
use super::geodesic::distance;

/// Decide if `candidate` is far enough, in space or time, from the last
/// accepted fix. Without a previous fix everything is accepted.
///
/// A threshold that is not a finite, non-negative number is read as the
/// default distance policy.
pub fn should_accept(
    previous: Option<&Fix>,
    candidate: &Fix,
    mode: CaptureMode,
    threshold: f64,
) -> bool {
    let previous = match previous {
        Some(p) => p,
        None => return true,
    };

    let (mode, threshold) = if threshold.is_finite() && threshold >= 0.0 {
        (mode, threshold)
    } else {
        (CaptureMode::Distance, DEFAULT_THRESHOLD)
    };

    match mode {
        CaptureMode::Distance => distance(&previous.position, &candidate.position) >= threshold,
        CaptureMode::Time => elapsed_seconds(previous, candidate) >= threshold,
    }
}

/// Seconds between the capture times of two fixes
pub fn elapsed_seconds(from: &Fix, to: &Fix) -> f64 {
    (to.captured_at_millis() - from.captured_at_millis()) as f64 / 1000.0
}
