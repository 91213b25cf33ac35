//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Floor a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn floor_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let floored = value.clamp(min, max).floor();
    cast::<f64, i64>(floored).unwrap_or(if floored > 0.0 { i64::MAX } else { i64::MIN })
}

/// Widen a stage number into the signed money domain.
#[must_use]
pub fn stage_scale(stage: u32) -> i64 {
    i64::from(stage.max(1))
}

/// Widen a configured count into an index, saturating on narrow targets.
#[must_use]
pub fn count_to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}
