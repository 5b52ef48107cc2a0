/// Number of fine (+1/-1) steps allowed below the first coarse step.
const INCREMENTS_BEFORE_LARGE_STEP: u32 = 3;

/// Formats a number of seconds as `MM:SS`, or `HH:MM:SS` once it reaches an hour.
pub fn format_seconds(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Next duration up: +1 in the fine zone below `step * 3`, otherwise the next
/// multiple of `step` strictly above `duration`.
pub fn incremented_duration(duration: u32, step: u32) -> u32 {
    let step = step.max(1);
    if duration < step.saturating_mul(INCREMENTS_BEFORE_LARGE_STEP) {
        return duration.saturating_add(1);
    }
    (duration.saturating_add(step) / step) * step
}

/// Next duration down: -1 (never below 1) when the result would land in the
/// fine zone, otherwise `duration - step`.
///
/// Not the exact inverse of [`incremented_duration`] around `step * 3`.
pub fn decremented_duration(duration: u32, step: u32) -> u32 {
    let step = step.max(1);
    let diff = duration.saturating_sub(step);
    if diff < step.saturating_mul(INCREMENTS_BEFORE_LARGE_STEP) {
        return duration.saturating_sub(1).max(1);
    }
    diff
}
