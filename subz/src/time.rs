/// Split a duration in seconds into `(hours, minutes, seconds)`.
///
/// Uses floor division with a non-negative remainder, so for any
/// non-negative input `hours * 3600 + minutes * 60 + seconds` gives the
/// input back, `minutes < 60` and `seconds < 60`. Hours never wrap.
///
/// Negative durations are outside the contract. They still split
/// deterministically (`-1.0` gives `(-1, 59, 59.0)`).
pub fn split_seconds(seconds: f64) -> (i64, u32, f64) {
    let hours = seconds.div_euclid(3600.0);
    let rest = seconds.rem_euclid(3600.0);
    let minutes = rest.div_euclid(60.0);
    let secs = rest.rem_euclid(60.0);
    (hours as i64, minutes as u32, secs)
}
