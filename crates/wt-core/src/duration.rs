//! Duration display helpers.

/// Formats seconds as `HH:MM:SS`, prefixed with `-` when negative.
///
/// The magnitude is floored to whole seconds before splitting, so `-0.4`
/// renders as `-00:00:00` and `59.9` as `00:00:59`.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "magnitude is non-negative and floored"
)]
pub fn format_hms(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let total = seconds.abs().floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{sign}{hours:02}:{minutes:02}:{secs:02}")
}

/// Rounds a duration up to whole minutes, as external trackers bill it.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped non-negative and ceiled"
)]
pub fn round_up_minutes(seconds: f64) -> u64 {
    (seconds.max(0.0) / 60.0).ceil() as u64
}

/// Converts an hours value (as stored in settings) to seconds.
pub fn hours_to_seconds(hours: f64) -> f64 {
    hours * 3600.0
}
