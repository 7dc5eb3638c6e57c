use chrono::Duration;

/// Round to the nearest whole second and render as `1h2m3s`.
///
/// Leading zero units are omitted; a zero or negative duration renders as `0s`.
pub fn format_uptime(elapsed: Duration) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    let total_secs = (millis + 500) / 1000;

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
