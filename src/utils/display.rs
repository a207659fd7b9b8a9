//! Small display helpers shared across screens.

use std::time::Duration;

use crate::engine::NIGHT_TOKEN_ID;

/// Human-readable name for a token id: `NIGHT` for the native token,
/// otherwise the first 8 characters of the id.
pub fn token_display_name(token_id: &str) -> String {
    if token_id == NIGHT_TOKEN_ID {
        "NIGHT".to_string()
    } else {
        format!("{}...", &token_id[..token_id.len().min(8)])
    }
}

/// Truncate long addresses for display: first 20 and last 16 characters.
pub fn truncate_address(address: &str) -> String {
    if address.len() <= 40 {
        return address.to_string();
    }
    format!(
        "{}...{}",
        &address[..20],
        &address[address.len() - 16..]
    )
}

/// Format a remaining duration as `2d 5h`, `5h 30m`, or `45m`.
/// Zero remaining time renders as `Complete`.
pub fn format_time_remaining(remaining: Duration) -> String {
    let total_seconds = remaining.as_secs();
    if total_seconds == 0 {
        return "Complete".to_string();
    }

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
