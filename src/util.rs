use chrono::Duration;

/// Formats a duration the way `kubectl get` prints the AGE column, using its largest unit.
pub fn age(duration: &Duration) -> String {
    let duration_seconds = duration.num_seconds().max(0);

    let seconds = duration_seconds % 60;
    let minutes = (duration_seconds / 60) % 60;
    let hours = (duration_seconds / 3600) % 24;
    let days = duration_seconds / 86400;

    if 0 < days {
        return format!("{}d", days);
    }
    if 0 < hours {
        return format!("{}h", hours);
    }
    if 0 < minutes {
        return format!("{}m", minutes);
    }
    format!("{}s", seconds)
}
