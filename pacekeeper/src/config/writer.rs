//! INI serialization: `ConfigFile` → commented INI text.

use std::time::Duration;

use super::file::ConfigFile;

fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}

/// Render `config` as the commented INI written to `config.ini`.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let m = &config.manager;
    let log_directory = config
        .logging
        .directory
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    format!(
        r#"[updates]
; Speed in m/s at or above which min_interval applies.
; Reference: standing 0, walking 0.3-1.4, running 1.4-4, cycling 4-12
speed_threshold = {speed_threshold}
; Interval updates while moving / while slow, in seconds
min_interval = {min_interval}
max_interval = {max_interval}
; Heartbeat period re-emitting the latest location, in seconds
loop_interval = {loop_interval}

[first_fix]
; Polls before reporting that no first location could be found
attempts = {attempts}
; Seconds between polls
poll_interval = {poll_interval}

[background]
; Keep updating while the application is in the background
allow_updates = {allow_background}

[distance]
; Distance in meters between distance updates
minimum_update = {minimum_update}
; Grow the distance threshold with speed (0.3 * v^2 + minimum_update)
scaling = {scaling}

[motion]
; Suppress distance accumulation while the device is stationary
enabled = {motion}

[sensor]
; best, nearest_ten_meters, hundred_meters, kilometer, three_kilometers
desired_accuracy = {accuracy}
; Meters the device must move before the sensor reports a new fix
distance_filter = {distance_filter}
; other, automotive_navigation, fitness, other_navigation
activity_type = {activity_type}

[events]
; Buffered events per channel before slow subscribers lag
capacity = {capacity}

[logging]
; Directory for pacekeeper.log (empty: log to stderr only)
directory = {log_directory}
"#,
        speed_threshold = m.speed_threshold,
        min_interval = secs(m.min_interval),
        max_interval = secs(m.max_interval),
        loop_interval = secs(m.loop_interval),
        attempts = m.first_fix_attempts,
        poll_interval = secs(m.first_fix_poll_interval),
        allow_background = m.allow_background_updates,
        minimum_update = m.minimum_update_distance,
        scaling = m.distance_scaling,
        motion = m.motion_activity,
        accuracy = m.sensor.desired_accuracy.as_str(),
        distance_filter = m.sensor.distance_filter,
        activity_type = m.sensor.activity_type.as_str(),
        capacity = m.event_capacity,
        log_directory = log_directory,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DesiredAccuracy;

    #[test]
    fn test_defaults_round_trip() {
        let config = ConfigFile::default();
        let text = to_config_string(&config);
        assert_eq!(ConfigFile::from_ini_str(&text).unwrap(), config);
    }

    #[test]
    fn test_customized_round_trip() {
        let mut config = ConfigFile::default();
        config.manager.speed_threshold = 1.25;
        config.manager.min_interval = Duration::from_millis(1500);
        config.manager.loop_interval = Duration::from_secs(30);
        config.manager.distance_scaling = true;
        config.manager.motion_activity = true;
        config.manager.sensor.desired_accuracy = DesiredAccuracy::Kilometer;

        let text = to_config_string(&config);
        assert!(text.contains("min_interval = 1.5"));
        assert_eq!(ConfigFile::from_ini_str(&text).unwrap(), config);
    }
}
