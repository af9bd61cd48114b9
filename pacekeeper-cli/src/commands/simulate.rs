//! Replay a recorded trace through the location manager.
//!
//! A trace is a JSON-lines file. Each line carries a millisecond offset from
//! the start of the trace and one input:
//!
//! ```text
//! {"at_ms": 0,    "type": "authorization", "status": "authorized_when_in_use"}
//! {"at_ms": 0,    "type": "start"}
//! {"at_ms": 1200, "type": "fix", "lat": 53.5511, "lon": 9.9937, "speed": 1.4}
//! {"at_ms": 9000, "type": "background"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Offsets must not go
//! backwards. Timers fire at their exact virtual deadlines between lines, so
//! the same trace always produces the same event stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use pacekeeper::config::{config_file_path, ConfigFile};
use pacekeeper::events::drain;
use pacekeeper::runtime::{Replay, SessionInput};
use pacekeeper::source::{SimulatedActivitySource, SimulatedObserver, SimulatedSource};
use pacekeeper::throttle::MotionActivity;
use pacekeeper::{
    AuthorizationMode, AuthorizationStatus, LocationEvent, LocationSample, ManagerConfig,
    SessionState,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::CliError;

/// How replayed events are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Arguments for `pacekeeper simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Trace file in JSON-lines format ("-" reads stdin)
    pub trace: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Configuration file (defaults to the user configuration)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Authorization status reported by the source before the trace starts
    #[arg(long, default_value = "not_determined", value_parser = parse_status)]
    pub status: AuthorizationStatus,

    /// Register an external observer; "external_fix" lines feed it
    #[arg(long)]
    pub external_observer: bool,

    /// Keep running timers until this many seconds after the trace start
    #[arg(long)]
    pub until: Option<f64>,

    /// Wall-clock time of the trace start, RFC 3339 (defaults to now)
    #[arg(long)]
    pub start_time: Option<DateTime<Utc>>,
}

fn parse_status(value: &str) -> Result<AuthorizationStatus, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|_| {
        format!(
            "unknown status '{}' (expected not_determined, authorized_always, \
             authorized_when_in_use, denied or restricted)",
            value
        )
    })
}

// =============================================================================
// Trace format
// =============================================================================

/// Largest accepted `at_ms` (about 100 years).
pub const MAX_TRACE_OFFSET_MS: u64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// One line of a trace file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceLine {
    /// 1-based line number in the trace file.
    #[serde(skip)]
    pub line: usize,
    /// Offset from the trace start in milliseconds.
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: TraceEvent,
}

/// A position fix as written in traces.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceFix {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

/// Trace inputs, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    Fix(TraceFix),
    ExternalFix(TraceFix),
    Authorization {
        status: AuthorizationStatus,
    },
    Activity {
        activity: MotionActivity,
    },
    Background,
    Foreground,
    RequestAuthorization {
        #[serde(default)]
        mode: AuthorizationMode,
    },
    Start,
    StartWithRequest {
        #[serde(default)]
        mode: AuthorizationMode,
    },
    Stop,
    OneTimeUpdate,
    RestartFirstFix,
    AllowBackground {
        allow: bool,
    },
    UnregisterObserver,
    Destroy,
}

impl TraceFix {
    fn to_sample(&self, timestamp: DateTime<Utc>) -> LocationSample {
        let mut sample = LocationSample::new(self.lat, self.lon).at(timestamp);
        if let Some(speed) = self.speed {
            sample = sample.with_speed(speed);
        }
        if let Some(accuracy) = self.accuracy {
            sample = sample.with_accuracy(accuracy);
        }
        sample
    }
}

impl TraceLine {
    /// Convert to a manager input. Fixes are stamped `start + at_ms`.
    ///
    /// Fails when that timestamp falls outside the representable range.
    pub fn to_input(&self, start: DateTime<Utc>) -> Result<SessionInput, CliError> {
        let timestamp = i64::try_from(self.at_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .and_then(|offset| start.checked_add_signed(offset))
            .ok_or_else(|| CliError::TraceParse {
                line: self.line,
                message: format!("at_ms {} is out of range for start time {}", self.at_ms, start),
            })?;
        let input = match &self.event {
            TraceEvent::Fix(fix) => SessionInput::Location(fix.to_sample(timestamp)),
            TraceEvent::ExternalFix(fix) => {
                SessionInput::ExternalLocation(fix.to_sample(timestamp))
            }
            TraceEvent::Authorization { status } => SessionInput::AuthorizationChanged(*status),
            TraceEvent::Activity { activity } => SessionInput::Activity(*activity),
            TraceEvent::Background => SessionInput::WillResignActive,
            TraceEvent::Foreground => SessionInput::DidBecomeActive,
            TraceEvent::RequestAuthorization { mode } => SessionInput::RequestAuthorization(*mode),
            TraceEvent::Start => SessionInput::Start,
            TraceEvent::StartWithRequest { mode } => SessionInput::StartWithRequest(*mode),
            TraceEvent::Stop => SessionInput::Stop,
            TraceEvent::OneTimeUpdate => SessionInput::OneTimeUpdate,
            TraceEvent::RestartFirstFix => SessionInput::RestartFirstFix,
            TraceEvent::AllowBackground { allow } => SessionInput::SetAllowBackgroundUpdates(*allow),
            TraceEvent::UnregisterObserver => SessionInput::UnregisterObserver,
            TraceEvent::Destroy => SessionInput::Destroy,
        };
        Ok(input)
    }
}

/// Parse a JSON-lines trace.
///
/// Line numbers in errors are 1-based and count skipped lines.
pub fn parse_trace(reader: impl BufRead) -> Result<Vec<TraceLine>, CliError> {
    let mut lines = Vec::new();
    let mut last_at = 0;

    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.map_err(|e| CliError::TraceParse {
            line: number,
            message: e.to_string(),
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parsed: TraceLine =
            serde_json::from_str(trimmed).map_err(|e| CliError::TraceParse {
                line: number,
                message: e.to_string(),
            })?;
        parsed.line = number;
        if parsed.at_ms > MAX_TRACE_OFFSET_MS {
            return Err(CliError::TraceParse {
                line: number,
                message: format!("at_ms {} exceeds the limit of {}", parsed.at_ms, MAX_TRACE_OFFSET_MS),
            });
        }
        if parsed.at_ms < last_at {
            return Err(CliError::TraceParse {
                line: number,
                message: format!("at_ms {} is before the previous line ({})", parsed.at_ms, last_at),
            });
        }
        last_at = parsed.at_ms;
        lines.push(parsed);
    }

    Ok(lines)
}

// =============================================================================
// Event output
// =============================================================================

/// A replayed event stamped with its virtual time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub at_ms: u64,
    pub event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl EventRecord {
    pub fn from_event(at: Duration, event: &LocationEvent) -> Self {
        let sample = event.sample();
        let mut record = Self {
            at_ms: at.as_millis() as u64,
            event: event.kind(),
            latitude: sample.map(LocationSample::latitude),
            longitude: sample.map(LocationSample::longitude),
            speed: sample.and_then(|s| s.speed),
            interval_secs: None,
            distance_m: None,
            detail: None,
        };

        match event {
            LocationEvent::UpdatedAfterInterval(update) => {
                record.interval_secs = Some(update.interval.as_secs_f64());
            }
            LocationEvent::UpdatedInLoopMode(update) => {
                record.interval_secs = Some(update.interval.as_secs_f64());
            }
            LocationEvent::UpdatedAfterDistance(update) => {
                record.distance_m = Some(update.distance_m);
            }
            LocationEvent::Error(error) => record.detail = Some(error.to_string()),
            LocationEvent::Notification(notification) => {
                record.detail = Some(notification.as_str().to_string());
            }
            LocationEvent::FirstLocation(_) | LocationEvent::Updated(_) => {}
        }
        record
    }

    /// Render as one aligned text line.
    pub fn to_text(&self) -> String {
        let mut line = format!("{:>10.3}s  {:<24}", self.at_ms as f64 / 1000.0, self.event);
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            line.push_str(&format!("  {:.6}, {:.6}", lat, lon));
        }
        if let Some(speed) = self.speed {
            line.push_str(&format!("  speed={:.1}m/s", speed));
        }
        if let Some(interval) = self.interval_secs {
            line.push_str(&format!("  interval={:.1}s", interval));
        }
        if let Some(distance) = self.distance_m {
            line.push_str(&format!("  distance={:.1}m", distance));
        }
        if let Some(detail) = &self.detail {
            line.push_str(&format!("  {}", detail));
        }
        line.trim_end().to_string()
    }
}

// =============================================================================
// Replay
// =============================================================================

/// Options that shape a replay, independent of where the trace came from.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub status: AuthorizationStatus,
    pub external_observer: bool,
    pub until: Option<Duration>,
    pub start_time: DateTime<Utc>,
}

/// Outcome of a replay.
#[derive(Debug)]
pub struct ReplayReport {
    pub records: Vec<EventRecord>,
    pub final_state: SessionState,
    pub elapsed: Duration,
}

/// Feed `lines` through a fresh manager and collect every event.
pub fn replay_trace(
    lines: &[TraceLine],
    config: ManagerConfig,
    options: &ReplayOptions,
) -> Result<ReplayReport, CliError> {
    let motion = config.motion_activity;
    let mut replay = Replay::new(SimulatedSource::new(options.status), config)?;
    if motion {
        replay = replay.with_activity_source(SimulatedActivitySource::new(true));
    }
    if options.external_observer {
        replay
            .manager_mut()
            .register_external_observer(SimulatedObserver::new())?;
    }

    let mut events = replay.manager().events().subscribe_all();
    let mut records = Vec::new();

    for line in lines {
        let offset = Duration::from_millis(line.at_ms);
        let input = line.to_input(options.start_time)?;
        run_timers_until(&mut replay, offset, &mut events, &mut records);
        replay.apply_at(offset, input);
        collect(&replay, &mut events, &mut records);
    }

    if let Some(until) = options.until.filter(|until| *until > replay.elapsed()) {
        run_timers_until(&mut replay, until, &mut events, &mut records);
        replay.advance_to(until);
    }

    tracing::info!(
        lines = lines.len(),
        events = records.len(),
        state = %replay.manager().state(),
        "Replay finished"
    );

    Ok(ReplayReport {
        records,
        final_state: replay.manager().state(),
        elapsed: replay.elapsed(),
    })
}

fn run_timers_until(
    replay: &mut Replay<SimulatedSource>,
    offset: Duration,
    events: &mut broadcast::Receiver<LocationEvent>,
    records: &mut Vec<EventRecord>,
) {
    while replay.step_until(offset).is_some() {
        collect(replay, events, records);
    }
}

fn collect(
    replay: &Replay<SimulatedSource>,
    events: &mut broadcast::Receiver<LocationEvent>,
    records: &mut Vec<EventRecord>,
) {
    let at = replay.elapsed();
    records.extend(
        drain(events)
            .iter()
            .map(|event| EventRecord::from_event(at, event)),
    );
}

// =============================================================================
// Command
// =============================================================================

/// Run `pacekeeper simulate`.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let lines = read_trace(&args.trace)?;
    tracing::debug!(lines = lines.len(), trace = %args.trace.display(), "Trace loaded");

    let options = ReplayOptions {
        status: args.status,
        external_observer: args.external_observer,
        until: args.until.map(parse_until).transpose()?,
        start_time: args.start_time.unwrap_or_else(Utc::now),
    };
    let report = replay_trace(&lines, config.manager, &options)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, &report, args.format).map_err(CliError::Output)
}

/// Convert `--until` seconds, bounded like trace offsets.
fn parse_until(secs: f64) -> Result<Duration, CliError> {
    let until = Duration::try_from_secs_f64(secs)
        .map_err(|e| CliError::Config(format!("invalid --until value: {}", e)))?;
    if until > Duration::from_millis(MAX_TRACE_OFFSET_MS) {
        return Err(CliError::Config(format!(
            "--until {} exceeds the limit of {}s",
            secs,
            MAX_TRACE_OFFSET_MS / 1000
        )));
    }
    Ok(until)
}

fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => {
            tracing::debug!(path = %config_file_path().display(), "Using user configuration");
            Ok(ConfigFile::load()?)
        }
    }
}

fn read_trace(path: &Path) -> Result<Vec<TraceLine>, CliError> {
    if path == Path::new("-") {
        return parse_trace(io::stdin().lock());
    }
    let file = File::open(path).map_err(|error| CliError::TraceRead {
        path: path.to_path_buf(),
        error,
    })?;
    parse_trace(BufReader::new(file))
}

/// Print `report` in `format`.
pub fn write_report(
    out: &mut impl Write,
    report: &ReplayReport,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            for record in &report.records {
                serde_json::to_writer(&mut *out, record)?;
                writeln!(out)?;
            }
        }
        OutputFormat::Text => {
            for record in &report.records {
                writeln!(out, "{}", record.to_text())?;
            }
            writeln!(out)?;
            writeln!(
                out,
                "{} events over {:.3}s, final state: {}",
                report.records.len(),
                report.elapsed.as_secs_f64(),
                report.final_state
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacekeeper::Notification;

    fn options() -> ReplayOptions {
        ReplayOptions {
            status: AuthorizationStatus::AuthorizedWhenInUse,
            external_observer: false,
            until: None,
            start_time: Utc::now(),
        }
    }

    fn trace(text: &str) -> Vec<TraceLine> {
        parse_trace(text.as_bytes()).unwrap()
    }

    fn kinds(report: &ReplayReport) -> Vec<&'static str> {
        report.records.iter().map(|r| r.event).collect()
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let lines = trace(
            "# walk\n\n{\"at_ms\": 0, \"type\": \"start\"}\n\
             {\"at_ms\": 10, \"type\": \"fix\", \"lat\": 1.0, \"lon\": 2.0, \"speed\": 1.5}\n",
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].event, TraceEvent::Start);
        assert_eq!(
            lines[1].event,
            TraceEvent::Fix(TraceFix {
                lat: 1.0,
                lon: 2.0,
                speed: Some(1.5),
                accuracy: None,
            })
        );
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let result = parse_trace("{\"at_ms\": 0, \"type\": \"teleport\"}".as_bytes());
        assert!(matches!(result, Err(CliError::TraceParse { line: 1, .. })));
    }

    #[test]
    fn test_parse_rejects_offsets_going_backwards() {
        let text = "{\"at_ms\": 500, \"type\": \"start\"}\n{\"at_ms\": 100, \"type\": \"stop\"}\n";
        let result = parse_trace(text.as_bytes());
        assert!(matches!(result, Err(CliError::TraceParse { line: 2, .. })));
    }

    #[test]
    fn test_parse_rejects_offsets_past_limit() {
        let text = format!(
            "{{\"at_ms\": 0, \"type\": \"start\"}}\n{{\"at_ms\": {}, \"type\": \"stop\"}}\n",
            u64::MAX
        );
        let result = parse_trace(text.as_bytes());
        assert!(matches!(result, Err(CliError::TraceParse { line: 2, .. })));

        let lines = trace(&format!(
            "{{\"at_ms\": {}, \"type\": \"stop\"}}",
            MAX_TRACE_OFFSET_MS
        ));
        assert_eq!(lines[0].at_ms, MAX_TRACE_OFFSET_MS);
    }

    #[test]
    fn test_fix_past_last_representable_time_is_an_error() {
        let lines = trace("\n{\"at_ms\": 1000, \"type\": \"fix\", \"lat\": 1.0, \"lon\": 2.0}");
        let result = lines[0].to_input(DateTime::<Utc>::MAX_UTC);
        assert!(matches!(result, Err(CliError::TraceParse { line: 2, .. })));

        let options = ReplayOptions {
            start_time: DateTime::<Utc>::MAX_UTC,
            ..options()
        };
        let result = replay_trace(&lines, ManagerConfig::default(), &options);
        assert!(matches!(result, Err(CliError::TraceParse { .. })));
    }

    #[test]
    fn test_until_is_bounded() {
        assert_eq!(parse_until(2.5).unwrap(), Duration::from_millis(2500));
        assert!(matches!(parse_until(1e18), Err(CliError::Config(_))));
        assert!(matches!(parse_until(-1.0), Err(CliError::Config(_))));
    }

    #[test]
    fn test_parse_defaults_request_mode() {
        let lines = trace("{\"at_ms\": 0, \"type\": \"request_authorization\"}");
        assert_eq!(
            lines[0].event,
            TraceEvent::RequestAuthorization {
                mode: AuthorizationMode::WhenInUse
            }
        );
    }

    #[test]
    fn test_fix_is_stamped_from_start_time() {
        let start = Utc::now();
        let lines = trace("{\"at_ms\": 1500, \"type\": \"fix\", \"lat\": 1.0, \"lon\": 2.0}");
        match lines[0].to_input(start).unwrap() {
            SessionInput::Location(sample) => {
                assert_eq!(sample.timestamp, start + chrono::Duration::milliseconds(1500));
                assert_eq!(sample.speed, None);
            }
            other => panic!("unexpected input {:?}", other),
        }
    }

    #[test]
    fn test_replay_emits_first_fix_and_updates() {
        let lines = trace(
            "{\"at_ms\": 0, \"type\": \"start\"}\n\
             {\"at_ms\": 200, \"type\": \"fix\", \"lat\": 53.55, \"lon\": 9.99}\n",
        );
        let report = replay_trace(&lines, ManagerConfig::default(), &options()).unwrap();

        assert_eq!(report.final_state, SessionState::Running);
        assert_eq!(
            kinds(&report),
            vec!["updated", "updated_after_interval"]
        );
        assert!(report.records.iter().all(|r| r.at_ms == 200));

        let options = ReplayOptions {
            until: Some(Duration::from_secs(2)),
            ..options()
        };
        let report = replay_trace(&lines, ManagerConfig::default(), &options).unwrap();
        let first = report
            .records
            .iter()
            .find(|r| r.event == "first_location")
            .unwrap();
        assert_eq!(first.at_ms, 1000);
        assert_eq!(report.elapsed, Duration::from_secs(2));
    }

    #[test]
    fn test_replay_without_permission_reports_not_authorized() {
        let lines = trace("{\"at_ms\": 0, \"type\": \"start\"}");
        let options = ReplayOptions {
            status: AuthorizationStatus::NotDetermined,
            ..options()
        };
        let report = replay_trace(&lines, ManagerConfig::default(), &options).unwrap();

        assert_eq!(kinds(&report), vec!["notification"]);
        assert_eq!(
            report.records[0].detail.as_deref(),
            Some(Notification::NotAuthorized.as_str())
        );
        assert_eq!(report.final_state, SessionState::Idle);
    }

    #[test]
    fn test_external_fixes_need_observer() {
        let lines = trace(
            "{\"at_ms\": 0, \"type\": \"start\"}\n\
             {\"at_ms\": 100, \"type\": \"external_fix\", \"lat\": 1.0, \"lon\": 1.0}\n",
        );
        let without = replay_trace(&lines, ManagerConfig::default(), &options()).unwrap();
        assert!(without.records.is_empty());

        let options = ReplayOptions {
            external_observer: true,
            ..options()
        };
        let with = replay_trace(&lines, ManagerConfig::default(), &options).unwrap();
        assert_eq!(with.records[0].event, "updated");
    }

    #[test]
    fn test_json_output_omits_empty_fields() {
        let report = ReplayReport {
            records: vec![EventRecord::from_event(
                Duration::from_millis(1500),
                &LocationEvent::Notification(Notification::AppActive),
            )],
            final_state: SessionState::Running,
            elapsed: Duration::from_millis(1500),
        };
        let mut out = Vec::new();
        write_report(&mut out, &report, OutputFormat::Json).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "{\"at_ms\":1500,\"event\":\"notification\",\"detail\":\"app_active\"}\n"
        );
    }

    #[test]
    fn test_text_line_layout() {
        let record = EventRecord::from_event(
            Duration::from_secs(5),
            &LocationEvent::Updated(LocationSample::new(53.55, 9.99).with_speed(1.5)),
        );
        assert_eq!(
            record.to_text(),
            "     5.000s  updated                   53.550000, 9.990000  speed=1.5m/s"
        );
    }
}
