//! Output formatting for CLI

use chrono::{DateTime, Utc};
use loopplay_core::PlayerState;
use serde::Serialize;
use std::time::Duration;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// One printed snapshot
#[derive(Debug, Serialize)]
pub struct SnapshotRecord {
    pub timestamp: DateTime<Utc>,
    pub media_time: f64,
    #[serde(flatten)]
    pub state: PlayerState,
}

impl SnapshotRecord {
    pub fn new(media_time: Duration, state: PlayerState) -> Self {
        Self {
            timestamp: Utc::now(),
            media_time: media_time.as_secs_f64(),
            state,
        }
    }
}

/// Render a snapshot as a single line
pub fn format_snapshot(record: &SnapshotRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => format!("[{:>7.1}s] {}", record.media_time, record.state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopplay_core::SkipIntroState;

    fn record() -> SnapshotRecord {
        SnapshotRecord::new(
            Duration::from_millis(17_500),
            PlayerState {
                is_playing: true,
                is_hud_visible: false,
                skip_intro: SkipIntroState::Showing { seconds_left: 9 },
            },
        )
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Text);
    }

    #[test]
    fn test_text_line() {
        let line = format_snapshot(&record(), OutputFormat::Text);
        assert!(line.starts_with("[   17.5s]"));
        assert!(line.contains("showing(9)"));
    }

    #[test]
    fn test_json_line() {
        let line = format_snapshot(&record(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["media_time"], 17.5);
        assert_eq!(value["is_playing"], true);
        assert_eq!(value["skip_intro"]["state"], "showing");
        assert_eq!(value["skip_intro"]["seconds_left"], 9);
    }
}
