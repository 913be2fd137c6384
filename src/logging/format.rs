//! Subscriber setup and the run summary lines written by the binary.

use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Summary line for a run or one of its attack trees.
#[derive(Debug, Serialize)]
pub struct LogEvent<'a> {
    pub ts: String,
    pub level: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_risk: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> LogEvent<'a> {
    pub fn new(level: &'a str, message: &'a str) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            level,
            message,
            run_id: None,
            mode: None,
            overall_risk: None,
            target: None,
            root_cause: None,
            error: None,
        }
    }
}

pub struct StructuredLogger;

impl StructuredLogger {
    /// `RUST_LOG` wins over `default_level`. False when a global subscriber is already set.
    pub fn init(json: bool, default_level: &str) -> bool {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let registry = tracing_subscriber::registry().with(filter);
        if json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(FmtSpan::CLOSE)
                        .with_writer(std::io::stdout),
                )
                .try_init()
                .is_ok()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
                .try_init()
                .is_ok()
        }
    }

    /// Write `event` as one JSON line, bypassing the subscriber.
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) -> std::io::Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(w, "{}", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_line_without_empty_fields() {
        let mut event = LogEvent::new("info", "run complete");
        event.run_id = Some("r1");
        event.overall_risk = Some("rk3");
        let mut out = Vec::new();
        StructuredLogger::emit_json(&event, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["run_id"], "r1");
        assert_eq!(value["overall_risk"], "rk3");
        assert!(value.get("target").is_none());
    }
}
