use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

use super::constants::{FASTDIAGN_COMPONENT, HOUSEKEEPER_COMPONENT};
use super::error::EventError;
use super::timestamp::log_timestamp;

static FAILED_ACTUATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Failing actuator detected N. (\d+)").expect("actuator pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SkipFrame,
    FailedActuator,
    RIP,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SkipFrame => write!(f, "SkipFrame"),
            Self::FailedActuator => write!(f, "FailedActuator"),
            Self::RIP => write!(f, "RIP"),
        }
    }
}

/// A point-in-time occurrence found in the logs (frame skips, actuator failures, safety shutdowns)
#[derive(Debug, Clone, PartialEq)]
pub struct PointEvent {
    pub kind: EventKind,
    pub timestamp: f64,
    pub details: String,
    pub actuator: Option<u32>,
}

impl PointEvent {
    /// Build the event of the given kind from a matched line of `component`'s log
    pub fn from_log_line(kind: EventKind, component: &str, line: &str) -> Result<Self, EventError> {
        match kind {
            EventKind::SkipFrame => Self::skip_frame(line),
            EventKind::FailedActuator => Self::failed_actuator(line),
            EventKind::RIP => Self::rip(component, line),
        }
    }

    fn skip_frame(line: &str) -> Result<Self, EventError> {
        let timestamp = log_timestamp(line)?;
        let line = line.replace("->", "--");
        Ok(Self {
            kind: EventKind::SkipFrame,
            timestamp,
            details: message(&line)?.to_string(),
            actuator: None,
        })
    }

    fn failed_actuator(line: &str) -> Result<Self, EventError> {
        let timestamp = log_timestamp(line)?;
        let number = FAILED_ACTUATOR
            .captures(line)
            .ok_or_else(|| EventError::MissingActuator(line.to_string()))?[1]
            .parse::<u32>()?;
        Ok(Self {
            kind: EventKind::FailedActuator,
            timestamp,
            details: format!("Act: {number} - {}", message(line)?),
            actuator: Some(number),
        })
    }

    fn rip(component: &str, line: &str) -> Result<Self, EventError> {
        let timestamp = log_timestamp(line)?;
        let process = match component {
            FASTDIAGN_COMPONENT => "FastDiagnostic",
            HOUSEKEEPER_COMPONENT => "HouseKeeper",
            other => other,
        };
        Ok(Self {
            kind: EventKind::RIP,
            timestamp,
            details: format!("Detected by {process}"),
            actuator: None,
        })
    }
}

/// The free text of a line: everything after the first '>'
fn message(line: &str) -> Result<&str, EventError> {
    line.split_once('>')
        .map(|(_, msg)| msg)
        .ok_or_else(|| EventError::MissingMessage(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_frame() {
        let line = "AOARB|R|MAIN|2021-03-04 05:06:07.000000|slopes->loop> - SkipFrame: 12 frames";
        let event = PointEvent::from_log_line(EventKind::SkipFrame, "AOARB", line).unwrap();
        assert_eq!(event.kind, EventKind::SkipFrame);
        assert_eq!(event.details, " - SkipFrame: 12 frames");
        assert_eq!(event.actuator, None);
    }

    #[test]
    fn test_failed_actuator() {
        let line = "fastdiagn|R|DIAG|2021-03-04 05:06:07.000000|ADSEC> Failing actuator detected N. 512 current too high";
        let event = PointEvent::from_log_line(EventKind::FailedActuator, "fastdiagn", line).unwrap();
        assert_eq!(event.actuator, Some(512));
        assert_eq!(
            event.details,
            "Act: 512 -  Failing actuator detected N. 512 current too high"
        );
    }

    #[test]
    fn test_failed_actuator_without_number() {
        let line = "fastdiagn|R|DIAG|2021-03-04 05:06:07.000000|ADSEC> Failing actuator detected";
        assert!(PointEvent::from_log_line(EventKind::FailedActuator, "fastdiagn", line).is_err());
    }

    #[test]
    fn test_rip() {
        let line = "housekeeper|R|HK|2021-03-04 05:06:07.000000|FUNCTEMERGENCYST";
        let event = PointEvent::from_log_line(EventKind::RIP, "housekeeper", line).unwrap();
        assert_eq!(event.details, "Detected by HouseKeeper");
        assert_eq!(event.kind.to_string(), "RIP");
    }
}
