use regex::Regex;
use std::rc::Rc;
use std::sync::LazyLock;

use super::constants::*;
use super::observation::{CompleteObs, Observation};
use super::timestamp::time_str;

/// Composite commands are kept in the same flat sequence as the atomic commands they
/// summarize, so commands are shared.
pub type CommandRef = Rc<Command>;

const NUMBER: &str = r"[-+]?(?:\d*\.\d+|\d+)";

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMBER).expect("number pattern is valid"));
static WFS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"wfsSpec = (\w+)WFS").expect("wfs pattern is valid"));
static MAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("expectedStarMagnitude = ({NUMBER})")).expect("mag pattern is valid")
});
static REF_X_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("roCoordX = ({NUMBER})")).expect("refX pattern is valid")
});
static REF_Y_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("roCoordY = ({NUMBER})")).expect("refY pattern is valid")
});
static MODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"mode = (\w+)").expect("mode pattern is valid"));

/// Noise stripped from PresetAO errors before display
const PRESET_ERROR_NOISE: [&str; 6] = [
    "presetAO:",
    "WARNING -",
    "RETRY:",
    "(-20004) WFSARB_ARG_ERROR",
    "(-5001) TIMEOUT_ERROR",
    "(-5002) VALUE_OUT_OF_RANGE_ERROR",
];

/// The two commands bounding an offset or exposure sequence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bracket {
    pub pause: Option<CommandRef>,
    pub resume: Option<CommandRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// A single request of the arbitrator, with its name
    Atomic(String),
    /// Pause - OffsetXY - Resume
    OffsetSequence(Bracket),
    /// Resume - Pause, the science exposure between two offsets
    ExposureSequence(Bracket),
    /// AcquireRefAO and its sub-commands
    Acquire,
    /// From an instrument PresetAO to the StopAO
    CompleteObs(Observation),
}

impl Default for CommandKind {
    fn default() -> Self {
        Self::Atomic(String::new())
    }
}

/// A command reconstructed from the arbitrator log.
///
/// An atomic command is one request, from its start marker to its end marker. A composite
/// command summarizes a recognized sequence of commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub args: String,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    /// None until the command is seen to complete or fail
    pub success: Option<bool>,
    pub error: String,
    pub intervention: Option<bool>,
    pub estimated_mag: Option<f64>,
    pub ho_binning: Option<i64>,
    pub ho_speed: Option<i64>,
}

/// Target information carried by the arguments of a PresetAO
#[derive(Debug, Clone, PartialEq)]
pub struct PresetInfo {
    pub wfs: String,
    pub magnitude: f64,
    pub ref_x: f64,
    pub ref_y: f64,
    pub mode: String,
}

impl PresetInfo {
    /// Parse the PresetAO argument string. Returns None if any field is missing.
    pub fn parse(args: &str) -> Option<Self> {
        let text = |pattern: &Regex| pattern.captures(args).map(|c| c[1].to_string());
        let number = |pattern: &Regex| text(pattern).and_then(|s| s.parse::<f64>().ok());
        Some(Self {
            wfs: text(&WFS_PATTERN)?,
            magnitude: number(&MAG_PATTERN)?,
            ref_x: number(&REF_X_PATTERN)?,
            ref_y: number(&REF_Y_PATTERN)?,
            mode: text(&MODE_PATTERN)?,
        })
    }

    /// A preset with a reference position is a real pointing for an instrument
    pub fn is_instrument(&self) -> bool {
        self.ref_x != 0.0 || self.ref_y != 0.0
    }
}

/// Left-biased AND of two command outcomes: a success takes the other outcome,
/// anything else (failure or unknown) is kept as is.
pub fn and_success(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match a {
        Some(true) => b,
        other => other,
    }
}

impl Command {
    /// Create an atomic command which started at `start_time`
    pub fn atomic(name: &str, args: &str, start_time: f64) -> Self {
        Self {
            kind: CommandKind::Atomic(name.to_string()),
            args: args.to_string(),
            start_time: Some(start_time),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            CommandKind::Atomic(name) => name,
            CommandKind::OffsetSequence(_) => OFFSET_SEQUENCE,
            CommandKind::ExposureSequence(_) => EXPOSURE_SEQUENCE,
            CommandKind::Acquire => ACQUIRE,
            CommandKind::CompleteObs(_) => COMPLETE_OBS,
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name() == name
    }

    pub fn is_any(&self, names: &[&str]) -> bool {
        names.contains(&self.name())
    }

    /// Execution time, if both ends are known
    pub fn elapsed(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// The parsed target of a PresetAO
    pub fn preset(&self) -> Option<PresetInfo> {
        if !self.is_named(PRESET_AO) {
            return None;
        }
        PresetInfo::parse(&self.args)
    }

    /// The parsed target of a PresetAO, only if it points an instrument
    pub fn instrument_preset(&self) -> Option<PresetInfo> {
        self.preset().filter(PresetInfo::is_instrument)
    }

    pub fn is_instrument_preset(&self) -> bool {
        self.instrument_preset().is_some()
    }

    /// View of a complete observation, with its metrics
    pub fn as_complete_obs(&self) -> Option<CompleteObs<'_>> {
        match &self.kind {
            CommandKind::CompleteObs(observation) => Some(CompleteObs::new(self, observation)),
            _ => None,
        }
    }

    /// Time between the end of the Pause and the start of the Resume
    pub fn time_paused(&self) -> f64 {
        match &self.kind {
            CommandKind::OffsetSequence(bracket) => bracket_gap(
                bracket.pause.as_ref().and_then(|p| p.end_time),
                bracket.resume.as_ref().and_then(|r| r.start_time),
            ),
            _ => 0.0,
        }
    }

    /// Time between the end of the Resume and the start of the next Pause
    pub fn time_exposing(&self) -> f64 {
        match &self.kind {
            CommandKind::ExposureSequence(bracket) => bracket_gap(
                bracket.resume.as_ref().and_then(|r| r.end_time),
                bracket.pause.as_ref().and_then(|p| p.start_time),
            ),
            _ => 0.0,
        }
    }

    /// Human readable description of the command parameters
    pub fn details(&self) -> Vec<String> {
        let mut details = Vec::new();
        match &self.kind {
            CommandKind::OffsetSequence(_) => details.extend(offset_details(&self.args)),
            CommandKind::Atomic(name) if name == OFFSET_XY => {
                details.extend(offset_details(&self.args))
            }
            CommandKind::Atomic(name) if name == PRESET_AO => match self.preset() {
                Some(preset) => {
                    details.push(format!(
                        "{}, star mag= {:.1}, posXY= {}, {} mm, mode = {}",
                        preset.wfs,
                        preset.magnitude,
                        format_position(preset.ref_x),
                        format_position(preset.ref_y),
                        preset.mode
                    ));
                    details.push(
                        match self.intervention {
                            Some(true) => "Intervention mode",
                            Some(false) => "Automatic mode",
                            None => "Intervention/automatic mode unknown",
                        }
                        .to_string(),
                    );
                }
                None => log::debug!("PresetAO with incomplete arguments: {}", self.args),
            },
            CommandKind::CompleteObs(observation) => {
                let obs = CompleteObs::new(self, observation);
                match obs.total_open_time() {
                    Ok(open) => {
                        let total = obs.total_time();
                        let percent = if total != 0.0 {
                            open * 100.0 / total
                        } else {
                            0.0
                        };
                        details.push(format!(
                            "{}, open shutter: {}s ({}%)",
                            observation.wfs,
                            open.trunc() as i64,
                            percent.trunc() as i64
                        ));
                    }
                    Err(e) => log::error!("Cannot describe observation: {e}"),
                }
            }
            CommandKind::Acquire => {
                if let Some(mag) = self.estimated_mag {
                    details.push(format!("Estimated magnitude: {mag:.1}"));
                }
                if let Some(binning) = self.ho_binning {
                    details.push(format!("Ccd39 binning: {binning}"));
                }
                if let Some(speed) = self.ho_speed {
                    details.push(format!("Loop speed: {speed} Hz"));
                }
            }
            _ => (),
        }
        details
    }

    /// Secondary details (time spent inside the sequence)
    pub fn extra_details(&self) -> Vec<String> {
        match &self.kind {
            CommandKind::OffsetSequence(_) => {
                vec![format!("Time paused: {:.1}s", self.time_paused())]
            }
            CommandKind::ExposureSequence(_) => {
                vec![format!("Time exposing: {:.1}s", self.time_exposing())]
            }
            _ => Vec::new(),
        }
    }

    /// Error text for display. PresetAO errors are stripped of their boilerplate.
    pub fn error_string(&self) -> String {
        if self.is_named(PRESET_AO) {
            PRESET_ERROR_NOISE
                .iter()
                .fold(self.error.clone(), |err, noise| err.replace(noise, ""))
                .trim()
                .to_string()
        } else {
            self.error.clone()
        }
    }

    pub fn success_str(&self) -> String {
        match self.success {
            Some(true) => String::from("Success"),
            Some(false) => format!("Failure: {}", self.error),
            None => String::from("Unknown"),
        }
    }

    /// One line summary: time, outcome and details
    pub fn report(&self) -> String {
        format!(
            "{} {} {}",
            self.start_time
                .map(time_str)
                .unwrap_or_else(|| String::from("Unknown")),
            self.success_str(),
            self.details().join(" - ")
        )
    }
}

fn bracket_gap(from: Option<f64>, to: Option<f64>) -> f64 {
    match (from, to) {
        (Some(from), Some(to)) => to - from,
        _ => 0.0,
    }
}

fn offset_details(args: &str) -> Option<String> {
    let coords: Vec<f64> = NUMBER_PATTERN
        .find_iter(args)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    match coords[..] {
        [x, y] => Some(format!("X={x:.2}, Y={y:.2} mm")),
        _ => None,
    }
}

/// One decimal, without a negative zero
fn format_position(x: f64) -> String {
    let s = format!("{x:.1}");
    if s == "-0.0" {
        String::from("0.0")
    } else {
        s
    }
}
