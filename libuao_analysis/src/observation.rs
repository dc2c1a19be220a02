use super::command::{Command, CommandRef};
use super::constants::{
    ACQUIRE_REF_AO, INTERVENTION_COMMANDS, PAUSE_NAMES, RESUME_NAMES, SETUP_EXCLUDED,
    START_AO_NAMES,
};
use super::error::MetricError;

/// Payload of a complete observation composite
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub wfs: String,
    pub mode: String,
    pub magnitude: f64,
    /// Every command from the PresetAO to the StopAO, both included
    pub commands: Vec<CommandRef>,
}

/// A complete observation composite together with its payload.
///
/// The observation runs from the start of an instrument PresetAO to the end of the StopAO
/// which closes it. Its duration splits into setup (up to the end of StartAO, itself AO
/// commands plus telescope overhead), offsets (inside Pause..Resume brackets) and open
/// shutter time.
#[derive(Debug, Clone, Copy)]
pub struct CompleteObs<'a> {
    command: &'a Command,
    observation: &'a Observation,
}

impl<'a> CompleteObs<'a> {
    pub fn new(command: &'a Command, observation: &'a Observation) -> Self {
        Self {
            command,
            observation,
        }
    }

    pub fn command(&self) -> &'a Command {
        self.command
    }

    pub fn observation(&self) -> &'a Observation {
        self.observation
    }

    /// Total observation time from start of PresetAO to end of StopAO
    pub fn total_time(&self) -> f64 {
        self.command.elapsed().unwrap_or(0.0)
    }

    /// The StartAO of the observation. There must be exactly one.
    fn start_ao(&self) -> Result<&'a CommandRef, MetricError> {
        let starts: Vec<&CommandRef> = self
            .observation
            .commands
            .iter()
            .filter(|cmd| cmd.is_any(&START_AO_NAMES))
            .collect();
        match starts[..] {
            [start] => Ok(start),
            [] => Err(MetricError::NoStartAo),
            _ => Err(MetricError::MultipleStartAo(starts.len())),
        }
    }

    /// Total setup time from start of PresetAO to end of StartAO
    pub fn setup_duration(&self) -> Result<f64, MetricError> {
        let start_ao = self.start_ao()?;
        let end = start_ao
            .end_time
            .ok_or_else(|| MetricError::MissingTime(start_ao.name().to_string()))?;
        let start = self
            .command
            .start_time
            .ok_or_else(|| MetricError::MissingTime(self.command.name().to_string()))?;
        Ok(end - start)
    }

    /// Time spent executing AO commands during setup.
    ///
    /// When the acquisition was driven by hand (any intervention command in the
    /// observation) the AcquireRefAO is left out, as its sub-commands are already counted.
    pub fn ao_setup_overhead(&self) -> f64 {
        let is_intervention = self
            .observation
            .commands
            .iter()
            .any(|cmd| cmd.is_any(&INTERVENTION_COMMANDS));

        let mut ao_time = 0.0;
        for cmd in &self.observation.commands {
            if cmd.is_any(&SETUP_EXCLUDED) {
                continue;
            }
            let Some(elapsed) = cmd.elapsed() else {
                continue;
            };
            if is_intervention && cmd.is_named(ACQUIRE_REF_AO) {
                continue;
            }
            ao_time += elapsed;
            if cmd.is_any(&START_AO_NAMES) {
                return ao_time;
            }
        }
        0.0
    }

    /// Telescope overhead during setup time
    pub fn telescope_overhead(&self) -> Result<f64, MetricError> {
        Ok(self.setup_duration()? - self.ao_setup_overhead())
    }

    /// Time spent executing offsets: from the start of each Pause to the end of its Resume
    pub fn offsets_overhead(&self) -> f64 {
        let mut offsets_time = 0.0;
        let mut pause_time: Option<f64> = None;
        for cmd in &self.observation.commands {
            if cmd.is_any(&PAUSE_NAMES) {
                pause_time = cmd.start_time;
            } else if cmd.is_any(&RESUME_NAMES) {
                if let (Some(pause), Some(resume)) = (pause_time.take(), cmd.end_time) {
                    offsets_time += resume - pause;
                }
            }
        }
        offsets_time
    }

    /// Total time available to the instrument
    pub fn total_open_time(&self) -> Result<f64, MetricError> {
        Ok(self.total_time() - self.setup_duration()? - self.offsets_overhead())
    }

    /// Time spent executing AO commands
    pub fn total_ao_overhead(&self) -> f64 {
        self.ao_setup_overhead() + self.offsets_overhead()
    }
}
