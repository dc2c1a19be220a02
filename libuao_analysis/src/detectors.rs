use std::rc::Rc;

use super::command::{and_success, Bracket, Command, CommandKind, CommandRef};
use super::constants::*;
use super::observation::Observation;

/// Detect Pause - OffsetXY - Resume sequences (and their incomplete variants) and
/// Resume - Pause exposures.
///
/// Like every detector pass, returns every input command in order, with the recognized
/// composites inserted in front of the command where they were recognized.
pub fn detect_offsets(commands: &[CommandRef]) -> Vec<CommandRef> {
    let mut new_commands = Vec::with_capacity(commands.len());
    for (n, cmd) in commands.iter().enumerate() {
        if let Some(sequence) = offset_sequence(&commands[n..]) {
            new_commands.push(Rc::new(sequence));
        }
        new_commands.push(cmd.clone());
    }
    new_commands
}

/// Recognize a sequence starting at the head of the window
fn offset_sequence(window: &[CommandRef]) -> Option<Command> {
    match window {
        [pause, offset, resume, ..]
            if pause.is_named(PAUSE) && offset.is_named(OFFSET_XY) && resume.is_named(RESUME) =>
        {
            let parts = [pause, offset, resume];
            Some(Command {
                kind: CommandKind::OffsetSequence(bracket(Some(pause), Some(resume))),
                args: offset.args.clone(),
                start_time: pause.start_time,
                end_time: resume.end_time,
                success: parts[1..]
                    .iter()
                    .fold(pause.success, |acc, cmd| and_success(acc, cmd.success)),
                error: join_errors(&parts),
                ..Default::default()
            })
        }
        [pause, offset, ..] if pause.is_named(PAUSE) && offset.is_named(OFFSET_XY) => {
            let completed = pause.success == Some(true) && offset.success == Some(true);
            Some(Command {
                kind: CommandKind::OffsetSequence(bracket(Some(pause), None)),
                args: offset.args.clone(),
                start_time: pause.start_time,
                end_time: offset.end_time,
                success: Some(false),
                error: if completed {
                    String::from("Resume was not sent")
                } else {
                    join_errors(&[pause, offset])
                },
                ..Default::default()
            })
        }
        [pause, resume, ..] if pause.is_named(PAUSE) && resume.is_named(RESUME) => {
            Some(Command {
                kind: CommandKind::OffsetSequence(bracket(Some(pause), Some(resume))),
                start_time: pause.start_time,
                end_time: resume.end_time,
                success: and_success(pause.success, resume.success),
                error: join_errors(&[pause, resume]),
                ..Default::default()
            })
        }
        [pause, ..] if pause.is_named(PAUSE) => {
            let (success, error) = match pause.success {
                Some(true) => (Some(false), String::from("no OffsetXY or Resume")),
                other => (other, pause.error.clone()),
            };
            Some(Command {
                kind: CommandKind::OffsetSequence(bracket(Some(pause), None)),
                start_time: pause.start_time,
                end_time: pause.end_time,
                success,
                error,
                ..Default::default()
            })
        }
        [resume, pause, ..] if resume.is_named(RESUME) && pause.is_named(PAUSE) => {
            Some(Command {
                kind: CommandKind::ExposureSequence(bracket(Some(pause), Some(resume))),
                start_time: resume.start_time,
                end_time: resume.end_time,
                success: and_success(resume.success, pause.success),
                error: join_errors(&[resume, pause]),
                ..Default::default()
            })
        }
        _ => None,
    }
}

fn bracket(pause: Option<&CommandRef>, resume: Option<&CommandRef>) -> Bracket {
    Bracket {
        pause: pause.cloned(),
        resume: resume.cloned(),
    }
}

fn join_errors(commands: &[&CommandRef]) -> String {
    commands
        .iter()
        .map(|cmd| cmd.error.as_str())
        .collect::<Vec<&str>>()
        .join(" ")
}

/// An Acquire being assembled from an AcquireRefAO and its sub-commands
struct AcquireWindow {
    acquire: Command,
    done: bool,
}

impl AcquireWindow {
    fn new(acquire_ref: &Command) -> Self {
        Self {
            acquire: Command {
                kind: CommandKind::Acquire,
                start_time: acquire_ref.start_time,
                success: acquire_ref.success,
                error: acquire_ref.error.clone(),
                ..Default::default()
            },
            done: false,
        }
    }

    fn fold(&mut self, cmd: &Command) {
        self.acquire.success = and_success(self.acquire.success, cmd.success);
        self.acquire.error.push_str(&cmd.error);
        self.acquire.end_time = cmd.end_time;
    }

    fn copy_flux_measurements(&mut self, cmd: &Command) {
        if cmd.estimated_mag.is_some() {
            self.acquire.estimated_mag = cmd.estimated_mag;
        }
        if cmd.ho_binning.is_some() {
            self.acquire.ho_binning = cmd.ho_binning;
        }
        if cmd.ho_speed.is_some() {
            self.acquire.ho_speed = cmd.ho_speed;
        }
    }
}

/// Detect AcquireRefAO sequences and group them into an Acquire command.
///
/// The Acquire is emitted when a Done succeeds, or as a failure as soon as an unrelated
/// command interrupts the sequence before any Done.
pub fn detect_acquires(commands: &[CommandRef]) -> Vec<CommandRef> {
    let mut new_commands = Vec::with_capacity(commands.len());
    let mut window: Option<AcquireWindow> = None;
    for cmd in commands {
        if cmd.is_named(ACQUIRE_REF_AO) {
            window = Some(AcquireWindow::new(cmd));
        } else if let Some(mut current) = window.take() {
            if cmd.is_named(CHECK_FLUX) {
                current.fold(cmd);
                current.copy_flux_measurements(cmd);
                window = Some(current);
            } else if cmd.is_any(&ACQUIRE_SUBCOMMANDS) {
                current.fold(cmd);
                window = Some(current);
            } else if cmd.is_named(DONE) {
                current.fold(cmd);
                current.done = true;
                if cmd.success == Some(true) {
                    new_commands.push(Rc::new(current.acquire));
                } else {
                    window = Some(current);
                }
            } else if !current.done {
                current.acquire.success = Some(false);
                current.acquire.error.push_str(" Command not completed");
                new_commands.push(Rc::new(current.acquire));
            } else {
                window = Some(current);
            }
        }
        new_commands.push(cmd.clone());
    }
    new_commands
}

/// A complete observation being assembled
struct PendingObs {
    start_time: Option<f64>,
    observation: Observation,
}

impl PendingObs {
    fn complete(self, end_time: Option<f64>) -> Command {
        Command {
            kind: CommandKind::CompleteObs(self.observation),
            start_time: self.start_time,
            end_time,
            success: Some(true),
            ..Default::default()
        }
    }
}

enum ObsState {
    Outside,
    InPreset(PendingObs),
    InObs(PendingObs),
}

/// Detect complete observations: an instrument PresetAO, its StartAO and the StopAO.
///
/// A Cancel before StartAO drops the observation. A new instrument PresetAO always starts
/// a new observation, dropping any observation in progress.
pub fn detect_complete_obs(commands: &[CommandRef]) -> Vec<CommandRef> {
    let mut new_commands = Vec::with_capacity(commands.len());
    let mut state = ObsState::Outside;
    for cmd in commands {
        state = if let Some(preset) = cmd.instrument_preset() {
            ObsState::InPreset(PendingObs {
                start_time: cmd.start_time,
                observation: Observation {
                    wfs: preset.wfs,
                    mode: preset.mode,
                    magnitude: preset.magnitude,
                    commands: vec![cmd.clone()],
                },
            })
        } else {
            match state {
                ObsState::InPreset(_) if cmd.is_named(CANCEL) => ObsState::Outside,
                ObsState::InObs(mut pending) => {
                    pending.observation.commands.push(cmd.clone());
                    if cmd.is_any(&STOP_NAMES) {
                        new_commands.push(Rc::new(pending.complete(cmd.end_time)));
                        ObsState::Outside
                    } else {
                        ObsState::InObs(pending)
                    }
                }
                ObsState::InPreset(mut pending) => {
                    pending.observation.commands.push(cmd.clone());
                    if cmd.is_any(&START_AO_NAMES) {
                        ObsState::InObs(pending)
                    } else {
                        ObsState::InPreset(pending)
                    }
                }
                ObsState::Outside => ObsState::Outside,
            }
        };
        new_commands.push(cmd.clone());
    }
    new_commands
}
