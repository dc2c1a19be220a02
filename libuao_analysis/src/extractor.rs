use regex::Regex;
use std::rc::Rc;
use std::sync::LazyLock;

use super::command::{Command, CommandRef};
use super::constants::*;
use super::error::ExtractorError;
use super::timestamp::log_timestamp;

/// One way of spelling a request in the arbitrator log
struct RequestPattern {
    regex: Regex,
    has_args: bool,
}

impl RequestPattern {
    fn new(pattern: &str, has_args: bool) -> Self {
        Self {
            regex: Regex::new(pattern).expect("request pattern is valid"),
            has_args,
        }
    }
}

/// Request spellings, by priority: the first one to match wins
static REQUEST_PATTERNS: LazyLock<[RequestPattern; 3]> = LazyLock::new(|| {
    [
        RequestPattern::new(r"Request: (.*?)\((.*)\)", true),
        RequestPattern::new(r"Request: (.*)", false),
        RequestPattern::new(r"has received command \d+ \((.*)\)", false),
    ]
});

/// Extract the name and argument string of a request line
fn parse_request(line: &str) -> Option<(String, String)> {
    REQUEST_PATTERNS.iter().find_map(|pattern| {
        pattern.regex.captures(line).map(|cap| {
            let args = if pattern.has_args {
                cap[2].to_string()
            } else {
                String::new()
            };
            (cap[1].to_string(), args)
        })
    })
}

/// The text following `marker` in `line`
fn after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker).map(|pos| &line[pos + marker.len()..])
}

/// CommandExtractor takes the lines of the arbitrator log and composes them into Commands.
///
/// A start marker opens a new command; the lines which follow complete it (end marker,
/// errors, extra information) until the next start marker, at which point the command is
/// emitted as is. Commands which never see an end marker are emitted with an unknown outcome.
#[derive(Debug, Default)]
pub struct CommandExtractor {
    current: Option<Command>,
    commands: Vec<Command>,
    /// Position of the last AcquireRefAO in the output, patched when the arbitrator
    /// signals it is ready for StartAO
    last_acquire: Option<usize>,
}

impl CommandExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line of the log to the extractor.
    ///
    /// An error means the line could not be used; the extractor stays consistent and
    /// the next line can be fed.
    pub fn append_line(&mut self, line: &str) -> Result<(), ExtractorError> {
        if line.contains(START_CMD_FLAO) || line.contains(START_CMD_UAO) {
            if line.contains(IGNORED_REQUEST) {
                return Ok(());
            }
            self.flush_command();

            let t = log_timestamp(line)?;
            let (name, args) = parse_request(line)
                .ok_or_else(|| ExtractorError::MalformedRequest(line.to_string()))?;
            if name == ACQUIRE_REF_AO {
                self.last_acquire = Some(self.commands.len());
            }
            self.current = Some(Command::atomic(&name, &args, t));
        } else if line.contains(END_CMD_FLAO) || line.contains(END_CMD_UAO) {
            let t = log_timestamp(line)?;
            let cmd = self.current_command(line)?;
            cmd.end_time = Some(t);
            cmd.success = Some(true);
            cmd.error.clear();

            if line.contains(READY_FOR_START_MARKER) {
                if let Some(acquire) = self.last_acquire.and_then(|idx| self.command_at(idx)) {
                    acquire.end_time = Some(t);
                }
            }
        } else if let Some(rest) = after(line, EXCEPTION_MARKER) {
            let cmd = self.current_command(line)?;
            cmd.error = rest.trim().to_string();
            cmd.success = Some(false);
        } else if let Some(pos) = line.find(ILLEGAL_CMD_MARKER) {
            let cmd = self.current_command(line)?;
            cmd.error = line[pos..].trim().to_string();
            cmd.success = Some(false);
        } else if let Some(rest) = after(line, INTERVENTION_MARKER) {
            // The flag follows the marker after a single separator
            let flag = rest.get(1..).is_some_and(|s| s.starts_with("True"));
            self.current_command(line)?.intervention = Some(flag);
        } else if let Some(rest) = after(line, ESTIMATED_MAG_MARKER) {
            let mag: f64 = rest.trim().parse()?;
            self.current_command(line)?.estimated_mag = Some(mag);
        } else if let Some(rest) = after(line, HO_BINNING_MARKER) {
            let binning: i64 = rest.trim().parse()?;
            self.current_command(line)?.ho_binning = Some(binning);
        } else if let Some(rest) = after(line, HO_SPEED_MARKER) {
            let speed: i64 = rest
                .split_whitespace()
                .next()
                .ok_or_else(|| ExtractorError::MissingValue(line.to_string()))?
                .parse()?;
            self.current_command(line)?.ho_speed = Some(speed);
        }
        Ok(())
    }

    /// Takes any remaining command and returns everything extracted.
    ///
    /// Used at the end of the log.
    pub fn finish(mut self) -> Vec<CommandRef> {
        self.flush_command();
        self.commands.into_iter().map(Rc::new).collect()
    }

    fn flush_command(&mut self) {
        if let Some(cmd) = self.current.take() {
            self.commands.push(cmd);
        }
    }

    fn current_command(&mut self, line: &str) -> Result<&mut Command, ExtractorError> {
        self.current
            .as_mut()
            .ok_or_else(|| ExtractorError::NoOpenCommand(line.to_string()))
    }

    /// A command by output position, whether already emitted or still open
    fn command_at(&mut self, idx: usize) -> Option<&mut Command> {
        if idx < self.commands.len() {
            self.commands.get_mut(idx)
        } else if idx == self.commands.len() {
            self.current.as_mut()
        } else {
            None
        }
    }
}

/// Run the extractor over every line, skipping the lines it cannot use
pub fn extract_commands<I>(lines: I) -> Vec<CommandRef>
where
    I: IntoIterator<Item = String>,
{
    let mut extractor = CommandExtractor::new();
    for line in lines {
        match extractor.append_line(&line) {
            Ok(()) => (),
            Err(e @ ExtractorError::MalformedRequest(_)) => log::warn!("{e}"),
            Err(e) => log::debug!("{e}"),
        }
    }
    extractor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(t: &str, msg: &str) -> String {
        format!("AOARB|R|MAIN|2021-03-04 00:00:{t}|{msg}")
    }

    const T0: f64 = 1614816000.0;

    #[test]
    fn test_request_patterns() {
        assert_eq!(
            parse_request("> Request: OffsetXY(1.0,2.0)"),
            Some((String::from("OffsetXY"), String::from("1.0,2.0")))
        );
        assert_eq!(
            parse_request("> Request: StartAO"),
            Some((String::from("StartAO"), String::new()))
        );
        assert_eq!(
            parse_request("FSM (status READY) has received command 12 (Start AO)"),
            Some((String::from("Start AO"), String::new()))
        );
        assert_eq!(parse_request("FSM (status READY) idle"), None);
    }

    #[test]
    fn test_start_and_end() {
        let commands = extract_commands(vec![
            line("00.000000", "Request: Pause()"),
            line("02.000000", "Status after command: Pause"),
            line("03.000000", "Request: OffsetXY(1.0,2.0)"),
            line("04.000000", "[AOException] offset too large"),
            line("06.000000", "Request: Resume()"),
        ]);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].name(), "Pause");
        assert_eq!(commands[0].start_time, Some(T0));
        assert_eq!(commands[0].end_time, Some(T0 + 2.0));
        assert_eq!(commands[0].success, Some(true));
        assert_eq!(commands[1].args, "1.0,2.0");
        assert_eq!(commands[1].success, Some(false));
        assert_eq!(commands[1].error, "offset too large");
        assert_eq!(commands[1].end_time, None);
        assert_eq!(commands[2].success, None);
    }

    #[test]
    fn test_illegal_command() {
        let commands = extract_commands(vec![
            line("00.000000", "Request: Foo()"),
            line("01.000000", "MAIN> Illegal command Foo in state READY"),
        ]);
        assert_eq!(commands[0].success, Some(false));
        assert_eq!(commands[0].error, "Illegal command Foo in state READY");
    }

    #[test]
    fn test_ignored_and_malformed() {
        let commands = extract_commands(vec![
            line("00.000000", "Request: Pause()"),
            line("01.000000", "Request: getLastImage()"),
            line("02.000000", "Status after command: Pause"),
            line("03.000000", "FSM (status READY) nothing useful"),
            line("04.000000", "Status after command: orphan"),
        ]);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].end_time, Some(T0 + 2.0));
    }

    #[test]
    fn test_acquire_fields_and_ready_signal() {
        let commands = extract_commands(vec![
            line("00.000000", "Request: AcquireRefAO(x)"),
            line("01.000000", "Intervention: True"),
            line("02.000000", "Estimated magnitude from ccd39: 10.25"),
            line("03.000000", "HO binning  : 2"),
            line("04.000000", "HO speed    : 990 Hz"),
            line("05.000000", "Request: CheckFlux()"),
            line("09.000000", "Status after command: AOArbitrator.ReadyForStartAO"),
        ]);
        assert_eq!(commands.len(), 2);
        let acquire = &commands[0];
        assert_eq!(acquire.intervention, Some(true));
        assert_eq!(acquire.estimated_mag, Some(10.25));
        assert_eq!(acquire.ho_binning, Some(2));
        assert_eq!(acquire.ho_speed, Some(990));
        assert_eq!(acquire.end_time, Some(T0 + 9.0));
        assert_eq!(acquire.success, None);
        assert_eq!(commands[1].end_time, Some(T0 + 9.0));
        assert_eq!(commands[1].success, Some(true));
    }

    #[test]
    fn test_intervention_false() {
        let commands = extract_commands(vec![
            line("00.000000", "Request: PresetAO(x)"),
            line("01.000000", "Intervention: False"),
        ]);
        assert_eq!(commands[0].intervention, Some(false));
    }
}
