use std::io::Write;

use super::command::CommandRef;
use super::config::Config;
use super::constants::*;
use super::csv_table::{update_command_table, update_observation_table};
use super::detectors::{detect_acquires, detect_complete_obs, detect_offsets};
use super::error::ProcessorError;
use super::event::{EventKind, PointEvent};
use super::extractor::extract_commands;
use super::log_source::LineSource;
use super::report::ReportWriter;
use super::search::search;

/// Where point events are searched for: (component, filter, kind)
const EVENT_SOURCES: [(&str, &str, EventKind); 4] = [
    (ARBITRATOR_COMPONENT, " - SkipFrame", EventKind::SkipFrame),
    (FASTDIAGN_COMPONENT, "Failing actuator detected", EventKind::FailedActuator),
    (FASTDIAGN_COMPONENT, "FUNCTEMERGENCYST", EventKind::RIP),
    (HOUSEKEEPER_COMPONENT, "FUNCTEMERGENCYST", EventKind::RIP),
];

/// Reconstruct the command timeline of the day from the arbitrator log.
///
/// Returns the flat command list with every composite command detected.
pub fn build_timeline(source: &dyn LineSource) -> Result<Vec<CommandRef>, ProcessorError> {
    let lines = search(
        source.lines(ARBITRATOR_COMPONENT, Some(ARBITRATOR_FILTER))?,
        ARBITRATOR_MINDIFF,
    );
    log::info!("Found {} arbitrator lines", lines.len());

    let commands = extract_commands(lines);
    log::info!("Extracted {} commands", commands.len());

    let commands = detect_offsets(&commands);
    let commands = detect_acquires(&commands);
    Ok(detect_complete_obs(&commands))
}

/// Collect the point events of the day
pub fn collect_events(source: &dyn LineSource) -> Result<Vec<PointEvent>, ProcessorError> {
    let mut events = Vec::new();
    for (component, filter, kind) in EVENT_SOURCES {
        for line in search(source.lines(component, Some(filter))?, EVENT_MINDIFF) {
            match PointEvent::from_log_line(kind, component, &line) {
                Ok(event) => events.push(event),
                Err(e) => log::warn!("Skipping {kind} event: {e}"),
            }
        }
    }
    Ok(events)
}

fn commands_named(commands: &[CommandRef], name: &str) -> Vec<CommandRef> {
    commands
        .iter()
        .filter(|cmd| cmd.is_named(name))
        .cloned()
        .collect()
}

/// The main loop of uao_analysis.
///
/// Reads the logs of the configured day, updates the csv tables in the output directory
/// and writes the report to `out`.
pub fn process<W: Write>(
    config: &Config,
    source: &dyn LineSource,
    out: W,
) -> Result<W, ProcessorError> {
    config.validate()?;
    let mut report = ReportWriter::new(out, config.html);
    report.begin(&config.day)?;

    let commands = build_timeline(source)?;

    log::info!("Updating tables in {}", config.output_path.display());
    update_observation_table(config, &commands_named(&commands, COMPLETE_OBS))?;
    for name in TIMED_COMMANDS {
        update_command_table(config, name, &commands_named(&commands, name))?;
    }

    let events = collect_events(source)?;
    report.write_events("Events", &events)?;

    for (name, title) in REPORT_SECTIONS {
        let rate = report.write_commands(title, &commands_named(&commands, name))?;
        log::debug!("{name}: success rate {:.0}%", rate * 100.0);
    }

    Ok(report.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_source::{LogDirectory, MemorySource};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::File;

    const PRESET: &str = "Request: PresetAO(wfsSpec = LBTIWFS, expectedStarMagnitude = 9.5, roCoordX = 1.5, roCoordY = -2.0, mode = ACE)";

    fn line(hms: &str, msg: &str) -> String {
        format!("AOARB|R|MAIN|2021-03-04 {hms}|{msg}")
    }

    fn arbitrator_lines() -> Vec<String> {
        vec![
            line("01:00:00.000000", PRESET),
            line("01:00:01.000000", "Intervention: False"),
            line("01:01:00.000000", "Status after command: PresetAO"),
            line("01:01:10.000000", "Request: AcquireRefAO()"),
            line("01:01:20.000000", "Estimated magnitude from ccd39: 9.7"),
            line("01:01:40.000000", "Status after command: AOArbitrator.ReadyForStartAO"),
            line("01:01:50.000000", "Request: StartAO()"),
            line("01:02:10.000000", "Status after command: StartAO"),
            line("01:30:00.000000", "Request: Pause()"),
            line("01:30:02.000000", "Status after command: Pause"),
            line("01:30:03.000000", "Request: OffsetXY(1.0,2.0)"),
            line("01:30:05.000000", "Status after command: OffsetXY"),
            line("01:30:06.000000", "Request: Resume()"),
            line("01:30:08.000000", "Status after command: Resume"),
            line("02:00:00.000000", "Request: StopAO()"),
            line("02:00:10.000000", "Status after command: StopAO"),
        ]
    }

    fn memory_source() -> MemorySource {
        let mut source = MemorySource::new();
        source.add_lines(ARBITRATOR_COMPONENT, arbitrator_lines());
        source.add_lines(
            FASTDIAGN_COMPONENT,
            [
                "fastdiagn|R|DIAG|2021-03-04 01:40:00.000000|ADSEC> Failing actuator detected N. 12 stuck",
                "fastdiagn|R|DIAG|2021-03-04 01:40:30.000000|ADSEC> Failing actuator detected N. 12 stuck",
            ],
        );
        source.add_lines(HOUSEKEEPER_COMPONENT, Vec::<String>::new());
        source
    }

    #[test]
    fn test_build_timeline() {
        let commands = build_timeline(&memory_source()).unwrap();
        let obs: Vec<&CommandRef> = commands
            .iter()
            .filter(|c| c.is_named(COMPLETE_OBS))
            .collect();
        assert_eq!(obs.len(), 1);
        let metrics = obs[0].as_complete_obs().unwrap();
        assert_eq!(metrics.total_time(), 3610.0);
        assert_eq!(metrics.setup_duration().unwrap(), 130.0);
        assert_eq!(metrics.offsets_overhead(), 8.0);

        let acquire_ref = commands
            .iter()
            .find(|c| c.is_named(ACQUIRE_REF_AO))
            .unwrap();
        assert_eq!(acquire_ref.elapsed(), Some(30.0));
    }

    #[test]
    fn test_collect_events() {
        let events = collect_events(&memory_source()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actuator, Some(12));
    }

    #[test]
    fn test_missing_component_is_fatal() {
        let source = MemorySource::new();
        assert!(build_timeline(&source).is_err());
    }

    #[test]
    fn test_process_log_directory() {
        let logs = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let day_dir = logs.path().join("2021").join("03").join("04");
        std::fs::create_dir_all(&day_dir).unwrap();

        let lines = arbitrator_lines();
        let (morning, rest) = lines.split_at(8);
        let mut encoder = GzEncoder::new(
            File::create(day_dir.join("AOARB.R.202103040100.log.gz")).unwrap(),
            Compression::default(),
        );
        encoder.write_all(morning.join("\n").as_bytes()).unwrap();
        encoder.write_all(b"\n").unwrap();
        encoder.finish().unwrap();
        std::fs::write(day_dir.join("AOARB.R.202103040130.log"), rest.join("\n")).unwrap();
        std::fs::write(day_dir.join("fastdiagn.R.202103040000.log"), "").unwrap();
        std::fs::write(day_dir.join("housekeeper.R.202103040000.log"), "").unwrap();

        let config = Config {
            day: String::from("20210304"),
            log_path: logs.path().to_path_buf(),
            output_path: output.path().to_path_buf(),
            ..Default::default()
        };
        let source = LogDirectory::new(&config);

        let out = process(&config, &source, Vec::new()).unwrap();
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("Complete observations (from PresetAO to StopAO, instrument presets only)\nTotal: 1 - Success rate: 100%"));
        assert!(report.contains("Pause - Offset - Resume sequences\nTotal: 1 - Success rate: 100%"));

        // A rerun leaves the tables unchanged
        process(&config, &source, std::io::sink()).unwrap();

        let data = std::fs::read_to_string(config.get_data_csv_path()).unwrap();
        assert_eq!(data.lines().count(), 2);
        assert!(data.lines().nth(1).unwrap().starts_with("20210304,01:00:00,3610,"));

        let cmds = std::fs::read_to_string(config.get_cmd_csv_path()).unwrap();
        assert_eq!(
            cmds,
            "day,hour,command,elapsed\n20210304,01:00:00,PresetAO,60\n20210304,01:30:03,OffsetXY,2\n"
        );
    }

    #[test]
    fn test_process_missing_logs() {
        let logs = tempfile::tempdir().unwrap();
        let config = Config {
            day: String::from("20210304"),
            log_path: logs.path().to_path_buf(),
            output_path: logs.path().to_path_buf(),
            ..Default::default()
        };
        let source = LogDirectory::new(&config);
        match process(&config, &source, Vec::new()) {
            Err(ProcessorError::LogSourceError(_)) => (),
            other => panic!("expected a missing log error, got {:?}", other.map(|_| ())),
        }
    }
}
