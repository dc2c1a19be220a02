use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::command::CommandRef;
use super::config::Config;
use super::error::CsvTableError;
use super::timestamp::{day_str, hour_str};

pub const CMD_HEADER: [&str; 4] = ["day", "hour", "command", "elapsed"];
pub const DATA_HEADER: [&str; 13] = [
    "day", "hour", "time", "time_h", "open", "open_h", "setup", "aosetup", "telsetup",
    "offsets", "wfs", "mode", "magnitude",
];

const DAY_COLUMN: usize = 0;
const COMMAND_COLUMN: usize = 2;

/// A CSV table held in memory; the first column is always the day.
///
/// Tables accumulate results across days. A run rewrites the whole file, replacing the rows
/// of the day being analysed. There is no locking: concurrent runs race and the last writer
/// wins.
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Load the table at path. A missing file is an empty table.
    pub fn load(path: &Path, header: &[&str]) -> Result<Self, CsvTableError> {
        let mut rows = Vec::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let row: Vec<String> = line.split(',').map(String::from).collect();
                // Skip the header
                if row[DAY_COLUMN] == header[DAY_COLUMN] {
                    continue;
                }
                rows.push(row);
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows,
        })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Vec<String>) -> bool,
    {
        self.rows.retain(keep);
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Sort by day (stable) and rewrite the whole file
    pub fn save(&mut self) -> Result<(), CsvTableError> {
        self.rows.sort_by(|a, b| a[DAY_COLUMN].cmp(&b[DAY_COLUMN]));
        let mut file = File::create(&self.path)?;
        writeln!(file, "{}", self.header.join(","))?;
        for row in &self.rows {
            writeln!(file, "{}", row.join(","))?;
        }
        Ok(())
    }
}

/// Replace the elapsed times of the named command for the configured day
pub fn update_command_table(
    config: &Config,
    name: &str,
    commands: &[CommandRef],
) -> Result<(), CsvTableError> {
    let mut table = CsvTable::load(&config.get_cmd_csv_path(), &CMD_HEADER)?;
    table.retain(|row| row[DAY_COLUMN] != config.day || row.get(COMMAND_COLUMN).map(String::as_str) != Some(name));

    for cmd in commands.iter().filter(|cmd| cmd.is_named(name)) {
        if cmd.success != Some(true) {
            continue;
        }
        let (Some(start), Some(elapsed)) = (cmd.start_time, cmd.elapsed()) else {
            continue;
        };
        table.push(vec![
            day_str(start),
            hour_str(start),
            name.to_string(),
            format!("{}", elapsed.trunc() as i64),
        ]);
    }

    table.save()
}

/// Replace the observation metrics of the configured day
pub fn update_observation_table(
    config: &Config,
    commands: &[CommandRef],
) -> Result<(), CsvTableError> {
    let mut table = CsvTable::load(&config.get_data_csv_path(), &DATA_HEADER)?;
    table.retain(|row| row[DAY_COLUMN] != config.day);

    for cmd in commands {
        let Some(obs) = cmd.as_complete_obs() else {
            continue;
        };
        let Some(start) = cmd.start_time else {
            continue;
        };
        let metrics = obs.setup_duration().and_then(|setup| {
            Ok((setup, obs.total_open_time()?, obs.telescope_overhead()?))
        });
        let (setup, open, telescope) = match metrics {
            Ok(m) => m,
            Err(e) => {
                log::error!("Skipping observation starting at {}: {e}", hour_str(start));
                continue;
            }
        };

        let total = obs.total_time().trunc();
        let open = open.trunc();
        let observation = obs.observation();
        table.push(vec![
            day_str(start),
            hour_str(start),
            format!("{}", total as i64),
            format!("{:?}", total / 3600.0),
            format!("{}", open as i64),
            format!("{:?}", open / 3600.0),
            format!("{}", setup.trunc() as i64),
            format!("{}", obs.ao_setup_overhead().trunc() as i64),
            format!("{}", telescope.trunc() as i64),
            format!("{}", obs.offsets_overhead().trunc() as i64),
            observation.wfs.clone(),
            observation.mode.clone(),
            format!("{:?}", observation.magnitude),
        ]);
    }

    table.save()
}
