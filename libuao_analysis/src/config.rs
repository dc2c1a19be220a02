use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use time::macros::format_description;
use time::Date;

use super::error::ConfigError;

/// One of the two telescope sides, each with its own AO system and logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[default]
    R,
    L,
}

impl FromStr for Side {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "R" => Ok(Self::R),
            "L" => Ok(Self::L),
            _ => Err(ConfigError::BadSide(s.to_string())),
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::R => write!(f, "R"),
            Self::L => write!(f, "L"),
        }
    }
}

/// Structure representing the application configuration. Contains the day to analyse and pathing information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// UTC day in YYYYMMDD format
    pub day: String,
    pub side: Side,
    /// Root of the log tree, which contains YYYY/MM/DD subdirectories
    pub log_path: PathBuf,
    pub html: bool,
    /// Where the csv tables are kept
    pub output_path: PathBuf,
    pub verbose: bool,
}

impl Default for Config {
    /// Generate a new Config object. The day and log path will be empty/invalid
    fn default() -> Self {
        Self {
            day: String::from(""),
            side: Side::default(),
            log_path: PathBuf::from("None"),
            html: false,
            output_path: PathBuf::from("."),
            verbose: false,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Check that the day is a real calendar date
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Date::parse(&self.day, format_description!("[year][month][day]")) {
            Ok(_) => Ok(()),
            Err(_) => Err(ConfigError::BadDay(self.day.clone())),
        }
    }

    /// Get the directory holding the logs of the configured day
    pub fn get_day_directory(&self) -> PathBuf {
        let year = self.day.get(0..4).unwrap_or_default();
        let month = self.day.get(4..6).unwrap_or_default();
        let day = self.day.get(6..8).unwrap_or_default();
        self.log_path.join(year).join(month).join(day)
    }

    /// Get the glob pattern matching every hourly log file of a component
    pub fn get_log_glob(&self, component: &str) -> String {
        self.get_day_directory()
            .join(format!(
                "{component}.{}.{}[0-9][0-9][0-9][0-9].log*",
                self.side, self.day
            ))
            .to_string_lossy()
            .into_owned()
    }

    /// Get the path to the per-command elapsed time table
    pub fn get_cmd_csv_path(&self) -> PathBuf {
        self.output_path.join(format!("cmd_{}.csv", self.side))
    }

    /// Get the path to the per-observation table
    pub fn get_data_csv_path(&self) -> PathBuf {
        self.output_path.join(format!("data_{}.csv", self.side))
    }
}
