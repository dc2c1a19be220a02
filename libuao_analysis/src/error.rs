use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("Log line has no timestamp field: {0}")]
    MissingField(String),
    #[error("Timestamp field {0:?} is not of the form 'YYYY-MM-DD HH:MM:SS.ffffff'")]
    BadFormat(String),
    #[error("Failed to parse timestamp date/time: {0}")]
    ParsingError(#[from] time::error::Parse),
    #[error("Failed to parse timestamp microseconds: {0}")]
    MicrosecondError(#[from] std::num::ParseIntError),
}

#[derive(Debug, Error)]
pub enum LogSourceError {
    #[error("Cannot find log file(s) matching: {0}")]
    NoMatchingFiles(String),
    #[error("LogSource was given an invalid glob pattern: {0}")]
    BadPattern(#[from] glob::PatternError),
    #[error("LogSource failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event failed due to timestamp error: {0}")]
    TimestampError(#[from] TimestampError),
    #[error("Event line has no message part: {0}")]
    MissingMessage(String),
    #[error("Event line has no actuator number: {0}")]
    MissingActuator(String),
    #[error("Event line has an invalid actuator number: {0}")]
    BadActuator(#[from] std::num::ParseIntError),
}

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("CommandExtractor failed due to timestamp error: {0}")]
    TimestampError(#[from] TimestampError),
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    #[error("CommandExtractor found a line with no open command: {0}")]
    NoOpenCommand(String),
    #[error("CommandExtractor failed to parse a float: {0}")]
    BadFloat(#[from] std::num::ParseFloatError),
    #[error("CommandExtractor failed to parse an integer: {0}")]
    BadInteger(#[from] std::num::ParseIntError),
    #[error("CommandExtractor found no value after marker in line: {0}")]
    MissingValue(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetricError {
    #[error("Complete observation contains no StartAO command")]
    NoStartAo,
    #[error("Complete observation contains {0} StartAO commands; expected exactly one")]
    MultipleStartAo(usize),
    #[error("Command {0} has no start or end time")]
    MissingTime(String),
}

#[derive(Debug, Error)]
pub enum CsvTableError {
    #[error("CsvTable failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has an invalid day {0:?}; expected YYYYMMDD")]
    BadDay(String),
    #[error("Config has an invalid side {0:?}; expected R or L")]
    BadSide(String),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to LogSource error: {0}")]
    LogSourceError(#[from] LogSourceError),
    #[error("Processor failed due to CsvTable error: {0}")]
    CsvError(#[from] CsvTableError),
    #[error("Processor failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}
