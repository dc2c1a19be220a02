use flate2::read::MultiGzDecoder;
use glob::glob;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::config::Config;
use super::error::LogSourceError;

/// Anything that can hand out the lines of a component log for the day being analysed.
///
/// Lines come back in file order, already decompressed, and restricted to the lines
/// containing `filter` when one is given.
pub trait LineSource {
    fn lines(
        &self,
        component: &str,
        filter: Option<&str>,
    ) -> Result<Box<dyn Iterator<Item = String>>, LogSourceError>;
}

/// The standard log tree: `<root>/YYYY/MM/DD/<component>.<side>.<day>HHMM.log[.gz]`
#[derive(Debug, Clone)]
pub struct LogDirectory {
    config: Config,
}

impl LogDirectory {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl LineSource for LogDirectory {
    fn lines(
        &self,
        component: &str,
        filter: Option<&str>,
    ) -> Result<Box<dyn Iterator<Item = String>>, LogSourceError> {
        let pattern = self.config.get_log_glob(component);
        let stack = LogStack::new(&pattern, filter)?;
        log::info!(
            "Reading {} file(s) ({}) matching {pattern} with filter {filter:?}",
            stack.file_stack.len() + 1,
            human_bytes::human_bytes(stack.total_stack_size_bytes as f64)
        );
        Ok(Box::new(stack))
    }
}

/// The hourly log files of one component, read back to back.
///
/// Files are sorted by name, which for this naming scheme is chronological.
/// Compressed (`.gz`) and plain files can be mixed.
pub struct LogStack {
    file_stack: VecDeque<PathBuf>,
    active_file: Box<dyn BufRead>,
    active_path: PathBuf,
    filter: Option<String>,
    pub total_stack_size_bytes: u64,
    is_ended: bool,
}

impl LogStack {
    /// Create a new LogStack from a glob pattern
    pub fn new(pattern: &str, filter: Option<&str>) -> Result<Self, LogSourceError> {
        let (mut stack, bytes) = Self::get_file_stack(pattern)?;
        if let Some(file_path) = stack.pop_front() {
            Ok(Self {
                file_stack: stack,
                active_file: open_log_file(&file_path)?,
                active_path: file_path,
                filter: filter.map(String::from),
                total_stack_size_bytes: bytes,
                is_ended: false,
            })
        } else {
            Err(LogSourceError::NoMatchingFiles(pattern.to_string()))
        }
    }

    /// Get all of the files matching the pattern and put them in the stack
    fn get_file_stack(pattern: &str) -> Result<(VecDeque<PathBuf>, u64), LogSourceError> {
        let mut file_list: Vec<PathBuf> = glob(pattern)?.filter_map(Result::ok).collect();

        if file_list.is_empty() {
            return Err(LogSourceError::NoMatchingFiles(pattern.to_string()));
        }

        let total_stack_size_bytes = file_list.iter().fold(0, |sum, path| {
            sum + path.metadata().map(|meta| meta.len()).unwrap_or(0)
        });

        file_list.sort();

        Ok((file_list.into(), total_stack_size_bytes))
    }

    /// Move to the next file in the stack. Unreadable files are skipped.
    fn move_to_next_file(&mut self) {
        while let Some(next_path) = self.file_stack.pop_front() {
            match open_log_file(&next_path) {
                Ok(file) => {
                    self.active_file = file;
                    self.active_path = next_path;
                    return;
                }
                Err(e) => log::warn!("Could not open {}: {e}", next_path.display()),
            }
        }
        self.is_ended = true;
    }

    /// Read the next raw line of the stack, crossing file boundaries
    fn next_line(&mut self) -> Option<String> {
        let mut buffer: Vec<u8> = Vec::new();
        loop {
            if self.is_ended {
                return None;
            }

            buffer.clear();
            match self.active_file.read_until(b'\n', &mut buffer) {
                Ok(0) => self.move_to_next_file(),
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buffer);
                    return Some(line.trim_end_matches(['\n', '\r']).to_string());
                }
                Err(e) => {
                    log::warn!(
                        "Error reading {}: {e}; skipping rest of file",
                        self.active_path.display()
                    );
                    self.move_to_next_file();
                }
            }
        }
    }
}

impl Iterator for LogStack {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.next_line()?;
            match &self.filter {
                Some(filter) if !line.contains(filter.as_str()) => continue,
                _ => return Some(line),
            }
        }
    }
}

fn open_log_file(path: &Path) -> Result<Box<dyn BufRead>, LogSourceError> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// In-memory logs, keyed by component. Handy for replaying captured lines.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    logs: HashMap<String, Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lines<I, S>(&mut self, component: &str, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.logs
            .entry(component.to_string())
            .or_default()
            .extend(lines.into_iter().map(Into::into));
    }
}

impl LineSource for MemorySource {
    fn lines(
        &self,
        component: &str,
        filter: Option<&str>,
    ) -> Result<Box<dyn Iterator<Item = String>>, LogSourceError> {
        let lines = self
            .logs
            .get(component)
            .ok_or_else(|| LogSourceError::NoMatchingFiles(component.to_string()))?;
        let filter = filter.map(String::from);
        let selected: Vec<String> = lines
            .iter()
            .filter(|line| filter.as_deref().map_or(true, |f| line.contains(f)))
            .cloned()
            .collect();
        Ok(Box::new(selected.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_log_stack_mixed_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("AOARB.R.202103040000.log.gz");
        let second = dir.path().join("AOARB.R.202103040100.log");

        let mut encoder = GzEncoder::new(File::create(&first).unwrap(), Compression::default());
        encoder.write_all(b"line 1 MAIN\nline 2 OTHER\n").unwrap();
        encoder.finish().unwrap();
        std::fs::write(&second, "line 3 MAIN\r\nline 4 MAIN").unwrap();

        let pattern = dir
            .path()
            .join("AOARB.R.20210304[0-9][0-9][0-9][0-9].log*")
            .to_string_lossy()
            .into_owned();
        let lines: Vec<String> = LogStack::new(&pattern, Some("MAIN")).unwrap().collect();
        assert_eq!(lines, vec!["line 1 MAIN", "line 3 MAIN", "line 4 MAIN"]);
    }

    #[test]
    fn test_no_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("missing.*.log*").to_string_lossy().into_owned();
        match LogStack::new(&pattern, None) {
            Err(LogSourceError::NoMatchingFiles(p)) => assert_eq!(p, pattern),
            _ => panic!("expected NoMatchingFiles"),
        }
    }

    #[test]
    fn test_memory_source() {
        let mut source = MemorySource::new();
        source.add_lines("fastdiagn", ["a FUNCTEMERGENCYST", "b"]);
        let lines: Vec<String> = source
            .lines("fastdiagn", Some("FUNCTEMERGENCYST"))
            .unwrap()
            .collect();
        assert_eq!(lines, vec!["a FUNCTEMERGENCYST"]);
        assert!(source.lines("housekeeper", None).is_err());
    }
}
