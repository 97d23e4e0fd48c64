use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A per-invocation log, appended to by every component that needs to report a best-effort
/// failure or milestone, and always forwarded to the `log` facade (§3a, §4.J). Never installs a
/// process-wide logging handler; only a binary or test harness calls `env_logger::try_init()`.
#[derive(Debug)]
pub struct DriverLog {
    path: PathBuf,
    file: Mutex<fs::File>,
}

impl DriverLog {
    /// Opens (creating if needed) the log file at `path` for appending.
    pub fn open(path: &Path) -> io::Result<DriverLog> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(DriverLog {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, message: &str) {
        log::info!("{}", message);
        self.append("INFO", message);
    }

    pub fn warn(&self, message: &str) {
        log::warn!("{}", message);
        self.append("WARN", message);
    }

    fn append(&self, level: &str, message: &str) {
        let timestamp = chrono::Local::now().to_rfc3339();
        let mut file = self.file.lock().unwrap();
        let _ = writeln!(file, "{} [{}] {}", timestamp, level, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("nested").join("all.log");
        let log = DriverLog::open(&log_path).unwrap();
        log.info("hello");
        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("INFO"));
        assert!(content.contains("hello"));
    }
}
