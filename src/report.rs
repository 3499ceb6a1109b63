//! Run reporting
//!
//! One [`Reporter`] is built at startup and passed by reference into
//! detection and the pipeline. Console output is the primary user
//! interface; a log file can mirror it with severity prefixes and a
//! timestamped session marker per run.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Local;

use crate::error::Result;

/// Console reporter with optional log-file fan-out
pub struct Reporter {
    log_file: Option<File>,
}

impl Reporter {
    /// Console-only reporter
    pub fn new() -> Self {
        Self { log_file: None }
    }

    /// Reporter that also appends to the log file at `path`
    ///
    /// The file is opened in append mode and stamped with a session
    /// marker so runs can be told apart.
    pub fn with_log_file(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(
            file,
            "[session started {}]",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        Ok(Self { log_file: Some(file) })
    }

    /// Status message
    pub fn info(&mut self, msg: &str) {
        println!("{msg}");
        self.mirror("info", msg);
    }

    /// Non-fatal condition; processing continues
    pub fn warn(&mut self, msg: &str) {
        eprintln!("Warning: {msg}");
        self.mirror("warn", msg);
    }

    /// Error text, friendly or fully detailed per the caller
    pub fn error(&mut self, msg: &str) {
        eprintln!("{msg}");
        self.mirror("error", msg);
    }

    fn mirror(&mut self, severity: &str, msg: &str) {
        if let Some(file) = self.log_file.as_mut() {
            // A failing log file must not take the run down with it
            let _ = writeln!(file, "[{severity}] {msg}");
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_receives_session_marker_and_messages() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("run.log");

        {
            let mut reporter = Reporter::with_log_file(&log_path).unwrap();
            reporter.info("hello");
            reporter.warn("careful");
        }

        let text = std::fs::read_to_string(&log_path).unwrap();
        assert!(text.starts_with("[session started "));
        assert!(text.contains("[info] hello"));
        assert!(text.contains("[warn] careful"));
    }

    #[test]
    fn test_append_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("run.log");

        Reporter::with_log_file(&log_path).unwrap().info("first");
        Reporter::with_log_file(&log_path).unwrap().info("second");

        let text = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(text.matches("[session started").count(), 2);
        assert!(text.contains("first"));
        assert!(text.contains("second"));
    }
}
