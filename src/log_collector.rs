//! Decoupled logging pipeline for lab runs.
//!
//! ```text
//! log::info!() / log_parsed!()
//!     |
//! [LogCollector] (log::Log, non-blocking)
//!     | (crossbeam unbounded channel)
//!     v
//! [disk persister thread]
//!     |
//! logs/full/<session>.log    every record
//! logs/parsed/<session>.log  records with target "parsed"
//! ```
//!
//! Disk failures are swallowed: a run must never die because a log line
//! could not be written.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Log target routed to the milestone log.
pub const PARSED_TARGET: &str = "parsed";

enum LogMessage {
    Line(LogLine),
    /// Flush marker; the persister answers once everything before it is on disk.
    Flush(std::sync::mpsc::Sender<()>),
}

/// A formatted log line waiting to be persisted.
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    /// `true` for milestone lines that also go to `logs/parsed/`.
    pub parsed: bool,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(message: String) -> Self {
        LogLine {
            message,
            parsed: false,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn parsed(message: String) -> Self {
        LogLine {
            parsed: true,
            ..LogLine::new(message)
        }
    }

    fn render(&self) -> String {
        format!("[{}] {}\n", self.timestamp, self.message)
    }
}

/// Default session name: `lab_<YYYYmmdd_HHMMSS>`.
pub fn default_session_name() -> String {
    format!("lab_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

/// `log::Log` backend that persists every record through a background thread.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    full_path: PathBuf,
    parsed_path: PathBuf,
    level: LevelFilter,
}

impl LogCollector {
    /// Create the `full/` and `parsed/` directories and start the persister.
    pub fn new(log_dir: &Path, session: &str, level: LevelFilter) -> Result<Self, String> {
        let full_dir = log_dir.join("full");
        let parsed_dir = log_dir.join("parsed");
        std::fs::create_dir_all(&full_dir)
            .map_err(|e| format!("Failed to create full log dir: {}", e))?;
        std::fs::create_dir_all(&parsed_dir)
            .map_err(|e| format!("Failed to create parsed log dir: {}", e))?;

        let full_path = full_dir.join(format!("{}.log", session));
        let parsed_path = parsed_dir.join(format!("{}.log", session));

        let (tx, rx) = unbounded::<LogMessage>();
        let full_clone = full_path.clone();
        let parsed_clone = parsed_path.clone();

        // Plain OS thread: blocking recv works no matter which runtime logs.
        std::thread::spawn(move || {
            let mut full = open_append(&full_clone);
            let mut parsed = open_append(&parsed_clone);

            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let rendered = line.render();
                        if let Some(file) = full.as_mut() {
                            let _ = file.write_all(rendered.as_bytes());
                        }
                        if line.parsed {
                            if let Some(file) = parsed.as_mut() {
                                let _ = file.write_all(rendered.as_bytes());
                            }
                        }
                    }
                    LogMessage::Flush(done) => {
                        for file in [full.as_mut(), parsed.as_mut()].into_iter().flatten() {
                            let _ = file.flush();
                        }
                        let _ = done.send(());
                    }
                }
            }
        });

        Ok(LogCollector {
            tx,
            full_path,
            parsed_path,
            level,
        })
    }

    /// Install as the global `log` backend.
    pub fn install(self) -> Result<(), String> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))
            .map_err(|e| format!("Failed to install logger: {}", e))?;
        log::set_max_level(level);
        Ok(())
    }

    pub fn full_log_path(&self) -> &Path {
        &self.full_path
    }

    pub fn parsed_log_path(&self) -> &Path {
        &self.parsed_path
    }

    /// Queue a line. Never blocks.
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    pub fn log_str(&self, message: impl Into<String>) {
        self.log_line(LogLine::new(message.into()));
    }

    pub fn log_parsed(&self, message: impl Into<String>) {
        self.log_line(LogLine::parsed(message.into()));
    }

    /// Block until every line queued before this call has reached disk.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        done_rx
            .recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = format!("{:<5} {}", record.level(), record.args());
        if record.target() == PARSED_TARGET {
            self.log_parsed(message);
        } else {
            self.log_str(message);
        }
        if record.level() == Level::Error {
            eprintln!("{}", record.args());
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}

fn open_append(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}
