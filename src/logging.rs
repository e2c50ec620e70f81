use chrono::{DateTime, SecondsFormat, Utc};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// The games own the terminal, so records can only go to a file.
struct FileLogger
{
    file: Mutex<File>,
    level: LevelFilter,
}

impl Log for FileLogger
{
    fn enabled(&self, metadata: &Metadata) -> bool
    {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record)
    {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(Utc::now(), record.target(), record.level(), &record.args().to_string());
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
        }
    }

    fn flush(&self)
    {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, clap::ValueEnum)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Installs the file logger. Without a path every record is discarded.
pub fn init(path: Option<&Path>, level: LogLevel) -> Result<(), String>
{
    let Some(path) = path else {
        log::set_max_level(LevelFilter::Off);
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| format!("Failed to open log file {}: {err}", path.display()))?;
    let level = LevelFilter::from(level);
    let logger = FileLogger {
        file: Mutex::new(file),
        level,
    };
    log::set_logger(Box::leak(Box::new(logger)))
        .map_err(|err| format!("Failed to install logger: {err}"))?;
    log::set_max_level(level);
    Ok(())
}

fn format_line(timestamp: DateTime<Utc>, target: &str, level: Level, message: &str) -> String
{
    format!(
        "[{}][{}][{}] {}",
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        target,
        level,
        message
    )
}
