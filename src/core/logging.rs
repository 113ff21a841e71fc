//! Structured logging
//!
//! Sets up the global `tracing` subscriber: JSON or text lines, written
//! through a non-blocking worker to stdout or to a size-rotated file.

use crate::core::config::{LogFormat, LogOutput, LoggingConfig};
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Keeps the background log writer alive; drop it last in `main`.
pub struct Logger {
    _guard: WorkerGuard,
}

impl Logger {
    /// Install the global subscriber described by `config`.
    ///
    /// `RUST_LOG`, when set, takes precedence over the configured level.
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let level = parse_log_level(&config.level)?;
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

        let (writer, guard) = match config.output {
            LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
            LogOutput::File => {
                let log_file = config
                    .log_file
                    .as_ref()
                    .context("log_file must be specified when output is 'file'")?;
                let appender =
                    SizeRotatingFile::open(log_file, config.max_file_size, config.max_backups)?;
                tracing_appender::non_blocking(appender)
            }
        };

        let fmt_layer = match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(writer)
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_target(true)
                .boxed(),
            LogFormat::Text => fmt::layer()
                .with_writer(writer)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize tracing subscriber")?;

        tracing::info!(
            level = %config.level,
            format = ?config.format,
            output = ?config.output,
            "Logging system initialized"
        );

        Ok(Logger { _guard: guard })
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {}", level),
    }
}

/// Log file that is renamed to `<name>.1` once it would grow past
/// `max_size`, shifting older backups up to `max_backups`.
pub struct SizeRotatingFile {
    path: PathBuf,
    max_size: usize,
    max_backups: usize,
    current: Option<(File, usize)>,
}

impl SizeRotatingFile {
    pub fn open(path: &Path, max_size: usize, max_backups: usize) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create log directory")?;
        }
        path.file_name().context("Log file must have a filename")?;

        Ok(Self {
            path: path.to_path_buf(),
            max_size,
            max_backups,
            current: None,
        })
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&self) -> std::io::Result<()> {
        std::fs::remove_file(self.backup_path(self.max_backups)).ok();
        for i in (1..self.max_backups).rev() {
            let from = self.backup_path(i);
            if from.exists() {
                std::fs::rename(&from, self.backup_path(i + 1))?;
            }
        }
        if self.path.exists() {
            std::fs::rename(&self.path, self.backup_path(1))?;
        }
        Ok(())
    }

    fn open_current(&self) -> std::io::Result<(File, usize)> {
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let size = file.metadata()?.len() as usize;
        Ok((file, size))
    }
}

impl Write for SizeRotatingFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let full = matches!(
            &self.current,
            Some((_, size)) if *size > 0 && size + buf.len() > self.max_size
        );
        if full {
            self.current = None;
            self.rotate()?;
        }
        if self.current.is_none() {
            self.current = Some(self.open_current()?);
        }

        match self.current.as_mut() {
            Some((file, size)) => {
                let written = file.write(buf)?;
                *size += written;
                Ok(written)
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "log file is not open",
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some((file, _)) = self.current.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}
