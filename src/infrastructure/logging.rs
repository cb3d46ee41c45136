use crate::domain::settings::{LogRotation, LogSettings};
use anyhow::Context;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub struct LoggingGuard {
    // Keeps the non-blocking file writer flushing until dropped
    _guards: Vec<WorkerGuard>,
}

fn appender_rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// `RUST_LOG` wins over the configured level.
fn level_filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::from_str(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_logger(settings: &LogSettings) -> anyhow::Result<LoggingGuard> {
    let mut guards = Vec::new();

    let console_layer = settings.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_file(settings.source_location)
            .with_line_number(settings.source_location)
            .with_thread_ids(settings.thread_ids)
            .with_target(settings.target)
            .with_ansi(settings.ansi)
    });

    let file_layer = if settings.file {
        std::fs::create_dir_all(&settings.log_dir)
            .with_context(|| format!("Could not create log directory {}", settings.log_dir))?;
        let file_appender = RollingFileAppender::new(
            appender_rotation(settings.rotation),
            &settings.log_dir,
            &settings.file_name_prefix,
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        guards.push(guard);
        Some(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_file(settings.source_location)
                .with_line_number(settings.source_location)
                .with_thread_ids(settings.thread_ids)
                .with_target(settings.target),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(level_filter(settings))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        level = %settings.level,
        file = settings.file,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guards: guards })
}
