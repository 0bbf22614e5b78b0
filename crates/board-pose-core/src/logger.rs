//! Process-wide logging setup.
//!
//! [`init_with_level`] installs a small stderr logger for the `log` facade.
//! Each line carries the seconds since installation, the level and the
//! record target. With the `tracing` feature, [`init_tracing`] installs a
//! `tracing-subscriber` instead, optionally emitting JSON lines.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger {
    max: LevelFilter,
    epoch: Instant,
}

impl StderrLogger {
    fn line(&self, record: &Record) -> String {
        format!(
            "[{:8.3}s {:>5} {}] {}",
            self.epoch.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // a closed stderr is not worth failing a frame over
            let _ = writeln!(std::io::stderr().lock(), "{}", self.line(record));
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static INSTALLED: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the given level filter.
///
/// Only the first call installs anything; later calls leave the level alone
/// and return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut fresh = false;
    let logger = INSTALLED.get_or_init(|| {
        fresh = true;
        StderrLogger {
            max: level,
            epoch: Instant::now(),
        }
    });
    if fresh {
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a global `tracing` subscriber. `RUST_LOG` overrides the default
/// `info` filter. Span close events carry their busy/idle timings, which is
/// how per-stage frame timings show up.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);
    // a second subscriber in the same process is ignored
    let _ = if json {
        builder
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .finish()
            .try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        assert!(init_with_level(LevelFilter::Debug).is_ok());
        assert!(init_with_level(LevelFilter::Trace).is_ok());
        log::debug!("logger installed");
    }

    #[test]
    fn line_names_level_and_target() {
        let logger = StderrLogger {
            max: LevelFilter::Info,
            epoch: Instant::now(),
        };
        let line = logger.line(
            &Record::builder()
                .args(format_args!("posed"))
                .level(log::Level::Warn)
                .target("board_pose")
                .build(),
        );
        assert!(line.ends_with(" WARN board_pose] posed"), "{line}");
    }
}
