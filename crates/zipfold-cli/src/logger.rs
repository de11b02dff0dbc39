//! Stderr logger for core library diagnostics.

use anyhow::Result;
use anyhow::anyhow;
use console::Term;
use console::style;
use log::Level;
use log::LevelFilter;
use log::Log;
use log::Metadata;
use log::Record;
use std::str::FromStr;

/// Environment variable overriding the level chosen by `-v`/`-q`.
pub const LOG_ENV: &str = "ZIPFOLD_LOG";

struct StderrLogger {
    term: Term,
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => style("error").red().bold(),
            Level::Warn => style("warn").yellow().bold(),
            Level::Info => style("info").green(),
            Level::Debug => style("debug").blue(),
            Level::Trace => style("trace").dim(),
        };
        // Logging must never abort a run.
        let _ = self
            .term
            .write_line(&format!("{tag} {}: {}", record.target(), record.args()));
    }

    fn flush(&self) {
        let _ = self.term.flush();
    }
}

/// Chooses the level from the global flags, unless `ZIPFOLD_LOG` names one.
fn level_filter(verbose: bool, quiet: bool, env: Option<&str>) -> LevelFilter {
    if let Some(level) = env.and_then(|value| LevelFilter::from_str(value.trim()).ok()) {
        return level;
    }
    if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Installs the logger. Must be called once, before any command runs.
pub fn init(verbose: bool, quiet: bool) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let level = level_filter(verbose, quiet, env.as_deref());
    let logger = StderrLogger {
        term: Term::stderr(),
        level,
    };
    log::set_logger(Box::leak(Box::new(logger))).map_err(|e| anyhow!("{e}"))?;
    log::set_max_level(level);
    Ok(())
}
