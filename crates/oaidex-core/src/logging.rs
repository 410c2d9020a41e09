//! Logging setup: env_logger, routed through indicatif when bars are live

use indicatif::MultiProgress;

/// Crates whose logs follow the requested level; everything else stays at `warn`
const OWN_TARGETS: [&str; 3] = ["oaidex", "oaidex_core", "oaidex_oai"];

fn label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

fn ansi(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    }
}

/// Filter string used when `RUST_LOG` is unset
pub fn default_filter(quiet: bool, debug: bool) -> String {
    let level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let mut filter = String::from("warn");
    for target in OWN_TARGETS {
        filter.push_str(&format!(",{target}={level}"));
    }
    filter
}

/// Logger printing above indicatif bars so lines and bars do not interleave.
pub struct ProgressLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl ProgressLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for ProgressLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.matches(record) {
            return;
        }
        let level = record.level();
        let line = if level >= log::Level::Debug {
            format!(
                "[{}{}\x1b[0m {}] {}",
                ansi(level),
                label(level),
                record.target(),
                record.args()
            )
        } else {
            format!("[{}{}\x1b[0m] {}", ansi(level), label(level), record.args())
        };
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the global logger.
///
/// With `multi` (TTY) lines go through [`ProgressLogger`]; without it plain
/// uncoloured lines suitable for log aggregation are written to stderr.
pub fn init_logging(
    quiet: bool,
    debug: bool,
    multi: Option<&MultiProgress>,
) -> Result<(), log::SetLoggerError> {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_filter(quiet, debug));

    match multi {
        Some(multi) => {
            let logger = env_logger::Builder::from_env(env).build();
            let max_level = logger.filter();
            log::set_boxed_logger(Box::new(ProgressLogger::new(logger, multi.clone())))?;
            log::set_max_level(max_level);
            Ok(())
        }
        None => env_logger::Builder::from_env(env)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} [{}] {}",
                    buf.timestamp_millis(),
                    label(record.level()),
                    record.args()
                )
            })
            .try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_levels() {
        assert!(default_filter(false, false).contains("oaidex_oai=info"));
        assert!(default_filter(true, false).contains("oaidex_oai=warn"));
        assert!(default_filter(true, true).contains("oaidex_core=debug"));
        assert!(default_filter(false, false).starts_with("warn,"));
    }

    #[test]
    fn labels_are_padded() {
        assert_eq!(label(log::Level::Info).len(), 5);
        assert_eq!(label(log::Level::Warn).len(), 5);
    }
}
