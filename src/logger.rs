//! The logger contract and its policy-driven implementation.

use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sea_orm::DbErr;
use tracing::Level;

use crate::config::{LogLevel, LoggerConfig, MessageFormat};
use crate::option::LoggerOption;
use crate::redact::KeywordMatcher;
use crate::sink::{Emission, QuerySites};

/// Row count reported when the number of affected rows is unknown.
pub const UNKNOWN_ROWS: i64 = -1;

/// Value of the `reason` field on slow-query warnings.
pub const SLOW_SQL: &str = "SLOW SQL";

/// The operations a database layer needs from its logger.
///
/// `info`, `warn` and `error` carry the database layer's own operational
/// messages; `trace` is called once for every executed statement.
pub trait QueryLogger: Send + Sync {
    /// Returns a logger sharing this one's configuration at `level`.
    fn set_level(&self, level: LogLevel) -> Self
    where
        Self: Sized;

    /// Log an informational message, e.g. a connection being established.
    fn info(&self, args: fmt::Arguments<'_>);

    /// Log a recoverable problem.
    fn warn(&self, args: fmt::Arguments<'_>);

    /// Log a failure outside of statement execution, such as a rolled back
    /// transaction.
    fn error(&self, args: fmt::Arguments<'_>);

    /// Report a completed statement.
    fn trace(&self, event: TraceEvent<'_>);
}

/// A completed statement, as reported by the database layer.
#[derive(Debug, Clone)]
pub struct TraceEvent<'a> {
    pub started_at: Instant,
    /// The statement as it should be displayed, parameters included.
    pub statement: Cow<'a, str>,
    /// Affected or returned rows, [`UNKNOWN_ROWS`] if not known.
    pub rows: i64,
    pub error: Option<&'a DbErr>,
    /// Where the event was created.
    pub location: &'static Location<'static>,
}

impl<'a> TraceEvent<'a> {
    /// Create an event for a successful statement. The caller's location is
    /// recorded.
    #[track_caller]
    pub fn new(started_at: Instant, statement: impl Into<Cow<'a, str>>, rows: i64) -> Self {
        Self {
            started_at,
            statement: statement.into(),
            rows,
            error: None,
            location: Location::caller(),
        }
    }

    /// Record `location` instead of the place this event was created.
    pub fn with_location(mut self, location: &'static Location<'static>) -> Self {
        self.location = location;
        self
    }

    /// Attach the error the statement failed with, if any.
    pub fn with_error(mut self, error: impl Into<Option<&'a DbErr>>) -> Self {
        self.error = error.into();
        self
    }
}

mod color {
    pub const RESET: &str = "\x1b[0m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE_BOLD: &str = "\x1b[34;1m";
    pub const RED_BOLD: &str = "\x1b[31;1m";
}

/// A [`QueryLogger`] that classifies statements and emits them to `tracing`.
///
/// Each statement produces at most one event, decided in this order:
///
/// 1. statements matching a redaction rule are dropped;
/// 2. failed statements are logged at ERROR with an `error` field, unless the
///    failure is `DbErr::RecordNotFound` and such failures are skipped;
/// 3. statements slower than the threshold are logged at WARN with
///    `reason = "SLOW SQL"`, if the level is at least [`LogLevel::Warn`];
/// 4. everything else is logged at DEBUG.
///
/// # Example
///
/// ```rust
/// use sea_orm_logging::{with_common_options, with_current_subscriber, CommonOptions, SqlLogger};
/// use std::time::Duration;
///
/// let logger = SqlLogger::new([
///     with_current_subscriber(),
///     with_common_options(CommonOptions {
///         slow_threshold: Duration::from_millis(200),
///         log_latency: true,
///         ..CommonOptions::default()
///     }),
/// ]);
/// ```
#[derive(Debug, Clone)]
pub struct SqlLogger {
    inner: Arc<Inner>,
    level: LogLevel,
}

#[derive(Debug)]
struct Inner {
    config: LoggerConfig,
    matchers: Vec<KeywordMatcher>,
    sites: Option<&'static QuerySites>,
}

impl SqlLogger {
    /// Create a logger from option units, applied in order.
    pub fn new(options: impl IntoIterator<Item = LoggerOption>) -> Self {
        Self::from_config(LoggerConfig::from_options(options))
    }

    /// Create a logger from a finished configuration.
    pub fn from_config(config: LoggerConfig) -> Self {
        let matchers = config.redactions.iter().map(KeywordMatcher::new).collect();
        let sites = QuerySites::get(config.target, config.source_field.as_deref());
        let level = config.level;
        Self {
            inner: Arc::new(Inner {
                config,
                matchers,
                sites,
            }),
            level,
        }
    }

    /// Get the configuration this logger was built from.
    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    /// The current level. May differ from `config().level` after
    /// [`set_level`](QueryLogger::set_level).
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Decide what, if anything, to emit for `event`.
    pub fn classify(&self, event: &TraceEvent<'_>) -> Option<Emission> {
        self.classify_elapsed(event, event.started_at.elapsed())
    }

    fn classify_elapsed(&self, event: &TraceEvent<'_>, elapsed: Duration) -> Option<Emission> {
        if self.is_redacted(&event.statement) {
            return None;
        }

        let config = &self.inner.config;
        let (level, error, slow) = match event.error {
            Some(DbErr::RecordNotFound(_)) if config.skip_record_not_found => return None,
            Some(err) => (Level::ERROR, Some(err.to_string()), false),
            None if self.is_slow(elapsed) => (Level::WARN, None, true),
            None => (Level::DEBUG, None, false),
        };

        let statement = truncate(&event.statement, config.truncate_len);
        let source = config.source_field.as_ref().map(|_| event.location);

        let emission = match config.format {
            MessageFormat::Structured => Emission {
                level,
                message: statement.to_string(),
                rows: Some(event.rows),
                duration: config.log_latency.then_some(elapsed),
                error,
                reason: slow.then_some(SLOW_SQL),
                source,
            },
            MessageFormat::Inline => Emission {
                level,
                message: self.inline_message(statement, event.rows, elapsed, slow),
                rows: None,
                duration: None,
                error,
                reason: None,
                source,
            },
        };
        Some(emission)
    }

    fn is_redacted(&self, statement: &str) -> bool {
        self.inner.matchers.iter().any(|m| m.matches(statement))
    }

    fn is_slow(&self, elapsed: Duration) -> bool {
        let threshold = self.inner.config.slow_threshold;
        !threshold.is_zero() && elapsed > threshold && self.level >= LogLevel::Warn
    }

    fn inline_message(&self, statement: &str, rows: i64, elapsed: Duration, slow: bool) -> String {
        let config = &self.inner.config;
        let paint = |code: &'static str| if config.colorful { code } else { "" };

        let mut message = String::with_capacity(statement.len() + 48);
        if slow {
            let _ = write!(
                message,
                "{}{} >= {:?}{} ",
                paint(color::RED_BOLD),
                SLOW_SQL,
                config.slow_threshold,
                paint(color::RESET)
            );
        }
        if config.log_latency {
            let _ = write!(
                message,
                "{}[{:.3}ms]{} ",
                paint(color::YELLOW),
                elapsed.as_secs_f64() * 1000.0,
                paint(color::RESET)
            );
        }
        let _ = write!(
            message,
            "{}[rows:{}]{} {}",
            paint(color::BLUE_BOLD),
            rows,
            paint(color::RESET),
            statement
        );
        message
    }

    fn emit(&self, emission: &Emission) {
        let Some(sites) = self.inner.sites else {
            return;
        };
        for sink in &self.inner.config.sinks {
            sink.emit(sites, emission);
        }
    }

    fn emit_message(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.inner.config.sinks.is_empty() {
            self.emit(&Emission::message(level, args.to_string()));
        }
    }
}

impl Default for SqlLogger {
    fn default() -> Self {
        Self::from_config(LoggerConfig::default())
    }
}

impl QueryLogger for SqlLogger {
    fn set_level(&self, level: LogLevel) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            level,
        }
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        self.emit_message(Level::INFO, args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit_message(Level::WARN, args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        self.emit_message(Level::ERROR, args);
    }

    fn trace(&self, event: TraceEvent<'_>) {
        if let Some(emission) = self.classify(&event) {
            self.emit(&emission);
        }
    }
}

/// Cut `text` to at most `max_chars` characters; 0 means unlimited.
fn truncate(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
