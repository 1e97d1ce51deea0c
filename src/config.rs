//! Configuration for query logging behavior.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::sink::Sink;

/// Verbosity of the logger, ordered from quietest to loudest.
///
/// Only slow-query warnings are gated on the level: statement errors and
/// ordinary statements are classified regardless of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Silent,
    Error,
    #[default]
    Warn,
    Info,
}

impl LogLevel {
    /// Returns the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Silent => "silent",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a [`LogLevel`] cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level `{0}`, expected one of: silent, error, warn, info")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// How trace emissions are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    /// The message is the statement text; rows, latency and the slow-query
    /// marker are separate fields.
    #[default]
    Structured,
    /// Rows, latency and the slow-query marker are folded into the message,
    /// e.g. `[1.042ms] [rows:3] SELECT ...`. Honors `colorful`.
    Inline,
}

/// A keyword that suppresses logging of any statement containing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    pub keyword: String,
    pub case_sensitive: bool,
}

impl Redaction {
    /// Match `keyword` exactly as written.
    pub fn exact(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            case_sensitive: true,
        }
    }

    /// Match `keyword` ignoring case.
    pub fn ignore_case(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            case_sensitive: false,
        }
    }
}

/// Settings usually tuned together, applied as one unit by
/// [`with_common_options`](crate::with_common_options).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommonOptions {
    pub level: LogLevel,
    pub truncate_len: usize,
    pub slow_threshold: Duration,
    pub log_latency: bool,
    pub colorful: bool,
}

/// Configuration options for query logging.
///
/// # Example
///
/// ```rust
/// use sea_orm_logging::{LoggerConfig, LogLevel, Redaction, Sink};
/// use std::time::Duration;
///
/// let config = LoggerConfig::default()
///     .with_sink(Sink::Current)
///     .with_redaction(Redaction::ignore_case("password"))
///     .with_slow_query_threshold(Duration::from_millis(100))
///     .with_level(LogLevel::Warn);
/// ```
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Where emissions are delivered. Every sink receives every emission.
    /// Default: none (nothing is logged)
    pub sinks: Vec<Sink>,

    /// Statements containing any of these keywords are never logged.
    /// Default: empty
    pub redactions: Vec<Redaction>,

    /// Statements running longer than this are logged at WARN.
    /// Zero disables slow-query detection.
    /// Default: zero
    pub slow_threshold: Duration,

    /// Verbosity; slow-query warnings require at least `Warn`.
    /// Default: `Warn`
    pub level: LogLevel,

    /// Whether to attach the elapsed time of each statement.
    /// Default: `false`
    pub log_latency: bool,

    /// Maximum number of characters of statement text to emit.
    /// Zero means no truncation.
    /// Default: 0
    pub truncate_len: usize,

    /// Whether inline messages use ANSI colors.
    /// Default: `false`
    pub colorful: bool,

    /// Message layout.
    /// Default: [`MessageFormat::Structured`]
    pub format: MessageFormat,

    /// Field name under which the caller location is recorded.
    /// Default: `None`
    pub source_field: Option<String>,

    /// Whether `DbErr::RecordNotFound` failures are silently skipped.
    /// Default: `false`
    pub skip_record_not_found: bool,

    /// Target name for emitted events.
    /// Default: "sea_orm_logging"
    pub target: &'static str,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            sinks: Vec::new(),
            redactions: Vec::new(),
            slow_threshold: Duration::ZERO,
            level: LogLevel::default(),
            log_latency: false,
            truncate_len: 0,
            colorful: false,
            format: MessageFormat::default(),
            source_field: None,
            skip_record_not_found: false,
            target: "sea_orm_logging",
        }
    }
}

impl LoggerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink, replacing any sink of the same kind.
    pub fn with_sink(mut self, sink: Sink) -> Self {
        match self.sinks.iter_mut().find(|s| s.same_kind(&sink)) {
            Some(existing) => *existing = sink,
            None => self.sinks.push(sink),
        }
        self
    }

    /// Add a redaction rule.
    pub fn with_redaction(mut self, redaction: Redaction) -> Self {
        self.redactions.push(redaction);
        self
    }

    /// Replace all redaction rules.
    pub fn with_redactions(mut self, redactions: impl IntoIterator<Item = Redaction>) -> Self {
        self.redactions = redactions.into_iter().collect();
        self
    }

    /// Set the threshold for slow query warnings.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Set the verbosity level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Enable or disable latency reporting.
    pub fn with_latency(mut self, enabled: bool) -> Self {
        self.log_latency = enabled;
        self
    }

    /// Truncate emitted statements to `len` characters (0 disables).
    pub fn with_truncate_len(mut self, len: usize) -> Self {
        self.truncate_len = len;
        self
    }

    /// Enable or disable ANSI colors in inline messages.
    pub fn with_colorful(mut self, enabled: bool) -> Self {
        self.colorful = enabled;
        self
    }

    /// Set the message layout.
    pub fn with_format(mut self, format: MessageFormat) -> Self {
        self.format = format;
        self
    }

    /// Record the caller location under the field `name`.
    pub fn with_source_field(mut self, name: impl Into<String>) -> Self {
        self.source_field = Some(name.into());
        self
    }

    /// Skip statements that failed with `DbErr::RecordNotFound`.
    pub fn with_skip_record_not_found(mut self, enabled: bool) -> Self {
        self.skip_record_not_found = enabled;
        self
    }

    /// Set a custom target name for emitted events.
    pub fn with_target(mut self, target: &'static str) -> Self {
        self.target = target;
        self
    }

    /// Apply a bundle of common options at once.
    pub fn with_common_options(mut self, options: CommonOptions) -> Self {
        self.level = options.level;
        self.truncate_len = options.truncate_len;
        self.slow_threshold = options.slow_threshold;
        self.log_latency = options.log_latency;
        self.colorful = options.colorful;
        self
    }

    /// Create a development-friendly configuration: colored inline output to
    /// the current subscriber with latency and a short slow-query threshold.
    pub fn development() -> Self {
        Self {
            sinks: vec![Sink::Current],
            slow_threshold: Duration::from_millis(100),
            level: LogLevel::Info,
            log_latency: true,
            colorful: true,
            format: MessageFormat::Inline,
            source_field: Some("caller".to_string()),
            ..Self::default()
        }
    }

    /// Create a production-oriented configuration: structured output to the
    /// current subscriber, common secrets redacted, missing records skipped.
    pub fn production() -> Self {
        Self {
            sinks: vec![Sink::Current],
            redactions: vec![
                Redaction::ignore_case("password"),
                Redaction::ignore_case("secret"),
                Redaction::ignore_case("token"),
            ],
            slow_threshold: Duration::from_secs(1),
            log_latency: true,
            truncate_len: 2048,
            skip_record_not_found: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert!(config.sinks.is_empty());
        assert!(config.redactions.is_empty());
        assert_eq!(config.slow_threshold, Duration::ZERO);
        assert_eq!(config.truncate_len, 0);
        assert!(!config.log_latency);
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.target, "sea_orm_logging");
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Silent < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!(" warning ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("off".parse::<LogLevel>(), Ok(LogLevel::Silent));
        let err = "loud".parse::<LogLevel>().unwrap_err();
        assert_eq!(err, ParseLevelError("loud".to_string()));
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_sink_replaced_per_kind() {
        let config = LoggerConfig::default()
            .with_sink(Sink::Current)
            .with_sink(Sink::Span(tracing::Span::none()))
            .with_sink(Sink::Current);
        assert_eq!(config.sinks.len(), 2);
    }

    #[test]
    fn test_common_options() {
        let config = LoggerConfig::default().with_common_options(CommonOptions {
            level: LogLevel::Info,
            truncate_len: 10,
            slow_threshold: Duration::from_millis(5),
            log_latency: true,
            colorful: true,
        });
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.truncate_len, 10);
        assert_eq!(config.slow_threshold, Duration::from_millis(5));
        assert!(config.log_latency);
        assert!(config.colorful);
    }

    #[test]
    fn test_presets() {
        let dev = LoggerConfig::development();
        assert_eq!(dev.format, MessageFormat::Inline);
        assert_eq!(dev.level, LogLevel::Info);

        let prod = LoggerConfig::production();
        assert_eq!(prod.format, MessageFormat::Structured);
        assert!(prod.skip_record_not_found);
        assert_eq!(prod.redactions.len(), 3);
    }
}
