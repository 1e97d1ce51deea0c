//! Option units accepted by [`SqlLogger::new`](crate::SqlLogger::new).
//!
//! Each constructor returns a [`LoggerOption`]; the logger folds them, in
//! argument order, over [`LoggerConfig::default`]. Options touching the same
//! setting are last-write-wins.

use tracing::{Dispatch, Span};

use crate::config::{CommonOptions, LoggerConfig, MessageFormat, Redaction};
use crate::sink::Sink;

/// A single configuration transform.
#[derive(Debug, Clone)]
pub enum LoggerOption {
    Sink(Sink),
    Redactions(Vec<Redaction>),
    Common(CommonOptions),
    SourceField(Option<String>),
    SkipRecordNotFound(bool),
    Format(MessageFormat),
    Target(&'static str),
}

impl LoggerOption {
    /// Apply this option to `config`.
    pub fn apply(self, config: LoggerConfig) -> LoggerConfig {
        match self {
            LoggerOption::Sink(sink) => config.with_sink(sink),
            LoggerOption::Redactions(redactions) => config.with_redactions(redactions),
            LoggerOption::Common(common) => config.with_common_options(common),
            LoggerOption::SourceField(name) => LoggerConfig {
                source_field: name,
                ..config
            },
            LoggerOption::SkipRecordNotFound(enabled) => config.with_skip_record_not_found(enabled),
            LoggerOption::Format(format) => config.with_format(format),
            LoggerOption::Target(target) => config.with_target(target),
        }
    }
}

impl LoggerConfig {
    /// Build a configuration by applying `options` in order to the defaults.
    pub fn from_options(options: impl IntoIterator<Item = LoggerOption>) -> Self {
        options
            .into_iter()
            .fold(LoggerConfig::default(), |config, option| option.apply(config))
    }
}

/// Deliver emissions to the subscriber behind `dispatch`.
pub fn with_dispatch(dispatch: impl Into<Dispatch>) -> LoggerOption {
    LoggerOption::Sink(Sink::Dispatch(dispatch.into()))
}

/// Deliver emissions as children of `span`, to the subscriber that owns it.
pub fn with_span(span: Span) -> LoggerOption {
    LoggerOption::Sink(Sink::Span(span))
}

/// Deliver emissions to whichever subscriber is the default at emission time.
pub fn with_current_subscriber() -> LoggerOption {
    LoggerOption::Sink(Sink::Current)
}

/// Never log statements matching any of `redactions`.
pub fn with_redactions(redactions: impl IntoIterator<Item = Redaction>) -> LoggerOption {
    LoggerOption::Redactions(redactions.into_iter().collect())
}

/// Set level, truncation, slow-query threshold, latency and colors together.
pub fn with_common_options(options: CommonOptions) -> LoggerOption {
    LoggerOption::Common(options)
}

/// Record the caller location under the field `name`.
pub fn with_source_field(name: impl Into<String>) -> LoggerOption {
    LoggerOption::SourceField(Some(name.into()))
}

/// Skip statements failing with `DbErr::RecordNotFound`.
pub fn with_skip_record_not_found(enabled: bool) -> LoggerOption {
    LoggerOption::SkipRecordNotFound(enabled)
}

/// Choose between structured fields and an inline message layout.
pub fn with_format(format: MessageFormat) -> LoggerOption {
    LoggerOption::Format(format)
}

/// Set the `tracing` target of emitted events.
pub fn with_target(target: &'static str) -> LoggerOption {
    LoggerOption::Target(target)
}
