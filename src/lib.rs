//! # sea-orm-logging
//!
//! Policy-driven query logging for SeaORM, routed through `tracing`.
//!
//! Every statement executed through a [`LoggedConnection`] is handed to a
//! [`QueryLogger`]. The provided [`SqlLogger`] decides whether and how to log
//! it, and emits at most one `tracing` event per statement to each configured
//! [`Sink`].
//!
//! ## Features
//!
//! - **Redaction**: statements containing configured keywords are never logged
//! - **Error Reporting**: failed statements are logged at ERROR with the error text
//! - **Slow Queries**: statements over a threshold are logged at WARN
//! - **Flexible Sinks**: a specific subscriber, a parent span, the current
//!   default subscriber, or any combination
//! - **Caller Location**: optionally recorded under a field name of your choice
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sea_orm::Database;
//! use sea_orm_logging::LoggingExt;
//!
//! let db = Database::connect("postgres://localhost/mydb").await?;
//! let logged_db = db.with_query_logging();
//!
//! // Use it exactly like a normal DatabaseConnection
//! let users = Users::find().all(&logged_db).await?;
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use sea_orm_logging::*;
//!
//! let logger = SqlLogger::new([
//!     with_current_subscriber(),
//!     with_redactions([Redaction::ignore_case("password")]),
//!     with_skip_record_not_found(true),
//!     with_source_field("caller"),
//!     with_common_options(CommonOptions {
//!         slow_threshold: Duration::from_millis(200),
//!         log_latency: true,
//!         ..CommonOptions::default()
//!     }),
//! ]);
//!
//! let logged_db = db.with_logger(logger);
//! ```
//!
//! ## Event Fields
//!
//! | Field | Description |
//! |-------|-------------|
//! | `message` | The statement, parameters inlined |
//! | `rows` | Rows affected or returned, `-1` when unknown |
//! | `duration` | Elapsed time (when latency is enabled) |
//! | `error` | Error text (ERROR events only) |
//! | `reason` | `"SLOW SQL"` (slow-query WARN events only) |
//! | *source field* | `file:line:column` of the caller (when configured) |

mod config;
mod connection;
mod logger;
mod option;
mod redact;
mod sink;

#[cfg(test)]
mod test_support;

pub use config::{CommonOptions, LogLevel, LoggerConfig, MessageFormat, ParseLevelError, Redaction};
pub use connection::{LoggedConnection, LoggingExt};
pub use logger::{QueryLogger, SqlLogger, TraceEvent, SLOW_SQL, UNKNOWN_ROWS};
pub use option::{
    with_common_options, with_current_subscriber, with_dispatch, with_format, with_redactions,
    with_skip_record_not_found, with_source_field, with_span, with_target, LoggerOption,
};
pub use sink::{Emission, Sink};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{LoggedConnection, LoggerConfig, LoggingExt, QueryLogger, SqlLogger};
}
