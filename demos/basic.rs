//! Basic example showing how to use sea-orm-logging.
//!
//! Run with: cargo run --example basic

use std::time::Duration;

use sea_orm::{ConnectionTrait, Database};
use sea_orm_logging::prelude::*;
use sea_orm_logging::{
    with_common_options, with_current_subscriber, with_redactions, with_skip_record_not_found,
    with_source_field, CommonOptions, LogLevel, Redaction,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sea_orm_logging=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let level = std::env::var("SQL_LOG_LEVEL")
        .ok()
        .map(|s| s.parse::<LogLevel>())
        .transpose()?
        .unwrap_or_default();

    // Connect to database
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/test".into());

    tracing::info!("Connecting to database...");

    let db = Database::connect(&database_url).await?;

    // Option 1: Log to the current subscriber with defaults
    // let logged_db = db.with_query_logging();

    // Option 2: Option units, applied in order
    let logged_db = db.with_logger(SqlLogger::new([
        with_current_subscriber(),
        with_redactions([Redaction::ignore_case("password")]),
        with_skip_record_not_found(true),
        with_source_field("caller"),
        with_common_options(CommonOptions {
            level,
            slow_threshold: Duration::from_millis(100),
            log_latency: true,
            ..CommonOptions::default()
        }),
    ]));

    // Option 3: Development preset (colored inline messages)
    // let logged_db = db.with_logger(SqlLogger::from_config(LoggerConfig::development()));

    logged_db.execute_unprepared("SELECT 1").await?;

    // Not logged: matches the redaction rule
    let _ = logged_db
        .execute_unprepared("SELECT 'password' AS hint")
        .await?;

    logged_db
        .logger()
        .info(format_args!("database connection established with query logging"));

    Ok(())
}
