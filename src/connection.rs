//! Logged database connection wrapper.

use std::fmt::{self, Write as _};
use std::future::Future;
use std::panic::Location;
use std::pin::Pin;
use std::time::Instant;

use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    ExecResult, IsolationLevel, QueryResult, Statement, StreamTrait, TransactionError,
    TransactionTrait,
};

use crate::logger::{QueryLogger, SqlLogger, TraceEvent, UNKNOWN_ROWS};
use crate::option::with_current_subscriber;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A wrapper around SeaORM's `DatabaseConnection` that reports every
/// statement to a [`QueryLogger`].
///
/// This wrapper implements `ConnectionTrait`, `StreamTrait`, and `TransactionTrait`,
/// making it a drop-in replacement for `DatabaseConnection`. Beginning a
/// transaction is reported as a `BEGIN` statement and a closure-based
/// transaction as a `TRANSACTION` statement; statements run inside the
/// transaction go through the `DatabaseTransaction` and are not reported.
///
/// The recorded source location is the code that called the connection
/// method, which for SeaORM's query builders is inside SeaORM itself.
///
/// # Example
///
/// ```rust,ignore
/// use sea_orm::Database;
/// use sea_orm_logging::{with_current_subscriber, LoggedConnection, SqlLogger};
///
/// let db = Database::connect("postgres://localhost/mydb").await?;
/// let logged = LoggedConnection::new(db, SqlLogger::new([with_current_subscriber()]));
///
/// // Every query is now logged
/// let users = Users::find().all(&logged).await?;
/// ```
#[derive(Debug)]
pub struct LoggedConnection<L = SqlLogger> {
    inner: DatabaseConnection,
    logger: L,
}

impl<L: QueryLogger> LoggedConnection<L> {
    /// Create a new logged connection.
    pub fn new(connection: DatabaseConnection, logger: L) -> Self {
        Self {
            inner: connection,
            logger,
        }
    }

    /// Get a reference to the underlying `DatabaseConnection`.
    pub fn inner(&self) -> &DatabaseConnection {
        &self.inner
    }

    /// Get the logger statements are reported to, e.g. to send it
    /// free-form messages.
    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Consume the wrapper and return the inner `DatabaseConnection`.
    pub fn into_inner(self) -> DatabaseConnection {
        self.inner
    }

    fn report(
        &self,
        caller: &'static Location<'static>,
        start: Instant,
        statement: String,
        rows: i64,
        error: Option<&DbErr>,
    ) {
        self.logger.trace(
            TraceEvent::new(start, statement, rows)
                .with_location(caller)
                .with_error(error),
        );
    }

    fn report_transaction<T, E: fmt::Display>(
        &self,
        caller: &'static Location<'static>,
        start: Instant,
        result: &Result<T, TransactionError<E>>,
    ) {
        match result {
            Ok(_) => self.report(caller, start, "TRANSACTION".to_string(), UNKNOWN_ROWS, None),
            Err(TransactionError::Connection(e)) => {
                self.report(caller, start, "TRANSACTION".to_string(), UNKNOWN_ROWS, Some(e))
            }
            Err(TransactionError::Transaction(e)) => {
                self.logger.error(format_args!("transaction rolled back: {e}"))
            }
        }
    }
}

impl From<DatabaseConnection> for LoggedConnection {
    /// Wrap `connection`, logging to the current default subscriber.
    fn from(connection: DatabaseConnection) -> Self {
        Self::new(connection, SqlLogger::new([with_current_subscriber()]))
    }
}

impl<L> AsRef<DatabaseConnection> for LoggedConnection<L> {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.inner
    }
}

fn row_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn begin_statement(isolation_level: Option<IsolationLevel>, access_mode: Option<AccessMode>) -> String {
    let mut statement = String::from("BEGIN");
    if let Some(level) = isolation_level {
        let _ = write!(statement, " isolation={level:?}");
    }
    if let Some(mode) = access_mode {
        let _ = write!(statement, " access={mode:?}");
    }
    statement
}

// The async methods are written out by hand rather than through
// `#[async_trait]` so that `#[track_caller]` sees the caller before the
// future is boxed.
impl<L: QueryLogger> ConnectionTrait for LoggedConnection<L> {
    fn get_database_backend(&self) -> DbBackend {
        self.inner.get_database_backend()
    }

    #[track_caller]
    fn execute<'life0, 'async_trait>(
        &'life0 self,
        stmt: Statement,
    ) -> BoxFuture<'async_trait, Result<ExecResult, DbErr>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        let caller = Location::caller();
        let statement = stmt.to_string();

        Box::pin(async move {
            let start = Instant::now();
            let result = self.inner.execute(stmt).await;

            let rows = result
                .as_ref()
                .map_or(UNKNOWN_ROWS, |r| row_count(r.rows_affected()));
            self.report(caller, start, statement, rows, result.as_ref().err());

            result
        })
    }

    #[track_caller]
    fn execute_unprepared<'life0, 'life1, 'async_trait>(
        &'life0 self,
        sql: &'life1 str,
    ) -> BoxFuture<'async_trait, Result<ExecResult, DbErr>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let caller = Location::caller();

        Box::pin(async move {
            let start = Instant::now();
            let result = self.inner.execute_unprepared(sql).await;

            let rows = result
                .as_ref()
                .map_or(UNKNOWN_ROWS, |r| row_count(r.rows_affected()));
            self.report(caller, start, sql.to_string(), rows, result.as_ref().err());

            result
        })
    }

    #[track_caller]
    fn query_one<'life0, 'async_trait>(
        &'life0 self,
        stmt: Statement,
    ) -> BoxFuture<'async_trait, Result<Option<QueryResult>, DbErr>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        let caller = Location::caller();
        let statement = stmt.to_string();

        Box::pin(async move {
            let start = Instant::now();
            let result = self.inner.query_one(stmt).await;

            let rows = result
                .as_ref()
                .map_or(UNKNOWN_ROWS, |opt| i64::from(opt.is_some()));
            self.report(caller, start, statement, rows, result.as_ref().err());

            result
        })
    }

    #[track_caller]
    fn query_all<'life0, 'async_trait>(
        &'life0 self,
        stmt: Statement,
    ) -> BoxFuture<'async_trait, Result<Vec<QueryResult>, DbErr>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        let caller = Location::caller();
        let statement = stmt.to_string();

        Box::pin(async move {
            let start = Instant::now();
            let result = self.inner.query_all(stmt).await;

            let rows = result
                .as_ref()
                .map_or(UNKNOWN_ROWS, |rows| row_count(rows.len() as u64));
            self.report(caller, start, statement, rows, result.as_ref().err());

            result
        })
    }

    fn support_returning(&self) -> bool {
        self.inner.support_returning()
    }

    fn is_mock_connection(&self) -> bool {
        self.inner.is_mock_connection()
    }
}

impl<L: QueryLogger> StreamTrait for LoggedConnection<L> {
    type Stream<'a> = <DatabaseConnection as StreamTrait>::Stream<'a> where L: 'a;

    #[track_caller]
    fn stream<'a>(
        &'a self,
        stmt: Statement,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Stream<'a>, DbErr>> + 'a + Send>> {
        let caller = Location::caller();
        let statement = stmt.to_string();

        Box::pin(async move {
            let start = Instant::now();
            let result = self.inner.stream(stmt).await;

            // Rows are consumed later by the caller, so the count is unknown here.
            self.report(caller, start, statement, UNKNOWN_ROWS, result.as_ref().err());

            result
        })
    }
}

impl<L: QueryLogger> TransactionTrait for LoggedConnection<L> {
    #[track_caller]
    fn begin<'life0, 'async_trait>(
        &'life0 self,
    ) -> BoxFuture<'async_trait, Result<DatabaseTransaction, DbErr>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        let caller = Location::caller();

        Box::pin(async move {
            let start = Instant::now();
            let result = self.inner.begin().await;
            self.report(caller, start, begin_statement(None, None), UNKNOWN_ROWS, result.as_ref().err());
            result
        })
    }

    #[track_caller]
    fn begin_with_config<'life0, 'async_trait>(
        &'life0 self,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> BoxFuture<'async_trait, Result<DatabaseTransaction, DbErr>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        let caller = Location::caller();
        let statement = begin_statement(isolation_level, access_mode);

        Box::pin(async move {
            let start = Instant::now();
            let result = self
                .inner
                .begin_with_config(isolation_level, access_mode)
                .await;
            self.report(caller, start, statement, UNKNOWN_ROWS, result.as_ref().err());
            result
        })
    }

    #[track_caller]
    fn transaction<'life0, 'async_trait, F, T, E>(
        &'life0 self,
        callback: F,
    ) -> BoxFuture<'async_trait, Result<T, TransactionError<E>>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
        F: 'async_trait,
        T: 'async_trait,
        E: 'async_trait,
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        let caller = Location::caller();

        Box::pin(async move {
            let start = Instant::now();
            let result = self.inner.transaction(callback).await;
            self.report_transaction(caller, start, &result);
            result
        })
    }

    #[track_caller]
    fn transaction_with_config<'life0, 'async_trait, F, T, E>(
        &'life0 self,
        callback: F,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> BoxFuture<'async_trait, Result<T, TransactionError<E>>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
        F: 'async_trait,
        T: 'async_trait,
        E: 'async_trait,
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        let caller = Location::caller();

        Box::pin(async move {
            let start = Instant::now();
            let result = self
                .inner
                .transaction_with_config(callback, isolation_level, access_mode)
                .await;
            self.report_transaction(caller, start, &result);
            result
        })
    }
}

/// Extension trait for easy wrapping of database connections.
pub trait LoggingExt {
    /// Wrap this connection, logging to the current default subscriber.
    fn with_query_logging(self) -> LoggedConnection;

    /// Wrap this connection with a specific logger.
    fn with_logger<L: QueryLogger>(self, logger: L) -> LoggedConnection<L>;
}

impl LoggingExt for DatabaseConnection {
    fn with_query_logging(self) -> LoggedConnection {
        LoggedConnection::from(self)
    }

    fn with_logger<L: QueryLogger>(self, logger: L) -> LoggedConnection<L> {
        LoggedConnection::new(self, logger)
    }
}
