/// Connection Module
///
/// This module defines the seam between uniql and a concrete backend: a
/// [`Connector`] opens a [`Connection`] from the opaque part of a DSN, and a
/// connection runs statements and reports failures as [`BackendError`]s.
/// Nothing above the session layer ever sees a `BackendError`.
use std::error::Error as StdError;
use std::fmt;

/// An undecoded, backend-native failure.
///
/// Wraps whatever error type the backend library produced so that the
/// driver's decoder hooks can downcast it back to the native type.
pub struct BackendError(Box<dyn StdError + Send + Sync + 'static>);

impl BackendError {
    /// Wraps a native error.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        BackendError(Box::new(err))
    }

    /// Creates a backend error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        BackendError(message.into().into())
    }

    /// Returns the native error if it is of type `T`.
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for BackendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Result type for calls made directly against a backend.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Represents the result of a SQL query execution
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names from the query result
    pub columns: Vec<String>,
    /// Rows of data as string values
    pub rows: Vec<Vec<String>>,
    /// Number of rows returned
    pub row_count: usize,
}

impl QueryResult {
    /// Creates a new QueryResult from column names and row data
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let row_count = rows.len();
        QueryResult {
            columns,
            rows,
            row_count,
        }
    }
}

/// Represents the result of a statement that does not return rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    /// Rows affected, when the backend reports it
    pub rows_affected: Option<i64>,
}

impl ExecResult {
    pub fn affected(rows: i64) -> Self {
        ExecResult {
            rows_affected: Some(rows),
        }
    }
}

/// An open connection to a backend.
///
/// Statements are dispatched serially; the session never issues a second
/// call before the previous one has returned.
pub trait Connection {
    /// Runs a statement that returns rows.
    fn query(&mut self, sql: &str) -> BackendResult<QueryResult>;

    /// Runs a statement that does not return rows.
    fn execute(&mut self, sql: &str) -> BackendResult<ExecResult>;

    fn begin(&mut self) -> BackendResult<()> {
        self.execute("BEGIN").map(|_| ())
    }

    fn commit(&mut self) -> BackendResult<()> {
        self.execute("COMMIT").map(|_| ())
    }

    fn rollback(&mut self) -> BackendResult<()> {
        self.execute("ROLLBACK").map(|_| ())
    }

    /// Releases the connection. An unfinished transaction is rolled back by
    /// the backend.
    fn close(&mut self) -> BackendResult<()> {
        Ok(())
    }
}

/// Opens connections for one backend.
pub trait Connector: Send + Sync {
    /// Connects using the part of the DSN following `name://`.
    fn connect(&self, params: &str) -> BackendResult<Box<dyn Connection>>;
}
