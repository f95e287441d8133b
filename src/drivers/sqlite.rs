//! SQLite driver backed by rusqlite.
//!
//! DSN parameters are a file path or `:memory:`; `sqlite3://` with nothing
//! after it opens an in-memory database.
use crate::core::db::{
    BackendError, BackendResult, Connection, Connector, ExecResult, QueryResult,
};
use crate::drivers::Driver;
use rusqlite::types::ValueRef;
use tracing::debug;

pub fn driver() -> Driver {
    Driver::new(SqliteConnector)
        .allow_multiline_comments()
        .with_version(version)
        .with_error_decode(decode_error)
}

fn version(conn: &mut dyn Connection) -> BackendResult<String> {
    let result = conn.query("SELECT sqlite_version()")?;
    let ver = result
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .ok_or_else(|| BackendError::msg("sqlite_version() returned no rows"))?;
    Ok(format!("SQLite {}", ver))
}

fn decode_error(err: &BackendError) -> (String, String) {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, msg)) => (
            e.extended_code.to_string(),
            msg.clone().unwrap_or_else(|| e.to_string()),
        ),
        _ => (String::new(), err.to_string()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn connect(&self, params: &str) -> BackendResult<Box<dyn Connection>> {
        let path = database_path(params);
        debug!("opening sqlite database {}", path);
        let conn = rusqlite::Connection::open(path).map_err(BackendError::new)?;
        Ok(Box::new(SqliteConnection { conn: Some(conn) }))
    }
}

/// Strips the `user:password@` prefix a password prompt injects; SQLite
/// has no authentication. Any other `@` is part of the file name.
fn database_path(params: &str) -> &str {
    let path = match params.split_once('@') {
        Some((info, rest)) if is_injected_user_info(info) => rest,
        _ => params,
    };
    if path.is_empty() {
        ":memory:"
    } else {
        path
    }
}

/// Matches `user:password` as written by `dsn::with_password`, which
/// escapes `:`, `@` and `/` in the password.
fn is_injected_user_info(info: &str) -> bool {
    match info.split_once(':') {
        Some((user, password)) => !user.contains('/') && !password.contains(['/', ':']),
        None => false,
    }
}

struct SqliteConnection {
    conn: Option<rusqlite::Connection>,
}

impl SqliteConnection {
    fn conn(&self) -> BackendResult<&rusqlite::Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| BackendError::msg("connection already closed"))
    }
}

impl Connection for SqliteConnection {
    fn query(&mut self, sql: &str) -> BackendResult<QueryResult> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(BackendError::new)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let column_count = columns.len();

        let mut rows = stmt.query([]).map_err(BackendError::new)?;
        let mut data = Vec::new();
        while let Some(row) = rows.next().map_err(BackendError::new)? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(format_value(row.get_ref(i).map_err(BackendError::new)?));
            }
            data.push(values);
        }
        Ok(QueryResult::new(columns, data))
    }

    fn execute(&mut self, sql: &str) -> BackendResult<ExecResult> {
        let changed = self.conn()?.execute(sql, []).map_err(BackendError::new)?;
        Ok(ExecResult::affected(changed as i64))
    }

    fn close(&mut self) -> BackendResult<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| BackendError::new(e)),
            None => Ok(()),
        }
    }
}

fn format_value(value: ValueRef) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}
