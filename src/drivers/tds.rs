//! SAP ASE (Sybase) driver descriptor for TDS connectors.
//!
//! ASE rejects a trailing statement terminator, needs the previous password
//! to change a password, and reports numbered server messages.
use crate::core::db::{BackendError, BackendResult, Connection, Connector};
use crate::drivers::{Driver, Processed};
use crate::statement;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*;?\s*$").expect("valid terminator pattern"));

/// Server message as reported by a TDS connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SybaseError {
    pub msg_number: i32,
    pub severity: i32,
    pub message: String,
}

impl fmt::Display for SybaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Msg {}, Level {}: {}",
            self.msg_number, self.severity, self.message
        )
    }
}

impl std::error::Error for SybaseError {}

/// Builds the `tds` descriptor around `connector`.
pub fn driver(connector: impl Connector + 'static) -> Driver {
    Driver::new(connector)
        .allow_multiline_comments()
        .require_previous_password()
        .with_version(version)
        .with_change_password(change_password)
        .with_error_decode(decode_error)
        .with_password_error(is_password_error)
        .with_process(process)
}

fn version(conn: &mut dyn Connection) -> BackendResult<String> {
    let result = conn.query("SELECT @@version")?;
    result
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .ok_or_else(|| BackendError::msg("@@version returned no rows"))
}

fn change_password(conn: &mut dyn Connection, user: &str, new: &str, old: &str) -> BackendResult<()> {
    if !user.is_empty() {
        return Err(BackendError::msg("Cannot change password for another user"));
    }
    conn.execute(&format!(
        "exec sp_password '{}', '{}'",
        old.replace('\'', "''"),
        new.replace('\'', "''")
    ))
    .map(|_| ())
}

fn decode_error(err: &BackendError) -> (String, String) {
    if let Some(e) = err.downcast_ref::<SybaseError>() {
        return (e.msg_number.to_string(), e.message.clone());
    }
    let msg = err.to_string();
    match msg.rfind("tds:") {
        Some(i) => (String::new(), msg[i..].to_string()),
        None => (String::new(), msg),
    }
}

fn is_password_error(err: &BackendError) -> bool {
    err.to_string().contains("Login failed")
}

fn process(prefix: &str, sql: &str) -> BackendResult<Processed> {
    let sql = END_RE.replace(sql, "").into_owned();
    let (kind, is_query) = statement::query_exec_type(prefix, &sql);
    Ok(Processed {
        kind,
        sql,
        is_query,
    })
}
