/// Drivers Module
///
/// A [`Driver`] is the capability descriptor for one backend: comment syntax
/// flags plus a set of optional hooks for the places where backends differ
/// (version query, password changes, error decoding, statement rewriting,
/// rows-affected reporting). Every hook is an explicit `Option`; call sites
/// check for presence and fall back to the documented default.
///
/// The [`Registry`] maps backend names and aliases to drivers. It is built
/// once at startup and only read afterwards.
use crate::core::db::{BackendError, BackendResult, Connection, Connector, ExecResult};
use crate::statement;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub mod adodb;
pub mod clickhouse;
#[cfg(feature = "sqlite3")]
pub mod sqlite;
pub mod tds;
pub mod voltdb;

/// Queries the backend version.
pub type VersionFn = fn(&mut dyn Connection) -> BackendResult<String>;
/// Changes a password: `(conn, user, new_password, old_password)`.
pub type ChangePasswordFn = fn(&mut dyn Connection, &str, &str, &str) -> BackendResult<()>;
/// Decodes a native error into `(code, message)`.
pub type ErrorDecodeFn = fn(&BackendError) -> (String, String);
/// Recognises an authentication failure.
pub type PasswordErrorFn = fn(&BackendError) -> bool;
/// Classifies and rewrites a statement: `(prefix, sql)`.
pub type ProcessFn = fn(&str, &str) -> BackendResult<Processed>;
/// Extracts the rows affected from an execution result.
pub type RowsAffectedFn = fn(&ExecResult) -> BackendResult<i64>;

/// A statement after the driver has classified and rewritten it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    /// Statement type, e.g. `SELECT` or `CREATE TABLE`
    pub kind: String,
    /// SQL to send to the backend
    pub sql: String,
    /// Whether the statement returns rows
    pub is_query: bool,
}

/// Capability descriptor for a backend.
#[derive(Clone)]
pub struct Driver {
    name: String,
    aliases: Vec<String>,
    connector: Arc<dyn Connector>,
    pub allow_multiline_comments: bool,
    pub allow_c_comments: bool,
    pub require_previous_password: bool,
    pub version: Option<VersionFn>,
    pub change_password: Option<ChangePasswordFn>,
    pub error_decode: Option<ErrorDecodeFn>,
    pub is_password_error: Option<PasswordErrorFn>,
    pub process: Option<ProcessFn>,
    pub rows_affected: Option<RowsAffectedFn>,
}

impl Driver {
    /// Creates a descriptor with no hooks and no comment extensions.
    pub fn new(connector: impl Connector + 'static) -> Self {
        Driver {
            name: String::new(),
            aliases: Vec::new(),
            connector: Arc::new(connector),
            allow_multiline_comments: false,
            allow_c_comments: false,
            require_previous_password: false,
            version: None,
            change_password: None,
            error_decode: None,
            is_password_error: None,
            process: None,
            rows_affected: None,
        }
    }

    pub fn allow_multiline_comments(mut self) -> Self {
        self.allow_multiline_comments = true;
        self
    }

    pub fn allow_c_comments(mut self) -> Self {
        self.allow_c_comments = true;
        self
    }

    pub fn require_previous_password(mut self) -> Self {
        self.require_previous_password = true;
        self
    }

    pub fn with_version(mut self, f: VersionFn) -> Self {
        self.version = Some(f);
        self
    }

    pub fn with_change_password(mut self, f: ChangePasswordFn) -> Self {
        self.change_password = Some(f);
        self
    }

    pub fn with_error_decode(mut self, f: ErrorDecodeFn) -> Self {
        self.error_decode = Some(f);
        self
    }

    pub fn with_password_error(mut self, f: PasswordErrorFn) -> Self {
        self.is_password_error = Some(f);
        self
    }

    pub fn with_process(mut self, f: ProcessFn) -> Self {
        self.process = Some(f);
        self
    }

    pub fn with_rows_affected(mut self, f: RowsAffectedFn) -> Self {
        self.rows_affected = Some(f);
        self
    }

    /// Canonical name, set on registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn connect(&self, params: &str) -> BackendResult<Box<dyn Connection>> {
        self.connector.connect(params)
    }

    /// Decodes a native error, passing the raw message through when the
    /// driver has no decoder.
    pub fn decode_error(&self, err: &BackendError) -> (String, String) {
        match self.error_decode {
            Some(decode) => decode(err),
            None => (String::new(), err.to_string()),
        }
    }

    pub fn is_password_err(&self, err: &BackendError) -> bool {
        self.is_password_error.map_or(false, |f| f(err))
    }

    /// Classifies a statement, using [`statement::query_exec_type`] when the
    /// driver has no processor.
    pub fn process_statement(&self, prefix: &str, sql: &str) -> BackendResult<Processed> {
        match self.process {
            Some(process) => process(prefix, sql),
            None => {
                let (kind, is_query) = statement::query_exec_type(prefix, sql);
                Ok(Processed {
                    kind,
                    sql: sql.to_string(),
                    is_query,
                })
            }
        }
    }

    pub fn affected(&self, res: &ExecResult) -> BackendResult<i64> {
        match self.rows_affected {
            Some(f) => f(res),
            None => res
                .rows_affected
                .ok_or_else(|| BackendError::msg("rows affected not reported by driver")),
        }
    }

    /// Queries the backend version through the driver hook, or
    /// `SELECT version()` when there is none.
    pub fn query_version(&self, conn: &mut dyn Connection) -> BackendResult<String> {
        if let Some(version) = self.version {
            return version(conn);
        }
        let result = conn.query("SELECT version()")?;
        result
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .ok_or_else(|| BackendError::msg("version query returned no rows"))
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("allow_multiline_comments", &self.allow_multiline_comments)
            .field("allow_c_comments", &self.allow_c_comments)
            .field("require_previous_password", &self.require_previous_password)
            .field("change_password", &self.change_password.is_some())
            .finish_non_exhaustive()
    }
}

/// Table of registered drivers.
#[derive(Debug, Default)]
pub struct Registry {
    drivers: BTreeMap<String, Driver>,
    aliases: BTreeMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every driver compiled into this build.
    #[allow(unused_mut)]
    pub fn builtin() -> Self {
        let mut registry = Registry::new();
        #[cfg(feature = "sqlite3")]
        registry.register("sqlite3", sqlite::driver(), &["sqlite", "file", "sq"]);
        registry
    }

    /// Registers `driver` under `name` and each of `aliases`.
    ///
    /// # Panics
    ///
    /// Panics if `name` or any alias is already taken. Registration happens
    /// once at startup, so a clash is a build configuration bug.
    pub fn register(&mut self, name: &str, mut driver: Driver, aliases: &[&str]) {
        if self.drivers.contains_key(name) || self.aliases.contains_key(name) {
            panic!("driver {} registered twice", name);
        }
        for alias in aliases.iter().filter(|alias| **alias != name) {
            if self.drivers.contains_key(*alias) || self.aliases.contains_key(*alias) {
                panic!("alias {} for driver {} is already registered", alias, name);
            }
        }

        driver.name = name.to_string();
        driver.aliases = aliases
            .iter()
            .filter(|alias| **alias != name)
            .map(|alias| alias.to_string())
            .collect();
        for alias in &driver.aliases {
            self.aliases.insert(alias.clone(), name.to_string());
        }
        debug!("registered driver {} (aliases: {:?})", name, driver.aliases);
        self.drivers.insert(name.to_string(), driver);
    }

    /// Maps a name or alias to the canonical driver name.
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    /// Looks up a driver by canonical name or alias.
    pub fn resolve(&self, name: &str) -> Option<&Driver> {
        self.drivers.get(self.canonical(name))
    }

    /// Canonical names of all registered drivers, sorted.
    pub fn available(&self) -> Vec<&str> {
        self.drivers.keys().map(String::as_str).collect()
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}

/// Cargo feature names mapped to the driver they enable.
///
/// Used to answer `--has-<name>-support` for either spelling and to point
/// users at the right feature when a driver is missing.
pub fn known_build_tags() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("adodb", "adodb"),
        ("clickhouse", "clickhouse"),
        ("sapase", "tds"),
        ("sqlite3", "sqlite3"),
        ("voltdb", "voltdb"),
    ])
}

/// Returns the build tag that enables `driver`, or the driver name itself.
pub fn build_tag_for(driver: &str) -> &str {
    known_build_tags()
        .into_iter()
        .find(|(_, name)| *name == driver)
        .map_or(driver, |(tag, _)| tag)
}
