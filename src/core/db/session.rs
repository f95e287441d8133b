/// Session Module
///
/// A [`Session`] owns at most one live backend connection together with the
/// driver it was opened through and the current transaction state. Every
/// backend failure is decoded through the driver before it leaves this
/// module, so callers only ever see [`UniqlError`].
use crate::core::db::{BackendError, Connection, QueryResult};
use crate::core::{DriverError, Result, UniqlError};
use crate::drivers::{Driver, Registry};
use crate::dsn;
use crate::statement::{self, TransactionControl};
use tracing::{debug, info, warn};

/// Outcome of a dispatched statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The statement returned rows
    Rows(QueryResult),
    /// The statement changed data or schema
    Affected {
        /// Statement type, e.g. `INSERT`
        kind: String,
        rows: i64,
    },
}

pub struct Session<'r> {
    registry: &'r Registry,
    driver: Option<&'r Driver>,
    conn: Option<Box<dyn Connection>>,
    transaction_active: bool,
}

impl<'r> Session<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Session {
            registry,
            driver: None,
            conn: None,
            transaction_active: false,
        }
    }

    /// Opens a connection for `dsn`, closing any previous one first.
    ///
    /// Fails with `DriverNotAvailable` when the backend named in the DSN has
    /// no registered driver, and with `Authentication` when the driver
    /// recognises the connection failure as a rejected password.
    pub fn open(&mut self, dsn: &str) -> Result<()> {
        let (name, params) = dsn::split(dsn)?;
        let driver = self
            .registry
            .resolve(name)
            .ok_or_else(|| UniqlError::DriverNotAvailable(name.to_string()))?;

        self.close();
        debug!("connecting with driver {}", driver.name());
        let conn = driver.connect(params).map_err(|err| {
            let decoded = decode(driver, &err);
            if driver.is_password_err(&err) {
                UniqlError::Authentication(decoded)
            } else {
                UniqlError::Backend(decoded)
            }
        })?;

        info!("connected with driver {}", driver.name());
        self.conn = Some(conn);
        self.driver = Some(driver);
        Ok(())
    }

    /// Releases the connection. Safe to call at any time; an unfinished
    /// transaction is left for the backend to roll back.
    pub fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if self.transaction_active {
                debug!("closing connection with an open transaction");
            }
            if let Err(err) = conn.close() {
                warn!("error closing connection: {}", err);
            }
        }
        self.driver = None;
        self.transaction_active = false;
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction_active
    }

    /// Driver of the open connection.
    pub fn driver(&self) -> Option<&'r Driver> {
        self.driver
    }

    pub fn begin(&mut self) -> Result<()> {
        let active = self.transaction_active;
        let (driver, conn) = self.connection()?;
        if active {
            return Err(UniqlError::PreviousTransactionExists);
        }
        conn.begin().map_err(|err| backend(driver, &err))?;
        debug!("transaction started");
        self.transaction_active = true;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        let active = self.transaction_active;
        let (driver, conn) = self.connection()?;
        if !active {
            return Err(UniqlError::NoPreviousTransactionExists);
        }
        let res = conn.commit();
        self.transaction_active = false;
        res.map_err(|err| backend(driver, &err))?;
        debug!("transaction committed");
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        let active = self.transaction_active;
        let (driver, conn) = self.connection()?;
        if !active {
            return Err(UniqlError::NoPreviousTransactionExists);
        }
        let res = conn.rollback();
        self.transaction_active = false;
        res.map_err(|err| backend(driver, &err))?;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Changes a password through the driver's hook.
    ///
    /// An empty `user` means the connected user.
    pub fn change_password(&mut self, user: &str, new_password: &str, old_password: &str) -> Result<()> {
        let (driver, conn) = self.connection()?;
        let change = driver
            .change_password
            .ok_or(UniqlError::PasswordNotSupportedByDriver)?;
        if driver.require_previous_password && old_password.is_empty() {
            return Err(UniqlError::MissingRequiredArgument);
        }
        change(&mut **conn, user, new_password, old_password).map_err(|err| backend(driver, &err))
    }

    /// Backend version string.
    pub fn version(&mut self) -> Result<String> {
        let (driver, conn) = self.connection()?;
        driver
            .query_version(&mut **conn)
            .map_err(|err| backend(driver, &err))
    }

    /// Classifies, rewrites and runs one statement.
    ///
    /// Statements that begin or end a transaction in raw SQL are checked
    /// against, and update, the session's transaction state.
    pub fn execute(&mut self, prefix: &str, raw: &str) -> Result<Outcome> {
        let driver = self.driver.ok_or(UniqlError::NotConnected)?;
        let conn = self.conn.as_mut().ok_or(UniqlError::NotConnected)?;

        let processed = driver
            .process_statement(prefix, raw)
            .map_err(|err| backend(driver, &err))?;

        let control = statement::transaction_control(prefix);
        match control {
            Some(TransactionControl::Begin) if self.transaction_active => {
                return Err(UniqlError::PreviousTransactionExists);
            }
            Some(TransactionControl::Commit | TransactionControl::Rollback)
                if !self.transaction_active =>
            {
                return Err(UniqlError::NoPreviousTransactionExists);
            }
            _ => {}
        }

        debug!("executing {} statement", processed.kind);
        let outcome = if processed.is_query {
            let rows = conn
                .query(&processed.sql)
                .map_err(|err| backend(driver, &err))?;
            Outcome::Rows(rows)
        } else {
            let res = conn
                .execute(&processed.sql)
                .map_err(|err| backend(driver, &err))?;
            let rows = driver.affected(&res).map_err(|err| backend(driver, &err))?;
            Outcome::Affected {
                kind: processed.kind,
                rows,
            }
        };

        match control {
            Some(TransactionControl::Begin) => self.transaction_active = true,
            Some(_) => self.transaction_active = false,
            None => {}
        }
        Ok(outcome)
    }

    fn connection(&mut self) -> Result<(&'r Driver, &mut Box<dyn Connection>)> {
        let driver = self.driver.ok_or(UniqlError::NotConnected)?;
        let conn = self.conn.as_mut().ok_or(UniqlError::NotConnected)?;
        Ok((driver, conn))
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

fn decode(driver: &Driver, err: &BackendError) -> DriverError {
    let (code, message) = driver.decode_error(err);
    DriverError {
        driver: driver.name().to_string(),
        code,
        message,
    }
}

fn backend(driver: &Driver, err: &BackendError) -> UniqlError {
    UniqlError::Backend(decode(driver, err))
}
