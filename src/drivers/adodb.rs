//! ADODB (OLE DB) driver descriptor. Registered with the `oleodbc` alias.
use crate::core::db::{BackendResult, Connector, ExecResult};
use crate::drivers::Driver;

pub fn driver(connector: impl Connector + 'static) -> Driver {
    Driver::new(connector)
        .allow_multiline_comments()
        .allow_c_comments()
        .with_rows_affected(rows_affected)
}

/// OLE DB providers do not report affected rows reliably.
fn rows_affected(_res: &ExecResult) -> BackendResult<i64> {
    Ok(0)
}
