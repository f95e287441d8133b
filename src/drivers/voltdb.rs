//! VoltDB driver descriptor.
use crate::core::db::Connector;
use crate::drivers::Driver;

pub fn driver(connector: impl Connector + 'static) -> Driver {
    Driver::new(connector).allow_multiline_comments()
}
