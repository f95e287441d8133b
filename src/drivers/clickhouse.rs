//! ClickHouse driver descriptor.
use crate::core::db::Connector;
use crate::drivers::Driver;

pub fn driver(connector: impl Connector + 'static) -> Driver {
    Driver::new(connector).allow_multiline_comments()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::Registry;
    use crate::statement::StatementBuffer;
    use crate::test_utils::MockConnector;

    #[test]
    fn test_block_comments_do_not_split() {
        let mut registry = Registry::new();
        registry.register("clickhouse", driver(MockConnector::new()), &[]);
        let d = registry.resolve("clickhouse").expect("registered");
        assert!(d.allow_multiline_comments && !d.allow_c_comments);

        let mut buf = StatementBuffer::new(d.allow_multiline_comments, d.allow_c_comments);
        assert!(buf.push_line("select /* a; b */ 1").is_empty());
        assert_eq!(buf.push_line(";"), vec!["select /* a; b */ 1\n;".to_string()]);
    }
}
