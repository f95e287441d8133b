/// # Test Utilities Module
///
/// Test doubles for the backend seam and the terminal:
/// - `MockConnector`: a scriptable backend that records every call
/// - `ScriptedTerminal`: canned password answers and interactive input
/// - `SharedOutput`: an in-memory writer for inspecting rendered results
use crate::core::db::{BackendError, BackendResult, Connection, Connector, ExecResult, QueryResult};
use crate::core::{Result, UniqlError};
use crate::drivers::{Driver, Registry};
use crate::input::{InputSource, Read};
use crate::terminal::Terminal;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Calls observed by a `MockConnector` and its connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(String),
    Query(String),
    Exec(String),
    Begin,
    Commit,
    Rollback,
    Close,
}

/// Backend double. Clones share one event log.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    events: Arc<Mutex<Vec<Event>>>,
    password: Option<String>,
    fail_on: Option<String>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects connections whose parameters do not carry `:password@`.
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Fails any statement containing `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn connects(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Connect(_)))
            .count()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Connector for MockConnector {
    fn connect(&self, params: &str) -> BackendResult<Box<dyn Connection>> {
        if let Some(password) = &self.password {
            if !params.contains(&format!(":{}@", password)) {
                return Err(BackendError::msg("Login failed for mock user"));
            }
        }
        self.record(Event::Connect(params.to_string()));
        Ok(Box::new(MockConnection {
            connector: self.clone(),
            in_transaction: false,
        }))
    }
}

struct MockConnection {
    connector: MockConnector,
    in_transaction: bool,
}

impl MockConnection {
    fn check(&self, sql: &str) -> BackendResult<()> {
        match &self.connector.fail_on {
            Some(needle) if sql.contains(needle.as_str()) => {
                Err(BackendError::msg(format!("statement failed: {}", sql)))
            }
            _ => Ok(()),
        }
    }
}

impl Connection for MockConnection {
    fn query(&mut self, sql: &str) -> BackendResult<QueryResult> {
        self.connector.record(Event::Query(sql.to_string()));
        self.check(sql)?;
        if sql.contains("version()") {
            return Ok(QueryResult::new(
                vec!["version".to_string()],
                vec![vec!["Mock 1.0".to_string()]],
            ));
        }
        Ok(QueryResult::new(vec!["?column?".to_string()], vec![vec!["1".to_string()]]))
    }

    fn execute(&mut self, sql: &str) -> BackendResult<ExecResult> {
        self.connector.record(Event::Exec(sql.to_string()));
        self.check(sql)?;
        Ok(ExecResult::affected(1))
    }

    fn begin(&mut self) -> BackendResult<()> {
        self.connector.record(Event::Begin);
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> BackendResult<()> {
        self.connector.record(Event::Commit);
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> BackendResult<()> {
        self.connector.record(Event::Rollback);
        self.in_transaction = false;
        Ok(())
    }

    fn close(&mut self) -> BackendResult<()> {
        if self.in_transaction {
            self.connector.record(Event::Rollback);
            self.in_transaction = false;
        }
        self.connector.record(Event::Close);
        Ok(())
    }
}

fn mock_decode(err: &BackendError) -> (String, String) {
    ("MOCK".to_string(), err.to_string())
}

fn mock_password_error(err: &BackendError) -> bool {
    err.to_string().contains("Login failed")
}

fn mock_change_password(conn: &mut dyn Connection, _user: &str, new: &str, _old: &str) -> BackendResult<()> {
    conn.execute(&format!("ALTER USER SET PASSWORD '{}'", new)).map(|_| ())
}

/// Descriptor for the mock backend: decodes errors with code `MOCK` and
/// recognises "Login failed" as a password error.
pub fn mock_driver(connector: MockConnector) -> Driver {
    Driver::new(connector)
        .allow_multiline_comments()
        .with_error_decode(mock_decode)
        .with_password_error(mock_password_error)
}

/// Registry with the mock backend under `mock` (alias `mk`).
pub fn mock_registry(connector: MockConnector) -> Registry {
    let mut registry = Registry::new();
    registry.register("mock", mock_driver(connector), &["mk"]);
    registry
}

/// Registry whose mock backend supports password changes and requires the
/// old password.
pub fn password_registry(connector: MockConnector) -> Registry {
    let mut registry = Registry::new();
    registry.register(
        "mock",
        mock_driver(connector)
            .require_previous_password()
            .with_change_password(mock_change_password),
        &[],
    );
    registry
}

/// Writer whose contents can be read back after the handler is done.
#[derive(Debug, Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Terminal double answering password prompts from a queue and serving
/// interactive input from canned lines.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTerminal {
    passwords: Arc<Mutex<VecDeque<String>>>,
    lines: Vec<String>,
    prompts: Arc<Mutex<usize>>,
}

impl ScriptedTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_passwords(self, passwords: &[&str]) -> Self {
        self.passwords
            .lock()
            .unwrap()
            .extend(passwords.iter().map(|p| p.to_string()));
        self
    }

    pub fn with_lines(mut self, lines: &[&str]) -> Self {
        self.lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Number of password prompts shown so far.
    pub fn prompts(&self) -> usize {
        *self.prompts.lock().unwrap()
    }
}

impl Terminal for ScriptedTerminal {
    fn interactive_input(&mut self, _history: Option<PathBuf>) -> Result<Box<dyn InputSource>> {
        Ok(Box::new(InteractiveScript {
            lines: self.lines.iter().cloned().collect(),
        }))
    }

    fn read_password(&mut self, _prompt: &str) -> Result<String> {
        *self.prompts.lock().unwrap() += 1;
        self.passwords.lock().unwrap().pop_front().ok_or_else(|| {
            UniqlError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "no password left"))
        })
    }
}

/// Interactive input double; `^C` in the script reads as an interrupt.
struct InteractiveScript {
    lines: VecDeque<String>,
}

impl InputSource for InteractiveScript {
    fn next_line(&mut self) -> Result<Read> {
        Ok(match self.lines.pop_front() {
            Some(line) if line == "^C" => Read::Interrupt,
            Some(line) => Read::Line(line),
            None => Read::Eof,
        })
    }

    fn is_interactive(&self) -> bool {
        true
    }
}
