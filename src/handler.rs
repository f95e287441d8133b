//! The handler drives one invocation of the client: it builds the input,
//! opens the session (prompting for passwords when the backend rejects
//! one), optionally wraps the run in a single transaction, runs the rc file
//! and then every statement and meta command the input yields.
use crate::config::{self, Config};
use crate::core::db::{Outcome, Session};
use crate::core::{Result, UniqlError};
use crate::drivers::{Driver, Registry};
use crate::dsn;
use crate::env::{self, VariableStore, Variables};
use crate::input::{self, InputSource, Read, ScriptInput};
use crate::repl::{self, Command};
use crate::statement::{self, StatementBuffer};
use crate::terminal::Terminal;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything the command line asked for. Built once per process.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub dsn: Option<String>,
    /// Operating system user running the client
    pub user: String,
    pub commands: Vec<String>,
    pub file: Option<PathBuf>,
    /// `NAME=VALUE` sets, a bare `NAME` unsets
    pub variables: Vec<String>,
    pub no_password: bool,
    pub force_password: bool,
    pub single_transaction: bool,
    pub no_rc: bool,
}

/// Resolved settings from the configuration file and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub password_attempts: u32,
    pub rc_file: Option<PathBuf>,
    pub history_file: Option<PathBuf>,
    pub prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            password_attempts: config::DEFAULT_PASSWORD_ATTEMPTS,
            rc_file: None,
            history_file: None,
            prompt: "{driver}=> ".to_string(),
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Settings {
            password_attempts: config.session.password_attempts,
            rc_file: env::rc_file(config.session.rc_file.as_deref()),
            history_file: env::history_file(config.session.history_file.as_deref()),
            prompt: config.ui.prompt.clone(),
        }
    }
}

/// Whether reading should go on after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Handler<'r> {
    registry: &'r Registry,
    session: Session<'r>,
    terminal: Box<dyn Terminal>,
    vars: Variables,
    settings: Settings,
    out: Box<dyn Write>,
    wd: PathBuf,
    user: String,
}

impl<'r> Handler<'r> {
    pub fn new(registry: &'r Registry, terminal: Box<dyn Terminal>, settings: Settings) -> Self {
        Handler {
            registry,
            session: Session::new(registry),
            terminal,
            vars: Variables::new(),
            settings,
            out: Box::new(io::stdout()),
            wd: PathBuf::new(),
            user: String::new(),
        }
    }

    /// Sends query results to `out` instead of stdout.
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    pub fn session(&self) -> &Session<'r> {
        &self.session
    }

    pub fn variables(&self) -> &Variables {
        &self.vars
    }

    /// Runs one invocation to completion.
    ///
    /// End of input and interrupts end the run successfully. With
    /// `single_transaction`, the transaction is committed only when every
    /// statement succeeded; on error the session is left for teardown to
    /// roll back.
    pub fn run(&mut self, inv: &Invocation) -> Result<()> {
        self.wd = std::env::current_dir()?;
        self.user = inv.user.clone();
        env::apply_overrides(&mut self.vars, &inv.variables);

        let history = self.settings.history_file.clone();
        let mut input = input::open(
            &inv.commands,
            inv.file.as_deref(),
            self.terminal.as_mut(),
            history,
        )?;
        let result = self.run_input(inv, input.as_mut());
        input.close();
        result
    }

    fn run_input(&mut self, inv: &Invocation, input: &mut dyn InputSource) -> Result<()> {
        let interactive = input.is_interactive();
        if inv.single_transaction && interactive {
            return Err(UniqlError::SingleTransactionCannotBeUsedWithInteractiveMode);
        }

        match inv.dsn.as_deref() {
            Some(dsn) => self.open(dsn, inv, interactive)?,
            None if inv.force_password => return Err(UniqlError::MissingDsn),
            None => {}
        }

        if inv.single_transaction {
            self.session.begin()?;
        }

        let mut flow = Flow::Continue;
        if !inv.no_rc {
            if let Some(rc) = self.settings.rc_file.clone() {
                flow = match self.include(&rc) {
                    Err(UniqlError::NoSuchFileOrDirectory) => {
                        debug!("no rc file at {:?}", rc);
                        Flow::Continue
                    }
                    other => other?,
                };
            }
        }

        if flow == Flow::Continue {
            self.run_loop(input, interactive)?;
        }

        if inv.single_transaction {
            self.session.commit()?;
        }
        Ok(())
    }

    /// Opens the session, prompting for a password up front in
    /// force-password mode and again whenever the backend rejects one.
    fn open(&mut self, dsn: &str, inv: &Invocation, interactive: bool) -> Result<()> {
        let mut dsn = dsn.to_string();
        let mut attempts = 0;
        if inv.force_password {
            dsn = self.password_dsn(&dsn)?;
            attempts += 1;
        }

        loop {
            match self.session.open(&dsn) {
                Ok(()) => break,
                Err(err) if err.is_password_error() && !inv.no_password => {
                    if attempts >= self.settings.password_attempts {
                        return Err(UniqlError::PasswordAttemptsExhausted);
                    }
                    warn!("password rejected: {}", err);
                    dsn = self.password_dsn(&dsn)?;
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }

        if interactive {
            self.print_banner()?;
        }
        Ok(())
    }

    fn password_dsn(&mut self, dsn: &str) -> Result<String> {
        let user = dsn::username(dsn).unwrap_or_else(|| self.user.clone());
        let password = self
            .terminal
            .read_password(&format!("Enter password for {}: ", user))?;
        dsn::with_password(dsn, &user, &password)
    }

    fn print_banner(&mut self) -> Result<()> {
        let name = self.session.driver().map_or("", Driver::name);
        match self.session.version() {
            Ok(version) => writeln!(self.out, "Connected with driver {} ({})", name, version)?,
            Err(err) => {
                debug!("could not query version: {}", err);
                writeln!(self.out, "Connected with driver {}", name)?;
            }
        }
        writeln!(self.out, "Type \"\\?\" for help.\n")?;
        Ok(())
    }

    /// Runs a script file. Relative paths resolve against the working
    /// directory.
    pub fn include(&mut self, path: &Path) -> Result<Flow> {
        let path = if path.is_relative() {
            self.wd.join(path)
        } else {
            path.to_path_buf()
        };
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => UniqlError::NoSuchFileOrDirectory,
            _ => UniqlError::Io(e),
        })?;
        if metadata.is_dir() {
            return Err(UniqlError::CannotIncludeDirectories);
        }

        info!("including {:?}", path);
        let mut input = ScriptInput::from_file(&path)?;
        self.run_loop(&mut input, false)
    }

    /// Reads until end of input, an interrupt or `\q`.
    ///
    /// In interactive mode failures are reported and reading goes on;
    /// otherwise the first failure ends the loop.
    fn run_loop(&mut self, input: &mut dyn InputSource, interactive: bool) -> Result<Flow> {
        let mut buf = self.statement_buffer();
        loop {
            if interactive {
                input.set_prompt(&self.prompt(buf.is_empty()));
            }
            match input.next_line()? {
                Read::Eof => {
                    if let Some(stmt) = buf.finish() {
                        let res = self.run_statement(&stmt);
                        report(res, interactive)?;
                    }
                    return Ok(Flow::Continue);
                }
                Read::Interrupt => {
                    debug!("input interrupted");
                    return Ok(Flow::Quit);
                }
                Read::Flush => {
                    if let Some(stmt) = buf.finish() {
                        let res = self.run_statement(&stmt);
                        report(res, interactive)?;
                    }
                }
                Read::Line(line) => {
                    if buf.is_empty() && line.trim_start().starts_with('\\') {
                        match self.run_meta(&line) {
                            Ok(Flow::Quit) => return Ok(Flow::Quit),
                            Ok(Flow::Continue) => {}
                            Err(err) => report(Err(err), interactive)?,
                        }
                        continue;
                    }
                    for stmt in buf.push_line(&line) {
                        let res = self.run_statement(&stmt);
                        report(res, interactive)?;
                    }
                }
            }
        }
    }

    fn statement_buffer(&self) -> StatementBuffer {
        self.session.driver().map_or_else(StatementBuffer::default, |d| {
            StatementBuffer::new(d.allow_multiline_comments, d.allow_c_comments)
        })
    }

    fn prompt(&self, fresh: bool) -> String {
        let name = self.session.driver().map_or("(not connected)", Driver::name);
        let prompt = self.settings.prompt.replace("{driver}", name);
        if fresh {
            prompt
        } else {
            prompt.replace("=>", "->")
        }
    }

    fn run_statement(&mut self, stmt: &str) -> Result<()> {
        let prefix = statement::prefix(stmt, statement::PREFIX_WORDS);
        let outcome = self.session.execute(&prefix, stmt)?;
        match outcome {
            Outcome::Rows(result) => {
                let header = result.columns.join(" | ");
                writeln!(self.out, "{}", header)?;
                writeln!(self.out, "{}", "-".repeat(header.len()))?;
                for row in &result.rows {
                    writeln!(self.out, "{}", row.join(" | "))?;
                }
                writeln!(self.out, "({} rows)\n", result.row_count)?;
            }
            Outcome::Affected { kind, rows } => writeln!(self.out, "{} {}", kind, rows)?,
        }
        self.out.flush()?;
        Ok(())
    }

    fn run_meta(&mut self, line: &str) -> Result<Flow> {
        let command = match repl::parse_command(line) {
            Some(command) => command,
            None => return Ok(Flow::Continue),
        };
        debug!("meta command {:?}", command);
        match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Include(Some(path)) => return self.include(Path::new(&path)),
            Command::Include(None) | Command::Unset(None) => {
                return Err(UniqlError::MissingRequiredArgument)
            }
            Command::Begin => self.session.begin()?,
            Command::Commit => self.session.commit()?,
            Command::Rollback => self.session.rollback()?,
            Command::Password(user) => self.change_password(user.as_deref())?,
            Command::Set { name: None, .. } => {
                for (name, value) in self.vars.iter() {
                    writeln!(self.out, "{} = '{}'", name, value)?;
                }
            }
            Command::Set {
                name: Some(name),
                value,
            } => self.vars.set(&name, value.as_deref().unwrap_or("")),
            Command::Unset(Some(name)) => self.vars.unset(&name),
            Command::Drivers => {
                let registry = self.registry;
                writeln!(self.out, "Available Drivers:")?;
                for name in registry.available() {
                    let aliases = registry
                        .resolve(name)
                        .map(|d| d.aliases().join(", "))
                        .unwrap_or_default();
                    if aliases.is_empty() {
                        writeln!(self.out, "  {}", name)?;
                    } else {
                        writeln!(self.out, "  {} [{}]", name, aliases)?;
                    }
                }
            }
            Command::ConnInfo => match self.session.driver() {
                Some(driver) => writeln!(self.out, "Connected with driver {}", driver.name())?,
                None => writeln!(self.out, "Not connected.")?,
            },
            Command::Help => write!(self.out, "{}", repl::help_text())?,
            Command::Unknown(name) => return Err(UniqlError::UnknownCommand(name)),
        }
        Ok(Flow::Continue)
    }

    /// Prompts for the new (and, when the driver needs it, the old)
    /// password and changes it. No `user` means the connected user.
    fn change_password(&mut self, user: Option<&str>) -> Result<()> {
        let driver = self.session.driver().ok_or(UniqlError::NotConnected)?;
        if driver.change_password.is_none() {
            return Err(UniqlError::PasswordNotSupportedByDriver);
        }

        let shown = user.map_or_else(|| self.user.clone(), str::to_string);
        let new = self
            .terminal
            .read_password(&format!("Enter new password for {}: ", shown))?;
        let again = self.terminal.read_password("Enter it again: ")?;
        if new != again {
            return Err(UniqlError::PasswordMismatch);
        }
        let old = if driver.require_previous_password {
            self.terminal.read_password("Enter old password: ")?
        } else {
            String::new()
        };

        self.session.change_password(user.unwrap_or(""), &new, &old)?;
        info!("password changed for {}", shown);
        Ok(())
    }
}

/// Swallows (after printing) failures in interactive mode.
fn report(result: Result<()>, interactive: bool) -> Result<()> {
    match result {
        Err(err) if interactive => {
            eprintln!("error: {}", err);
            Ok(())
        }
        other => other,
    }
}
