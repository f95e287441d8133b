//! Input sources feeding the handler: scripted commands, files and the
//! interactive line editor (see [`crate::terminal`]).
use crate::core::{Result, UniqlError};
use crate::terminal::Terminal;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One read from an input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Read {
    /// A line of text, without its line terminator
    Line(String),
    /// End of a self-contained command; any pending statement runs now
    Flush,
    /// No more input
    Eof,
    /// The user interrupted input
    Interrupt,
}

pub trait InputSource {
    fn next_line(&mut self) -> Result<Read>;

    fn is_interactive(&self) -> bool;

    /// Prompt shown before the next line, for interactive sources.
    fn set_prompt(&mut self, _prompt: &str) {}

    fn close(&mut self) {}
}

/// Non-interactive input from `-c` commands, a file, or included scripts.
#[derive(Debug, Default)]
pub struct ScriptInput {
    reads: VecDeque<Read>,
}

impl ScriptInput {
    /// Each command runs on its own, as if followed by a terminator.
    pub fn from_commands(commands: &[String]) -> Self {
        let mut reads = VecDeque::new();
        for command in commands {
            reads.extend(command.lines().map(|l| Read::Line(l.to_string())));
            reads.push_back(Read::Flush);
        }
        ScriptInput { reads }
    }

    pub fn from_text(text: &str) -> Self {
        ScriptInput {
            reads: text.lines().map(|l| Read::Line(l.to_string())).collect(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => UniqlError::NoSuchFileOrDirectory,
            _ => UniqlError::Io(e),
        })?;
        Ok(Self::from_text(&text))
    }
}

impl InputSource for ScriptInput {
    fn next_line(&mut self) -> Result<Read> {
        Ok(self.reads.pop_front().unwrap_or(Read::Eof))
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Builds the input for an invocation: explicit commands first, then a
/// file, then the interactive terminal.
pub fn open(
    commands: &[String],
    file: Option<&Path>,
    terminal: &mut dyn Terminal,
    history: Option<PathBuf>,
) -> Result<Box<dyn InputSource>> {
    if !commands.is_empty() {
        return Ok(Box::new(ScriptInput::from_commands(commands)));
    }
    if let Some(file) = file {
        return Ok(Box::new(ScriptInput::from_file(file)?));
    }
    terminal.interactive_input(history)
}
