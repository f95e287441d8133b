//! Terminal access: the interactive line editor and hidden password input.
use crate::core::{Result, UniqlError};
use crate::input::{InputSource, Read};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::debug;

/// Number of entries kept in the history file.
const HISTORY_CAPACITY: usize = 1000;

/// Everything the handler needs from the user's terminal.
pub trait Terminal {
    /// Opens the interactive reader, persisting history to `history` when
    /// given.
    fn interactive_input(&mut self, history: Option<PathBuf>) -> Result<Box<dyn InputSource>>;

    /// Reads a password without echoing it.
    fn read_password(&mut self, prompt: &str) -> Result<String>;
}

/// The process's real terminal.
#[derive(Debug, Default)]
pub struct ConsoleTerminal;

impl Terminal for ConsoleTerminal {
    fn interactive_input(&mut self, history: Option<PathBuf>) -> Result<Box<dyn InputSource>> {
        let mut editor = Reedline::create();
        if let Some(path) = history {
            debug!("using history file {:?}", path);
            let history = FileBackedHistory::with_file(HISTORY_CAPACITY, path)
                .map_err(|e| UniqlError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?;
            editor = editor.with_history(Box::new(history));
        }
        Ok(Box::new(LineEditorInput {
            editor,
            prompt: prompt_for(""),
        }))
    }

    fn read_password(&mut self, prompt: &str) -> Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{}", prompt)?;
        stderr.flush()?;

        if !io::stdin().is_terminal() {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            return Ok(line.trim_end_matches(['\r', '\n']).to_string());
        }

        terminal::enable_raw_mode()?;
        let password = read_hidden();
        terminal::disable_raw_mode()?;
        writeln!(stderr)?;

        password?.ok_or_else(|| {
            UniqlError::Io(io::Error::new(io::ErrorKind::Interrupted, "interrupted"))
        })
    }
}

/// Reads key presses until Enter. Returns `None` on Ctrl-C.
fn read_hidden() -> io::Result<Option<String>> {
    let mut password = String::new();
    loop {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        {
            if kind != KeyEventKind::Press {
                continue;
            }
            match code {
                KeyCode::Enter => return Ok(Some(password)),
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(None),
                KeyCode::Backspace => {
                    password.pop();
                }
                KeyCode::Char(c) => password.push(c),
                _ => {}
            }
        }
    }
}

fn prompt_for(text: &str) -> DefaultPrompt {
    DefaultPrompt::new(
        DefaultPromptSegment::Basic(text.to_string()),
        DefaultPromptSegment::Empty,
    )
}

/// Interactive input backed by reedline.
pub struct LineEditorInput {
    editor: Reedline,
    prompt: DefaultPrompt,
}

impl InputSource for LineEditorInput {
    fn next_line(&mut self) -> Result<Read> {
        Ok(match self.editor.read_line(&self.prompt)? {
            Signal::Success(line) => Read::Line(line),
            Signal::CtrlC => Read::Interrupt,
            _ => Read::Eof,
        })
    }

    fn is_interactive(&self) -> bool {
        true
    }

    fn set_prompt(&mut self, prompt: &str) {
        self.prompt = prompt_for(prompt);
    }
}
