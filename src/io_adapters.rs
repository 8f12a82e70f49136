use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Write};

/// One result of asking the user for a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// The read was interrupted (Ctrl-C); the session goes on.
    Interrupted,
    /// No more input will arrive.
    Eof,
}

/// Source of command lines for the read-eval loop.
pub trait LineSource {
    /// Show `prompt` (if the source is interactive) and read one line.
    fn next_line(&mut self, prompt: &str) -> Result<Input>;
}

/// Interactive terminal input with line editing.
pub struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().context("can't initialise line editor")?;
        Ok(Self { editor })
    }
}

impl LineSource for Terminal {
    fn next_line(&mut self, prompt: &str) -> Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor
                        .add_history_entry(line.as_str())
                        .context("can't record line in editor")?;
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(err) => Err(err).context("can't read input"),
        }
    }
}

/// Non-interactive input, one line per read.
///
/// The prompt is written to `prompt_out` when one is given; `new` reads
/// silently.
pub struct ScriptedInput<R, W = io::Sink> {
    reader: R,
    prompt_out: Option<W>,
}

impl<R: BufRead> ScriptedInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            prompt_out: None,
        }
    }
}

impl<R: BufRead, W: Write> ScriptedInput<R, W> {
    /// Read from `reader`, writing the prompt to `prompt_out` before each line.
    pub fn with_prompt(reader: R, prompt_out: W) -> Self {
        Self {
            reader,
            prompt_out: Some(prompt_out),
        }
    }
}

impl<R: BufRead, W: Write> LineSource for ScriptedInput<R, W> {
    fn next_line(&mut self, prompt: &str) -> Result<Input> {
        if let Some(out) = self.prompt_out.as_mut() {
            write!(out, "{}", prompt).context("can't write prompt")?;
            out.flush().context("can't write prompt")?;
        }
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context("can't read input")?;
        if read == 0 {
            return Ok(Input::Eof);
        }
        let stripped = line.strip_suffix('\n').unwrap_or(&line);
        let stripped = stripped.strip_suffix('\r').unwrap_or(stripped);
        Ok(Input::Line(stripped.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_scripted_input_yields_lines_then_eof() {
        let mut source = ScriptedInput::new(Cursor::new(b"echo a\r\n\nlast".to_vec()));
        assert_eq!(source.next_line("> ").unwrap(), Input::Line("echo a".to_string()));
        assert_eq!(source.next_line("> ").unwrap(), Input::Line(String::new()));
        assert_eq!(source.next_line("> ").unwrap(), Input::Line("last".to_string()));
        assert_eq!(source.next_line("> ").unwrap(), Input::Eof);
        assert_eq!(source.next_line("> ").unwrap(), Input::Eof);
    }

    #[test]
    fn test_scripted_input_writes_prompt_before_each_read() {
        let mut source = ScriptedInput::with_prompt(Cursor::new(b"echo a\n".to_vec()), Vec::new());
        assert_eq!(source.next_line("> ").unwrap(), Input::Line("echo a".to_string()));
        assert_eq!(source.next_line("> ").unwrap(), Input::Eof);
        assert_eq!(source.prompt_out.as_deref(), Some(&b"> > "[..]));
    }

    #[test]
    fn test_scripted_input_rejects_invalid_utf8() {
        let mut source = ScriptedInput::new(Cursor::new(vec![0xFF, 0xFE, b'\n']));
        assert!(source.next_line("> ").is_err());
    }
}
