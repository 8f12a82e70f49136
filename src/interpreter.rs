use crate::builtin::{BootCheck, CronSnapshot, Echo, EnvQuery, MemDump, ShowHistory};
use crate::command::{Command, CommandKind, ExecutableCommand};
use crate::config::Config;
use crate::env::Environment;
use crate::external::ExternalCommand;
use crate::history::History;
use crate::io_adapters::{Input, LineSource};
use anyhow::Result;
use std::io::Write;

/// Everything a command may read or change during one shell session.
pub struct Session {
    pub env: Environment,
    pub history: History,
    pub config: Config,
}

impl Session {
    pub fn new(config: Config, env: Environment) -> Self {
        Self {
            env,
            history: History::new(),
            config,
        }
    }
}

/// Where the read-eval loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Prompting,
    Reading,
    Dispatching,
    /// The session has ended; no further input is read.
    Terminated,
}

/// Whether the loop should keep reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The interactive shell: reads lines, records them and routes each one to a
/// single handler.
///
/// Example
/// ```
/// use diagsh::{Config, Environment, Flow, Interpreter};
/// let mut sh = Interpreter::new(Config::default(), Environment::with_vars([("FOO", "bar")]));
/// let mut out = Vec::new();
/// assert_eq!(sh.dispatch("\\e FOO", &mut out).unwrap(), Flow::Continue);
/// assert_eq!(String::from_utf8(out).unwrap(), "FOO=bar\n");
/// ```
pub struct Interpreter {
    session: Session,
    state: State,
}

impl Interpreter {
    pub fn new(config: Config, env: Environment) -> Self {
        Self {
            session: Session::new(config, env),
            state: State::Prompting,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.session.history
    }

    pub fn config(&self) -> &Config {
        &self.session.config
    }

    /// Handle one line of input.
    ///
    /// Blank lines do nothing. Any other line is recorded in history before it
    /// runs. Handler failures are printed to `stdout`; the only error returned is
    /// a failure to write the farewell output.
    pub fn dispatch(&mut self, line: &str, stdout: &mut dyn Write) -> Result<Flow> {
        if self.state == State::Terminated {
            return Ok(Flow::Exit);
        }
        let Some(cmd) = Command::parse(line) else {
            self.state = State::Prompting;
            return Ok(Flow::Continue);
        };

        self.state = State::Dispatching;
        self.session.history.push(cmd.text());
        log::debug!("dispatching {:?} as {:?}", cmd.text(), cmd.kind());

        let handler: Box<dyn ExecutableCommand> = match cmd.kind() {
            CommandKind::Exit => {
                self.terminate(stdout)?;
                return Ok(Flow::Exit);
            }
            CommandKind::History => Box::new(ShowHistory),
            CommandKind::Echo => Box::new(Echo {
                text: cmd.argument().to_string(),
            }),
            CommandKind::EnvQuery => Box::new(EnvQuery::new(cmd.argument())),
            CommandKind::BootCheck => Box::new(BootCheck {
                target: cmd.argument().to_string(),
            }),
            CommandKind::CronSnapshot => Box::new(CronSnapshot),
            CommandKind::MemDump => match MemDump::create(cmd.argument()) {
                Ok(handler) => handler,
                Err(e) => {
                    writeln!(stdout, "{:#}", e)?;
                    self.state = State::Prompting;
                    return Ok(Flow::Continue);
                }
            },
            CommandKind::External => match ExternalCommand::from_line(cmd.text()) {
                Some(external) => Box::new(external),
                None => {
                    self.state = State::Prompting;
                    return Ok(Flow::Continue);
                }
            },
        };

        let code = handler.run(stdout, &mut self.session);
        log::debug!("{:?} finished with {}", cmd.text(), code);
        self.state = State::Prompting;
        Ok(Flow::Continue)
    }

    /// Save history, say goodbye and stop.
    fn terminate(&mut self, stdout: &mut dyn Write) -> Result<()> {
        let path = &self.session.config.history_file;
        match self.session.history.save(path) {
            Ok(()) => writeln!(stdout, "History saved to {}.", path.display())?,
            Err(e) => {
                log::warn!("history not saved: {:#}", e);
                writeln!(stdout, "Failed to save history: {:#}", e)?;
            }
        }
        writeln!(stdout, "Goodbye!")?;
        stdout.flush()?;
        self.state = State::Terminated;
        Ok(())
    }

    /// Read-eval loop: prompt, read a line, dispatch it, until the session ends.
    ///
    /// End of input ends the session like `exit` without being recorded. Only a
    /// failure of the line source itself is returned as an error.
    pub fn repl(&mut self, source: &mut dyn LineSource, stdout: &mut dyn Write) -> Result<()> {
        if self.session.config.banner {
            writeln!(stdout, "Welcome to diagsh! Type exit or \\q to quit.")?;
        }
        while self.state != State::Terminated {
            self.state = State::Prompting;
            stdout.flush()?;
            self.state = State::Reading;
            match source.next_line(&self.session.config.prompt)? {
                Input::Line(line) => {
                    self.dispatch(&line, stdout)?;
                }
                Input::Interrupted => {
                    writeln!(stdout, "Interrupted")?;
                }
                Input::Eof => {
                    self.terminate(stdout)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::ScriptedInput;
    use crate::test_support::make_unique_temp_dir;
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;

    fn config_in(dir: &Path) -> Config {
        Config {
            history_file: dir.join("history.txt"),
            cron_dir: dir.join("cron"),
            snapshot_file: dir.join("vfs"),
            banner: false,
            ..Config::default()
        }
    }

    fn run_script(config: Config, vars: &[(&str, &str)], script: &str) -> (Interpreter, String) {
        let mut sh = Interpreter::new(config, Environment::with_vars(vars.iter().copied()));
        let mut source = ScriptedInput::new(Cursor::new(script.as_bytes().to_vec()));
        let mut out = Vec::new();
        sh.repl(&mut source, &mut out).unwrap();
        (sh, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_echo_history_exit_scenario() {
        let dir = make_unique_temp_dir("session_scenario").unwrap();
        let config = config_in(&dir);
        let history_file = config.history_file.clone();

        let (sh, out) = run_script(config, &[], "echo hi\nhistory\nexit\n");

        assert_eq!(
            out,
            format!(
                "hi\n1: echo hi\n2: history\nHistory saved to {}.\nGoodbye!\n",
                history_file.display()
            )
        );
        assert_eq!(sh.state(), State::Terminated);
        assert_eq!(fs::read_to_string(&history_file).unwrap(), "echo hi\nhistory\nexit\n");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_blank_lines_are_not_recorded() {
        let dir = make_unique_temp_dir("session_blank").unwrap();
        let (sh, _) = run_script(config_in(&dir), &[], "\n   \necho a\n\t\necho b\n\\q\n");

        assert_eq!(sh.history().entries(), ["echo a", "echo b", "\\q"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_history_length_counts_every_non_empty_line() {
        let dir = make_unique_temp_dir("session_count").unwrap();
        let lines = [
            "echo one",
            "",
            "\\e FOO",
            "\\e NOPE",
            "\\l /definitely/not/here",
            "\\mem",
            "\\mem xyz",
            "history",
            "   ",
            "EXIT",
        ];
        let script = lines.join("\n");
        let (sh, _) = run_script(config_in(&dir), &[("FOO", "bar")], &script);

        let non_empty = lines.iter().filter(|l| !l.trim().is_empty()).count();
        assert_eq!(sh.history().len(), non_empty);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_end_of_input_saves_history() {
        let dir = make_unique_temp_dir("session_eof").unwrap();
        let config = config_in(&dir);
        let history_file = config.history_file.clone();

        let (sh, out) = run_script(config, &[], "echo last words");

        assert!(out.starts_with("last words\n"));
        assert!(out.ends_with("Goodbye!\n"));
        assert_eq!(sh.state(), State::Terminated);
        assert_eq!(fs::read_to_string(&history_file).unwrap(), "echo last words\n");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_lines_after_exit_are_ignored() {
        let dir = make_unique_temp_dir("session_after_exit").unwrap();
        let (sh, out) = run_script(config_in(&dir), &[], "exit\necho too late\n");

        assert!(!out.contains("too late"));
        assert_eq!(sh.history().entries(), ["exit"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failures_do_not_end_the_session() {
        let dir = make_unique_temp_dir("session_failures").unwrap();
        let script = "definitely-not-a-program-4242\n\\e MISSING\n\\mem abc\necho still here\nexit\n";
        let (sh, out) = run_script(config_in(&dir), &[("PATH", "/nonexistent")], script);

        assert!(out.contains("definitely-not-a-program-4242: command not found\n"));
        assert!(out.contains("Environment variable MISSING not found.\n"));
        assert!(out.contains("Invalid PID: abc\n"));
        assert!(out.contains("still here\n"));
        assert_eq!(sh.history().len(), 5);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_history_save_failure_still_says_goodbye() {
        let dir = make_unique_temp_dir("session_save_fail").unwrap();
        let config = Config {
            history_file: dir.join("missing").join("history.txt"),
            ..config_in(&dir)
        };
        let (sh, out) = run_script(config, &[], "exit\n");

        assert!(out.starts_with("Failed to save history: "));
        assert!(out.ends_with("Goodbye!\n"));
        assert_eq!(sh.state(), State::Terminated);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_dispatch_state_transitions() {
        let dir = make_unique_temp_dir("session_states").unwrap();
        let mut sh = Interpreter::new(config_in(&dir), Environment::with_vars([("FOO", "bar")]));
        let mut out = Vec::new();

        assert_eq!(sh.state(), State::Prompting);
        assert_eq!(sh.dispatch("", &mut out).unwrap(), Flow::Continue);
        assert_eq!(sh.state(), State::Prompting);
        assert_eq!(sh.dispatch("\\e $FOO", &mut out).unwrap(), Flow::Continue);
        assert_eq!(sh.state(), State::Prompting);
        assert_eq!(sh.dispatch("\\q", &mut out).unwrap(), Flow::Exit);
        assert_eq!(sh.state(), State::Terminated);

        // terminated is absorbing
        assert_eq!(sh.dispatch("echo again", &mut out).unwrap(), Flow::Exit);
        assert_eq!(sh.history().len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_independent_sessions() {
        let dir = make_unique_temp_dir("session_independent").unwrap();
        let mut first = Interpreter::new(config_in(&dir), Environment::with_vars([("A", "1")]));
        let mut second = Interpreter::new(config_in(&dir), Environment::with_vars([("A", "2")]));
        let mut out1 = Vec::new();
        let mut out2 = Vec::new();

        first.dispatch("\\e A", &mut out1).unwrap();
        first.dispatch("echo x", &mut out1).unwrap();
        second.dispatch("\\e A", &mut out2).unwrap();

        assert_eq!(String::from_utf8(out1).unwrap(), "A=1\nx\n");
        assert_eq!(String::from_utf8(out2).unwrap(), "A=2\n");
        assert_eq!(first.history().len(), 2);
        assert_eq!(second.history().len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_boot_check_twice_gives_same_verdict() {
        let dir = make_unique_temp_dir("session_boot").unwrap();
        fs::create_dir(dir.join("efi")).unwrap();
        let line = format!("\\l {}", dir.display());

        let mut sh = Interpreter::new(config_in(&dir), Environment::with_vars([("A", "1")]));
        let mut first = Vec::new();
        let mut second = Vec::new();
        sh.dispatch(&line, &mut first).unwrap();
        sh.dispatch(&line, &mut second).unwrap();

        let first = String::from_utf8(first).unwrap();
        assert_eq!(
            first,
            format!("marker directory `efi` present\nDisk {} is bootable.\n", dir.display())
        );
        assert_eq!(first, String::from_utf8(second).unwrap());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_banner_is_printed_first() {
        let dir = make_unique_temp_dir("session_banner").unwrap();
        let config = Config {
            banner: true,
            ..config_in(&dir)
        };
        let (_, out) = run_script(config, &[], "exit\n");
        assert!(out.starts_with("Welcome to diagsh! Type exit or \\q to quit.\n"));

        let _ = fs::remove_dir_all(&dir);
    }
}
