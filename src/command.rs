use crate::interpreter::Session;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// What a line of input asks the shell to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Save history, say goodbye and stop reading input.
    Exit,
    /// Print the session history.
    History,
    /// Print the rest of the line.
    Echo,
    /// Print one environment variable.
    EnvQuery,
    /// Check whether a disk, image or directory is bootable.
    BootCheck,
    /// Write the cron spool listing to the snapshot file.
    CronSnapshot,
    /// Dump the memory of a running process.
    MemDump,
    /// Anything else: run it as a program.
    External,
}

/// How a table entry recognises its line.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    /// The whole line, ignoring ASCII case.
    KeywordNoCase(&'static str),
    /// The whole line, exactly.
    Keyword(&'static str),
    /// The marker alone or followed by whitespace; the rest is the argument.
    Marker(&'static str),
}

impl Trigger {
    /// Returns the argument text when `line` matches.
    fn matches<'a>(&self, line: &'a str) -> Option<&'a str> {
        match *self {
            Trigger::KeywordNoCase(word) => line.eq_ignore_ascii_case(word).then_some(""),
            Trigger::Keyword(word) => (line == word).then_some(""),
            Trigger::Marker(marker) => {
                let rest = line.strip_prefix(marker)?;
                if rest.is_empty() {
                    Some(rest)
                } else if rest.starts_with(char::is_whitespace) {
                    Some(rest.trim_start())
                } else {
                    None
                }
            }
        }
    }
}

/// Routing table, first match wins.
const ROUTES: &[(Trigger, CommandKind)] = &[
    (Trigger::KeywordNoCase("exit"), CommandKind::Exit),
    (Trigger::Keyword("\\q"), CommandKind::Exit),
    (Trigger::Keyword("history"), CommandKind::History),
    (Trigger::Marker("echo"), CommandKind::Echo),
    (Trigger::Marker("\\e"), CommandKind::EnvQuery),
    (Trigger::Marker("\\l"), CommandKind::BootCheck),
    (Trigger::Marker("\\cron"), CommandKind::CronSnapshot),
    (Trigger::Marker("\\mem"), CommandKind::MemDump),
];

/// One trimmed, non-empty line of input together with its routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    kind: CommandKind,
    arg_start: usize,
}

impl Command {
    /// Trim `line` and classify it. Returns `None` for blank input.
    pub fn parse(line: &str) -> Option<Self> {
        let text = line.trim();
        if text.is_empty() {
            return None;
        }
        for (trigger, kind) in ROUTES {
            if let Some(arg) = trigger.matches(text) {
                return Some(Self {
                    text: text.to_string(),
                    kind: *kind,
                    arg_start: text.len() - arg.len(),
                });
            }
        }
        Some(Self {
            text: text.to_string(),
            kind: CommandKind::External,
            arg_start: 0,
        })
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// The trimmed line as typed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text after the marker with leading whitespace removed.
    ///
    /// For external commands this is the whole line.
    pub fn argument(&self) -> &str {
        &self.text[self.arg_start..]
    }
}

/// A command interpreted entirely inside the shell.
pub(crate) trait BuiltinCommand {
    /// Executes the command, writing its report to `stdout`.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

/// Object-safe form of a command the dispatcher can run.
///
/// Implementations never return a failure; problems are printed and turned
/// into a non-zero exit code.
pub(crate) trait ExecutableCommand {
    fn run(self: Box<Self>, stdout: &mut dyn Write, session: &mut Session) -> ExitCode;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn run(self: Box<Self>, stdout: &mut dyn Write, session: &mut Session) -> ExitCode {
        match T::execute(*self, stdout, session) {
            Ok(code) => code,
            Err(e) => {
                log::warn!("builtin failed: {:#}", e);
                // Nothing left to report to if stdout itself is broken.
                let _ = writeln!(stdout, "{:#}", e);
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(line: &str) -> CommandKind {
        Command::parse(line).unwrap().kind()
    }

    #[test]
    fn test_blank_lines_are_not_commands() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("   \t  "), None);
    }

    #[test]
    fn test_line_is_trimmed() {
        let cmd = Command::parse("   echo hi  \n").unwrap();
        assert_eq!(cmd.text(), "echo hi");
        assert_eq!(cmd.argument(), "hi");
    }

    #[test]
    fn test_exit_keywords() {
        assert_eq!(kind_of("exit"), CommandKind::Exit);
        assert_eq!(kind_of("EXIT"), CommandKind::Exit);
        assert_eq!(kind_of("ExIt"), CommandKind::Exit);
        assert_eq!(kind_of("\\q"), CommandKind::Exit);
        assert_eq!(kind_of("\\Q"), CommandKind::External);
        assert_eq!(kind_of("exit now"), CommandKind::External);
    }

    #[test]
    fn test_history_is_exact() {
        assert_eq!(kind_of("history"), CommandKind::History);
        assert_eq!(kind_of("History"), CommandKind::External);
        assert_eq!(kind_of("history 5"), CommandKind::External);
    }

    #[test]
    fn test_markers_and_arguments() {
        let cases = [
            ("echo hello world", CommandKind::Echo, "hello world"),
            ("\\e $HOME", CommandKind::EnvQuery, "$HOME"),
            ("\\l /dev/sda", CommandKind::BootCheck, "/dev/sda"),
            ("\\l   /mnt/my usb", CommandKind::BootCheck, "/mnt/my usb"),
            ("\\cron", CommandKind::CronSnapshot, ""),
            ("\\mem 1234", CommandKind::MemDump, "1234"),
            ("\\mem", CommandKind::MemDump, ""),
        ];
        for (line, kind, arg) in cases {
            let cmd = Command::parse(line).unwrap();
            assert_eq!(cmd.kind(), kind, "{}", line);
            assert_eq!(cmd.argument(), arg, "{}", line);
        }
    }

    #[test]
    fn test_marker_requires_separator() {
        // longer words sharing a marker's prefix are not that builtin
        assert_eq!(kind_of("\\memory 12"), CommandKind::External);
        assert_eq!(kind_of("\\env HOME"), CommandKind::External);
        assert_eq!(kind_of("\\exit"), CommandKind::External);
        assert_eq!(kind_of("\\lsblk"), CommandKind::External);
        assert_eq!(kind_of("\\crontab"), CommandKind::External);
        assert_eq!(kind_of("echoes x"), CommandKind::External);
    }

    #[test]
    fn test_mem_is_not_shadowed_by_env_marker() {
        assert_eq!(kind_of("\\mem 1"), CommandKind::MemDump);
        assert_eq!(kind_of("\\e mem"), CommandKind::EnvQuery);
    }

    #[test]
    fn test_echo_keeps_inner_spacing_and_escapes() {
        let cmd = Command::parse("echo a   b\\tc").unwrap();
        assert_eq!(cmd.argument(), "a   b\\tc");
    }

    #[test]
    fn test_external_argument_is_whole_line() {
        let cmd = Command::parse("ls -la /tmp").unwrap();
        assert_eq!(cmd.kind(), CommandKind::External);
        assert_eq!(cmd.argument(), "ls -la /tmp");
    }
}
