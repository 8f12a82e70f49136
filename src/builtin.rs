use crate::boot;
use crate::command::{BuiltinCommand, ExecutableCommand, ExitCode};
use crate::external;
use crate::interpreter::Session;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use regex::Regex;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output of a builtin whose arguments could not be parsed.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn run(self: Box<Self>, stdout: &mut dyn Write, _session: &mut Session) -> ExitCode {
        let _ = writeln!(stdout, "{}", self.output.trim_end());
        if self.is_error { 1 } else { 0 }
    }
}

/// Print the numbered session history.
pub struct ShowHistory;

impl BuiltinCommand for ShowHistory {
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        session.history.print(stdout)?;
        Ok(0)
    }
}

/// Print the rest of the line as-is.
pub struct Echo {
    pub text: String,
}

impl BuiltinCommand for Echo {
    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.text)?;
        Ok(0)
    }
}

/// Print `NAME=value` for one environment variable.
pub struct EnvQuery {
    pub name: String,
}

impl EnvQuery {
    /// Accepts both `NAME` and `$NAME`.
    pub fn new(arg: &str) -> Self {
        let arg = arg.trim();
        Self {
            name: arg.strip_prefix('$').unwrap_or(arg).to_string(),
        }
    }
}

impl BuiltinCommand for EnvQuery {
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        if self.name.is_empty() {
            writeln!(stdout, "Usage: \\e <variable>")?;
            return Ok(1);
        }
        match session.env.get_var(&self.name) {
            Some(value) => {
                writeln!(stdout, "{}={}", self.name, value)?;
                Ok(0)
            }
            None => {
                writeln!(stdout, "Environment variable {} not found.", self.name)?;
                Ok(1)
            }
        }
    }
}

/// Report whether a disk, image or directory is bootable.
pub struct BootCheck {
    pub target: String,
}

impl BuiltinCommand for BootCheck {
    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        if self.target.is_empty() {
            writeln!(stdout, "Usage: \\l <path>")?;
            return Ok(1);
        }
        let verdict = boot::detect(Path::new(&self.target))
            .with_context(|| format!("Disk {} could not be checked", self.target))?;
        log::debug!("boot check {}: {:?}", self.target, verdict);
        writeln!(stdout, "{}", verdict)?;
        if verdict.is_bootable() {
            writeln!(stdout, "Disk {} is bootable.", self.target)?;
        } else {
            writeln!(stdout, "Disk {} is not bootable.", self.target)?;
        }
        Ok(0)
    }
}

/// Write the names in the cron spool directory to the snapshot file.
pub struct CronSnapshot;

impl BuiltinCommand for CronSnapshot {
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let dir = &session.config.cron_dir;
        let target = &session.config.snapshot_file;
        if !dir.is_dir() {
            writeln!(stdout, "Cron directory not found: {}", dir.display())?;
            return Ok(1);
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("can't list {}", dir.display()))? {
            let entry = entry.with_context(|| format!("can't list {}", dir.display()))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        let file = File::create(target)
            .with_context(|| format!("can't create {}", target.display()))?;
        let mut writer = BufWriter::new(file);
        for name in &names {
            writeln!(writer, "{}", name)
                .with_context(|| format!("can't write {}", target.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("can't write {}", target.display()))?;

        log::info!("cron snapshot of {} written to {}", dir.display(), target.display());
        writeln!(
            stdout,
            "Cron snapshot written to {} ({} entries).",
            target.display(),
            names.len()
        )?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Dump the memory of a running process.
pub struct MemDump {
    #[argh(positional)]
    /// id of the process to dump.
    pub pid: Option<String>,
}

impl MemDump {
    /// Parse the text after `\mem`.
    pub(crate) fn create(arg: &str) -> Result<Box<dyn ExecutableCommand>> {
        let separator = Regex::new(r"\s+").context("invalid argument separator")?;
        // Only the first word is the PID; anything after it is ignored.
        let first = separator.split(arg).find(|s| !s.is_empty());
        let args: Vec<&str> = match first {
            // `-5` is a bad PID, not an unknown flag
            Some(word) if word.starts_with('-') && word != "--help" => {
                return Ok(Box::new(MemDump {
                    pid: Some(word.to_string()),
                }));
            }
            Some(word) => vec![word],
            None => Vec::new(),
        };
        Ok(match MemDump::from_args(&["\\mem"], &args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

impl BuiltinCommand for MemDump {
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let Some(raw) = self.pid else {
            writeln!(stdout, "Usage: \\mem <pid>")?;
            return Ok(1);
        };
        let digits_only = raw.bytes().all(|b| b.is_ascii_digit());
        let Some(pid) = raw.parse::<u32>().ok().filter(|_| digits_only) else {
            writeln!(stdout, "Invalid PID: {}", raw)?;
            return Ok(1);
        };

        let proc_root = Path::new("/proc");
        if proc_root.is_dir() && !proc_root.join(pid.to_string()).exists() {
            writeln!(stdout, "Process {} not found.", pid)?;
            return Ok(1);
        }

        stdout.flush()?;
        let tool = &session.config.dump_tool;
        let code = external::run_program(&session.env, tool, &[pid.to_string()])
            .with_context(|| format!("Memory dump for process {} failed", pid))?;
        if code == 0 {
            writeln!(stdout, "Memory dump for process {} created.", pid)?;
        } else {
            log::warn!("{} {} exited with status {}", tool, pid, code);
            writeln!(
                stdout,
                "Memory dump for process {} failed: {} exited with status {}",
                pid, tool, code
            )?;
        }
        Ok(code)
    }
}
