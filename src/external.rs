use crate::command::{ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::interpreter::Session;
use anyhow::{Context, Result, bail};
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

/// Command that is not a builtin.
///
/// The line is split on whitespace; there is no quoting, so every
/// whitespace-separated word becomes its own argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a command line into program and arguments.
    ///
    /// Returns `None` for a line with no words.
    pub fn from_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self::new(program, words.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl ExecutableCommand for ExternalCommand {
    fn run(self: Box<Self>, stdout: &mut dyn Write, session: &mut Session) -> ExitCode {
        // The child shares our terminal; earlier output must land first.
        let _ = stdout.flush();
        match run_program(&session.env, &self.program, &self.args) {
            Ok(0) => 0,
            Ok(code) => {
                log::warn!("{} exited with status {}", self.program, code);
                let _ = writeln!(stdout, "{}: exited with status {}", self.program, code);
                code
            }
            Err(e) => {
                log::warn!("{:#}", e);
                let _ = writeln!(stdout, "{:#}", e);
                127
            }
        }
    }
}

/// Spawn `program` with inherited standard streams and wait for it.
///
/// The program is resolved through the environment's `PATH` and runs in its
/// working directory with its variables. Failing to find or start the program
/// is an error; a non-zero exit is not.
pub fn run_program(env: &Environment, program: &str, args: &[String]) -> Result<ExitCode> {
    let search_paths = env.get_var("PATH").unwrap_or_default();
    let executable = match find_command_path(
        OsStr::new(&search_paths),
        &env.current_dir,
        Path::new(program),
    ) {
        Some(path) => path,
        None => bail!("{}: command not found", program),
    };
    log::debug!("spawning {} {:?}", executable.display(), args);

    let mut child = std::process::Command::new(&executable)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir)
        .spawn()
        .with_context(|| format!("{}: failed to start", program))?;
    let exit_status = child
        .wait()
        .with_context(|| format!("{}: failed to wait", program))?;
    match exit_status.code() {
        Some(x) => Ok(x),
        None => Ok(terminated_by_signal(exit_status)),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`) or `./`-prefixed:
///   resolved against `cwd`, returned if it exists.
/// - Single path component (no separators): search each directory in
///   `search_paths` (PATH) and return the first existing match.
/// - Empty path: returns `None`.
pub fn find_command_path(search_paths: &OsStr, cwd: &Path, path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return find_by_path(path);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        // Empty path -> not found
        (None, _) => None,
        (Some(std::path::Component::Normal(name)), None) => {
            // Single component -> search in PATH
            let found = find_in_path(search_paths, name);
            if found.is_none() && cfg!(not(unix)) {
                find_by_path(&cwd.join(path))
            } else {
                found
            }
        }
        // `./foo`, `bin/sh`, `../x` -> relative to the working directory
        _ => find_by_path(&cwd.join(path)),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .find_map(|dir| find_by_path(&dir.join(cmd)))
}

fn find_by_path(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        Some(path.to_path_buf())
    } else {
        None
    }
}
