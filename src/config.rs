use std::path::PathBuf;

/// Settings fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where history is written when the session ends.
    pub history_file: PathBuf,
    /// Directory listed by `\cron`.
    pub cron_dir: PathBuf,
    /// File `\cron` writes the listing into.
    pub snapshot_file: PathBuf,
    /// Program invoked by `\mem` with the PID as its only argument.
    pub dump_tool: String,
    /// Text shown before every interactive read.
    pub prompt: String,
    /// Print the welcome line when the session starts.
    pub banner: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_file: PathBuf::from("history.txt"),
            cron_dir: PathBuf::from("/var/spool/cron"),
            snapshot_file: PathBuf::from("/tmp/vfs"),
            dump_tool: "gcore".to_string(),
            prompt: "> ".to_string(),
            banner: true,
        }
    }
}
