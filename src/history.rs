use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Ordered, append-only record of the lines entered in one session.
#[derive(Debug, Default, Clone)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entered line. Entries are never removed.
    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Print the history as `<n>: <line>`, numbered from 1.
    pub fn print(&self, stdout: &mut dyn Write) -> std::io::Result<()> {
        if self.entries.is_empty() {
            return writeln!(stdout, "History is empty.");
        }
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(stdout, "{}: {}", i + 1, entry)?;
        }
        Ok(())
    }

    /// Overwrite `path` with one entry per line.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("can't create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for entry in &self.entries {
            writeln!(writer, "{}", entry)
                .with_context(|| format!("can't write {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("can't write {}", path.display()))?;
        log::info!("saved {} history entries to {}", self.entries.len(), path.display());
        Ok(())
    }
}
