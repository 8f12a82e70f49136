use std::env as stdenv;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Create an empty directory under the system temp dir that no other test uses.
pub(crate) fn make_unique_temp_dir(tag: &str) -> io::Result<PathBuf> {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let mut p = stdenv::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    p.push(format!("diagsh_{}_{}_{}_{}", tag, std::process::id(), nanos, seq));
    fs::create_dir_all(&p)?;
    Ok(p)
}
