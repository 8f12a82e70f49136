//! Boot signature detection.
//!
//! Files and block devices are classified by the MBR signature in their first
//! sector. Directories are classified by well-known loader files and
//! directories sitting directly inside them.

use anyhow::{Context, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

/// Size of one disk sector.
pub const SECTOR_SIZE: usize = 512;

/// Offset of the two signature bytes inside the first sector.
pub const SIGNATURE_OFFSET: usize = 510;

/// Loader and configuration files found at the root of installable media.
pub const MARKER_FILES: &[&str] = &["bootmgr", "ntldr", "vmlinuz", "syslinux.cfg", "isolinux.cfg"];

/// Directories found at the root of installable media.
pub const MARKER_DIRS: &[&str] = &["boot", "efi", "syslinux", "isolinux"];

/// Classification of a path, with the reason it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Bootable(String),
    NotBootable(String),
}

impl Verdict {
    pub fn is_bootable(&self) -> bool {
        matches!(self, Verdict::Bootable(_))
    }

    pub fn reason(&self) -> &str {
        match self {
            Verdict::Bootable(reason) | Verdict::NotBootable(reason) => reason,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Classify `path` as bootable or not.
///
/// A missing path is a `NotBootable` verdict. `Err` is returned only when the
/// path exists but could not be read.
pub fn detect(path: &Path) -> Result<Verdict> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        // `img/child` where `img` is a file does not exist either.
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            return Ok(Verdict::NotBootable("path not found".to_string()));
        }
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("can't stat {}", path.display())));
        }
    };

    if metadata.is_dir() {
        return scan_markers(path);
    }
    if metadata.is_file() || is_block_device(&metadata) {
        let sector = read_first_sector(path)?;
        return Ok(classify_sector(&sector));
    }
    Ok(Verdict::NotBootable(
        "not a regular file, block device or directory".to_string(),
    ))
}

/// Classify the first sector of a medium by its MBR signature.
///
/// `sector` holds whatever could be read from the start of the medium; anything
/// shorter than one sector is reported as truncated.
pub fn classify_sector(sector: &[u8]) -> Verdict {
    if sector.len() < SECTOR_SIZE {
        return Verdict::NotBootable(format!(
            "sector truncated: only {} of {} bytes available",
            sector.len(),
            SECTOR_SIZE
        ));
    }
    let low = sector[SIGNATURE_OFFSET];
    let high = sector[SIGNATURE_OFFSET + 1];
    let found = u16::from_le_bytes([low, high]);
    if low == 0x55 && high == 0xAA {
        Verdict::Bootable(format!(
            "signature 0x{:04X} found at offset {}",
            found, SIGNATURE_OFFSET
        ))
    } else {
        Verdict::NotBootable(format!(
            "no boot signature: found 0x{:04X} at offset {}, expected 0xAA55",
            found, SIGNATURE_OFFSET
        ))
    }
}

fn read_first_sector(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("can't open {}", path.display()))?;
    let mut sector = Vec::with_capacity(SECTOR_SIZE);
    file.take(SECTOR_SIZE as u64)
        .read_to_end(&mut sector)
        .with_context(|| format!("can't read {}", path.display()))?;
    Ok(sector)
}

fn scan_markers(dir: &Path) -> Result<Verdict> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("can't list {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("can't list {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Follows symlinks so a linked `boot` directory still counts.
        let is_dir = entry.path().is_dir();
        let table = if is_dir { MARKER_DIRS } else { MARKER_FILES };
        if let Some(marker) = table.iter().find(|m| m.eq_ignore_ascii_case(&name)) {
            if is_dir {
                dirs.push((*marker, name));
            } else {
                files.push((*marker, name));
            }
        }
    }

    // Report in table order so the reason does not depend on directory order.
    let mut found: Vec<String> = Vec::new();
    for marker in MARKER_FILES {
        for (_, name) in files.iter().filter(|(m, _)| m == marker) {
            found.push(format!("marker file `{}` present", name));
        }
    }
    for marker in MARKER_DIRS {
        for (_, name) in dirs.iter().filter(|(m, _)| m == marker) {
            found.push(format!("marker directory `{}` present", name));
        }
    }

    if found.is_empty() {
        Ok(Verdict::NotBootable("no boot markers present".to_string()))
    } else {
        Ok(Verdict::Bootable(found.join(", ")))
    }
}

#[cfg(unix)]
fn is_block_device(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    metadata.file_type().is_block_device()
}

#[cfg(not(unix))]
fn is_block_device(_metadata: &fs::Metadata) -> bool {
    false
}
