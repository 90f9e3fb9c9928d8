use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Mode;

const MAX_SUFFIX: usize = 999;

/// Workspace name for a measurement file: the first five characters of its
/// file name followed by the mode letter.
pub fn workspace_base_name(measurement_file: &Path, mode: Mode) -> String {
    let name = measurement_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix: String = name.chars().take(5).collect();
    format!("{}{}", prefix, mode.letter())
}

/// Atomically create a new directory `parent/base`, or `parent/base_NNN`
/// with the first free suffix. Concurrent callers never receive the same
/// directory.
pub fn create_unique_dir(parent: &Path, base: &str) -> Result<PathBuf> {
    fs::create_dir_all(parent)?;
    for n in 0..=MAX_SUFFIX {
        let candidate = if n == 0 {
            parent.join(base)
        } else {
            parent.join(format!("{}_{:03}", base, n))
        };
        match fs::create_dir(&candidate) {
            Ok(()) => {
                debug!("Created workspace {:?}", candidate);
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::invalid(
        "workspace",
        format!("no free name for {:?} in {:?}", base, parent),
    ))
}

/// Create the master directory shared by all workers. The first creator
/// wins; later callers, including later runs, reuse it.
pub fn ensure_master_dir(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}
