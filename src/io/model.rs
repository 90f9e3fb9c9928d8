use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Suffix of model output files written by the inversion program.
pub const MODEL_FILE_SUFFIX: &str = "mod.dat";

/// Locate the model output file in a previous run directory: the first
/// file, by name, ending in `mod.dat`.
pub fn find_model_file(model_dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(model_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with(MODEL_FILE_SUFFIX))
        })
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::NoModelLayers(model_dir.to_path_buf()))
}

/// Layer top depths of the first model in a previous run directory.
///
/// Rows whose first field is numeric contribute their first field as a
/// layer top; other rows are headers. The first model block ends where the
/// depths stop increasing.
pub fn read_layer_tops(model_dir: &Path) -> Result<Vec<f64>> {
    let path = find_model_file(model_dir)?;
    let text = fs::read_to_string(&path)?;

    let mut tops: Vec<f64> = Vec::new();
    for line in text.lines() {
        let Some(first) = line.split_whitespace().next() else {
            continue;
        };
        let Ok(depth) = first.parse::<f64>() else {
            if tops.is_empty() {
                continue;
            }
            break;
        };
        match tops.last() {
            Some(&last) if depth <= last => break,
            _ => tops.push(depth),
        }
    }

    if tops.is_empty() {
        return Err(Error::NoModelLayers(model_dir.to_path_buf()));
    }
    debug!("{} layer tops read from {:?}", tops.len(), path);
    Ok(tops)
}
