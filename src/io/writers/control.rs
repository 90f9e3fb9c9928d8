use std::fs;
use std::path::{Path, PathBuf};

use crate::core::params::ControlParams;
use crate::error::Result;

pub const CONTROL_FILE: &str = "ai1ctl.dat";

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the control file: penalty types, weight counts, structure
/// weights, anisotropy weights and the iteration cap, one group per line.
pub fn format_ctlfile(params: &ControlParams) -> String {
    format!(
        "{} {}\n{} {}\n{}\n{}\n{}\n",
        params.penalty_type_structure,
        params.penalty_type_anisotropy,
        params.penalty_weight_structure.len(),
        params.penalty_weight_anisotropy.len(),
        join(&params.penalty_weight_structure),
        join(&params.penalty_weight_anisotropy),
        params.iteration_max
    )
}

pub fn write_ctlfile(params: &ControlParams, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(CONTROL_FILE);
    fs::write(&path, format_ctlfile(params))?;
    Ok(path)
}
