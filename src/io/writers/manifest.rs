use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::rank::WorkerIdentity;
use crate::error::Result;

pub const MANIFEST_FILE: &str = "run.json";

/// Record of one prepared inversion run, written next to its input files.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub created: String,
    pub station: String,
    pub measurement_file: PathBuf,
    pub worker: WorkerIdentity,
    pub workspace: PathBuf,
    pub files: Vec<String>,
    pub command: Vec<String>,
}

impl RunManifest {
    pub fn new(
        station: &str,
        measurement_file: &Path,
        worker: WorkerIdentity,
        workspace: &Path,
        files: Vec<String>,
        command: Vec<String>,
    ) -> Self {
        Self {
            created: chrono::Utc::now().to_rfc3339(),
            station: station.to_string(),
            measurement_file: measurement_file.to_path_buf(),
            worker,
            workspace: workspace.to_path_buf(),
            files,
            command,
        }
    }
}

/// Write `run.json` into the manifest's workspace.
pub fn write_manifest(manifest: &RunManifest) -> Result<PathBuf> {
    let path = manifest.workspace.join(MANIFEST_FILE);
    let json_string = serde_json::to_string_pretty(manifest)?;
    std::fs::write(&path, json_string)?;
    info!("Created run manifest: {:?}", path);
    Ok(path)
}
