//! Writers for the files placed in a run workspace.
pub mod control;
pub mod data;
pub mod inmodel;
pub mod manifest;

pub use control::{CONTROL_FILE, write_ctlfile};
pub use data::write_datafile;
pub use inmodel::{INMODEL_FILE, write_inmodel};
pub use manifest::{MANIFEST_FILE, RunManifest, write_manifest};
