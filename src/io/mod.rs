//! I/O layer: EDI measurement files, elevation point files and previous
//! model runs on the read side; `writers` for the data, control, a-priori
//! and manifest files of a run workspace.
pub mod edi;
pub use edi::{EdiError, EdiFile, EdiMetadata};

pub mod elevation;
pub use elevation::{ElevationError, ElevationGrid, get_elevation};

pub mod model;

pub mod writers;
