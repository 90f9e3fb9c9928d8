//! Core building blocks: parameter sets and their typed groups, the
//! constraint dictionary, measurement-file discovery, workspace allocation
//! and worker identity. These are consumed by the high-level `api` module.
pub mod constraints;
pub mod discovery;
pub mod params;
pub mod rank;
pub mod workspace;
