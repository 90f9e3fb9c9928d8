//! Command Line Interface (CLI) layer.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for a single worker of an
//! inversion suite. It wires user-provided options to the library
//! functionality exposed via `aniso1d::api`.
//!
//! If you are embedding this crate into another application, prefer the
//! high-level `aniso1d::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
