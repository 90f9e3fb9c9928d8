//! aniso1d CLI entrypoint.
//!
//! Provides a thin wrapper over the `cli` module: parse args, run this
//! worker's share of the inversion suite, and exit with appropriate status.
//! Launch one process per measurement file, e.g. `mpirun -np 12 aniso1d ...`.
//! For programmatic use, prefer the library API (`aniso1d::api`).

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
