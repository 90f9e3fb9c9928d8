#![doc = r#"
aniso1d: set up and launch suites of 1D anisotropic magnetotelluric inversions.

This crate turns EDI measurement files and a flat set of tuning parameters into
the data, control and optional a-priori (inmodel) files read by an external 1D
anisotropic inversion program, then launches that program. A suite is run as
one process per station: every worker discovers the same ordered set of EDI
files and takes the one at its rank.

Quick start: generate input files for one station
--------------------------------------------------
```rust,no_run
use std::path::Path;
use aniso1d::{generate_input_files, ParameterSet};

fn main() -> aniso1d::Result<()> {
    let params = ParameterSet::new()
        .with("working_directory", "/runs")
        .with("mode", "R")
        .with("errorfloor", 0.05)
        .with("penalty_weight_structure", vec![1.0, 10.0, 100.0]);

    let inputs = generate_input_files(Path::new("/data/line1/ST01.edi"), &params)?;
    println!("{} -> {:?}", inputs.datafile, inputs.workspace);
    Ok(())
}
```

Dispatch this worker's run
--------------------------
```rust,no_run
use aniso1d::{ParameterSet, RunDispatcher, WorkerIdentity};

fn main() -> aniso1d::Result<()> {
    let params = ParameterSet::new()
        .with("working_directory", "/data")
        .with("program_location", "/opt/aniso1d/ai1oz_ak");

    let identity = WorkerIdentity::from_env()?;
    let launched = RunDispatcher::new(params, identity).dispatch()?;
    println!("started pid {}", launched.child.id());
    Ok(())
}
```

A-priori constraints
--------------------
With `build_inmodel` set, `inmodel_parameters_file` names a table of
`elevation_file_or_none, offset, resmin, resmax, strike` rows. Each row becomes a
depth constraint at the station's elevation plus the offset; the constraints are
bound to the layers of the model found in `inmodel_modeldir`.

```rust,no_run
use std::path::Path;
use aniso1d::build_constraint_dictionary;

fn main() -> aniso1d::Result<()> {
    let dict = build_constraint_dictionary(Path::new("constraints.csv"), 140.25, -30.5, None)?;
    for (depth, c) in dict.iter() {
        println!("{depth}: {:?}", c.as_triplet());
    }
    Ok(())
}
```

Error handling
--------------
All public functions return `aniso1d::Result<T>`. A dispatcher failure is wrapped
in `Error::Dispatch`, which records the worker state at which the pipeline halted.

Useful modules
--------------
- [`api`]: high-level entry points.
- [`core`]: parameters, constraints, discovery, workspaces and worker identity.
- [`io`]: EDI, elevation and model readers; data/control/inmodel writers.
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::constraints::{Constraint, ConstraintDictionary, Depth};
pub use crate::core::params::{
    ControlParams, DataParams, InmodelParams, ParamValue, ParameterSet, RunParams,
};
pub use crate::core::rank::{WorkerIdentity, WorkerState};
pub use error::{Error, Result};
pub use types::{ErrorFloorType, Mode};

// Readers
pub use io::edi::{EdiError, EdiFile, EdiMetadata};
pub use io::elevation::{ElevationError, ElevationGrid, get_elevation};

// Building blocks
pub use crate::core::constraints::build_constraint_dictionary;
pub use crate::core::discovery::discover_measurement_files;
pub use crate::core::workspace::create_unique_dir;

// High-level API re-exports
pub use api::{
    GeneratedInputs, InversionCommand, LaunchedRun, PreparedRun, RunDispatcher,
    generate_input_files, write_input_files,
};
