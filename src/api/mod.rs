//! High-level library API: generate the input files of one inversion run
//! and dispatch one run per worker. Prefer these entry points over the
//! low-level `core` and `io` modules when integrating the crate.
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use tracing::{debug, info, warn};

use crate::core::constraints::build_constraint_dictionary;
use crate::core::discovery::discover_measurement_files;
use crate::core::params::{
    CONTROL_KEYS, ControlParams, DATA_KEYS, DataParams, INMODEL_KEYS, InmodelParams, ParameterSet,
    RunParams,
};
use crate::core::rank::{WorkerIdentity, WorkerState, assign};
use crate::core::workspace::{create_unique_dir, ensure_master_dir, workspace_base_name};
use crate::error::{Error, Result};
use crate::io::edi::EdiFile;
use crate::io::model::read_layer_tops;
use crate::io::writers::{RunManifest, write_ctlfile, write_datafile, write_inmodel, write_manifest};

/// Files generated for one measurement file
#[derive(Debug, Clone)]
pub struct GeneratedInputs {
    pub measurement_file: PathBuf,
    pub station: String,
    /// Station coordinate used for elevation lookups
    pub x: f64,
    pub y: f64,
    /// Workspace holding every generated file
    pub workspace: PathBuf,
    /// Data file name, relative to the workspace
    pub datafile: String,
    pub files: Vec<PathBuf>,
}

/// Generate the data, control and optional a-priori files for `epath`.
///
/// `params` is partitioned into the data, control and inmodel groups; keys
/// outside those groups are not consumed here. The files land in a new,
/// uniquely named workspace under the data group's `working_directory`
/// (the measurement file's directory when unset).
pub fn generate_input_files(epath: &Path, params: &ParameterSet) -> Result<GeneratedInputs> {
    let data = DataParams::from_set(&params.subset(DATA_KEYS))?;
    let edi = EdiFile::open(epath)?;

    let parent = match &data.working_directory {
        Some(wd) => wd.clone(),
        None => epath
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let workspace = create_unique_dir(&parent, &workspace_base_name(epath, data.mode))?;
    write_input_files(&edi, params, &workspace)
}

/// Write the input files of `edi` into an existing `workspace`.
///
/// Relative inmodel paths, and the elevation sources named inside the
/// constraint table, resolve against the data group's `working_directory`
/// when set; otherwise they are used as given.
pub fn write_input_files(
    edi: &EdiFile,
    params: &ParameterSet,
    workspace: &Path,
) -> Result<GeneratedInputs> {
    let data = DataParams::from_set(&params.subset(DATA_KEYS))?;
    let control = ControlParams::from_set(&params.subset(CONTROL_KEYS))?;
    let inmodel = InmodelParams::from_set(&params.subset(INMODEL_KEYS))?;
    let root = data.working_directory.as_deref();
    let resolve = |path: &Path| match root {
        Some(wd) => wd.join(path),
        None => path.to_path_buf(),
    };

    let mut files = vec![write_datafile(edi, &data, workspace)?];
    files.push(write_ctlfile(&control, workspace)?);

    if inmodel.build_inmodel {
        let parameters_file = inmodel
            .inmodel_parameters_file
            .as_deref()
            .map(resolve)
            .ok_or_else(|| Error::MissingArgument {
                arg: "inmodel_parameters_file".to_string(),
            })?;
        let model_dir = inmodel
            .inmodel_modeldir
            .as_deref()
            .map(resolve)
            .ok_or_else(|| Error::MissingArgument {
                arg: "inmodel_modeldir".to_string(),
            })?;

        let dictionary = build_constraint_dictionary(&parameters_file, edi.x(), edi.y(), root)?;
        let layer_tops = read_layer_tops(&model_dir)?;
        info!(
            "Constraining {} depths over {} layers",
            dictionary.len(),
            layer_tops.len()
        );
        files.push(write_inmodel(&layer_tops, &dictionary, workspace)?);
    }

    info!(
        "Generated {} input files for {} in {:?}",
        files.len(),
        edi.metadata.station,
        workspace
    );

    Ok(GeneratedInputs {
        measurement_file: edi.path.clone(),
        station: edi.metadata.station.clone(),
        x: edi.x(),
        y: edi.y(),
        workspace: workspace.to_path_buf(),
        datafile: data.datafile,
        files,
    })
}

/// Expand a leading `$HOME` or `~` using the `HOME` environment variable.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = path
        .strip_prefix("$HOME")
        .or_else(|| path.strip_prefix('~'));
    match (rest, std::env::var("HOME")) {
        (Some(rest), Ok(home)) => PathBuf::from(format!("{}{}", home, rest)),
        _ => PathBuf::from(path),
    }
}

/// Invocation of the inversion program
#[derive(Debug, Clone, PartialEq)]
pub struct InversionCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Directory the program runs in
    pub current_dir: PathBuf,
}

impl InversionCommand {
    /// `program datafile run_input...`
    pub fn new(program_location: &str, datafile: &str, run_input: &[f64], current_dir: &Path) -> Result<Self> {
        let mut program = expand_home(program_location);
        // Relative paths would otherwise resolve against the workspace
        if program.is_relative() && program.components().count() > 1 {
            program = std::env::current_dir()?.join(program);
        }
        let mut args = vec![datafile.to_string()];
        args.extend(run_input.iter().map(|n| n.to_string()));
        Ok(Self {
            program,
            args,
            current_dir: current_dir.to_path_buf(),
        })
    }

    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(&self.current_dir);
        command
    }

    /// Start the program without waiting for it.
    pub fn spawn(&self) -> Result<Child> {
        self.to_command().spawn().map_err(|source| Error::Launch {
            program: self.program.clone(),
            source,
        })
    }
}

/// A run whose files are written and whose command is ready
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub identity: WorkerIdentity,
    pub master_directory: PathBuf,
    pub inputs: GeneratedInputs,
    pub command: InversionCommand,
    pub manifest: PathBuf,
}

/// A launched run; the child is neither waited on nor killed here
#[derive(Debug)]
pub struct LaunchedRun {
    pub prepared: PreparedRun,
    pub child: Child,
}

/// Runs the pipeline of one worker: resolve parameters, pick the
/// measurement file for this rank, write its inputs and launch the
/// inversion program.
#[derive(Debug)]
pub struct RunDispatcher {
    params: ParameterSet,
    identity: WorkerIdentity,
    state: WorkerState,
}

impl RunDispatcher {
    pub fn new(params: ParameterSet, identity: WorkerIdentity) -> Self {
        Self {
            params,
            identity,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn identity(&self) -> WorkerIdentity {
        self.identity
    }

    fn advance(&mut self, next: WorkerState) {
        debug!("Worker {}: {} -> {}", self.identity, self.state, next);
        self.state = next;
    }

    /// Run every step short of launching.
    pub fn prepare(&mut self) -> Result<PreparedRun> {
        let state = self.state;
        self.prepare_inner().map_err(|e| e.halted_at(state))
    }

    fn prepare_inner(&mut self) -> Result<PreparedRun> {
        self.params.warn_unrecognized();
        let run = RunParams::from_set(&self.params)?;
        self.advance(WorkerState::ParametersResolved);

        let master_directory = ensure_master_dir(&run.master_directory())
            .map_err(|e| e.halted_at(self.state))?;
        let files = discover_measurement_files(&run.working_directory, run.edifolder_list.as_deref())
            .map_err(|e| e.halted_at(self.state))?;
        info!(
            "Discovered {} measurement files under {:?}",
            files.len(),
            run.working_directory
        );
        if files.len() > self.identity.size {
            warn!(
                "{} measurement files but only {} workers; {} files will not be inverted",
                files.len(),
                self.identity.size,
                files.len() - self.identity.size
            );
        }
        let measurement_file = assign(&files, self.identity.rank)
            .map_err(|e| e.halted_at(self.state))?
            .clone();
        info!("Worker {} assigned {:?}", self.identity, measurement_file);

        let mut build = self.params.clone();
        build.insert("working_directory", run.working_directory.as_path());
        let data = DataParams::from_set(&build.subset(DATA_KEYS))
            .map_err(|e| e.halted_at(self.state))?;
        let edi = EdiFile::open(&measurement_file)
            .map_err(|e| Error::from(e).halted_at(self.state))?;
        let workspace = create_unique_dir(
            &master_directory,
            &workspace_base_name(&measurement_file, data.mode),
        )
        .map_err(|e| e.halted_at(self.state))?;
        self.advance(WorkerState::WorkspaceBuilt);

        let inputs = write_input_files(&edi, &build, &workspace)
            .map_err(|e| e.halted_at(self.state))?;
        let command = InversionCommand::new(
            &run.program_location,
            &inputs.datafile,
            &run.run_input,
            &inputs.workspace,
        )
        .map_err(|e| e.halted_at(self.state))?;

        let manifest = write_manifest(&RunManifest::new(
            &inputs.station,
            &inputs.measurement_file,
            self.identity,
            &inputs.workspace,
            inputs
                .files
                .iter()
                .filter_map(|f| f.file_name())
                .map(|f| f.to_string_lossy().into_owned())
                .collect(),
            command.argv(),
        ))
        .map_err(|e| e.halted_at(self.state))?;
        self.advance(WorkerState::FilesWritten);

        Ok(PreparedRun {
            identity: self.identity,
            master_directory,
            inputs,
            command,
            manifest,
        })
    }

    /// Launch a prepared run. Completion means the process started.
    pub fn launch(&mut self, prepared: PreparedRun) -> Result<LaunchedRun> {
        if self.state != WorkerState::FilesWritten {
            return Err(Error::invalid("state", self.state).halted_at(self.state));
        }
        info!("Launching {:?} in {:?}", prepared.command.argv(), prepared.command.current_dir);
        let child = prepared
            .command
            .spawn()
            .map_err(|e| e.halted_at(self.state))?;
        self.advance(WorkerState::SubprocessLaunched);
        Ok(LaunchedRun { prepared, child })
    }

    /// Prepare and launch.
    pub fn dispatch(&mut self) -> Result<LaunchedRun> {
        let prepared = self.prepare()?;
        self.launch(prepared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_is_expanded() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        assert_eq!(
            expand_home("$HOME/aniso1d/ai1oz_ak"),
            PathBuf::from(format!("{}/aniso1d/ai1oz_ak", home))
        );
        assert_eq!(expand_home("/opt/ai1oz_ak"), PathBuf::from("/opt/ai1oz_ak"));
    }

    #[test]
    fn command_line_follows_fixed_layout() {
        let cmd = InversionCommand::new(
            "/opt/aniso1d/ai1oz_ak",
            "ai1dat.dat",
            &[1.0, 0.0, 0.1, 40.0, 1.05, 1.0, 0.0],
            Path::new("/tmp/run"),
        )
        .unwrap();

        assert_eq!(
            cmd.argv(),
            vec!["/opt/aniso1d/ai1oz_ak", "ai1dat.dat", "1", "0", "0.1", "40", "1.05", "1", "0"]
        );
        assert_eq!(cmd.current_dir, PathBuf::from("/tmp/run"));
    }

    #[test]
    fn bare_program_name_is_left_for_path_lookup() {
        let cmd = InversionCommand::new("ai1oz_ak", "ai1dat.dat", &[], Path::new(".")).unwrap();
        assert_eq!(cmd.program, PathBuf::from("ai1oz_ak"));
    }

    #[test]
    fn launch_before_prepare_is_rejected() {
        let mut dispatcher = RunDispatcher::new(ParameterSet::new(), WorkerIdentity::singleton());
        let prepared = PreparedRun {
            identity: WorkerIdentity::singleton(),
            master_directory: PathBuf::from("."),
            inputs: GeneratedInputs {
                measurement_file: PathBuf::from("a.edi"),
                station: "A".to_string(),
                x: 0.0,
                y: 0.0,
                workspace: PathBuf::from("."),
                datafile: "ai1dat.dat".to_string(),
                files: Vec::new(),
            },
            command: InversionCommand::new("true", "ai1dat.dat", &[], Path::new(".")).unwrap(),
            manifest: PathBuf::from("run.json"),
        };
        assert!(matches!(
            dispatcher.launch(prepared),
            Err(Error::Dispatch {
                state: WorkerState::Idle,
                ..
            })
        ));
    }
}
