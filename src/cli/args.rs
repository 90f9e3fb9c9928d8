use clap::Parser;
use std::path::PathBuf;

use aniso1d::types::{ErrorFloorType, Mode};
use aniso1d::ParameterSet;

/// Flags left unset fall back to the parameter file, then to the built-in
/// defaults shown in brackets.
#[derive(Parser, Debug)]
#[command(
    name = "aniso1d",
    version,
    about = "Set up and run a suite of 1D anisotropic inversions, one per worker"
)]
pub struct CliArgs {
    /// Path to the inversion program [default: $HOME/aniso1d/ai1oz_ak]
    #[arg(short = 'l', long, alias = "program_location")]
    pub program_location: Option<String>,

    /// Command line input for the inversion program, 7 values [default: 1 0 0.1 40 1.05 1 0]
    #[arg(short = 'r', long, alias = "run_input", num_args = 7, allow_negative_numbers = true)]
    pub run_input: Option<Vec<f64>>,

    /// Error floor for impedance tensor or resistivity values [default: 0.1]
    #[arg(long)]
    pub errorfloor: Option<f64>,

    /// Type of error floor [default: relative]
    #[arg(long, alias = "errorfloor_type", value_enum)]
    pub errorfloor_type: Option<ErrorFloorType>,

    /// Working directory [default: .]
    #[arg(short = 'w', long, alias = "working_directory")]
    pub working_directory: Option<PathBuf>,

    /// Folders containing EDI files, relative to the working directory
    /// [default: every folder below the working directory]
    #[arg(short = 'e', long, alias = "edifolder_list", num_args = 1..)]
    pub edifolder_list: Option<Vec<String>>,

    /// Data to put in the data file: impedance (I) or resistivity and phase (R) [default: I]
    #[arg(short = 'm', long, value_enum)]
    pub mode: Option<Mode>,

    /// Type of structure penalty [default: 6]
    #[arg(long, alias = "penalty_type_structure")]
    pub penalty_type_structure: Option<u32>,

    /// Type of anisotropy penalty [default: 2]
    #[arg(long, alias = "penalty_type_anisotropy")]
    pub penalty_type_anisotropy: Option<u32>,

    /// Structure penalty weights [default: 1 10 100]
    #[arg(long, alias = "penalty_weight_structure", num_args = 1..)]
    pub penalty_weight_structure: Option<Vec<f64>>,

    /// Anisotropy penalty weights [default: 1 10 100]
    #[arg(long, alias = "penalty_weight_anisotropy", num_args = 1..)]
    pub penalty_weight_anisotropy: Option<Vec<f64>>,

    /// Maximum number of iterations [default: 100]
    #[arg(long, alias = "iteration_max")]
    pub iteration_max: Option<u32>,

    /// Build an a-priori (inmodel) file
    #[arg(short = 'i', long, alias = "build_inmodel", default_value_t = false)]
    pub build_inmodel: bool,

    /// File of inmodel parameters, absolute or relative to the working directory
    #[arg(long, alias = "inmodel_parameters_file")]
    pub inmodel_parameters_file: Option<PathBuf>,

    /// Previous model run directory providing the layer depths
    #[arg(long, alias = "inmodel_modeldir")]
    pub inmodel_modeldir: Option<PathBuf>,

    /// Master directory to save the suite of runs into [default: inversion_suite]
    #[arg(short = 's', long, alias = "master_savepath")]
    pub master_savepath: Option<PathBuf>,

    /// JSON file of parameters, overridden by flags given here
    #[arg(short = 'p', long)]
    pub params: Option<PathBuf>,

    /// Rank of this worker [default: from the MPI or Slurm environment, else 0]
    #[arg(long)]
    pub rank: Option<usize>,

    /// Number of workers [default: from the environment, else rank + 1]
    #[arg(long)]
    pub size: Option<usize>,

    /// Wait for the inversion to finish and report its exit status
    #[arg(long, default_value_t = false)]
    pub wait: bool,

    /// Write all input files but do not launch the inversion
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}

impl CliArgs {
    /// Parameters given explicitly on the command line.
    pub fn to_parameter_set(&self) -> ParameterSet {
        let mut set = ParameterSet::new();
        if let Some(v) = &self.program_location {
            set.insert("program_location", v.as_str());
        }
        if let Some(v) = &self.run_input {
            set.insert("run_input", v.clone());
        }
        if let Some(v) = self.errorfloor {
            set.insert("errorfloor", v);
        }
        if let Some(v) = self.errorfloor_type {
            set.insert("errorfloor_type", v.to_string());
        }
        if let Some(v) = &self.working_directory {
            set.insert("working_directory", v.as_path());
        }
        if let Some(v) = &self.edifolder_list {
            set.insert("edifolder_list", v.clone());
        }
        if let Some(v) = self.mode {
            set.insert("mode", v.to_string());
        }
        if let Some(v) = self.penalty_type_structure {
            set.insert("penalty_type_structure", v);
        }
        if let Some(v) = self.penalty_type_anisotropy {
            set.insert("penalty_type_anisotropy", v);
        }
        if let Some(v) = &self.penalty_weight_structure {
            set.insert("penalty_weight_structure", v.clone());
        }
        if let Some(v) = &self.penalty_weight_anisotropy {
            set.insert("penalty_weight_anisotropy", v.clone());
        }
        if let Some(v) = self.iteration_max {
            set.insert("iteration_max", v);
        }
        if self.build_inmodel {
            set.insert("build_inmodel", true);
        }
        if let Some(v) = &self.inmodel_parameters_file {
            set.insert("inmodel_parameters_file", v.as_path());
        }
        if let Some(v) = &self.inmodel_modeldir {
            set.insert("inmodel_modeldir", v.as_path());
        }
        if let Some(v) = &self.master_savepath {
            set.insert("master_savepath", v.as_path());
        }
        set
    }
}
