use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{ErrorFloorType, Mode};

/// Keys consumed when building the data file.
pub const DATA_KEYS: &[&str] = &[
    "working_directory",
    "datafile",
    "errorfloor",
    "errorfloor_type",
    "mode",
];

/// Keys consumed when building the control file.
pub const CONTROL_KEYS: &[&str] = &[
    "penalty_type_structure",
    "penalty_type_anisotropy",
    "penalty_weight_structure",
    "penalty_weight_anisotropy",
    "iteration_max",
];

/// Keys consumed when building the a-priori (inmodel) file.
pub const INMODEL_KEYS: &[&str] = &[
    "build_inmodel",
    "inmodel_parameters_file",
    "inmodel_modeldir",
];

/// Keys consumed by the dispatcher itself.
pub const RUN_KEYS: &[&str] = &[
    "program_location",
    "run_input",
    "working_directory",
    "edifolder_list",
    "master_savepath",
];

pub const DEFAULT_PROGRAM_LOCATION: &str = "$HOME/aniso1d/ai1oz_ak";
pub const DEFAULT_RUN_INPUT: [f64; 7] = [1.0, 0.0, 0.1, 40.0, 1.05, 1.0, 0.0];
pub const DEFAULT_PENALTY_WEIGHTS: [f64; 3] = [1.0, 10.0, 100.0];
pub const DEFAULT_DATAFILE: &str = "ai1dat.dat";
pub const DEFAULT_MASTER_SAVEPATH: &str = "inversion_suite";

/// A single scalar or list parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Numbers(Vec<f64>),
    Texts(Vec<String>),
    Text(String),
}

impl ParamValue {
    fn describe(&self) -> String {
        match self {
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Number(n) => n.to_string(),
            ParamValue::Numbers(ns) => format!("{:?}", ns),
            ParamValue::Texts(ts) => format!("{:?}", ts),
            ParamValue::Text(t) => t.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(t) => t.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_f64()
            .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64)
            .map(|n| n as u32)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Number(n) => Some(*n != 0.0),
            ParamValue::Text(t) => match t.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        match self {
            ParamValue::Numbers(ns) => Some(ns.clone()),
            ParamValue::Number(n) => Some(vec![*n]),
            ParamValue::Texts(ts) => ts.iter().map(|t| t.trim().parse().ok()).collect(),
            ParamValue::Text(t) => t
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().ok())
                .collect(),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_texts(&self) -> Option<Vec<String>> {
        match self {
            ParamValue::Texts(ts) => Some(ts.clone()),
            ParamValue::Text(t) => Some(vec![t.clone()]),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Number(value as f64)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(value: Vec<f64>) -> Self {
        ParamValue::Numbers(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::Texts(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&Path> for ParamValue {
    fn from(value: &Path) -> Self {
        ParamValue::Text(value.to_string_lossy().into_owned())
    }
}

/// Flat parameter dictionary, merged from defaults, a parameter file and
/// command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON object of `key: value` pairs.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: ParameterSet) {
        self.0.extend(other.0);
    }

    /// Keys that no component consumes.
    pub fn unrecognized_keys(&self) -> Vec<&str> {
        self.keys()
            .filter(|k| {
                ![DATA_KEYS, CONTROL_KEYS, INMODEL_KEYS, RUN_KEYS]
                    .iter()
                    .any(|group| group.contains(k))
            })
            .collect()
    }

    /// Log and drop keys outside every allow-list.
    pub fn warn_unrecognized(&self) {
        for key in self.unrecognized_keys() {
            warn!("Ignoring unrecognized parameter `{}`", key);
        }
    }

    /// Copy of the set restricted to `allowed` keys.
    pub fn subset(&self, allowed: &[&str]) -> ParameterSet {
        ParameterSet(
            self.0
                .iter()
                .filter(|(k, _)| allowed.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    fn typed<T>(&self, key: &str, convert: impl Fn(&ParamValue) -> Option<T>) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => convert(value)
                .map(Some)
                .ok_or_else(|| Error::invalid(key, value.describe())),
        }
    }

    fn path(&self, key: &str) -> Result<Option<PathBuf>> {
        self.typed(key, |v| v.as_text().map(PathBuf::from))
    }
}

/// Parameters of the data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataParams {
    /// Directory in which the run workspace is created; the measurement
    /// file's own directory when unset.
    pub working_directory: Option<PathBuf>,
    pub datafile: String,
    pub errorfloor: f64,
    pub errorfloor_type: ErrorFloorType,
    pub mode: Mode,
}

impl Default for DataParams {
    fn default() -> Self {
        Self {
            working_directory: None,
            datafile: DEFAULT_DATAFILE.to_string(),
            errorfloor: 0.1,
            errorfloor_type: ErrorFloorType::Relative,
            mode: Mode::Impedance,
        }
    }
}

impl DataParams {
    pub fn from_set(set: &ParameterSet) -> Result<Self> {
        let defaults = Self::default();
        let errorfloor = set
            .typed("errorfloor", ParamValue::as_f64)?
            .unwrap_or(defaults.errorfloor);
        if errorfloor.is_nan() || errorfloor < 0.0 {
            return Err(Error::invalid("errorfloor", errorfloor));
        }
        Ok(Self {
            working_directory: set.path("working_directory")?,
            datafile: set
                .typed("datafile", |v| v.as_text().map(str::to_string))?
                .unwrap_or(defaults.datafile),
            errorfloor,
            errorfloor_type: set
                .typed("errorfloor_type", |v| v.as_text().and_then(ErrorFloorType::parse))?
                .unwrap_or(defaults.errorfloor_type),
            mode: set
                .typed("mode", |v| v.as_text().and_then(Mode::parse))?
                .unwrap_or(defaults.mode),
        })
    }
}

/// Parameters of the control file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlParams {
    pub penalty_type_structure: u32,
    pub penalty_type_anisotropy: u32,
    pub penalty_weight_structure: Vec<f64>,
    pub penalty_weight_anisotropy: Vec<f64>,
    pub iteration_max: u32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            penalty_type_structure: 6,
            penalty_type_anisotropy: 2,
            penalty_weight_structure: DEFAULT_PENALTY_WEIGHTS.to_vec(),
            penalty_weight_anisotropy: DEFAULT_PENALTY_WEIGHTS.to_vec(),
            iteration_max: 100,
        }
    }
}

impl ControlParams {
    pub fn from_set(set: &ParameterSet) -> Result<Self> {
        let defaults = Self::default();
        let weights = |key: &str, default: Vec<f64>| -> Result<Vec<f64>> {
            let ws = set.typed(key, ParamValue::as_numbers)?.unwrap_or(default);
            if ws.is_empty() {
                return Err(Error::invalid(key, "[]"));
            }
            Ok(ws)
        };
        Ok(Self {
            penalty_type_structure: set
                .typed("penalty_type_structure", ParamValue::as_u32)?
                .unwrap_or(defaults.penalty_type_structure),
            penalty_type_anisotropy: set
                .typed("penalty_type_anisotropy", ParamValue::as_u32)?
                .unwrap_or(defaults.penalty_type_anisotropy),
            penalty_weight_structure: weights(
                "penalty_weight_structure",
                defaults.penalty_weight_structure,
            )?,
            penalty_weight_anisotropy: weights(
                "penalty_weight_anisotropy",
                defaults.penalty_weight_anisotropy,
            )?,
            iteration_max: set
                .typed("iteration_max", ParamValue::as_u32)?
                .unwrap_or(defaults.iteration_max),
        })
    }
}

/// Parameters of the optional a-priori constraint file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InmodelParams {
    pub build_inmodel: bool,
    pub inmodel_parameters_file: Option<PathBuf>,
    pub inmodel_modeldir: Option<PathBuf>,
}

impl InmodelParams {
    pub fn from_set(set: &ParameterSet) -> Result<Self> {
        Ok(Self {
            build_inmodel: set
                .typed("build_inmodel", ParamValue::as_bool)?
                .unwrap_or(false),
            inmodel_parameters_file: set.path("inmodel_parameters_file")?,
            inmodel_modeldir: set.path("inmodel_modeldir")?,
        })
    }
}

/// Parameters read by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub program_location: String,
    pub run_input: Vec<f64>,
    pub working_directory: PathBuf,
    pub edifolder_list: Option<Vec<String>>,
    pub master_savepath: PathBuf,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            program_location: DEFAULT_PROGRAM_LOCATION.to_string(),
            run_input: DEFAULT_RUN_INPUT.to_vec(),
            working_directory: PathBuf::from("."),
            edifolder_list: None,
            master_savepath: PathBuf::from(DEFAULT_MASTER_SAVEPATH),
        }
    }
}

impl RunParams {
    pub fn from_set(set: &ParameterSet) -> Result<Self> {
        let defaults = Self::default();
        let run_input = set
            .typed("run_input", ParamValue::as_numbers)?
            .unwrap_or(defaults.run_input);
        if run_input.len() != DEFAULT_RUN_INPUT.len() {
            return Err(Error::invalid("run_input", format!("{:?}", run_input)));
        }
        Ok(Self {
            program_location: set
                .typed("program_location", |v| v.as_text().map(str::to_string))?
                .unwrap_or(defaults.program_location),
            run_input,
            working_directory: set
                .path("working_directory")?
                .unwrap_or(defaults.working_directory),
            edifolder_list: set.typed("edifolder_list", ParamValue::as_texts)?,
            master_savepath: set
                .path("master_savepath")?
                .unwrap_or(defaults.master_savepath),
        })
    }

    /// Master directory, resolved against the working directory when relative.
    pub fn master_directory(&self) -> PathBuf {
        if self.master_savepath.is_absolute() {
            self.master_savepath.clone()
        } else {
            self.working_directory.join(&self.master_savepath)
        }
    }
}
