use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::io::elevation::{ElevationError, get_elevation};

/// Depth rounded to centimetres, usable as an ordered map key.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Depth(i64);

impl Depth {
    pub fn from_metres(metres: f64) -> Self {
        Depth((metres * 100.0).round() as i64)
    }

    pub fn metres(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl std::fmt::Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.metres())
    }
}

impl Serialize for Depth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Resistivity bounds and strike imposed from a given depth.
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub struct Constraint {
    pub min_resistivity: f64,
    pub max_resistivity: f64,
    pub strike: f64,
}

impl Constraint {
    pub fn as_triplet(&self) -> [f64; 3] {
        [self.min_resistivity, self.max_resistivity, self.strike]
    }
}

/// Depth -> constraint mapping written to the a-priori file.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConstraintDictionary {
    entries: BTreeMap<Depth, Constraint>,
}

impl ConstraintDictionary {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, depth_metres: f64) -> Option<&Constraint> {
        self.entries.get(&Depth::from_metres(depth_metres))
    }

    /// Entries in ascending depth order.
    pub fn iter(&self) -> impl Iterator<Item = (Depth, &Constraint)> {
        self.entries.iter().map(|(d, c)| (*d, c))
    }

    fn insert(&mut self, depth: Depth, constraint: Constraint) -> Option<Constraint> {
        self.entries.insert(depth, constraint)
    }
}

/// Build a constraint dictionary from a constraint-parameter table.
///
/// The table has a header row followed by rows of
/// `elevation_source_or_none, offset, min_resistivity, max_resistivity, strike`.
/// Each row's depth is the elevation of the source at (x, y) plus the offset,
/// rounded to 2 decimals; a source of `none` contributes zero elevation. A
/// missing elevation source is treated as zero elevation. Rows resolving to
/// the same depth overwrite earlier ones.
pub fn build_constraint_dictionary(
    input_file: &Path,
    x: f64,
    y: f64,
    working_directory: Option<&Path>,
) -> Result<ConstraintDictionary> {
    let text = std::fs::read_to_string(input_file)?;
    let mut dictionary = ConstraintDictionary::default();

    for (idx, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let row_error = |reason: String| Error::ConstraintRow {
            path: input_file.to_path_buf(),
            line: idx + 1,
            reason,
        };

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 5 {
            return Err(row_error(format!("expected 5 fields, got {}", fields.len())));
        }

        let source = fields[0];
        let elevation = if source.eq_ignore_ascii_case("none") {
            0.0
        } else {
            let elevation_path = resolve_source(source, working_directory);
            match get_elevation(x, y, &elevation_path) {
                Ok(elevation) => elevation,
                Err(ElevationError::NotFound(path)) => {
                    warn!("Elevation source {:?} not found, using zero elevation", path);
                    0.0
                }
                Err(e) => return Err(e.into()),
            }
        };

        let params = fields[1..5]
            .iter()
            .map(|f| f.parse::<f64>())
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|e| row_error(e.to_string()))?;

        let depth = Depth::from_metres(elevation + params[0]);
        let constraint = Constraint {
            min_resistivity: params[1],
            max_resistivity: params[2],
            strike: params[3],
        };
        if dictionary.insert(depth, constraint).is_some() {
            debug!("Constraint at depth {} replaced by row {}", depth, idx + 1);
        }
    }

    Ok(dictionary)
}

fn resolve_source(source: &str, working_directory: Option<&Path>) -> PathBuf {
    match working_directory {
        Some(wd) => wd.join(source),
        None => PathBuf::from(source),
    }
}
