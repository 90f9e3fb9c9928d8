use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::constraints::{Constraint, ConstraintDictionary, Depth};
use crate::error::Result;

pub const INMODEL_FILE: &str = "inmodel.dat";

/// Merge the previous model's layer tops with the constraint depths.
///
/// Every dictionary entry becomes a layer boundary of its own, so no
/// constraint is dropped or moved; model tops that coincide with a
/// constraint depth carry that constraint.
pub fn merge_layers(
    layer_tops: &[f64],
    dictionary: &ConstraintDictionary,
) -> Vec<(Depth, Option<Constraint>)> {
    let mut layers: BTreeMap<Depth, Option<Constraint>> = layer_tops
        .iter()
        .map(|&top| (Depth::from_metres(top), None))
        .collect();
    let shallowest = layers.keys().next().copied();

    for (depth, constraint) in dictionary.iter() {
        if shallowest.is_some_and(|top| depth < top) {
            warn!(
                "Constraint depth {} lies above the top of the previous model ({})",
                depth,
                shallowest.map(|d| d.to_string()).unwrap_or_default()
            );
        }
        layers.insert(depth, Some(*constraint));
    }
    layers.into_iter().collect()
}

/// Render the a-priori file: layer count, then
/// `top flag resmin resmax strike` per layer.
pub fn format_inmodel(layer_tops: &[f64], dictionary: &ConstraintDictionary) -> String {
    let layers = merge_layers(layer_tops, dictionary);
    let mut out = format!("{}\n", layers.len());
    for (top, constraint) in layers {
        let row = match constraint {
            Some(c) => format!(
                "{} 1 {} {} {}\n",
                top, c.min_resistivity, c.max_resistivity, c.strike
            ),
            None => format!("{} 0 0 0 0\n", top),
        };
        out.push_str(&row);
    }
    out
}

pub fn write_inmodel(
    layer_tops: &[f64],
    dictionary: &ConstraintDictionary,
    dir: &Path,
) -> Result<PathBuf> {
    let path = dir.join(INMODEL_FILE);
    fs::write(&path, format_inmodel(layer_tops, dictionary))?;
    Ok(path)
}
