use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use num_complex::Complex;

use crate::core::params::DataParams;
use crate::error::Result;
use crate::io::edi::EdiFile;
use crate::types::{ErrorFloorType, Mode};

const COMPONENTS: [(usize, usize); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// One period of the data file.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub period: f64,
    /// Mode I: re/im of xx, xy, yx, yy. Mode R: rho of xx..yy then phase of xx..yy.
    pub values: Vec<f64>,
    /// Mode I: one error per component. Mode R: rho errors then phase errors.
    pub errors: Vec<f64>,
}

/// Impedance errors raised to the error floor.
pub fn floored_errors(
    z: &Array3<Complex<f64>>,
    z_err: &Array3<f64>,
    errorfloor: f64,
    floor_type: ErrorFloorType,
) -> Array3<f64> {
    let mut out = z_err.clone();
    for i in 0..z.len_of(ndarray::Axis(0)) {
        let floor = match floor_type {
            ErrorFloorType::Relative => errorfloor * (z[[i, 0, 1]] * z[[i, 1, 0]]).norm().sqrt(),
            ErrorFloorType::Absolute => errorfloor,
        };
        for (r, c) in COMPONENTS {
            out[[i, r, c]] = out[[i, r, c]].max(floor);
        }
    }
    out
}

/// Apparent resistivity (ohm m) from an impedance in field units.
pub fn apparent_resistivity(z: Complex<f64>, period: f64) -> f64 {
    0.2 * period * z.norm_sqr()
}

/// Phase in degrees.
pub fn phase_degrees(z: Complex<f64>) -> f64 {
    z.im.atan2(z.re).to_degrees()
}

/// Data rows in ascending period order.
pub fn build_rows(edi: &EdiFile, params: &DataParams) -> Vec<DataRow> {
    let periods = edi.periods();
    let mut rows: Vec<DataRow> = match params.mode {
        Mode::Impedance => {
            let errors = floored_errors(&edi.z, &edi.z_err, params.errorfloor, params.errorfloor_type);
            periods
                .iter()
                .enumerate()
                .map(|(i, &period)| DataRow {
                    period,
                    values: COMPONENTS
                        .iter()
                        .flat_map(|&(r, c)| [edi.z[[i, r, c]].re, edi.z[[i, r, c]].im])
                        .collect(),
                    errors: COMPONENTS.iter().map(|&(r, c)| errors[[i, r, c]]).collect(),
                })
                .collect()
        }
        Mode::ResistivityPhase => periods
            .iter()
            .enumerate()
            .map(|(i, &period)| resistivity_row(edi, params, i, period))
            .collect(),
    };
    rows.sort_by(|a, b| a.period.total_cmp(&b.period));
    rows
}

fn resistivity_row(edi: &EdiFile, params: &DataParams, i: usize, period: f64) -> DataRow {
    let (rho_floor_rel, phase_floor) = match params.errorfloor_type {
        ErrorFloorType::Relative => (
            Some(params.errorfloor),
            (params.errorfloor / 2.0).min(1.0).asin().to_degrees(),
        ),
        ErrorFloorType::Absolute => (None, params.errorfloor),
    };

    let mut rho = Vec::with_capacity(4);
    let mut phase = Vec::with_capacity(4);
    let mut rho_err = Vec::with_capacity(4);
    let mut phase_err = Vec::with_capacity(4);

    for (r, c) in COMPONENTS {
        let z = edi.z[[i, r, c]];
        let modulus = z.norm();
        let relative = if modulus > 0.0 {
            edi.z_err[[i, r, c]] / modulus
        } else {
            0.0
        };
        let rho_value = apparent_resistivity(z, period);
        let rho_floor = match rho_floor_rel {
            Some(ef) => ef * rho_value,
            None => params.errorfloor,
        };
        rho.push(rho_value);
        phase.push(phase_degrees(z));
        rho_err.push((2.0 * rho_value * relative).max(rho_floor));
        phase_err.push(relative.to_degrees().max(phase_floor));
    }

    rho.extend(phase);
    rho_err.extend(phase_err);
    DataRow {
        period,
        values: rho,
        errors: rho_err,
    }
}

/// Render the data file.
pub fn format_datafile(station: &str, mode: Mode, rows: &[DataRow]) -> String {
    let mut out = format!("{}\n{} {}\n", station, mode.letter(), rows.len());
    for row in rows {
        out.push_str(&format!("{:>14.6e}", row.period));
        for v in row.values.iter().chain(row.errors.iter()) {
            out.push_str(&format!(" {:>14.6e}", v));
        }
        out.push('\n');
    }
    out
}

/// Write the data file into `dir`, returning its path.
pub fn write_datafile(edi: &EdiFile, params: &DataParams, dir: &Path) -> Result<PathBuf> {
    let rows = build_rows(edi, params);
    let path = dir.join(&params.datafile);
    fs::write(&path, format_datafile(&edi.metadata.station, params.mode, &rows))?;
    Ok(path)
}
