use ndarray::{Array1, Array3, Axis};
use num_complex::Complex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors encountered when reading EDI files
#[derive(Debug, Error)]
pub enum EdiError {
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Missing block `{0}` in EDI file")]
    MissingBlock(String),
    #[error("Block `{block}` has {found} values, expected {expected}")]
    BlockLength {
        block: String,
        found: usize,
        expected: usize,
    },
    #[error("Parse error on line {line}: {content}")]
    Parse { line: usize, content: String },
    #[error("EDI file contains no usable frequencies")]
    NoFrequencies,
}

/// Tensor components as (block prefix, row, column).
const COMPONENTS: [(&str, usize, usize); 4] = [
    ("ZXX", 0, 0),
    ("ZXY", 0, 1),
    ("ZYX", 1, 0),
    ("ZYY", 1, 1),
];

const DEFAULT_EMPTY: f64 = 1.0e32;

/// Station metadata from the `>HEAD` and `>=DEFINEMEAS` sections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdiMetadata {
    pub station: String,
    /// Decimal degrees
    pub latitude: Option<f64>,
    /// Decimal degrees
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
}

/// Impedance data of one station
#[derive(Debug, Clone)]
pub struct EdiFile {
    pub path: PathBuf,
    pub metadata: EdiMetadata,
    /// Hz, in file order
    pub frequencies: Array1<f64>,
    /// Shape (nfreq, 2, 2), field units (mV/km/nT)
    pub z: Array3<Complex<f64>>,
    /// Standard error of each component, shape (nfreq, 2, 2)
    pub z_err: Array3<f64>,
}

impl EdiFile {
    /// Read and validate an EDI file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EdiError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| EdiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut edi = Self::parse(&text)?;
        if edi.metadata.station.is_empty() {
            edi.metadata.station = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        edi.path = path.to_path_buf();
        debug!(
            "Read {:?}: station {} with {} frequencies",
            path,
            edi.metadata.station,
            edi.frequencies.len()
        );
        Ok(edi)
    }

    /// Parse EDI text. The returned file has an empty `path`.
    pub fn parse(text: &str) -> Result<Self, EdiError> {
        let mut fields: HashMap<String, String> = HashMap::new();
        let mut blocks: HashMap<String, Vec<f64>> = HashMap::new();
        let mut section = String::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix('>') {
                section = rest
                    .trim_start_matches('=')
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_ascii_uppercase();
                if is_data_block(&section) {
                    blocks.entry(section.clone()).or_default();
                }
                continue;
            }

            match section.as_str() {
                "HEAD" | "DEFINEMEAS" => {
                    if let Some((key, value)) = line.split_once('=') {
                        fields
                            .entry(key.trim().to_ascii_uppercase())
                            .or_insert_with(|| value.trim().trim_matches('"').to_string());
                    }
                }
                block if is_data_block(block) => {
                    let values = blocks.entry(block.to_string()).or_default();
                    for token in line.split_whitespace() {
                        let value = token.parse::<f64>().map_err(|_| EdiError::Parse {
                            line: idx + 1,
                            content: line.to_string(),
                        })?;
                        values.push(value);
                    }
                }
                _ => {}
            }
        }

        let metadata = EdiMetadata {
            station: fields.get("DATAID").cloned().unwrap_or_default(),
            latitude: first_angle(&fields, &["REFLAT", "LAT"]),
            longitude: first_angle(&fields, &["REFLONG", "LONG"]),
            elevation: ["REFELEV", "ELEV"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(|v| v.parse().ok())),
        };
        let empty = fields
            .get("EMPTY")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_EMPTY);

        let frequencies = blocks
            .remove("FREQ")
            .ok_or_else(|| EdiError::MissingBlock("FREQ".to_string()))?;
        let n = frequencies.len();
        if n == 0 {
            return Err(EdiError::NoFrequencies);
        }

        let mut z = Array3::<Complex<f64>>::zeros((n, 2, 2));
        let mut z_err = Array3::<f64>::zeros((n, 2, 2));
        let mut valid = vec![true; n];

        for (name, row, col) in COMPONENTS {
            let required = row != col;
            let re = take_block(&mut blocks, &format!("{}R", name), n, required)?;
            let im = take_block(&mut blocks, &format!("{}I", name), n, required)?;
            let var = take_block(&mut blocks, &format!("{}.VAR", name), n, false)?;

            for i in 0..n {
                let (r, m) = (re.as_ref().map_or(0.0, |v| v[i]), im.as_ref().map_or(0.0, |v| v[i]));
                if r.abs() >= empty || m.abs() >= empty {
                    valid[i] = false;
                    continue;
                }
                z[[i, row, col]] = Complex::new(r, m);
                if let Some(var) = &var {
                    if var[i].abs() < empty {
                        z_err[[i, row, col]] = var[i].max(0.0).sqrt();
                    }
                }
            }
        }

        let keep: Vec<usize> = (0..n).filter(|&i| valid[i]).collect();
        if keep.is_empty() {
            return Err(EdiError::NoFrequencies);
        }
        if keep.len() < n {
            warn!("Dropping {} frequencies with empty impedance values", n - keep.len());
        }

        Ok(Self {
            path: PathBuf::new(),
            metadata,
            frequencies: Array1::from(frequencies).select(Axis(0), &keep),
            z: z.select(Axis(0), &keep),
            z_err: z_err.select(Axis(0), &keep),
        })
    }

    /// Periods in seconds, in file order
    pub fn periods(&self) -> Array1<f64> {
        self.frequencies.mapv(|f| 1.0 / f)
    }

    /// Station x coordinate (longitude), zero when unknown
    pub fn x(&self) -> f64 {
        self.metadata.longitude.unwrap_or(0.0)
    }

    /// Station y coordinate (latitude), zero when unknown
    pub fn y(&self) -> f64 {
        self.metadata.latitude.unwrap_or(0.0)
    }
}

fn is_data_block(name: &str) -> bool {
    name == "FREQ"
        || COMPONENTS.iter().any(|(c, _, _)| {
            name.strip_prefix(c)
                .is_some_and(|rest| matches!(rest, "R" | "I" | ".VAR"))
        })
}

fn take_block(
    blocks: &mut HashMap<String, Vec<f64>>,
    name: &str,
    expected: usize,
    required: bool,
) -> Result<Option<Vec<f64>>, EdiError> {
    match blocks.remove(name) {
        Some(values) if values.len() == expected => Ok(Some(values)),
        Some(values) => Err(EdiError::BlockLength {
            block: name.to_string(),
            found: values.len(),
            expected,
        }),
        None if required => Err(EdiError::MissingBlock(name.to_string())),
        None => Ok(None),
    }
}

fn first_angle(fields: &HashMap<String, String>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| fields.get(*k).and_then(|v| parse_angle(v)))
}

/// Parse decimal degrees or `dd:mm:ss.ss`
pub fn parse_angle(value: &str) -> Option<f64> {
    let value = value.trim();
    if !value.contains(':') {
        return value.parse().ok();
    }
    let parts: Vec<f64> = value
        .split(':')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let degrees = *parts.first()?;
    let minutes = parts.get(1).copied().unwrap_or(0.0);
    let seconds = parts.get(2).copied().unwrap_or(0.0);
    let sign = if value.starts_with('-') { -1.0 } else { 1.0 };
    Some(sign * (degrees.abs() + minutes / 60.0 + seconds / 3600.0))
}
