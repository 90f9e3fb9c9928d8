use ndarray::{Array2, Axis};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors encountered when reading an elevation source
#[derive(Debug, Error)]
pub enum ElevationError {
    #[error("Elevation source not found: {0:?}")]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed elevation row {line}: {content}")]
    Malformed { line: usize, content: String },
    #[error("Elevation source {0:?} contains no points")]
    Empty(PathBuf),
}

/// Scattered `x y z` elevation points.
#[derive(Debug, Clone)]
pub struct ElevationGrid {
    /// One row per point: x, y, z
    pub points: Array2<f64>,
}

impl ElevationGrid {
    /// Read a whitespace- or comma-delimited `x y z` file. Blank lines,
    /// `#` comments and a non-numeric header row are skipped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ElevationError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ElevationError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut values = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .collect();
            let parsed: Option<Vec<f64>> = fields.iter().map(|f| f.parse().ok()).collect();
            match parsed {
                Some(xyz) if xyz.len() >= 3 => values.extend_from_slice(&xyz[..3]),
                None if values.is_empty() => continue,
                _ => {
                    return Err(ElevationError::Malformed {
                        line: idx + 1,
                        content: line.to_string(),
                    });
                }
            }
        }

        if values.is_empty() {
            return Err(ElevationError::Empty(path.to_path_buf()));
        }
        let rows = values.len() / 3;
        let points = Array2::from_shape_vec((rows, 3), values)
            .map_err(|_| ElevationError::Empty(path.to_path_buf()))?;
        debug!("Loaded {} elevation points from {:?}", rows, path);
        Ok(Self { points })
    }

    /// Absolute elevation of the point nearest to (x, y).
    pub fn nearest(&self, x: f64, y: f64) -> f64 {
        let mut best = f64::INFINITY;
        let mut elevation = 0.0;
        for point in self.points.axis_iter(Axis(0)) {
            let d2 = (point[0] - x).powi(2) + (point[1] - y).powi(2);
            if d2 < best {
                best = d2;
                elevation = point[2];
            }
        }
        elevation.abs()
    }
}

/// Elevation at (x, y) from the point file at `path`.
pub fn get_elevation(x: f64, y: f64, path: &Path) -> Result<f64, ElevationError> {
    Ok(ElevationGrid::open(path)?.nearest(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn nearest_point_is_returned_as_absolute_value() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("basement.xyz");
        std::fs::write(&path, "x y z\n0 0 -120.5\n10 0 -80\n0 10 -60\n").unwrap();

        assert_eq!(get_elevation(1.0, 1.0, &path).unwrap(), 120.5);
        assert_eq!(get_elevation(9.0, 1.0, &path).unwrap(), 80.0);
        assert_eq!(get_elevation(0.0, 7.0, &path).unwrap(), 60.0);
    }

    #[test]
    fn comma_delimited_points_are_accepted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("surface.csv");
        std::fs::write(&path, "140.1,-30.2,250\n140.2,-30.2,300\n").unwrap();

        assert_eq!(get_elevation(140.19, -30.2, &path).unwrap(), 300.0);
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = get_elevation(0.0, 0.0, &temp.path().join("absent.xyz")).unwrap_err();
        assert!(matches!(err, ElevationError::NotFound(_)));
    }

    #[test]
    fn truncated_row_is_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.xyz");
        std::fs::write(&path, "0 0 10\n5 5\n").unwrap();
        assert!(matches!(
            ElevationGrid::open(&path),
            Err(ElevationError::Malformed { line: 2, .. })
        ));
    }
}
