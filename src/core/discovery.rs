use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;

/// Extension identifying measurement files.
pub const MEASUREMENT_EXTENSION: &str = ".edi";

/// Collect measurement files below `working_directory`.
///
/// With `subfolders` given, only those folders (relative to the working
/// directory, or absolute) are searched. Otherwise every directory strictly
/// below the working directory is searched; files directly in the root are
/// never returned. Directory listings are sorted by file name so that every
/// worker scanning the same tree gets the same ordered sequence.
pub fn discover_measurement_files(
    working_directory: &Path,
    subfolders: Option<&[String]>,
) -> Result<Vec<PathBuf>> {
    let folders: Vec<PathBuf> = match subfolders {
        Some(list) => list.iter().map(|s| working_directory.join(s)).collect(),
        None => {
            let mut dirs = Vec::new();
            for entry in WalkDir::new(working_directory)
                .min_depth(1)
                .sort_by_file_name()
            {
                let entry = entry?;
                if entry.file_type().is_dir() {
                    dirs.push(entry.into_path());
                }
            }
            dirs
        }
    };

    let mut files = Vec::new();
    for folder in &folders {
        let mut found: Vec<PathBuf> = std::fs::read_dir(folder)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_measurement_file(path))
            .collect();
        found.sort();
        debug!("{} measurement files in {:?}", found.len(), folder);
        files.extend(found);
    }
    Ok(files)
}

fn is_measurement_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(MEASUREMENT_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn build_tree(root: &Path) {
        for dir in ["line2", "line1", "line1/deep"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in [
            "root.edi",
            "line1/s02.edi",
            "line1/s01.edi",
            "line1/notes.txt",
            "line1/deep/s10.edi",
            "line2/s05.edi",
            "line2/s05.dat",
        ] {
            fs::write(root.join(file), "").unwrap();
        }
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn walks_every_subdirectory_excluding_root() {
        let temp = TempDir::new().unwrap();
        build_tree(temp.path());

        let files = discover_measurement_files(temp.path(), None).unwrap();

        assert_eq!(
            names(temp.path(), &files),
            vec![
                "line1/s01.edi",
                "line1/s02.edi",
                "line1/deep/s10.edi",
                "line2/s05.edi"
            ]
        );
    }

    #[test]
    fn explicit_subfolders_restrict_the_search() {
        let temp = TempDir::new().unwrap();
        build_tree(temp.path());

        let subfolders = vec!["line2".to_string(), "line1".to_string()];
        let files = discover_measurement_files(temp.path(), Some(subfolders.as_slice())).unwrap();

        assert_eq!(
            names(temp.path(), &files),
            vec!["line2/s05.edi", "line1/s01.edi", "line1/s02.edi"]
        );
    }

    #[test]
    fn repeated_discovery_is_identical() {
        let temp = TempDir::new().unwrap();
        build_tree(temp.path());

        let first = discover_measurement_files(temp.path(), None).unwrap();
        let second = discover_measurement_files(temp.path(), None).unwrap();
        assert_eq!(first, second);
        assert!(first.iter().all(|f| f.to_string_lossy().ends_with(".edi")));
    }

    #[test]
    fn missing_subfolder_is_an_error() {
        let temp = TempDir::new().unwrap();
        let subfolders = vec!["nowhere".to_string()];
        assert!(discover_measurement_files(temp.path(), Some(subfolders.as_slice())).is_err());
    }
}
