use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variables exported by common parallel launchers, as
/// (rank, size) pairs in lookup order.
pub const RANK_ENV_VARS: &[(&str, &str)] = &[
    ("OMPI_COMM_WORLD_RANK", "OMPI_COMM_WORLD_SIZE"),
    ("PMIX_RANK", "PMIX_SIZE"),
    ("PMI_RANK", "PMI_SIZE"),
    ("MV2_COMM_WORLD_RANK", "MV2_COMM_WORLD_SIZE"),
    ("SLURM_PROCID", "SLURM_NTASKS"),
];

/// A worker's position in its cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerIdentity {
    pub rank: usize,
    pub size: usize,
}

impl WorkerIdentity {
    pub fn new(rank: usize, size: usize) -> Result<Self> {
        if size == 0 || rank >= size {
            return Err(Error::invalid("rank", format!("{} of {}", rank, size)));
        }
        Ok(Self { rank, size })
    }

    pub fn singleton() -> Self {
        Self { rank: 0, size: 1 }
    }

    /// Resolve identity from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve identity through `lookup`. The first launcher whose rank
    /// variable is set wins; its size variable defaults to `rank + 1`.
    /// With no launcher variables present the worker is a singleton.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        for &(rank_var, size_var) in RANK_ENV_VARS {
            let Some(raw_rank) = lookup(rank_var) else {
                continue;
            };
            let rank: usize = raw_rank
                .trim()
                .parse()
                .map_err(|_| Error::invalid(rank_var, &raw_rank))?;
            let size = match lookup(size_var) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| Error::invalid(size_var, &raw))?,
                None => rank + 1,
            };
            debug!("Worker identity from {}: rank {} of {}", rank_var, rank, size);
            return Self::new(rank, size);
        }
        Ok(Self::singleton())
    }
}

impl std::fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.rank, self.size)
    }
}

/// Pipeline progress of a single worker. Transitions only move forward.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize)]
pub enum WorkerState {
    Idle,
    ParametersResolved,
    WorkspaceBuilt,
    FilesWritten,
    SubprocessLaunched,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "Idle"),
            WorkerState::ParametersResolved => write!(f, "ParametersResolved"),
            WorkerState::WorkspaceBuilt => write!(f, "WorkspaceBuilt"),
            WorkerState::FilesWritten => write!(f, "FilesWritten"),
            WorkerState::SubprocessLaunched => write!(f, "SubprocessLaunched"),
        }
    }
}

/// Pick the file assigned to `rank`.
pub fn assign<T>(files: &[T], rank: usize) -> Result<&T> {
    files.get(rank).ok_or(Error::RankOutOfRange {
        rank,
        available: files.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn no_launcher_means_singleton() {
        assert_eq!(
            WorkerIdentity::from_lookup(env(&[])).unwrap(),
            WorkerIdentity::singleton()
        );
    }

    #[test]
    fn open_mpi_variables_are_read() {
        let id = WorkerIdentity::from_lookup(env(&[
            ("OMPI_COMM_WORLD_RANK", "2"),
            ("OMPI_COMM_WORLD_SIZE", "4"),
        ]))
        .unwrap();
        assert_eq!(id, WorkerIdentity { rank: 2, size: 4 });
    }

    #[test]
    fn slurm_variables_are_read_last() {
        let id = WorkerIdentity::from_lookup(env(&[
            ("SLURM_PROCID", "0"),
            ("SLURM_NTASKS", "8"),
            ("PMI_RANK", "3"),
            ("PMI_SIZE", "5"),
        ]))
        .unwrap();
        assert_eq!(id, WorkerIdentity { rank: 3, size: 5 });
    }

    #[test]
    fn garbage_rank_is_rejected() {
        assert!(WorkerIdentity::from_lookup(env(&[("PMI_RANK", "first")])).is_err());
        assert!(WorkerIdentity::new(4, 4).is_err());
    }

    #[test]
    fn assignment_is_a_bijection_over_ranks() {
        let files = vec!["a.edi", "b.edi", "c.edi"];
        let assigned: Vec<_> = (0..files.len())
            .map(|rank| *assign(&files, rank).unwrap())
            .collect();
        assert_eq!(assigned, files);
    }

    #[test]
    fn rank_past_file_count_fails() {
        let files = vec!["a.edi", "b.edi"];
        assert!(matches!(
            assign(&files, 2),
            Err(Error::RankOutOfRange {
                rank: 2,
                available: 2
            })
        ));
    }
}
