//! The compute session shared by all per-country runs: a worker pool and a scratch area.

use std::path::{Path, PathBuf};
use std::{fs, io, process};

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of partitions, and hence of worker threads.
    pub partitions: usize,

    /// Parent of the session's scratch directory. No scratch area is created when unset.
    pub scratch_dir: Option<PathBuf>,
}
impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            partitions: 6,
            scratch_dir: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot build worker pool: {0}")]
    Pool(#[from] ThreadPoolBuildError),

    #[error("cannot create scratch directory {path}: {source}")]
    Scratch { path: PathBuf, source: io::Error },
}

pub struct Session {
    pool: ThreadPool,
    partitions: usize,
    scratch: Option<PathBuf>,
    closed: bool,
}
impl Session {
    pub fn open(config: &SessionConfig) -> Result<Self, SessionError> {
        let partitions = config.partitions.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(partitions)
            .thread_name(|index| format!("halftime-worker-{index}"))
            .build()?;
        let scratch = match &config.scratch_dir {
            None => None,
            Some(parent) => {
                let path = parent.join(format!("halftime-{}", process::id()));
                fs::create_dir_all(&path).map_err(|source| SessionError::Scratch {
                    path: path.clone(),
                    source,
                })?;
                Some(path)
            }
        };
        debug!("opened session with {partitions} partitions, scratch: {scratch:?}");
        Ok(Self {
            pool,
            partitions,
            scratch,
            closed: false,
        })
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Runs `op` inside the session's worker pool; parallel iterators started from `op`
    /// execute on the session's workers.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_deref()
    }

    /// Releases the session, removing its scratch area.
    pub fn close(mut self) -> Result<(), io::Error> {
        self.closed = true;
        self.remove_scratch()
    }

    fn remove_scratch(&mut self) -> Result<(), io::Error> {
        match self.scratch.take() {
            Some(path) if path.exists() => {
                debug!("removing scratch directory {}", path.display());
                fs::remove_dir_all(path)
            }
            _ => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.remove_scratch() {
                warn!("failed to remove scratch directory: {err}");
            }
        }
    }
}
