use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use fs2::FileExt;
use markov_core::now_millis;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::paths::MarkovPaths;

/// Who holds `.markov/LOCK`, written into the lock file once it is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockHolder {
    pub pid: u32,
    /// Epoch millis.
    pub acquired_at: i64,
}

/// Exclusive advisory lock on `.markov/LOCK`, held by every command that
/// rewrites branch files. Released when dropped.
///
/// The store never takes it itself; callers hold it around their whole
/// load, mutate and persist sequence.
#[derive(Debug)]
pub struct WorkspaceLock {
    _file: File,
}

impl WorkspaceLock {
    /// Take the lock without blocking. Fails with the holder's pid when
    /// another process has it.
    pub fn acquire(paths: &MarkovPaths) -> anyhow::Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&paths.lock_file)
            .map_err(|e| {
                anyhow::anyhow!("cannot open lock file {}: {}", paths.lock_file.display(), e)
            })?;

        if file.try_lock_exclusive().is_err() {
            let holder = match Self::holder(paths) {
                Some(h) => format!("markov process {}", h.pid),
                None => "another markov process".to_string(),
            };
            anyhow::bail!(
                "project is locked by {holder} ({})",
                paths.lock_file.display()
            );
        }

        let holder = LockHolder {
            pid: std::process::id(),
            acquired_at: now_millis(),
        };
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        serde_json::to_writer(&mut file, &holder)?;
        file.flush()?;
        debug!(pid = holder.pid, "acquired project lock");

        Ok(Self { _file: file })
    }

    /// Last holder recorded in the lock file, whether or not it still holds
    /// the lock. `None` when the file is missing, empty or unreadable.
    pub fn holder(paths: &MarkovPaths) -> Option<LockHolder> {
        let mut text = String::new();
        File::open(&paths.lock_file)
            .and_then(|mut f| f.read_to_string(&mut text))
            .ok()?;
        serde_json::from_str(&text).ok()
    }
}
