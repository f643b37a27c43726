//! Exclusive, process-crash-safe lock over a `wacli` store directory
//! (spec section 4.2).
//!
//! Uses `fs2`'s OS-level advisory file locking rather than a lockfile
//! existence race: the lock is released automatically if the holding
//! process exits or crashes, so a stale `LOCK` file is never mistaken for
//! an active holder.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use wacli_core::error::WacliError;

/// Human-readable owner hint written into the lock file body, read back by
/// `doctor` to report who holds the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerInfo {
    pub pid: u32,
    pub command: String,
    pub acquired_at: chrono::DateTime<chrono::Utc>,
}

impl OwnerInfo {
    fn current(command: &str) -> Self {
        Self {
            pid: std::process::id(),
            command: command.to_string(),
            acquired_at: chrono::Utc::now(),
        }
    }

    fn to_body(&self) -> String {
        format!("{}\n{}\n{}\n", self.pid, self.command, self.acquired_at.to_rfc3339())
    }

    fn parse(body: &str) -> Option<Self> {
        let mut lines = body.lines();
        let pid: u32 = lines.next()?.trim().parse().ok()?;
        let command = lines.next()?.trim().to_string();
        let acquired_at = chrono::DateTime::parse_from_rfc3339(lines.next()?.trim())
            .ok()?
            .with_timezone(&chrono::Utc);
        Some(Self { pid, command, acquired_at })
    }
}

/// An acquired exclusive lock over `<dir>/LOCK`. Dropping (or calling
/// [`Lock::release`]) unlocks the underlying file; both are safe to call
/// more than once.
pub struct Lock {
    file: Option<File>,
    path: PathBuf,
}

impl Lock {
    fn lock_path(dir: &Path) -> PathBuf {
        dir.join("LOCK")
    }

    /// Take an exclusive advisory lock over `<dir>/LOCK`, creating the file
    /// (and `dir`) if missing. Returns `WacliError::LockHeld` immediately
    /// (no blocking/queueing) if another process already holds it.
    pub fn acquire(dir: &Path) -> Result<Self, WacliError> {
        std::fs::create_dir_all(dir)?;
        let path = Self::lock_path(dir);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(_) => {
                return Err(WacliError::LockHeld { path });
            }
        }

        // Best-effort owner hint; failures here never block acquisition.
        let owner = OwnerInfo::current(&current_command_hint());
        file.set_len(0)?;
        use std::io::Seek;
        file.seek(std::io::SeekFrom::Start(0))?;
        let _ = file.write_all(owner.to_body().as_bytes());
        let _ = file.sync_all();

        tracing::info!(path = %path.display(), pid = owner.pid, "lock acquired");

        Ok(Self { file: Some(file), path })
    }

    /// Probe whether the lock is currently held without holding it for the
    /// caller's lifetime: attempts a non-blocking exclusive lock and
    /// releases it immediately. Used by `doctor` and read-only commands.
    ///
    /// Returns `(held, owner)`. `owner` is `None` if the lock isn't held, or
    /// if it is held but the owner hint couldn't be parsed.
    pub fn probe(dir: &Path) -> (bool, Option<OwnerInfo>) {
        let path = Self::lock_path(dir);
        if !path.exists() {
            return (false, None);
        }

        let owner = std::fs::read_to_string(&path)
            .ok()
            .and_then(|body| OwnerInfo::parse(&body));

        let Ok(file) = OpenOptions::new().read(true).write(true).open(&path) else {
            return (false, owner);
        };

        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                (false, None)
            }
            Err(_) => (true, owner),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock. Idempotent — calling this (or dropping `Lock`)
    /// more than once is a no-op after the first.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
            tracing::info!(path = %self.path.display(), "lock released");
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        self.release();
    }
}

fn current_command_hint() -> String {
    std::env::args().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_and_release_roundtrip() {
        let dir = tempdir().unwrap();
        let mut lock = Lock::acquire(dir.path()).unwrap();
        assert!(dir.path().join("LOCK").exists());
        lock.release();
        lock.release(); // idempotent
    }

    #[test]
    fn second_acquire_fails_with_lock_held() {
        let dir = tempdir().unwrap();
        let _lock = Lock::acquire(dir.path()).unwrap();
        let second = Lock::acquire(dir.path());
        assert!(matches!(second, Err(WacliError::LockHeld { .. })));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempdir().unwrap();
        {
            let _lock = Lock::acquire(dir.path()).unwrap();
        }
        let second = Lock::acquire(dir.path());
        assert!(second.is_ok());
    }

    #[test]
    fn probe_reports_held_state_without_blocking() {
        let dir = tempdir().unwrap();
        let (held, _) = Lock::probe(dir.path());
        assert!(!held);

        let _lock = Lock::acquire(dir.path()).unwrap();
        let (held, owner) = Lock::probe(dir.path());
        assert!(held);
        assert!(owner.is_some());
    }

    #[test]
    fn owner_info_roundtrips_through_body() {
        let owner = OwnerInfo {
            pid: 1234,
            command: "wacli sync --follow".to_string(),
            acquired_at: chrono::Utc::now(),
        };
        let body = owner.to_body();
        let parsed = OwnerInfo::parse(&body).unwrap();
        assert_eq!(parsed.pid, owner.pid);
        assert_eq!(parsed.command, owner.command);
    }
}
