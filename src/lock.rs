//! Process-singleton guard backed by a PID file.
//!
//! Only one process may poll the chat transport at a time; a second poller
//! would answer every message twice. Acquisition is a single exclusive
//! create, so there is no window between checking for the file and writing
//! it.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub struct PidLock {
    path: PathBuf,
    pid: u32,
    alive: Box<dyn Fn(u32) -> bool + Send + Sync>,
}

impl PidLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pid: std::process::id(),
            alive: Box::new(pid_alive),
        }
    }

    /// Override the caller's PID. Test hook.
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Override the liveness probe for the recorded holder. Test hook.
    pub fn with_probe(mut self, probe: impl Fn(u32) -> bool + Send + Sync + 'static) -> Self {
        self.alive = Box::new(probe);
        self
    }

    /// Try to become the lock holder. Returns false when another live
    /// process already holds the lock; stale records left by dead holders
    /// are removed and acquisition proceeds.
    pub fn acquire(&self) -> bool {
        for _ in 0..2 {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
            {
                Ok(mut file) => {
                    if let Err(err) = file.write_all(self.pid.to_string().as_bytes()) {
                        warn!("failed to write pid to {}: {}", self.path.display(), err);
                        let _ = fs::remove_file(&self.path);
                        return false;
                    }
                    info!("acquired lock {} as pid {}", self.path.display(), self.pid);
                    return true;
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    match self.recorded_pid() {
                        Some(holder) if holder == self.pid => return true,
                        Some(holder) if (self.alive)(holder) => {
                            warn!(
                                "lock {} held by live pid {}, refusing to start",
                                self.path.display(),
                                holder
                            );
                            return false;
                        }
                        Some(holder) => {
                            info!(
                                "removing stale lock {} left by dead pid {}",
                                self.path.display(),
                                holder
                            );
                            let _ = fs::remove_file(&self.path);
                        }
                        None => {
                            warn!("lock {} is unreadable, removing", self.path.display());
                            let _ = fs::remove_file(&self.path);
                        }
                    }
                }
                Err(err) => {
                    warn!("could not create lock {}: {}", self.path.display(), err);
                    return false;
                }
            }
        }
        false
    }

    /// Remove the lock file, but only when it still records our own PID;
    /// a delayed cleanup must not delete a successor's lock. Best effort on
    /// the crash path.
    pub fn release(&self) {
        match self.recorded_pid() {
            Some(holder) if holder == self.pid => {
                if let Err(err) = fs::remove_file(&self.path) {
                    warn!("failed to remove lock {}: {}", self.path.display(), err);
                }
            }
            Some(holder) => {
                info!(
                    "lock {} now held by pid {}, leaving it in place",
                    self.path.display(),
                    holder
                );
            }
            None => {}
        }
    }

    fn recorded_pid(&self) -> Option<u32> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

fn pid_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_holder_is_alive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.pid");

        let first = PidLock::new(&path).with_pid(1111).with_probe(|_| true);
        let second = PidLock::new(&path).with_pid(2222).with_probe(|_| true);

        assert!(first.acquire());
        assert!(!second.acquire());
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "1111");
    }

    #[test]
    fn stale_lock_is_replaced_when_holder_is_dead() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.pid");

        let first = PidLock::new(&path).with_pid(1111).with_probe(|_| true);
        assert!(first.acquire());

        let second = PidLock::new(&path).with_pid(2222).with_probe(|_| false);
        assert!(second.acquire());
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "2222");
    }

    #[test]
    fn reacquire_by_same_pid_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.pid");

        let lock = PidLock::new(&path).with_pid(1111).with_probe(|_| true);
        assert!(lock.acquire());
        assert!(lock.acquire());
    }

    #[test]
    fn release_only_removes_own_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.pid");

        let first = PidLock::new(&path).with_pid(1111).with_probe(|_| false);
        assert!(first.acquire());

        let second = PidLock::new(&path).with_pid(2222).with_probe(|_| false);
        assert!(second.acquire());

        // delayed cleanup from the first process must not delete the
        // second's legitimately-acquired lock
        first.release();
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "2222");

        second.release();
        assert!(!path.exists());
    }

    #[test]
    fn unreadable_lock_is_treated_as_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.pid");
        fs::write(&path, "not a pid").unwrap();

        let lock = PidLock::new(&path).with_pid(1111).with_probe(|_| true);
        assert!(lock.acquire());
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "1111");
    }
}
