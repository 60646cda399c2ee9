//! Turns an outside signal into batch cancellation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pf_batch::CancelFlag;
use tracing::{info, warn};

use crate::error::AppResult;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cancels a batch once a file appears at a given path.
///
/// The watching thread stops when the watcher is dropped.
pub struct StopFileWatcher {
    done: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StopFileWatcher {
    pub fn spawn(path: impl Into<PathBuf>, cancel: CancelFlag) -> AppResult<Self> {
        let path = path.into();
        let done = Arc::new(AtomicBool::new(false));
        let thread = {
            let done = Arc::clone(&done);
            thread::Builder::new()
                .name("pf-stop-file".into())
                .spawn(move || watch(&path, &cancel, &done))?
        };
        Ok(Self {
            done,
            thread: Some(thread),
        })
    }
}

fn watch(path: &Path, cancel: &CancelFlag, done: &AtomicBool) {
    while !done.load(Ordering::SeqCst) {
        if path.exists() {
            info!(path = %path.display(), "stop file found, cancelling batch");
            cancel.cancel();
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl Drop for StopFileWatcher {
    fn drop(&mut self) {
        self.done.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("stop-file watcher panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn stop_file_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("STOP");
        let cancel = CancelFlag::new();
        let _watcher = StopFileWatcher::spawn(&path, cancel.clone()).unwrap();

        thread::sleep(POLL_INTERVAL * 2);
        assert!(!cancel.is_cancelled());

        std::fs::write(&path, b"").unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cancel.is_cancelled() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn dropping_the_watcher_leaves_flag_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("STOP");
        let cancel = CancelFlag::new();
        drop(StopFileWatcher::spawn(&path, cancel.clone()).unwrap());

        std::fs::write(&path, b"").unwrap();
        thread::sleep(POLL_INTERVAL * 2);
        assert!(!cancel.is_cancelled());
    }
}
