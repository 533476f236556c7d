//! External-change detection for the backing save file.
//!
//! A background thread polls the file's (mtime, length) signature and sends
//! a unit event whenever it changes. Consumers drain the channel in batches,
//! so any burst of external writes collapses into a single observation.
//! Suppressing self-triggered events is structural: the save path stops the
//! watcher before writing and builds a fresh one afterwards, which baselines
//! on the just-written state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use log::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Signature {
    mtime: Option<SystemTime>,
    len: u64,
    exists: bool,
}

fn signature(path: &Path) -> Signature {
    match fs::metadata(path) {
        Ok(meta) => Signature {
            mtime: meta.modified().ok(),
            len: meta.len(),
            exists: true,
        },
        Err(_) => Signature {
            mtime: None,
            len: 0,
            exists: false,
        },
    }
}

#[derive(Debug)]
pub struct FileWatcher {
    path: PathBuf,
    rx: Receiver<()>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FileWatcher {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    pub fn watch(path: &Path, interval: Duration) -> io::Result<Self> {
        let path = path.to_path_buf();
        let (tx, rx) = channel();
        let stop = Arc::new(AtomicBool::new(false));

        let thread_path = path.clone();
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("save-watch".into())
            .spawn(move || watch_loop(&thread_path, interval, &tx, &thread_stop))?;

        debug!("watching {}", path.display());
        Ok(Self {
            path,
            rx,
            stop,
            handle: Some(handle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drains every pending change event; true if at least one arrived.
    /// Rapid consecutive writes therefore coalesce into one observation.
    pub fn drain(&self) -> bool {
        let mut any = false;
        loop {
            match self.rx.try_recv() {
                Ok(()) => any = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        any
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("stopped watching {}", self.path.display());
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn watch_loop(path: &Path, interval: Duration, tx: &Sender<()>, stop: &AtomicBool) {
    let mut last = signature(path);
    while !stop.load(Ordering::Relaxed) {
        thread::sleep(interval);
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let current = signature(path);
        if !current.exists {
            // Some writers replace files by delete-then-create; keep the
            // pre-delete signature until the new file shows up.
            continue;
        }
        if current != last {
            trace!("{} changed on disk", path.display());
            last = current;
            if tx.send(()).is_err() {
                break;
            }
        }
    }
}
