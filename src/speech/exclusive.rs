//! Blocking playback that never overlaps
//!
//! Audio output runs on blocking threads. Dropping the async side (for
//! example when the speech worker times an item out) raises a cancel flag,
//! and the next playback waits until the previous one has actually let go
//! of the device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{Error, Result};

/// Serializes blocking playback jobs
#[derive(Debug, Clone, Default)]
pub struct ExclusivePlayer {
    slot: Arc<Mutex<()>>,
}

/// Raises the cancel flag when the awaiting future goes away
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

impl ExclusivePlayer {
    /// Create a player with a free slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` on a blocking thread once no other job is playing
    ///
    /// `job` must return promptly after its flag is set; the flag is raised
    /// when the returned future is dropped before completion.
    ///
    /// # Errors
    ///
    /// Returns the job's error, or `Error::Synthesis` if the task panicked
    pub async fn play<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&AtomicBool) -> Result<()> + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let _guard = CancelOnDrop(Arc::clone(&cancel));
        let slot = Arc::clone(&self.slot);

        tokio::task::spawn_blocking(move || {
            let _held = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if cancel.load(Ordering::Acquire) {
                return Ok(());
            }
            job(&cancel)
        })
        .await
        .map_err(|e| Error::Synthesis(format!("playback task failed: {e}")))?
    }
}
