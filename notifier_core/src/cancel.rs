use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Owning side of a cooperative cancellation signal.
pub struct CancelSource {
    flag: Arc<AtomicBool>,
    wake_tx: Option<Sender<()>>,
    wake_rx: Receiver<()>,
}

/// Observing side; cheap to clone into worker threads.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    wake_rx: Receiver<()>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(0);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            wake_tx: Some(wake_tx),
            wake_rx,
        }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            flag: Arc::clone(&self.flag),
            wake_rx: self.wake_rx.clone(),
        }
    }

    /// Sets the flag and wakes every sleeping token. Idempotent.
    pub fn cancel(&mut self) {
        self.flag.store(true, Ordering::SeqCst);
        // Dropping the only sender disconnects the channel, which wakes all
        // pending `recv_timeout` calls at once.
        self.wake_tx.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleeps for up to `duration`. Returns `true` if cancellation was
    /// requested before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        match self.wake_rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => self.is_cancelled(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}
