use crate::cancel::{CancelSource, CancelToken};
use crate::endpoint::normalize_address;
use crate::protocol::ControlClient;
use crate::settings::SettingsHandle;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_POLLS_PER_ATTEMPT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// How often `is_connected` is checked after a connect attempt.
    pub poll_interval: Duration,
    /// Polls before the next connect attempt.
    pub polls_per_attempt: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            polls_per_attempt: DEFAULT_POLLS_PER_ATTEMPT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconnectStats {
    /// Sessions started since the supervisor was created.
    pub started: u64,
    /// Loops currently running.
    pub live: usize,
    /// Highest number of loops ever observed running at once.
    pub peak: usize,
}

#[derive(Default)]
pub(crate) struct LoopCounters {
    started: AtomicU64,
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl LoopCounters {
    pub(crate) fn stats(&self) -> ReconnectStats {
        ReconnectStats {
            started: self.started.load(Ordering::SeqCst),
            live: self.live.load(Ordering::SeqCst),
            peak: self.peak.load(Ordering::SeqCst),
        }
    }
}

struct LiveLoop(Arc<LoopCounters>);

impl LiveLoop {
    fn enter(counters: Arc<LoopCounters>) -> Self {
        let now = counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for LiveLoop {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A running reconnection loop: its cancellation source and thread.
pub(crate) struct ReconnectSession {
    cancel: CancelSource,
    join_handle: Option<JoinHandle<()>>,
}

impl ReconnectSession {
    pub(crate) fn spawn(
        client: Arc<dyn ControlClient>,
        settings: SettingsHandle,
        policy: ReconnectPolicy,
        counters: Arc<LoopCounters>,
    ) -> std::io::Result<Self> {
        let cancel = CancelSource::new();
        let token = cancel.token();
        counters.started.fetch_add(1, Ordering::SeqCst);
        let live = LiveLoop::enter(counters);

        let join_handle = thread::Builder::new()
            .name("obs-reconnect".to_string())
            .spawn(move || {
                let _live = live;
                run_reconnect_loop(client.as_ref(), &settings, policy, &token);
            })?;

        Ok(Self {
            cancel,
            join_handle: Some(join_handle),
        })
    }

    /// Whether the loop has returned on its own.
    pub(crate) fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Cancels the loop and blocks until its thread has exited.
    pub(crate) fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                warn!("reconnection thread panicked");
            }
        }
    }
}

impl Drop for ReconnectSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Retries until connected or cancelled. Connect failures are silent; the
/// client's own Connected event moves the supervisor out of reconnecting.
pub(crate) fn run_reconnect_loop(
    client: &dyn ControlClient,
    settings: &SettingsHandle,
    policy: ReconnectPolicy,
    token: &CancelToken,
) {
    let mut attempt: u64 = 0;
    loop {
        if token.is_cancelled() {
            return;
        }

        attempt += 1;
        let (address, credential) = settings.endpoint();
        match normalize_address(&address) {
            Ok(url) => match client.connect(url.as_str(), credential.expose()) {
                Ok(()) => debug!(attempt, "reconnect attempt accepted"),
                Err(e) => debug!(attempt, error = %e, "reconnect attempt failed"),
            },
            Err(e) => debug!(attempt, error = %e, "reconnect attempt skipped"),
        }

        if token.is_cancelled() {
            return;
        }

        for _ in 0..policy.polls_per_attempt {
            if token.is_cancelled() {
                return;
            }
            if token.sleep(policy.poll_interval) {
                return;
            }
            if client.is_connected() {
                info!(attempt, "reconnected");
                return;
            }
        }
    }
}
