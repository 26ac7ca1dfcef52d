use crate::endpoint::{normalize_address, Credential};
use crate::error::{ConnectError, UserReport};
use crate::protocol::{ClientEvent, CloseDisposition, ControlClient, DisconnectInfo};
use crate::reconnect::{LoopCounters, ReconnectPolicy, ReconnectSession, ReconnectStats};
use crate::router::ConnectionNoticeGate;
use crate::settings::SettingsHandle;
use crate::ui::{UiSender, UiTask};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    TryingToReconnect,
}

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorSignal {
    Continue,
    /// The monitored application is closing and the user asked to exit with it.
    ExitRequested,
}

struct Inner {
    state: ConnectionState,
    session: Option<ReconnectSession>,
    listeners: Vec<Sender<ConnectionState>>,
}

/// Owns the connection state and the reconnection loop.
///
/// Every state change goes through one mutex, so "tear down the old loop,
/// start the new one, publish" happens atomically with respect to other
/// transitions.
pub struct ConnectionSupervisor {
    client: Arc<dyn ControlClient>,
    settings: SettingsHandle,
    policy: ReconnectPolicy,
    gate: ConnectionNoticeGate,
    reports: Sender<UserReport>,
    inner: Mutex<Inner>,
    intentional_close: AtomicBool,
    counters: Arc<LoopCounters>,
}

impl ConnectionSupervisor {
    /// Subscribes to the client's connection events, which are handled on the
    /// UI context through [`ConnectionSupervisor::handle_client_event`].
    pub fn new(
        client: Arc<dyn ControlClient>,
        settings: SettingsHandle,
        policy: ReconnectPolicy,
        gate: ConnectionNoticeGate,
        reports: Sender<UserReport>,
        ui: &UiSender,
    ) -> Self {
        let ui = ui.clone();
        client.subscribe(Box::new(move |event| {
            if event.is_connection_event() {
                ui.send(UiTask::Connection(event.clone()));
            }
        }));

        Self {
            client,
            settings,
            policy,
            gate,
            reports,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                session: None,
                listeners: Vec::new(),
            }),
            intentional_close: AtomicBool::new(false),
            counters: Arc::new(LoopCounters::default()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Receives every state change from now on, exactly once per change.
    pub fn subscribe_state(&self) -> Receiver<ConnectionState> {
        let (tx, rx) = unbounded();
        self.lock().listeners.push(tx);
        rx
    }

    pub fn reconnect_stats(&self) -> ReconnectStats {
        self.counters.stats()
    }

    /// Connects on the caller's thread. Failures are reported once and leave
    /// the state untouched; success is confirmed by the client's Connected
    /// event, not here.
    pub fn connect(&self, address: &str, credential: &Credential) -> Result<(), ConnectError> {
        self.gate.disarm();
        let result = normalize_address(address).and_then(|url| {
            info!(address = %url, "connecting");
            self.client
                .connect(url.as_str(), credential.expose())
                .map_err(ConnectError::from)
        });

        match result {
            Ok(()) => {
                self.settings.save_or_warn();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "connect failed");
                let _ = self.reports.send(UserReport::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Connects with the address and password from settings.
    pub fn connect_with_saved(&self) -> Result<(), ConnectError> {
        let (address, credential) = self.settings.endpoint();
        self.connect(&address, &credential)
    }

    /// Closes the connection on purpose. Idempotent.
    pub fn disconnect(&self) {
        self.settings.set_connection_intent(false);
        // Tear down any reconnect loop first so it cannot reopen the socket
        // behind our back.
        self.change_state(ConnectionState::Disconnected);
        if self.client.is_connected() {
            self.intentional_close.store(true, Ordering::SeqCst);
        }
        self.client.disconnect();
        self.settings.save_or_warn();
    }

    /// Resumes the previous session at startup if the user left it connected.
    /// The very first launch never reconnects; it only clears the first-run
    /// flag. Returns whether a reconnect was started.
    pub fn restore_connection(&self) -> bool {
        let first_run = self.settings.update(|s| std::mem::replace(&mut s.first_run, false));
        if first_run {
            info!("first run, not restoring a connection");
            self.settings.save_or_warn();
            return false;
        }
        if !self.settings.connection_intent() || self.client.is_connected() {
            return false;
        }
        info!("restoring previous connection");
        self.change_state(ConnectionState::TryingToReconnect)
    }

    /// Clears the connection intent, cancels the reconnection loop and blocks
    /// until it has exited. A connection the loop managed to open is closed.
    pub fn stop_reconnection(&self) {
        self.settings.set_connection_intent(false);
        let had_session = {
            let mut inner = self.lock();
            let had_session = match inner.session.take() {
                Some(session) => {
                    session.stop();
                    true
                }
                None => false,
            };
            if inner.state == ConnectionState::TryingToReconnect {
                self.transition(&mut inner, ConnectionState::Disconnected);
            }
            had_session
        };
        if had_session {
            debug!("reconnection stopped");
            if self.client.is_connected() {
                self.intentional_close.store(true, Ordering::SeqCst);
                self.client.disconnect();
            }
        }
    }

    /// Stops everything before exit. The remembered intent survives so the
    /// next launch can restore the connection.
    pub fn shutdown(&self) {
        let intent = self.settings.connection_intent();
        self.stop_reconnection();
        if self.client.is_connected() {
            self.intentional_close.store(true, Ordering::SeqCst);
        }
        self.client.disconnect();
        self.change_state(ConnectionState::Disconnected);
        self.settings.set_connection_intent(intent);
        self.settings.save_or_warn();
    }

    pub fn handle_client_event(&self, event: &ClientEvent) -> SupervisorSignal {
        match event {
            ClientEvent::Connected => self.on_connected(),
            ClientEvent::Disconnected(info) => self.on_disconnected(info),
            ClientEvent::ExitStarted => return self.on_exit_started(),
            _ => {}
        }
        SupervisorSignal::Continue
    }

    fn on_connected(&self) {
        if !self.client.is_connected() {
            debug!("ignoring stale connected event");
            self.revive_reconnection();
            return;
        }
        info!("connected");
        self.intentional_close.store(false, Ordering::SeqCst);
        self.change_state(ConnectionState::Connected);
        self.settings.set_connection_intent(true);
        self.settings.save_or_warn();
    }

    fn on_disconnected(&self, info: &DisconnectInfo) {
        let intentional = self.intentional_close.swap(false, Ordering::SeqCst);
        let disposition = info.code.disposition();

        if disposition == CloseDisposition::Fatal {
            warn!(code = %info.code, reason = %info.reason, "server rejected the session");
            self.stop_reconnection();
            self.client.disconnect();
            self.change_state(ConnectionState::Disconnected);
            self.settings.save_or_warn();
            return;
        }

        if intentional {
            debug!(code = %info.code, "connection closed on request");
            self.change_state(ConnectionState::Disconnected);
            return;
        }

        match self.state() {
            ConnectionState::TryingToReconnect => {
                debug!(code = %info.code, "reconnect attempt closed");
                self.revive_reconnection();
            }
            ConnectionState::Connected if self.settings.connection_intent() => {
                info!(code = %info.code, ?disposition, "connection dropped, reconnecting");
                self.change_state(ConnectionState::TryingToReconnect);
            }
            _ => {
                info!(code = %info.code, "disconnected");
                self.change_state(ConnectionState::Disconnected);
            }
        }
    }

    fn on_exit_started(&self) -> SupervisorSignal {
        info!("monitored application is closing");
        if !self.settings.read(|s| s.close_on_exit) {
            return SupervisorSignal::Continue;
        }
        let intent = self.settings.connection_intent();
        self.stop_reconnection();
        self.settings.set_connection_intent(intent);
        SupervisorSignal::ExitRequested
    }

    /// Restarts the loop when it already returned (it saw a connection that
    /// dropped again before its Connected event was handled).
    fn revive_reconnection(&self) {
        let mut inner = self.lock();
        if inner.state != ConnectionState::TryingToReconnect || self.client.is_connected() {
            return;
        }
        if inner.session.as_ref().map_or(false, |s| !s.is_finished()) {
            return;
        }
        if let Some(session) = inner.session.take() {
            session.stop();
        }

        info!("reconnection loop ended without a connection, restarting it");
        self.gate.arm();
        match self.spawn_session() {
            Ok(session) => inner.session = Some(session),
            Err(e) => {
                error!(error = %e, "failed to restart reconnection thread");
                self.transition(&mut inner, ConnectionState::Disconnected);
            }
        }
    }

    fn spawn_session(&self) -> std::io::Result<ReconnectSession> {
        ReconnectSession::spawn(
            Arc::clone(&self.client),
            self.settings.clone(),
            self.policy,
            Arc::clone(&self.counters),
        )
    }

    fn change_state(&self, new_state: ConnectionState) -> bool {
        let mut inner = self.lock();
        self.transition(&mut inner, new_state)
    }

    /// The only place the connection state is written. Runs under the state
    /// lock; returns whether `new_state` was entered.
    fn transition(&self, inner: &mut Inner, new_state: ConnectionState) -> bool {
        let previous = inner.state;
        if previous == new_state {
            return false;
        }

        // Joined synchronously: the old loop is gone before a new one starts.
        if let Some(session) = inner.session.take() {
            session.stop();
        }

        inner.state = new_state;
        match new_state {
            // The reconnect episode is over even if the router never saw its
            // Connected notice (preview on, no renderer).
            ConnectionState::Connected => self.gate.disarm(),
            ConnectionState::TryingToReconnect => self.gate.arm(),
            ConnectionState::Disconnected => {}
        }
        if new_state == ConnectionState::TryingToReconnect {
            match self.spawn_session() {
                Ok(session) => inner.session = Some(session),
                Err(e) => {
                    error!(error = %e, "failed to start reconnection thread");
                    self.gate.disarm();
                    inner.state = ConnectionState::Disconnected;
                    if previous == ConnectionState::Disconnected {
                        return false;
                    }
                }
            }
        }

        let state = inner.state;
        info!(from = ?previous, to = ?state, "connection state changed");
        inner.listeners.retain(|tx| tx.send(state).is_ok());
        state == new_state
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        if let Some(session) = self.lock().session.take() {
            session.stop();
        }
    }
}
