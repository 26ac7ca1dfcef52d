use crate::error::{RegistryError, UserReport};
use crate::protocol::ControlClient;
use crate::reconnect::ReconnectPolicy;
use crate::registry::{PluginRegistry, DEFAULT_PLUGIN_ID};
use crate::router::{ConnectionNoticeGate, EventRouter};
use crate::settings::SettingsHandle;
use crate::supervisor::{ConnectionSupervisor, SupervisorSignal};
use crate::ui::{ui_channel, UiTask};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// The UI context: owns the renderers and runs every routed event and
/// connection transition on one thread.
pub struct MainLoop {
    ui_rx: Receiver<UiTask>,
    reports_rx: Receiver<UserReport>,
    plugins: PluginRegistry,
    router: EventRouter,
    supervisor: Arc<ConnectionSupervisor>,
    settings: SettingsHandle,
    exit_requested: bool,
}

impl MainLoop {
    pub fn new(
        client: Arc<dyn ControlClient>,
        settings: SettingsHandle,
        plugins: PluginRegistry,
        policy: ReconnectPolicy,
    ) -> Self {
        let (ui_tx, ui_rx) = ui_channel();
        let (reports_tx, reports_rx) = unbounded();
        let gate = ConnectionNoticeGate::default();

        // Subscription order is delivery order: the router sees an event
        // before the supervisor acts on it.
        let router = EventRouter::new(Arc::clone(&client), settings.clone(), gate.clone(), &ui_tx);
        let supervisor = Arc::new(ConnectionSupervisor::new(
            client,
            settings.clone(),
            policy,
            gate,
            reports_tx,
            &ui_tx,
        ));

        let mut main_loop = Self {
            ui_rx,
            reports_rx,
            plugins,
            router,
            supervisor,
            settings,
            exit_requested: false,
        };

        let cleared = main_loop
            .settings
            .update(|s| s.clear_unused_plugin_settings(main_loop.plugins.ids()));
        if cleared {
            main_loop.settings.save_or_warn();
        }

        let style = main_loop.settings.read(|s| s.notification_style.clone());
        if let Err(e) = main_loop.select_plugin(&style) {
            warn!(error = %e, "saved notification style is not available");
        }
        main_loop
    }

    /// Makes `id` the current renderer. An unknown id falls back to the
    /// default renderer, which is persisted, and the lookup error is returned.
    pub fn select_plugin(&mut self, id: &str) -> Result<(), RegistryError> {
        let plugin_settings = self.settings.plugin_settings(id);
        match self.plugins.select_current(id, &plugin_settings) {
            Ok(()) => {
                self.persist_style(id);
                Ok(())
            }
            Err(e) => {
                let fallback = self.settings.plugin_settings(DEFAULT_PLUGIN_ID);
                match self.plugins.select_current(DEFAULT_PLUGIN_ID, &fallback) {
                    Ok(()) => self.persist_style(DEFAULT_PLUGIN_ID),
                    Err(fallback_err) => error!(error = %fallback_err, "no renderer available"),
                }
                Err(e)
            }
        }
    }

    pub fn restore_connection(&self) -> bool {
        self.supervisor.restore_connection()
    }

    /// Handles every queued task without blocking. Returns how many ran.
    pub fn tick(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.ui_rx.try_recv() {
                Ok(task) => {
                    self.handle(task);
                    handled += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        handled
    }

    /// Waits up to `timeout` for a task, then drains the queue.
    pub fn pump(&mut self, timeout: Duration) -> usize {
        match self.ui_rx.recv_timeout(timeout) {
            Ok(task) => {
                self.handle(task);
                1 + self.tick()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor> {
        &self.supervisor
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    /// User-facing errors raised since the last call.
    pub fn take_reports(&self) -> Vec<UserReport> {
        self.reports_rx.try_iter().collect()
    }

    /// Set once the monitored application closed and close-on-exit is on.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn shutdown(mut self) {
        info!("shutting down");
        self.supervisor.shutdown();
        self.plugins.dispose_all();
        self.settings.save_or_warn();
    }

    fn handle(&mut self, task: UiTask) {
        match task {
            UiTask::Notify(event) => {
                let state = self.supervisor.state();
                self.router.route(&event, state, &mut self.plugins);
            }
            UiTask::Connection(event) => {
                if self.supervisor.handle_client_event(&event) == SupervisorSignal::ExitRequested {
                    self.exit_requested = true;
                }
            }
        }
    }

    fn persist_style(&self, id: &str) {
        let changed = self.settings.update(|s| {
            let changed = s.notification_style != id;
            s.notification_style = id.to_string();
            changed
        });
        if changed {
            self.settings.save_or_warn();
        }
    }
}
