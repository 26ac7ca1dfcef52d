use crate::catalog::{format_description, EventKind, KindMask};
use crate::plugin::Notification;
use crate::protocol::{ClientEvent, ControlClient, OutputState};
use crate::registry::PluginRegistry;
use crate::settings::SettingsHandle;
use crate::supervisor::ConnectionState;
use crate::ui::{UiSender, UiTask};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// One-shot suppression of Connected/Disconnected notices while a reconnect
/// episode is in progress. Shared between the supervisor (arms it) and the
/// router (consumes it).
#[derive(Clone, Default)]
pub struct ConnectionNoticeGate(Arc<AtomicBool>);

impl ConnectionNoticeGate {
    pub fn arm(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Delivered(EventKind),
    /// Preview mode is on or no renderer is selected.
    Suppressed,
    ConnectionNoticeSkipped(EventKind),
    /// Not in the current renderer's enablement mask.
    Filtered(EventKind),
    /// The event has no notification kind.
    Unclassified,
}

/// Maps a client event to the notification kind it produces, if any.
pub fn classify(event: &ClientEvent) -> Option<EventKind> {
    let kind = match event {
        ClientEvent::Connected => EventKind::Connected,
        ClientEvent::Disconnected(_) => EventKind::Disconnected,
        ClientEvent::RecordingStateChanged { state } => match state {
            OutputState::Started => EventKind::RecordingStarted,
            OutputState::Stopped => EventKind::RecordingStopped,
            _ => return None,
        },
        ClientEvent::RecordingPaused => EventKind::RecordingPaused,
        ClientEvent::RecordingResumed => EventKind::RecordingResumed,
        ClientEvent::StreamingStateChanged { state } => match state {
            OutputState::Started => EventKind::StreamingStarted,
            OutputState::Stopped => EventKind::StreamingStopped,
            _ => return None,
        },
        ClientEvent::ReplayBufferStateChanged { state } => match state {
            OutputState::Started => EventKind::ReplayStarted,
            OutputState::Stopped => EventKind::ReplayStopped,
            OutputState::Saved => EventKind::ReplaySaved,
            _ => return None,
        },
        ClientEvent::VirtualCameraStarted => EventKind::VirtualCameraStarted,
        ClientEvent::VirtualCameraStopped => EventKind::VirtualCameraStopped,
        ClientEvent::SceneChanged { .. } => EventKind::SceneSwitched,
        ClientEvent::SceneCollectionChanged => EventKind::SceneCollectionSwitched,
        ClientEvent::ProfileChanged => EventKind::ProfileSwitched,
        ClientEvent::SourceMuteStateChanged { muted: true, .. } => EventKind::AudioSourceMuted,
        ClientEvent::SourceMuteStateChanged { muted: false, .. } => EventKind::AudioSourceUnmuted,
        ClientEvent::ExitStarted => return None,
    };
    Some(kind)
}

/// Turns client events into notifications for the current renderer.
pub struct EventRouter {
    client: Arc<dyn ControlClient>,
    settings: SettingsHandle,
    gate: ConnectionNoticeGate,
}

impl EventRouter {
    /// Subscribes to every client event. Events are queued onto the UI
    /// context; nothing is rendered on the client's thread.
    pub fn new(
        client: Arc<dyn ControlClient>,
        settings: SettingsHandle,
        gate: ConnectionNoticeGate,
        ui: &UiSender,
    ) -> Self {
        let ui = ui.clone();
        client.subscribe(Box::new(move |event| {
            ui.send(UiTask::Notify(event.clone()));
        }));
        Self {
            client,
            settings,
            gate,
        }
    }

    /// Classifies, filters, formats and delivers one event. `state` is the
    /// supervisor's state at the time the event is handled.
    pub fn route(
        &self,
        event: &ClientEvent,
        state: ConnectionState,
        plugins: &mut PluginRegistry,
    ) -> RouteOutcome {
        let outcome = self.route_inner(event, state, plugins);
        debug!(?outcome, "routed client event");
        outcome
    }

    fn route_inner(
        &self,
        event: &ClientEvent,
        state: ConnectionState,
        plugins: &mut PluginRegistry,
    ) -> RouteOutcome {
        if self.settings.is_preview_showing() {
            return RouteOutcome::Suppressed;
        }
        let Some(plugin) = plugins.current_mut() else {
            return RouteOutcome::Suppressed;
        };
        let Some(kind) = classify(event) else {
            return RouteOutcome::Unclassified;
        };

        if kind.is_connection_notice() && self.gate.is_armed() {
            let episode_over = match kind {
                EventKind::Connected => true,
                _ => state != ConnectionState::TryingToReconnect,
            };
            if episode_over {
                self.gate.disarm();
            }
            return RouteOutcome::ConnectionNoticeSkipped(kind);
        }

        let active = self.active_kinds(plugin.id(), plugin.default_active_kinds());
        if !active.contains(kind) {
            return RouteOutcome::Filtered(kind);
        }

        let entry = kind.entry();
        let args = self.arguments(event);
        let description = entry
            .template
            .and_then(|template| format_description(template, &args));
        plugin.render(&Notification {
            kind,
            title: entry.name.to_string(),
            description,
            args,
        });
        RouteOutcome::Delivered(kind)
    }

    fn active_kinds(&self, plugin_id: &str, default: KindMask) -> KindMask {
        self.settings
            .active_kinds_override(plugin_id)
            .unwrap_or(default)
    }

    fn arguments(&self, event: &ClientEvent) -> Vec<Value> {
        match event {
            ClientEvent::SceneChanged { scene_name } => vec![Value::from(scene_name.as_str())],
            ClientEvent::SourceMuteStateChanged { source_name, .. } => {
                vec![Value::from(source_name.as_str())]
            }
            ClientEvent::SceneCollectionChanged => {
                self.query("scene collection", || self.client.current_scene_collection())
            }
            ClientEvent::ProfileChanged => self.query("profile", || self.client.current_profile()),
            _ => Vec::new(),
        }
    }

    fn query(
        &self,
        what: &str,
        fetch: impl FnOnce() -> Result<String, crate::protocol::ClientError>,
    ) -> Vec<Value> {
        match fetch() {
            Ok(name) => vec![Value::from(name)],
            Err(e) => {
                warn!(error = %e, "failed to query current {what}");
                Vec::new()
            }
        }
    }
}
