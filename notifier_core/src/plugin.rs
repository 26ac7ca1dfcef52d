use crate::catalog::{EventKind, KindMask};
use crate::settings::PluginSettings;
use serde::Serialize;
use serde_json::Value;

/// A formatted notification, ready for presentation.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: EventKind,
    pub title: String,
    pub description: Option<String>,
    /// The raw arguments the description was formatted from.
    pub args: Vec<Value>,
}

/// A swappable notification presenter.
///
/// Renderers are driven from the UI context only and need not be thread-safe.
pub trait RendererPlugin {
    /// Stable identifier, persisted as the selected notification style.
    fn id(&self) -> &str;

    fn default_active_kinds(&self) -> KindMask;

    fn render(&mut self, notification: &Notification);

    /// Called when the plugin becomes the current one.
    fn activate(&mut self, _settings: &PluginSettings) {}

    fn deactivate(&mut self) {}

    /// Releases everything the plugin holds. Called once, at shutdown.
    fn dispose(&mut self) {}
}
