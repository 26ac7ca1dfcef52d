pub mod cancel;
pub mod catalog;
pub mod default_renderer;
pub mod endpoint;
pub mod error;
pub mod main_loop;
pub mod plugin;
pub mod protocol;
mod reconnect;
pub mod registry;
pub mod router;
pub mod settings;
pub mod status;
pub mod supervisor;
pub mod ui;

pub use crate::catalog::{EventKind, KindMask};
pub use crate::default_renderer::DefaultRenderer;
pub use crate::endpoint::{normalize_address, Credential, DEFAULT_ADDRESS};
pub use crate::error::{ConnectError, RegistryError, SettingsError, UserReport};
pub use crate::main_loop::MainLoop;
pub use crate::plugin::{Notification, RendererPlugin};
pub use crate::protocol::{
    ClientError, ClientEvent, CloseCode, CloseDisposition, ControlClient, DisconnectInfo,
    EventListener, OutputState,
};
pub use crate::reconnect::{
    ReconnectPolicy, ReconnectStats, DEFAULT_POLLS_PER_ATTEMPT, DEFAULT_POLL_INTERVAL,
};
pub use crate::registry::{PluginRegistry, DEFAULT_PLUGIN_ID};
pub use crate::router::{classify, ConnectionNoticeGate, EventRouter, RouteOutcome};
pub use crate::settings::{PluginSettings, Settings, SettingsHandle};
pub use crate::status::TrayStatus;
pub use crate::supervisor::{ConnectionState, ConnectionSupervisor, SupervisorSignal};
