use crate::supervisor::ConnectionState;
use serde::Serialize;

/// What a tray icon should show for a connection state.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TrayStatus {
    pub icon: &'static str,
    pub tooltip: String,
}

impl TrayStatus {
    pub fn for_state(state: ConnectionState) -> Self {
        let (icon, text) = match state {
            ConnectionState::Connected => ("obs_connected", "Connected"),
            ConnectionState::Disconnected => ("obs_disconnected", "Not connected"),
            ConnectionState::TryingToReconnect => ("obs_reconnecting", "Trying to reconnect"),
        };
        Self {
            icon,
            tooltip: format!("OBS Notifier:\n{text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooltip_names_the_state() {
        assert_eq!(
            TrayStatus::for_state(ConnectionState::TryingToReconnect).tooltip,
            "OBS Notifier:\nTrying to reconnect"
        );
        assert_ne!(
            TrayStatus::for_state(ConnectionState::Connected).icon,
            TrayStatus::for_state(ConnectionState::Disconnected).icon
        );
    }
}
