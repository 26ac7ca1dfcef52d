use crate::protocol::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid server address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a plugin with id '{0}' is already registered")]
    DuplicatePlugin(String),
    #[error("no plugin with id '{0}'")]
    UnknownPlugin(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Something the user should be told about, e.g. in a message box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserReport {
    pub title: String,
    pub message: String,
}

impl UserReport {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: "OBS Notifier Error".to_string(),
            message: message.into(),
        }
    }
}
