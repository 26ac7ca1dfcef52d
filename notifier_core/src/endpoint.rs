use crate::error::ConnectError;
use url::Url;
use zeroize::Zeroizing;

pub const DEFAULT_ADDRESS: &str = "ws://localhost:4455";

/// Turns whatever the user typed into a websocket URL.
pub fn normalize_address(raw: &str) -> Result<Url, ConnectError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.is_empty() {
        DEFAULT_ADDRESS.to_string()
    } else if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        trimmed.to_string()
    } else {
        format!("ws://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|source| ConnectError::InvalidAddress {
        address: raw.to_string(),
        reason: source.to_string(),
    })?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConnectError::InvalidAddress {
            address: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

/// Decrypted password, wiped from memory when dropped.
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Credential {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}
