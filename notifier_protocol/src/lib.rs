use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codes at or above this value belong to the application protocol; everything
/// below is a generic transport close status.
pub const APPLICATION_CODE_THRESHOLD: u16 = 4000;

pub mod generic_codes {
    pub const NORMAL_CLOSURE: u16 = 1000;
    pub const ENDPOINT_UNAVAILABLE: u16 = 1001;
    pub const PROTOCOL_ERROR: u16 = 1002;
    pub const INVALID_MESSAGE_TYPE: u16 = 1003;
    pub const EMPTY: u16 = 1005;
    pub const INVALID_PAYLOAD_DATA: u16 = 1007;
    pub const POLICY_VIOLATION: u16 = 1008;
    pub const MESSAGE_TOO_BIG: u16 = 1009;
    pub const MANDATORY_EXTENSION: u16 = 1010;
    pub const INTERNAL_SERVER_ERROR: u16 = 1011;
}

pub mod application_codes {
    pub const UNKNOWN_REASON: u16 = 4000;
    pub const MESSAGE_DECODE_ERROR: u16 = 4002;
    pub const MISSING_DATA_FIELD: u16 = 4003;
    pub const INVALID_DATA_FIELD_TYPE: u16 = 4004;
    pub const INVALID_DATA_FIELD_VALUE: u16 = 4005;
    pub const UNKNOWN_OP_CODE: u16 = 4006;
    pub const NOT_IDENTIFIED: u16 = 4007;
    pub const ALREADY_IDENTIFIED: u16 = 4008;
    pub const AUTHENTICATION_FAILED: u16 = 4009;
    pub const UNSUPPORTED_RPC_VERSION: u16 = 4010;
    pub const SESSION_INVALIDATED: u16 = 4011;
    pub const UNSUPPORTED_FEATURE: u16 = 4012;
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "space", content = "code")]
pub enum CloseCode {
    Generic(u16),
    Application(u16),
}

/// How an unexpected close should be treated by whoever owns the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDisposition {
    /// Transport-level drop: the peer went away or the socket broke.
    Transient,
    /// Application-level session end that a fresh connect may recover from.
    Session,
    /// Never retried.
    Fatal,
}

impl CloseCode {
    pub fn from_raw(code: u16) -> Self {
        if code >= APPLICATION_CODE_THRESHOLD {
            CloseCode::Application(code)
        } else {
            CloseCode::Generic(code)
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            CloseCode::Generic(c) | CloseCode::Application(c) => c,
        }
    }

    pub fn is_application(self) -> bool {
        matches!(self, CloseCode::Application(_))
    }

    pub fn disposition(self) -> CloseDisposition {
        match self {
            CloseCode::Generic(_) => CloseDisposition::Transient,
            CloseCode::Application(application_codes::AUTHENTICATION_FAILED) => {
                CloseDisposition::Fatal
            }
            CloseCode::Application(_) => CloseDisposition::Session,
        }
    }

    pub fn name(self) -> &'static str {
        use application_codes as app;
        use generic_codes as net;
        match self {
            CloseCode::Generic(net::NORMAL_CLOSURE) => "NormalClosure",
            CloseCode::Generic(net::ENDPOINT_UNAVAILABLE) => "EndpointUnavailable",
            CloseCode::Generic(net::PROTOCOL_ERROR) => "ProtocolError",
            CloseCode::Generic(net::INVALID_MESSAGE_TYPE) => "InvalidMessageType",
            CloseCode::Generic(net::EMPTY) => "Empty",
            CloseCode::Generic(net::INVALID_PAYLOAD_DATA) => "InvalidPayloadData",
            CloseCode::Generic(net::POLICY_VIOLATION) => "PolicyViolation",
            CloseCode::Generic(net::MESSAGE_TOO_BIG) => "MessageTooBig",
            CloseCode::Generic(net::MANDATORY_EXTENSION) => "MandatoryExtension",
            CloseCode::Generic(net::INTERNAL_SERVER_ERROR) => "InternalServerError",
            CloseCode::Generic(_) => "UnknownGeneric",
            CloseCode::Application(app::UNKNOWN_REASON) => "UnknownReason",
            CloseCode::Application(app::MESSAGE_DECODE_ERROR) => "MessageDecodeError",
            CloseCode::Application(app::MISSING_DATA_FIELD) => "MissingDataField",
            CloseCode::Application(app::INVALID_DATA_FIELD_TYPE) => "InvalidDataFieldType",
            CloseCode::Application(app::INVALID_DATA_FIELD_VALUE) => "InvalidDataFieldValue",
            CloseCode::Application(app::UNKNOWN_OP_CODE) => "UnknownOpCode",
            CloseCode::Application(app::NOT_IDENTIFIED) => "NotIdentified",
            CloseCode::Application(app::ALREADY_IDENTIFIED) => "AlreadyIdentified",
            CloseCode::Application(app::AUTHENTICATION_FAILED) => "AuthenticationFailed",
            CloseCode::Application(app::UNSUPPORTED_RPC_VERSION) => "UnsupportedRpcVersion",
            CloseCode::Application(app::SESSION_INVALIDATED) => "SessionInvalidated",
            CloseCode::Application(app::UNSUPPORTED_FEATURE) => "UnsupportedFeature",
            CloseCode::Application(_) => "UnknownApplication",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.raw())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DisconnectInfo {
    pub code: CloseCode,
    #[serde(default)]
    pub reason: String,
}

impl DisconnectInfo {
    pub fn new(code: u16) -> Self {
        Self {
            code: CloseCode::from_raw(code),
            reason: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputState {
    Starting,
    Started,
    Stopping,
    Stopped,
    Saved,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ClientEvent {
    Connected,
    Disconnected(DisconnectInfo),
    RecordingStateChanged { state: OutputState },
    RecordingPaused,
    RecordingResumed,
    StreamingStateChanged { state: OutputState },
    ReplayBufferStateChanged { state: OutputState },
    VirtualCameraStarted,
    VirtualCameraStopped,
    SceneChanged { scene_name: String },
    SceneCollectionChanged,
    ProfileChanged,
    SourceMuteStateChanged { source_name: String, muted: bool },
    /// The monitored application is shutting down.
    ExitStarted,
}

impl ClientEvent {
    pub fn is_connection_event(&self) -> bool {
        matches!(
            self,
            ClientEvent::Connected | ClientEvent::Disconnected(_) | ClientEvent::ExitStarted
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("connection refused: {0}")]
    Refused(String),
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("timed out waiting for the server")]
    Timeout,
    #[error("not connected")]
    NotConnected,
    #[error("{0}")]
    Other(String),
}

/// Called on a client-owned thread. Implementations must not block.
pub type EventListener = Box<dyn Fn(&ClientEvent) + Send + Sync>;

/// The control connection to the monitored application.
///
/// Implementations own their socket and callback threads; every listener
/// registered through [`ControlClient::subscribe`] receives every event, in
/// registration order.
pub trait ControlClient: Send + Sync {
    fn connect(&self, address: &str, credential: &str) -> Result<(), ClientError>;
    fn disconnect(&self);
    fn is_connected(&self) -> bool;

    fn current_scene_collection(&self) -> Result<String, ClientError>;
    fn current_profile(&self) -> Result<String, ClientError>;

    fn subscribe(&self, listener: EventListener);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_codes_split_at_threshold() {
        assert_eq!(
            CloseCode::from_raw(generic_codes::ENDPOINT_UNAVAILABLE),
            CloseCode::Generic(1001)
        );
        assert!(CloseCode::from_raw(APPLICATION_CODE_THRESHOLD).is_application());
        assert!(!CloseCode::from_raw(APPLICATION_CODE_THRESHOLD - 1).is_application());
    }

    #[test]
    fn only_authentication_failure_is_fatal() {
        assert_eq!(
            CloseCode::from_raw(application_codes::AUTHENTICATION_FAILED).disposition(),
            CloseDisposition::Fatal
        );
        for code in [
            application_codes::ALREADY_IDENTIFIED,
            application_codes::UNSUPPORTED_FEATURE,
            application_codes::UNKNOWN_OP_CODE,
            4999,
        ] {
            assert_eq!(CloseCode::from_raw(code).disposition(), CloseDisposition::Session);
        }
        for code in [
            generic_codes::NORMAL_CLOSURE,
            generic_codes::ENDPOINT_UNAVAILABLE,
            generic_codes::INTERNAL_SERVER_ERROR,
        ] {
            assert_eq!(CloseCode::from_raw(code).disposition(), CloseDisposition::Transient);
        }
    }

    #[test]
    fn close_code_display_names_the_code() {
        let code = CloseCode::from_raw(application_codes::AUTHENTICATION_FAILED);
        assert_eq!(code.to_string(), "AuthenticationFailed (4009)");
        assert_eq!(CloseCode::from_raw(1234).name(), "UnknownGeneric");
    }
}
