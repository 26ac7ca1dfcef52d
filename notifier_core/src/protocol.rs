pub use notifier_protocol::{
    application_codes, generic_codes, ClientError, ClientEvent, CloseCode, CloseDisposition,
    ControlClient, DisconnectInfo, EventListener, OutputState, APPLICATION_CODE_THRESHOLD,
};
