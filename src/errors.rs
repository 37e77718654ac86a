use thiserror::Error;

/// Errors surfaced by the automation service.
///
/// Request-level failures (`ElementNotFound`, `ActionUnavailable`,
/// `DeviceUnavailable`, `UnknownCommand`) are reported to the client as
/// structured error responses and never terminate the process. The wire
/// messages for those variants are fixed; controllers match on them.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found")]
    ElementNotFound(String),

    #[error("Click action unavailable")]
    ActionUnavailable(String),

    #[error("Input device unavailable")]
    DeviceUnavailable,

    #[error("Unknown command")]
    UnknownCommand(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
