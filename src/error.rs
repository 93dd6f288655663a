//! Unified error handling for amcpd.
//!
//! Handler failures are surfaced as [`AmcpError`] and mapped onto the
//! numeric AMCP reply codes inside the command queue. Parsing-stage
//! failures never reach a queue; the protocol strategy resolves them
//! with its own error kind (see `protocol`).

use thiserror::Error;

/// Errors that can occur while a command handler executes.
#[derive(Debug, Error)]
pub enum AmcpError {
    /// A referenced file, template or resource does not exist (404).
    #[error("not found: {0}")]
    FileNotFound(String),

    /// Malformed input the user can fix; already diagnosed, so the
    /// queue does not log it at error level (403).
    #[error("{0}")]
    ExpectedUserError(String),

    /// Malformed input the user can fix (403).
    #[error("invalid syntax: {0}")]
    UserError(String),

    /// Fewer parameters than the command needs (402).
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// A parameter failed to parse (403).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O failure during command execution (501).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected failure (501).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AmcpError {
    /// The numeric AMCP reply code for this failure.
    pub fn code(&self) -> u16 {
        match self {
            Self::FileNotFound(_) => 404,
            Self::ExpectedUserError(_) | Self::UserError(_) | Self::InvalidParameter(_) => 403,
            Self::MissingParameter(_) => 402,
            Self::Io(_) | Self::Internal(_) => 501,
        }
    }

    /// Whether the failure was already diagnosed by the handler and only
    /// needs the client reply, not an error-level log line.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::ExpectedUserError(_))
    }

    /// The client-visible reply body: the code plus the command's own
    /// name, never internal detail.
    pub fn reply_body(&self, command_name: &str) -> String {
        format!("{} {} FAILED\r\n", self.code(), command_name)
    }
}

/// Result type for command handlers.
pub type CommandResult = Result<String, AmcpError>;
