use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of a collaborator boundary failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollaboratorKind {
    Io,
    Json,
}

/// Coarse classification used by callers deciding whether a fresh request may help.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Argument,
    PermissionDenied,
    UnsupportedCapability,
    CollaboratorFailure,
    NotImplemented,
    Lifecycle,
}

/// Errors reported to the host for a single request or subscription.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("missing argument '{0}'")]
    MissingArgument(String),
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("{message}")]
    Collaborator {
        kind: CollaboratorKind,
        message: String,
    },
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("no interactive surface attached to prompt for permissions")]
    NoSurface,
    #[error("provider is not attached to a host")]
    Detached,
    #[error("request abandoned before a reply was sent")]
    Abandoned,
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn io(message: impl Into<String>) -> Self {
        BridgeError::Collaborator {
            kind: CollaboratorKind::Io,
            message: message.into(),
        }
    }

    pub fn json(message: impl Into<String>) -> Self {
        BridgeError::Collaborator {
            kind: CollaboratorKind::Json,
            message: message.into(),
        }
    }

    /// Wire code understood by the host side.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::MissingArgument(_) | BridgeError::InvalidArgument { .. } => "#02",
            BridgeError::PermissionDenied(_) => "#01",
            BridgeError::Unsupported(_) => "#03",
            BridgeError::Collaborator {
                kind: CollaboratorKind::Io,
                ..
            } => "IO_ERROR",
            BridgeError::Collaborator {
                kind: CollaboratorKind::Json,
                ..
            } => "JSON_ERROR",
            BridgeError::NotImplemented(_) => "NOT_IMPLEMENTED",
            BridgeError::NoSurface => "NO_SURFACE",
            BridgeError::Detached => "DETACHED",
            BridgeError::Abandoned => "ABANDONED",
            BridgeError::Internal(_) => "INTERNAL",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            BridgeError::MissingArgument(_) | BridgeError::InvalidArgument { .. } => {
                ErrorClass::Argument
            }
            BridgeError::PermissionDenied(_) => ErrorClass::PermissionDenied,
            BridgeError::Unsupported(_) => ErrorClass::UnsupportedCapability,
            BridgeError::Collaborator { .. } | BridgeError::Internal(_) => {
                ErrorClass::CollaboratorFailure
            }
            BridgeError::NotImplemented(_) => ErrorClass::NotImplemented,
            BridgeError::NoSurface | BridgeError::Detached | BridgeError::Abandoned => {
                ErrorClass::Lifecycle
            }
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::json(err.to_string())
    }
}

/// Error body sent across the host boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_the_host_contract() {
        assert_eq!(BridgeError::PermissionDenied("permission denied".into()).code(), "#01");
        assert_eq!(BridgeError::MissingArgument("address".into()).code(), "#02");
        assert_eq!(BridgeError::Unsupported("no multi sim".into()).code(), "#03");
        assert_eq!(BridgeError::io("disk").code(), "IO_ERROR");
        assert_eq!(BridgeError::json("bad").code(), "JSON_ERROR");
    }

    #[test]
    fn payload_carries_display_message() {
        let payload = BridgeError::MissingArgument("address".into()).payload();
        assert_eq!(payload.code, "#02");
        assert_eq!(payload.message, "missing argument 'address'");
    }
}
