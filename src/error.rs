//! Error types for service management operations.
//!
//! This module defines the errors the registry, SCM, hosted-service, and
//! event-log collaborators can produce, with the Win32 status or
//! last-error code that caused them where one exists.

use thiserror::Error;

/// Result type alias using [`SvcError`].
pub type Result<T> = std::result::Result<T, SvcError>;

/// Errors that can occur during service management operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SvcError {
    /// An OS call failed; carries the call name and its last-error code.
    #[error("{call} failed with error {code}")]
    Os {
        /// Name of the failing API.
        call: &'static str,
        /// Win32 last-error code observed after the call.
        code: u32,
    },

    /// A registry operation returned a failure status.
    #[error("registry operation on '{path}' failed with status {status}")]
    Registry {
        /// Key path the operation targeted.
        path: String,
        /// `LSTATUS` value the API returned.
        status: u32,
    },

    /// The caller lacks the rights the operation needs.
    #[error("access denied during {operation}; administrator rights are required")]
    AccessDenied {
        /// Operation that was refused.
        operation: &'static str,
    },

    /// The named service is not installed.
    #[error("service '{name}' does not exist")]
    ServiceNotFound {
        /// Service name as registered with the SCM.
        name: String,
    },

    /// The service did not reach the running state within the polling
    /// window.
    #[error("service '{name}' did not start within {waited_secs} seconds")]
    StartTimeout {
        /// Service name as registered with the SCM.
        name: String,
        /// Total time spent polling.
        waited_secs: u64,
    },

    /// A status query reported a state the operation cannot proceed
    /// from.
    #[error("service '{name}' is in unexpected state {state}")]
    UnexpectedState {
        /// Service name as registered with the SCM.
        name: String,
        /// `SERVICE_*` state code the query returned.
        state: u32,
    },

    /// An SCM operation was attempted before connecting to the manager.
    #[error("not connected to the service control manager")]
    NotConnected,

    /// I/O error, e.g. resolving the installer's own executable path.
    #[error("I/O error: {0}")]
    Io(String),
}

impl SvcError {
    /// Create an OS call error from the call name and last-error code.
    pub fn os(call: &'static str, code: u32) -> Self {
        Self::Os { call, code }
    }

    /// Create a registry error from the key path and returned status.
    pub fn registry(path: impl Into<String>, status: u32) -> Self {
        Self::Registry {
            path: path.into(),
            status,
        }
    }

    /// Create an access denied error for the given operation.
    pub fn access_denied(operation: &'static str) -> Self {
        Self::AccessDenied { operation }
    }

    /// Create a service-not-found error.
    pub fn service_not_found(name: impl Into<String>) -> Self {
        Self::ServiceNotFound { name: name.into() }
    }

    /// Create a start timeout error.
    pub fn start_timeout(name: impl Into<String>, waited_secs: u64) -> Self {
        Self::StartTimeout {
            name: name.into(),
            waited_secs,
        }
    }

    /// Create an unexpected-state error.
    pub fn unexpected_state(name: impl Into<String>, state: u32) -> Self {
        Self::UnexpectedState {
            name: name.into(),
            state,
        }
    }

    /// Returns the Win32 error code behind this error, if one exists.
    pub fn os_code(&self) -> Option<u32> {
        match self {
            Self::Os { code, .. } => Some(*code),
            Self::Registry { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SvcError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SvcError::os("OpenSCManagerW", 5);
        assert_eq!(err.to_string(), "OpenSCManagerW failed with error 5");

        let err = SvcError::start_timeout("SvcFault", 60);
        assert_eq!(
            err.to_string(),
            "service 'SvcFault' did not start within 60 seconds"
        );
    }

    #[test]
    fn test_os_code() {
        assert_eq!(SvcError::os("RegCloseKey", 6).os_code(), Some(6));
        assert_eq!(SvcError::registry("Software\\X", 1015).os_code(), Some(1015));
        assert_eq!(SvcError::NotConnected.os_code(), None);
    }
}
