//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ocprobe_device::packet::VerifyError;
use ocprobe_telemetry::Error;
use ocprobe_watch::WatchError;
use tracing::{info, warn};

// Conformance case errors.
#[derive(Debug)]
pub enum CaseError {
    // The testbed can't run the case
    Skipped(String),
    // The device didn't behave as expected
    Failed(String),
    // Collaborator failures
    Telemetry(Error),
    Watch(WatchError),
    Verify(VerifyError),
}

// ===== impl CaseError =====

impl CaseError {
    pub fn failed(reason: impl Into<String>) -> CaseError {
        CaseError::Failed(reason.into())
    }

    pub fn skipped(reason: impl Into<String>) -> CaseError {
        CaseError::Skipped(reason.into())
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, CaseError::Skipped(..))
    }

    pub fn log(&self) {
        match self {
            CaseError::Skipped(reason) => {
                info!(%reason, "{}", self);
            }
            CaseError::Failed(reason) => {
                warn!(%reason, "{}", self);
            }
            CaseError::Telemetry(error) => {
                warn!(error = %with_source(error), "{}", self);
            }
            CaseError::Watch(error) => {
                error.log();
            }
            CaseError::Verify(error) => {
                error.log();
            }
        }
    }
}

impl std::fmt::Display for CaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseError::Skipped(reason) => {
                write!(f, "case skipped: {reason}")
            }
            CaseError::Failed(reason) => {
                write!(f, "case failed: {reason}")
            }
            CaseError::Telemetry(error) => {
                write!(f, "telemetry operation failed: {error}")
            }
            CaseError::Watch(error) => {
                write!(f, "{error}")
            }
            CaseError::Verify(error) => {
                write!(f, "punted packet verification failed: {error}")
            }
        }
    }
}

impl std::error::Error for CaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaseError::Telemetry(error) => Some(error),
            CaseError::Watch(error) => Some(error),
            CaseError::Verify(error) => Some(error),
            _ => None,
        }
    }
}

impl From<Error> for CaseError {
    fn from(error: Error) -> CaseError {
        CaseError::Telemetry(error)
    }
}

impl From<WatchError> for CaseError {
    fn from(error: WatchError) -> CaseError {
        CaseError::Watch(error)
    }
}

impl From<VerifyError> for CaseError {
    fn from(error: VerifyError) -> CaseError {
        CaseError::Verify(error)
    }
}

// ===== global functions =====

pub fn with_source<E: std::error::Error>(error: E) -> String {
    if let Some(source) = error.source() {
        format!("{} ({})", error, with_source(source))
    } else {
        error.to_string()
    }
}
