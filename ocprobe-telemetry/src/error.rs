//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::path::{ParsePathError, Path};
use crate::value::ValueError;

// RPC status code reported by a telemetry or operations collaborator.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Code {
    Unavailable,
    Unimplemented,
    NotFound,
    InvalidArgument,
    FailedPrecondition,
    Internal,
    DeadlineExceeded,
    Aborted,
    Unknown,
}

// Telemetry errors.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    // Collaborator RPC failure
    Rpc { code: Code, message: String },
    // Typed accessors
    NotPresent(Path),
    Decode { path: Path, error: ValueError },
    // Path handling
    InvalidPath(ParsePathError),
}

// ===== impl Code =====

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Unavailable => "UNAVAILABLE",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::NotFound => "NOT_FOUND",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Internal => "INTERNAL",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::Aborted => "ABORTED",
            Code::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ===== impl Error =====

impl Error {
    pub fn rpc(code: Code, message: impl Into<String>) -> Error {
        Error::Rpc {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Code {
        match self {
            Error::Rpc { code, .. } => *code,
            Error::NotPresent(..) => Code::NotFound,
            Error::Decode { .. } | Error::InvalidPath(..) => {
                Code::InvalidArgument
            }
        }
    }

    // Returns whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.code(),
            Code::Unavailable | Code::DeadlineExceeded | Code::Aborted
        )
    }

    pub fn log(&self) {
        match self {
            Error::Rpc { code, message } => {
                warn!(%code, %message, "{}", self);
            }
            Error::NotPresent(path) => {
                warn!(%path, "{}", self);
            }
            Error::Decode { path, error } => {
                warn!(%path, %error, "{}", self);
            }
            Error::InvalidPath(error) => {
                warn!(%error, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Rpc { code, message } => {
                write!(f, "rpc error: code = {code} desc = {message}")
            }
            Error::NotPresent(path) => {
                write!(f, "value not present at {path}")
            }
            Error::Decode { path, .. } => {
                write!(f, "failed to decode value at {path}")
            }
            Error::InvalidPath(..) => {
                write!(f, "invalid path")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Decode { error, .. } => Some(error),
            Error::InvalidPath(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ParsePathError> for Error {
    fn from(error: ParsePathError) -> Error {
        Error::InvalidPath(error)
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
