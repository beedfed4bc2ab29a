// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Status codes and the common error type.
//!
//! Fallible operations return `RiptideResult<T>`; the error carries a
//! coarse status code plus a human-readable message.

use std::fmt;

/// Coarse classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Invalid,
    IOError,
    TimedOut,
    NotFound,
    Disconnected,
    SchedulingCancelled,
    RpcError,
    Unavailable,
    Internal,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::IOError => "IOError",
            Self::TimedOut => "TimedOut",
            Self::NotFound => "NotFound",
            Self::Disconnected => "Disconnected",
            Self::SchedulingCancelled => "SchedulingCancelled",
            Self::RpcError => "RpcError",
            Self::Unavailable => "Unavailable",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The primary error type for riptide operations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RiptideError {
    pub code: StatusCode,
    pub message: String,
}

impl RiptideError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    // Convenience constructors
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::Invalid, msg)
    }
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::IOError, msg)
    }
    pub fn timed_out(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::TimedOut, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, msg)
    }
    pub fn disconnected(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::Disconnected, msg)
    }
    pub fn scheduling_cancelled(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::SchedulingCancelled, msg)
    }
    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::RpcError, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::Unavailable, msg)
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::Internal, msg)
    }

    // Status code predicates
    pub fn is_invalid(&self) -> bool {
        self.code == StatusCode::Invalid
    }
    pub fn is_timed_out(&self) -> bool {
        self.code == StatusCode::TimedOut
    }
    pub fn is_not_found(&self) -> bool {
        self.code == StatusCode::NotFound
    }
    pub fn is_unavailable(&self) -> bool {
        self.code == StatusCode::Unavailable
    }
}

/// Convenience type alias: `Result<T, RiptideError>`.
pub type RiptideResult<T> = Result<T, RiptideError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RiptideError::io_error("disk full");
        assert_eq!(err.to_string(), "IOError: disk full");
    }

    #[test]
    fn test_predicates() {
        assert!(RiptideError::unavailable("raylet down").is_unavailable());
        assert!(RiptideError::not_found("no worker").is_not_found());
        assert!(!RiptideError::invalid("bad arg").is_not_found());
    }

    #[test]
    fn test_result_alias() {
        let ok: RiptideResult<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: RiptideResult<i32> = Err(RiptideError::invalid("x"));
        assert!(err.unwrap_err().is_invalid());
    }
}
