//! Error classification policies.
//!
//! The deleter asks an [`ErrorClassifier`] whether a failure means the object
//! is really still there (`Fatal`) or is already gone (`Ignorable`). Ignorable
//! failures are logged and dropped instead of being reported to the caller.

use anyhow::Error;

use crate::types::KeyError;
use crate::types::error::{RemoteError, is_cancelled_error};

/// S3 error codes meaning the object (or its whole bucket) no longer exists.
const ALREADY_GONE_ERROR_CODES: [&str; 3] = ["NoSuchKey", "NoSuchVersion", "NoSuchBucket"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Ignorable,
    Fatal,
}

pub trait ErrorClassifier: Send + Sync {
    /// Classify an error returned by a whole DeleteObjects call.
    fn classify_call_error(&self, error: &Error) -> ErrorClass;

    /// Classify one per-key error of a DeleteObjects response.
    fn classify_key_error(&self, error: &KeyError) -> ErrorClass;
}

/// Reports every failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictClassifier;

impl ErrorClassifier for StrictClassifier {
    fn classify_call_error(&self, _error: &Error) -> ErrorClass {
        ErrorClass::Fatal
    }

    fn classify_key_error(&self, _error: &KeyError) -> ErrorClass {
        ErrorClass::Fatal
    }
}

/// Treats "already deleted" S3 error codes as success.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3ErrorClassifier;

impl ErrorClassifier for S3ErrorClassifier {
    fn classify_call_error(&self, error: &Error) -> ErrorClass {
        if is_cancelled_error(error) {
            return ErrorClass::Fatal;
        }

        match error.downcast_ref::<RemoteError>() {
            Some(remote) => classify_code(&remote.code),
            None => ErrorClass::Fatal,
        }
    }

    fn classify_key_error(&self, error: &KeyError) -> ErrorClass {
        match error.code.as_deref() {
            Some(code) => classify_code(code),
            None => ErrorClass::Fatal,
        }
    }
}

fn classify_code(code: &str) -> ErrorClass {
    if ALREADY_GONE_ERROR_CODES.contains(&code) {
        ErrorClass::Ignorable
    } else {
        ErrorClass::Fatal
    }
}
