use crate::{config::ConfigError, key::KeyEncodeError, range::RangeError, scan::CursorError};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError without origin-specific detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a scan-origin invariant violation.
    pub(crate) fn scan_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Scan,
            message.into(),
        )
    }

    /// Construct a scan-origin unsupported error.
    pub(crate) fn scan_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Scan, message.into())
    }

    /// Construct a scan-origin corruption error with a canonical prefix.
    pub(crate) fn scan_corruption(message: impl Into<String>) -> Self {
        let message = message.into();

        Self::new(
            ErrorClass::Corruption,
            ErrorOrigin::Scan,
            format!("corruption detected ({}): {message}", ErrorOrigin::Scan),
        )
    }

    #[must_use]
    pub const fn is_resource_limit(&self) -> bool {
        matches!(self.class, ErrorClass::ResourceLimit)
    }

    /// Storage code carried by a fatal cursor failure, if this error wraps one.
    #[must_use]
    pub const fn storage_code(&self) -> Option<i32> {
        match self.detail {
            Some(ErrorDetail::Cursor(CursorError::Storage { code })) => Some(code),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Range(RangeError),
    #[error("{0}")]
    Cursor(CursorError),
}

impl From<RangeError> for InternalError {
    fn from(err: RangeError) -> Self {
        let class = match err {
            RangeError::TooManyNodes { .. } => ErrorClass::ResourceLimit,
            RangeError::LeadingPartMissing { .. } => ErrorClass::Unsupported,
            RangeError::PartOutOfRange { .. } | RangeError::ImageLength { .. } => {
                ErrorClass::InvariantViolation
            }
        };

        Self {
            class,
            origin: ErrorOrigin::Range,
            message: err.to_string(),
            detail: Some(ErrorDetail::Range(err)),
        }
    }
}

impl From<CursorError> for InternalError {
    fn from(err: CursorError) -> Self {
        Self {
            class: ErrorClass::Storage,
            origin: ErrorOrigin::Cursor,
            message: err.to_string(),
            detail: Some(ErrorDetail::Cursor(err)),
        }
    }
}

impl From<KeyEncodeError> for InternalError {
    fn from(err: KeyEncodeError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Key, err.to_string())
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    Internal,
    Unsupported,
    InvariantViolation,
    ResourceLimit,
    Storage,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
            Self::ResourceLimit => "resource_limit",
            Self::Storage => "storage",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Range,
    Key,
    Cursor,
    Scan,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Range => "range",
            Self::Key => "key",
            Self::Cursor => "cursor",
            Self::Scan => "scan",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}
