//! Validation errors raised while constructing core types.

use thiserror::Error;

/// Malformed input detected at the type boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("principal id must not be empty")]
    EmptyPrincipal,

    #[error("principal id too long: {len} bytes (max {max})")]
    PrincipalTooLong { len: usize, max: usize },

    #[error("report id must not be empty")]
    EmptyReportId,

    #[error("report id contains invalid character {0:?}")]
    InvalidReportId(char),

    #[error("report id too long: {len} bytes (max {max})")]
    ReportIdTooLong { len: usize, max: usize },

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("description too long: {len} chars (max {max})")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("media handle must not be empty")]
    EmptyMediaHandle,
}
