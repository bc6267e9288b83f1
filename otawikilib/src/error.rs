//! Error types for otawikilib

use thiserror::Error;

/// Errors that can occur while filtering or rendering a catalog
#[derive(Error, Debug)]
pub enum OtaError {
    /// Device identifier is missing or does not match the identifier pattern
    #[error("invalid device identifier '{0}': expected something like iPhone8,1")]
    InvalidDevice(String),

    /// The device needs a model identifier to disambiguate entries, but none was given
    #[error("device '{device}' requires a model identifier (e.g. N71AP)")]
    MissingModel { device: String },

    /// Model identifier does not match the model pattern
    #[error("invalid model identifier '{0}': expected something like N71AP")]
    InvalidModel(String),

    /// A minimum/maximum version bound could not be parsed
    #[error("invalid version bound '{0}'")]
    InvalidVersionBound(String),

    /// A raw catalog record is missing required fields or carries unusable values.
    /// The whole load fails: a partial catalog would silently corrupt span counts.
    #[error("malformed catalog record at position {position}: {reason}")]
    MalformedRecord { position: usize, reason: String },

    /// The renderer finished a full pass with merge instructions left over
    #[error("span plan not fully consumed: {leftover} instruction(s) left after the final row")]
    SpanPlanLeftover { leftover: usize },

    /// The external catalog loader could not be reached; passed through unchanged
    #[error("catalog source unavailable: {0}")]
    SourceUnavailable(String),

    /// The external catalog loader produced something that is not an update catalog
    #[error("catalog source is not a software update catalog: {0}")]
    SourceFormat(String),
}
