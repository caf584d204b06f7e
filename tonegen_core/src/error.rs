use thiserror::Error;

/// Errors produced by the synthesis layer.
///
/// Every failure here is recoverable by the caller: the generator keeps its
/// last good state, so a rejected parameter never silences or corrupts the
/// audible output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A parameter was outside its valid domain (non-positive or non-finite
    /// frequency, zero sample rate, empty buffer request).
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
