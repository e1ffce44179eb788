//! Error types for the admission decision engine.
//!
//! Errors raised while evaluating a request never turn into a denied
//! admission: the engine maps them to "allow, no patch" and only uses the
//! variant to pick a log level. Only envelope errors, where there is no uid
//! to answer, reach the caller.

use thiserror::Error;

/// Errors that can occur while evaluating an admission request.
#[derive(Error, Debug)]
pub enum InjectorError {
    /// The admission request did not carry an object.
    #[error("admission request carries no object")]
    MissingObject,

    /// The object could not be parsed as a Pod.
    #[error("malformed pod: {0}")]
    MalformedPod(String),

    /// A fragment value could not be serialized into the patch.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The admission review envelope itself could not be read.
    #[error("malformed admission review: {0}")]
    MalformedReview(#[source] serde_json::Error),

    /// The admission review had no request to answer.
    #[error("admission review carries no request")]
    MissingRequest,
}

impl InjectorError {
    /// Check if this error was caused by the submitted Pod rather than by
    /// the injector itself.
    ///
    /// Malformed Pods are logged as warnings, everything else as errors.
    #[must_use]
    pub const fn is_malformed_input(&self) -> bool {
        matches!(self, Self::MissingObject | Self::MalformedPod(_))
    }
}

/// A specialized Result type for injector operations.
pub type Result<T> = std::result::Result<T, InjectorError>;
