//! Error types for injector configuration.

use thiserror::Error;

/// A result type using `ConfigError`.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while constructing an [`InjectorConfig`](crate::InjectorConfig).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The agent API key was empty.
    #[error("agent API key must not be empty")]
    MissingApiKey,

    /// The kubelet port was neither `-1` nor a valid TCP port.
    #[error("invalid kubelet port {0}: expected -1 or a port in 0..=65535")]
    InvalidKubeletPort(i64),

    /// The agent image reference was empty.
    #[error("agent image must not be empty")]
    EmptyImage,

    /// An ignored namespace entry was empty.
    #[error("ignored namespace names must not be empty")]
    EmptyNamespace,

    /// The agent ConfigMap name was set but empty.
    #[error("agent ConfigMap name must not be empty")]
    EmptyConfigMap,
}
