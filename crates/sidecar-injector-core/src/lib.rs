//! Core configuration types for the sidecar injector.
//!
//! This crate provides the settings shared by every admission decision:
//!
//! - **Configuration**: the immutable [`InjectorConfig`] and its validating builder
//! - **Error types**: [`ConfigError`] for rejected settings
//!
//! # Example
//!
//! ```
//! use sidecar_injector_core::InjectorConfig;
//!
//! let config = InjectorConfig::builder("my-api-key")
//!     .kubelet_port(10250)
//!     .kubelet_insecure_tls(true)
//!     .ignore_namespace("kube-system")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.kubelet_port(), Some(10250));
//! assert!(config.is_namespace_ignored("kube-system"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;

pub use config::{InjectorConfig, InjectorConfigBuilder, DEFAULT_AGENT_IMAGE, KUBELET_PORT_UNSET};
pub use error::{ConfigError, Result};
