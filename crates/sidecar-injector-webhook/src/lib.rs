//! Admission decision engine for the Mackerel container agent sidecar.
//!
//! This crate decides, for each Pod admission request, whether to inject the
//! monitoring agent and describes the injection as a JSON patch. It handles:
//!
//! - Eligibility checks (ignored namespaces, malformed Pods, already injected Pods)
//! - Sidecar container construction from the injector configuration
//! - Append-only JSON patch generation
//! - Wrapping the outcome in an admission response
//!
//! The engine never denies a Pod. Every failure results in an allowed
//! response without a patch, and a warning or error log event.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              Hosting layer (HTTP / TLS / AdmissionReview)       │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Admission Decision Engine                    │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────────┐    │
//! │  │ Eligibility │ │   Sidecar   │ │    Patch                │    │
//! │  │ Filter      │→│   Builder   │→│    Generator            │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!               allowed: true, patch: JSONPatch | none
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sidecar_injector_core::InjectorConfig;
//! use sidecar_injector_webhook::review_value;
//!
//! # fn example(body: serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
//! let config = InjectorConfig::builder("my-api-key")
//!     .ignore_namespace("kube-system")
//!     .build()?;
//!
//! let response = review_value(body, &config)?;
//! println!("{}", serde_json::to_string(&response)?);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod admission;
pub mod error;
pub mod filter;
pub mod patch;
pub mod sidecar;
pub mod types;

#[cfg(test)]
mod testing;

pub use admission::{decide, evaluate, respond, review, review_value, Decision};
pub use error::{InjectorError, Result};
pub use filter::{should_inject, Eligibility, SkipReason};
pub use patch::generate_patch;
pub use sidecar::{build_sidecar, SidecarFragment, SIDECAR_CONTAINER_NAME};
pub use types::PodSpecView;
