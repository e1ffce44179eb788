//! Eligibility filter.
//!
//! Decides whether a Pod should receive the sidecar. Rules are evaluated in
//! order and the first match wins:
//!
//! 1. the namespace is ignored
//! 2. the object does not parse as a Pod
//! 3. the Pod already has the reserved sidecar container
//!
//! The namespace is taken from the request. When the request leaves it
//! empty, the one in the Pod's metadata is checked once the Pod is parsed.
//!
//! Anything else is eligible. The filter never fails: unparseable input is
//! itself an ineligible outcome.

use std::fmt;

use kube::core::{
    admission::{AdmissionRequest, Operation},
    DynamicObject,
};
use sidecar_injector_core::InjectorConfig;

use crate::sidecar::SIDECAR_CONTAINER_NAME;
use crate::types::PodSpecView;
use crate::InjectorError;

/// Why a Pod is passed through without a patch.
#[derive(Debug)]
pub enum SkipReason {
    /// The admission operation is not a create.
    UnsupportedOperation(Operation),
    /// The Pod's namespace is in the ignored set.
    IgnoredNamespace(String),
    /// The object could not be parsed as a Pod.
    Malformed(InjectorError),
    /// The Pod already carries the sidecar container.
    AlreadyInjected,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedOperation(op) => write!(f, "unsupported operation {op:?}"),
            Self::IgnoredNamespace(ns) => write!(f, "namespace {ns} is ignored"),
            Self::Malformed(e) => write!(f, "{e}"),
            Self::AlreadyInjected => write!(f, "{SIDECAR_CONTAINER_NAME} already present"),
        }
    }
}

/// Outcome of the eligibility check.
#[derive(Debug)]
pub enum Eligibility {
    /// The Pod should be injected; carries the parsed view.
    Eligible(PodSpecView),
    /// The Pod is passed through unchanged.
    Ineligible(SkipReason),
}

impl Eligibility {
    /// Check if the Pod should be injected.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible(_))
    }
}

/// Run the eligibility rules against a request.
#[must_use]
pub fn check(request: &AdmissionRequest<DynamicObject>, config: &InjectorConfig) -> Eligibility {
    if let Some(namespace) = request.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        if config.is_namespace_ignored(namespace) {
            return ignored(namespace);
        }
    }

    let view = match PodSpecView::from_request(request) {
        Ok(view) => view,
        Err(e) => return Eligibility::Ineligible(SkipReason::Malformed(e)),
    };

    if let Some(namespace) = view.namespace.as_deref() {
        if config.is_namespace_ignored(namespace) {
            return ignored(namespace);
        }
    }

    if view.has_container(SIDECAR_CONTAINER_NAME) {
        return Eligibility::Ineligible(SkipReason::AlreadyInjected);
    }

    Eligibility::Eligible(view)
}

fn ignored(namespace: &str) -> Eligibility {
    Eligibility::Ineligible(SkipReason::IgnoredNamespace(namespace.to_string()))
}

/// Check whether the sidecar should be injected into the requested Pod.
#[must_use]
pub fn should_inject(request: &AdmissionRequest<DynamicObject>, config: &InjectorConfig) -> bool {
    check(request, config).is_eligible()
}

/// Check whether the admission operation is one the injector mutates.
///
/// Containers cannot be added to an existing Pod, so only creates qualify.
#[must_use]
pub const fn is_supported_operation(operation: &Operation) -> bool {
    matches!(operation, Operation::Create)
}
