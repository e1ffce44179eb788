//! Typed view of the Pod under admission.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use kube::core::{admission::AdmissionRequest, DynamicObject};

use crate::{InjectorError, Result};

/// The parts of a Pod the decision engine looks at.
///
/// Built by strictly deserializing the admission object into a
/// [`Pod`]; anything that does not fit the schema is rejected as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PodSpecView {
    /// Pod name, or its `generateName` prefix when the name is not assigned yet.
    pub name: Option<String>,
    /// Namespace the Pod is being created in.
    pub namespace: Option<String>,
    /// Names of the existing containers, in order.
    pub container_names: Vec<String>,
    /// Names of the existing volumes, in order.
    pub volume_names: Vec<String>,
    /// Pod annotations.
    pub annotations: BTreeMap<String, String>,
}

impl PodSpecView {
    /// Parse the object of an admission request.
    ///
    /// The request namespace takes precedence over the one in the object's
    /// metadata, which is usually empty on create.
    ///
    /// # Errors
    ///
    /// Returns [`InjectorError::MissingObject`] if the request has no object and
    /// [`InjectorError::MalformedPod`] if it is not a valid Pod.
    pub fn from_request(request: &AdmissionRequest<DynamicObject>) -> Result<Self> {
        let object = request
            .object
            .as_ref()
            .ok_or(InjectorError::MissingObject)?;

        let value =
            serde_json::to_value(object).map_err(|e| InjectorError::MalformedPod(e.to_string()))?;
        let pod: Pod =
            serde_json::from_value(value).map_err(|e| InjectorError::MalformedPod(e.to_string()))?;

        let mut view = Self::from_pod(&pod)?;
        if let Some(namespace) = request.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            view.namespace = Some(namespace.to_string());
        }
        Ok(view)
    }

    /// Project a typed Pod.
    ///
    /// # Errors
    ///
    /// Returns [`InjectorError::MalformedPod`] if the Pod has no spec.
    pub fn from_pod(pod: &Pod) -> Result<Self> {
        let spec = pod
            .spec
            .as_ref()
            .ok_or_else(|| InjectorError::MalformedPod("pod has no spec".to_string()))?;

        let meta = &pod.metadata;
        Ok(Self {
            name: meta.name.clone().or_else(|| meta.generate_name.clone()),
            namespace: meta.namespace.clone(),
            container_names: spec.containers.iter().map(|c| c.name.clone()).collect(),
            volume_names: spec
                .volumes
                .iter()
                .flatten()
                .map(|v| v.name.clone())
                .collect(),
            annotations: meta.annotations.clone().unwrap_or_default(),
        })
    }

    /// Check whether a container with the given name exists.
    #[must_use]
    pub fn has_container(&self, name: &str) -> bool {
        self.container_names.iter().any(|c| c == name)
    }

    /// Check whether a volume with the given name exists.
    #[must_use]
    pub fn has_volume(&self, name: &str) -> bool {
        self.volume_names.iter().any(|v| v == name)
    }

    /// Name used to identify the Pod in log events.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}
