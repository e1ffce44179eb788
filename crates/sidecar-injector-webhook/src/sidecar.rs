//! Sidecar container builder.
//!
//! This module constructs the Mackerel container agent fragment that gets
//! appended to qualifying Pods. Construction depends only on the
//! [`InjectorConfig`]; it never looks at cluster state.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, EnvVar, EnvVarSource, ObjectFieldSelector,
    ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use sidecar_injector_core::InjectorConfig;

/// Reserved name of the injected container. Pods already carrying a
/// container with this name are never injected again.
pub const SIDECAR_CONTAINER_NAME: &str = "mackerel-container-agent";

/// Name of the volume holding the agent configuration file.
pub const CONFIG_VOLUME_NAME: &str = "mackerel-container-agent-config";

/// Directory the agent configuration is mounted at.
pub const CONFIG_MOUNT_PATH: &str = "/etc/mackerel-container-agent";

/// File name of the agent configuration inside the ConfigMap.
const CONFIG_FILE_NAME: &str = "mackerel.yaml";

const AGENT_MEMORY_REQUEST: &str = "64Mi";
const AGENT_MEMORY_LIMIT: &str = "128Mi";

/// The container and volumes to inject into a Pod.
#[derive(Debug, Clone, PartialEq)]
pub struct SidecarFragment {
    /// The agent container, including its volume mounts.
    pub container: Container,
    /// Volumes the container mounts, in order.
    pub volumes: Vec<Volume>,
}

/// Build the sidecar fragment for the given configuration.
///
/// The container always gets the reserved [`SIDECAR_CONTAINER_NAME`]. Kubelet
/// arguments are only passed when a kubelet port is configured; otherwise
/// the agent discovers the kubelet on its own.
#[must_use]
pub fn build_sidecar(config: &InjectorConfig) -> SidecarFragment {
    let volumes = config
        .agent_config_map()
        .map(build_config_volume)
        .into_iter()
        .collect();

    SidecarFragment {
        container: build_container(config),
        volumes,
    }
}

fn build_container(config: &InjectorConfig) -> Container {
    let args = build_args(config);
    let volume_mounts = config.agent_config_map().map(|_| vec![build_config_mount()]);

    Container {
        name: SIDECAR_CONTAINER_NAME.to_string(),
        image: Some(config.agent_image().to_string()),
        args: (!args.is_empty()).then_some(args),
        env: Some(build_env_vars(config)),
        resources: Some(build_resources()),
        volume_mounts,
        ..Default::default()
    }
}

fn build_args(config: &InjectorConfig) -> Vec<String> {
    match config.kubelet_port() {
        Some(port) => vec![
            format!("--kubelet-port={port}"),
            format!("--kubelet-insecure-tls={}", config.kubelet_insecure_tls()),
        ],
        None => Vec::new(),
    }
}

fn build_env_vars(config: &InjectorConfig) -> Vec<EnvVar> {
    let mut env = vec![
        EnvVar {
            name: "MACKEREL_APIKEY".to_string(),
            value: Some(config.agent_api_key().to_string()),
            ..Default::default()
        },
        EnvVar {
            name: "MACKEREL_CONTAINER_PLATFORM".to_string(),
            value: Some("kubernetes".to_string()),
            ..Default::default()
        },
        field_ref_env("MACKEREL_KUBERNETES_KUBELET_HOST", "status.hostIP"),
        field_ref_env("MACKEREL_KUBERNETES_NAMESPACE", "metadata.namespace"),
        field_ref_env("MACKEREL_KUBERNETES_POD_NAME", "metadata.name"),
    ];

    if config.agent_config_map().is_some() {
        env.push(EnvVar {
            name: "MACKEREL_AGENT_CONFIG".to_string(),
            value: Some(format!("{CONFIG_MOUNT_PATH}/{CONFIG_FILE_NAME}")),
            ..Default::default()
        });
    }

    env
}

fn field_ref_env(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field_path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_resources() -> ResourceRequirements {
    let mut requests = BTreeMap::new();
    requests.insert(
        "memory".to_string(),
        Quantity(AGENT_MEMORY_REQUEST.to_string()),
    );

    let mut limits = BTreeMap::new();
    limits.insert("memory".to_string(), Quantity(AGENT_MEMORY_LIMIT.to_string()));

    ResourceRequirements {
        requests: Some(requests),
        limits: Some(limits),
        ..Default::default()
    }
}

fn build_config_volume(config_map: &str) -> Volume {
    Volume {
        name: CONFIG_VOLUME_NAME.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_config_mount() -> VolumeMount {
    VolumeMount {
        name: CONFIG_VOLUME_NAME.to_string(),
        mount_path: CONFIG_MOUNT_PATH.to_string(),
        read_only: Some(true),
        ..Default::default()
    }
}
