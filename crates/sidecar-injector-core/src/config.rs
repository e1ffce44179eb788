//! Injector configuration.
//!
//! [`InjectorConfig`] is built once at process start and then shared
//! read-only by every admission decision. It has no setters: the only way to
//! obtain one is through [`InjectorConfigBuilder::build`] (or deserialization,
//! which goes through the same validation).

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Kubelet port value meaning "not configured, let the agent discover it".
pub const KUBELET_PORT_UNSET: i64 = -1;

/// Default container image for the injected agent.
pub const DEFAULT_AGENT_IMAGE: &str = "mackerel/mackerel-container-agent:latest";

/// Settings for the sidecar injector.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawInjectorConfig")]
pub struct InjectorConfig {
    agent_api_key: String,
    kubelet_port: Option<u16>,
    kubelet_insecure_tls: bool,
    ignored_namespaces: BTreeSet<String>,
    agent_image: String,
    agent_config_map: Option<String>,
}

impl InjectorConfig {
    /// Start building a configuration for the given agent API key.
    #[must_use]
    pub fn builder(agent_api_key: impl Into<String>) -> InjectorConfigBuilder {
        InjectorConfigBuilder::new(agent_api_key)
    }

    /// The API key handed to the injected agent.
    #[must_use]
    pub fn agent_api_key(&self) -> &str {
        &self.agent_api_key
    }

    /// The kubelet port the agent should target, or `None` for auto-discovery.
    #[must_use]
    pub const fn kubelet_port(&self) -> Option<u16> {
        self.kubelet_port
    }

    /// Whether the agent should skip kubelet TLS verification.
    #[must_use]
    pub const fn kubelet_insecure_tls(&self) -> bool {
        self.kubelet_insecure_tls
    }

    /// Namespaces whose Pods are never mutated.
    #[must_use]
    pub const fn ignored_namespaces(&self) -> &BTreeSet<String> {
        &self.ignored_namespaces
    }

    /// Check whether Pods in `namespace` are excluded from injection.
    #[must_use]
    pub fn is_namespace_ignored(&self, namespace: &str) -> bool {
        self.ignored_namespaces.contains(namespace)
    }

    /// Container image of the injected agent.
    #[must_use]
    pub fn agent_image(&self) -> &str {
        &self.agent_image
    }

    /// ConfigMap holding the agent configuration file, if any.
    #[must_use]
    pub fn agent_config_map(&self) -> Option<&str> {
        self.agent_config_map.as_deref()
    }
}

impl fmt::Debug for InjectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectorConfig")
            .field("agent_api_key", &"<redacted>")
            .field("kubelet_port", &self.kubelet_port)
            .field("kubelet_insecure_tls", &self.kubelet_insecure_tls)
            .field("ignored_namespaces", &self.ignored_namespaces)
            .field("agent_image", &self.agent_image)
            .field("agent_config_map", &self.agent_config_map)
            .finish()
    }
}

/// Builder for [`InjectorConfig`].
#[derive(Clone)]
pub struct InjectorConfigBuilder {
    agent_api_key: String,
    kubelet_port: i64,
    kubelet_insecure_tls: bool,
    ignored_namespaces: Vec<String>,
    agent_image: String,
    agent_config_map: Option<String>,
}

impl InjectorConfigBuilder {
    fn new(agent_api_key: impl Into<String>) -> Self {
        Self {
            agent_api_key: agent_api_key.into(),
            kubelet_port: KUBELET_PORT_UNSET,
            kubelet_insecure_tls: false,
            ignored_namespaces: Vec::new(),
            agent_image: DEFAULT_AGENT_IMAGE.to_string(),
            agent_config_map: None,
        }
    }

    /// Set the kubelet port. `-1` leaves it unset.
    #[must_use]
    pub fn kubelet_port(mut self, port: impl Into<i64>) -> Self {
        self.kubelet_port = port.into();
        self
    }

    /// Skip kubelet TLS verification in the agent.
    #[must_use]
    pub const fn kubelet_insecure_tls(mut self, insecure: bool) -> Self {
        self.kubelet_insecure_tls = insecure;
        self
    }

    /// Exclude a namespace from injection.
    #[must_use]
    pub fn ignore_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.ignored_namespaces.push(namespace.into());
        self
    }

    /// Exclude several namespaces from injection.
    #[must_use]
    pub fn ignore_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_namespaces
            .extend(namespaces.into_iter().map(Into::into));
        self
    }

    /// Override the agent container image.
    #[must_use]
    pub fn agent_image(mut self, image: impl Into<String>) -> Self {
        self.agent_image = image.into();
        self
    }

    /// Mount the agent configuration from the named ConfigMap.
    #[must_use]
    pub fn agent_config_map(mut self, name: impl Into<String>) -> Self {
        self.agent_config_map = Some(name.into());
        self
    }

    /// Validate the settings and produce an immutable configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key, image, a namespace or the ConfigMap
    /// name is empty, or if the kubelet port is neither `-1` nor a TCP port.
    pub fn build(self) -> Result<InjectorConfig> {
        if self.agent_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.agent_image.trim().is_empty() {
            return Err(ConfigError::EmptyImage);
        }

        let kubelet_port = match self.kubelet_port {
            KUBELET_PORT_UNSET => None,
            port => Some(
                u16::try_from(port).map_err(|_| ConfigError::InvalidKubeletPort(port))?,
            ),
        };

        let mut ignored_namespaces = BTreeSet::new();
        for namespace in self.ignored_namespaces {
            let namespace = namespace.trim();
            if namespace.is_empty() {
                return Err(ConfigError::EmptyNamespace);
            }
            ignored_namespaces.insert(namespace.to_string());
        }

        if matches!(&self.agent_config_map, Some(name) if name.trim().is_empty()) {
            return Err(ConfigError::EmptyConfigMap);
        }

        Ok(InjectorConfig {
            agent_api_key: self.agent_api_key,
            kubelet_port,
            kubelet_insecure_tls: self.kubelet_insecure_tls,
            ignored_namespaces,
            agent_image: self.agent_image,
            agent_config_map: self.agent_config_map,
        })
    }
}

/// Wire form of [`InjectorConfig`], validated on conversion.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInjectorConfig {
    agent_api_key: String,
    #[serde(default = "RawInjectorConfig::default_kubelet_port")]
    kubelet_port: i64,
    #[serde(default)]
    kubelet_insecure_tls: bool,
    #[serde(default)]
    ignored_namespaces: Vec<String>,
    #[serde(default = "RawInjectorConfig::default_agent_image")]
    agent_image: String,
    #[serde(default)]
    agent_config_map: Option<String>,
}

impl RawInjectorConfig {
    const fn default_kubelet_port() -> i64 {
        KUBELET_PORT_UNSET
    }

    fn default_agent_image() -> String {
        DEFAULT_AGENT_IMAGE.to_string()
    }
}

impl TryFrom<RawInjectorConfig> for InjectorConfig {
    type Error = ConfigError;

    fn try_from(raw: RawInjectorConfig) -> Result<Self> {
        let mut builder = InjectorConfig::builder(raw.agent_api_key)
            .kubelet_port(raw.kubelet_port)
            .kubelet_insecure_tls(raw.kubelet_insecure_tls)
            .ignore_namespaces(raw.ignored_namespaces)
            .agent_image(raw.agent_image);
        if let Some(name) = raw.agent_config_map {
            builder = builder.agent_config_map(name);
        }
        builder.build()
    }
}
