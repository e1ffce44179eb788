//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sidecar_injector_core::{InjectorConfig, DEFAULT_AGENT_IMAGE, KUBELET_PORT_UNSET};

/// Run the sidecar injector against a captured admission review.
#[derive(Parser, Debug)]
#[command(name = "sidecar-injector")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Mackerel API key handed to the injected agent.
    #[arg(
        long,
        alias = "agentAPIKey",
        env = "SIDECAR_AGENT_API_KEY",
        hide_env_values = true
    )]
    pub agent_api_key: String,

    /// Kubelet port the agent connects to (-1 lets the agent decide).
    #[arg(
        long,
        alias = "agentKubeletPort",
        env = "SIDECAR_AGENT_KUBELET_PORT",
        default_value_t = KUBELET_PORT_UNSET,
        allow_hyphen_values = true
    )]
    pub agent_kubelet_port: i64,

    /// Skip TLS verification when the agent talks to the kubelet.
    #[arg(
        long,
        alias = "agentKubeletInsecureTLS",
        env = "SIDECAR_AGENT_KUBELET_INSECURE_TLS"
    )]
    pub agent_kubelet_insecure_tls: bool,

    /// Older spelling of `--agent-kubelet-insecure-tls`, still read from
    /// `SIDECAR_AGENT_KUBELET_INSECURE_PORT` by existing deployments.
    #[arg(
        long = "agent-kubelet-insecure-port",
        env = "SIDECAR_AGENT_KUBELET_INSECURE_PORT",
        hide = true
    )]
    pub legacy_kubelet_insecure_tls: bool,

    /// Namespace whose Pods are never injected. Repeatable.
    #[arg(
        long = "ignore-namespace",
        alias = "ignoreNamespace",
        env = "SIDECAR_IGNORE_NAMESPACES",
        value_delimiter = ','
    )]
    pub ignore_namespaces: Vec<String>,

    /// Agent container image.
    #[arg(long, env = "SIDECAR_AGENT_IMAGE", default_value = DEFAULT_AGENT_IMAGE)]
    pub agent_image: String,

    /// ConfigMap holding the agent configuration file.
    #[arg(long, env = "SIDECAR_AGENT_CONFIG_MAP")]
    pub agent_config_map: Option<String>,

    /// File containing the AdmissionReview, or `-` for stdin.
    #[arg(long, default_value = "-")]
    pub input: PathBuf,

    /// Pretty-print the response review.
    #[arg(long)]
    pub pretty: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Format of the log lines written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

impl Args {
    /// Build the injector configuration from the parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if any value fails validation.
    pub fn to_config(&self) -> sidecar_injector_core::Result<InjectorConfig> {
        let insecure_tls = self.agent_kubelet_insecure_tls || self.legacy_kubelet_insecure_tls;
        let mut builder = InjectorConfig::builder(self.agent_api_key.clone())
            .kubelet_port(self.agent_kubelet_port)
            .kubelet_insecure_tls(insecure_tls)
            .ignore_namespaces(self.ignore_namespaces.iter().map(String::as_str))
            .agent_image(self.agent_image.clone());

        if let Some(name) = &self.agent_config_map {
            builder = builder.agent_config_map(name.clone());
        }

        builder.build()
    }

    /// Check if the review should be read from stdin.
    #[must_use]
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }
}
