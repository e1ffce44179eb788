//! Sidecar injector CLI - answer a captured AdmissionReview offline.
//!
//! This is the entry point for the `sidecar-injector` binary. The response
//! review goes to stdout; logs go to stderr.

mod cli;
mod run;

use std::fs::File;
use std::io::{self, BufReader};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Args, LogFormat};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sidecar_injector=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init(),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.to_config().context("invalid injector configuration")?;
    tracing::debug!(?config, "Loaded injector configuration");

    let stdout = io::stdout().lock();
    if args.reads_stdin() {
        run::process(&config, io::stdin().lock(), stdout, args.pretty)
    } else {
        let file = File::open(&args.input)
            .with_context(|| format!("failed to open {}", args.input.display()))?;
        run::process(&config, BufReader::new(file), stdout, args.pretty)
    }
}
