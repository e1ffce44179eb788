//! Review processing: read one AdmissionReview, answer it, write the result.

use std::io::{Read, Write};

use anyhow::Context;
use serde_json::Value;
use sidecar_injector_core::InjectorConfig;

/// Answer the review read from `input` and write the response review to
/// `output`.
///
/// # Errors
///
/// Returns an error if the input is not JSON, if the envelope is not an
/// AdmissionReview with a request, or if the response cannot be written. A
/// malformed Pod inside a readable envelope is answered, not reported.
pub fn process<R: Read, W: Write>(
    config: &InjectorConfig,
    input: R,
    mut output: W,
    pretty: bool,
) -> anyhow::Result<()> {
    let body: Value = serde_json::from_reader(input).context("failed to parse AdmissionReview")?;

    let response = sidecar_injector_webhook::review_value(body, config)?;

    if pretty {
        serde_json::to_writer_pretty(&mut output, &response)?;
    } else {
        serde_json::to_writer(&mut output, &response)?;
    }
    writeln!(output)?;
    output.flush()?;

    Ok(())
}
