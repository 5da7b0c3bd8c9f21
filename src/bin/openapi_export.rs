//! Writes the OpenAPI document for client generation.
//!
//! Usage: `openapi-export [OUTPUT]`. Without an argument the path comes from
//! `APP__OPENAPI_OUTPUT`, falling back to `openapi/sportfacility-api.v1.json`.

use std::{env, path::PathBuf};

use anyhow::Context;
use sportfacility_api::openapi::{write_document, DEFAULT_EXPORT_PATH};

fn main() -> anyhow::Result<()> {
    let output_path: PathBuf = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::var_os("APP__OPENAPI_OUTPUT").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_PATH));

    write_document(&output_path)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    println!("OpenAPI document written to {}", output_path.display());
    Ok(())
}
