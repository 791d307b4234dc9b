//! Shared helpers for the index-packer CLI.
//!
//! The CLI is a thin wrapper around `indexpack-core`; all substantive logic
//! lives in the library. Helpers here exist so integration tests can exercise
//! command plumbing directly.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indexpack_core::corpus::CorpusMap;

pub mod commands;

/// Canonicalize a path if possible, falling back to joining it onto the
/// current working directory (e.g. when it does not exist yet).
pub fn canonicalize_or_current(path: &str) -> Result<PathBuf> {
    let path = Path::new(path);
    if path == Path::new(".") {
        Ok(env::current_dir().context("Failed to get current directory")?)
    } else {
        match path.canonicalize() {
            Ok(p) => Ok(p),
            Err(_) => {
                let cwd = env::current_dir().context("Failed to get current directory")?;
                Ok(cwd.join(path))
            }
        }
    }
}

/// Load a corpus map from a YAML or JSON config file, dispatched on the
/// file extension.
pub fn load_corpus_map(path: &Path) -> Result<CorpusMap> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus config at {}", path.display()))?;

    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    let map = match extension {
        "yaml" | "yml" => serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse corpus config YAML {}", path.display()))?,
        "json" => serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse corpus config JSON {}", path.display()))?,
        other => bail!(
            "Unsupported corpus config extension '{}' for {} (expected yaml, yml, or json)",
            other,
            path.display()
        ),
    };
    Ok(map)
}

/// Wall-clock timestamp for progress messages.
pub fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
