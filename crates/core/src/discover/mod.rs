//! Dependency discovery: enumerating the transitive inputs of a compilation.
//!
//! Discovery wraps compiler preprocessing and is injected into the unit
//! builder as a capability. The contract: return the ordered, deduplicated
//! list of paths (relative to the invocation's working directory, or
//! absolute) that the compilation transitively depends on — primary source
//! first, then headers, then toolchain/sysroot files.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::builder::Invocation;

/// Dependency enumeration failed; the unit being built is abandoned.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Missing dependency listing {path}")]
    MissingListing { path: PathBuf },
    #[error("Failed to read dependency listing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Dependency discovery failed: {0}")]
    Failed(String),
}

/// Capability returning the ordered, deduplicated transitive input paths of
/// an invocation.
pub trait DependencyDiscoverer: Send + Sync {
    fn discover(&self, invocation: &Invocation) -> Result<Vec<String>, DiscoveryError>;
}

/// Reads the `<source>.filepaths` sidecar emitted by the clang
/// translation-unit tool: one input path per line, relative to the
/// compilation's working directory.
///
/// The tool writes `//` at the boundary between a system include directory
/// and the path used in the `#include` directive; the boundary is collapsed
/// to a plain separator here. Duplicate lines keep their first occurrence.
#[derive(Debug, Clone)]
pub struct FilepathsDiscoverer {
    /// Paths containing any of these fragments are dropped, e.g. builtin
    /// clang headers that must not be packaged.
    pub excluded_fragments: Vec<String>,
}

impl Default for FilepathsDiscoverer {
    fn default() -> Self {
        Self { excluded_fragments: vec!["third_party/llvm-build".to_string()] }
    }
}

impl FilepathsDiscoverer {
    pub fn new(excluded_fragments: Vec<String>) -> Self {
        Self { excluded_fragments }
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.excluded_fragments.iter().any(|fragment| path.contains(fragment))
    }
}

impl DependencyDiscoverer for FilepathsDiscoverer {
    fn discover(&self, invocation: &Invocation) -> Result<Vec<String>, DiscoveryError> {
        let listing_path = invocation
            .working_directory
            .join(format!("{}.filepaths", invocation.source_file));

        if !listing_path.exists() {
            return Err(DiscoveryError::MissingListing { path: listing_path });
        }

        let raw = std::fs::read_to_string(&listing_path)
            .map_err(|source| DiscoveryError::Io { path: listing_path, source })?;

        let mut seen = std::collections::HashSet::new();
        let mut paths = Vec::new();
        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let path = trimmed.replace("//", "/");
            if self.is_excluded(&path) {
                continue;
            }
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }

        Ok(paths)
    }
}

/// Discoverer returning a fixed path list. Useful in tests and for pipelines
/// that compute dependencies elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscoverer {
    pub paths: Vec<String>,
}

impl StaticDiscoverer {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }
}

impl DependencyDiscoverer for StaticDiscoverer {
    fn discover(&self, _invocation: &Invocation) -> Result<Vec<String>, DiscoveryError> {
        Ok(self.paths.clone())
    }
}
