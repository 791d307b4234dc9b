//! The unit builder: one compiler invocation in, one immutable unit out.
//!
//! The builder is a pure transformation over its injected collaborators: the
//! dependency discoverer enumerates transitive inputs, the hasher digests
//! them, and the corpus map resolves each path to a corpus-qualified name.
//! Required inputs keep discovery order; arguments are copied verbatim.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::corpus::{normalize_path, CorpusMap};
use crate::digest::{FileHasher, ReadError};
use crate::discover::{DependencyDiscoverer, DiscoveryError};
use crate::model::{BuildDetails, CompilationUnit, FileInfo, RequiredInput, UnitDetails, VName};

/// Everything describing a single compilation to be indexed.
///
/// The argument list is final by the time an invocation reaches the builder;
/// any preprocessing (warning stripping, wrapper trimming) happens during
/// compilation-database conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Directory the compiler ran in; relative inputs resolve against it.
    pub working_directory: PathBuf,
    /// Primary translation unit, relative to the working directory.
    pub source_file: String,
    pub arguments: Vec<String>,
    /// Identifier for the expected output artifact, e.g. `obj/foo/bar.o`.
    pub output_key: String,
    pub language: String,
    /// Optional build configuration recorded in the unit's details.
    pub build_config: Option<String>,
}

/// Why a single unit failed to build. Each variant aborts only the unit
/// currently being built; the batch orchestrator decides whether siblings
/// continue.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Read(#[from] ReadError),
    /// Two different on-disk paths resolved to the same VName. This signals
    /// a corpus-map misconfiguration, not a discovery bug.
    #[error("Required input {path} resolved to duplicate name {corpus}//{root}//{vname_path}")]
    DuplicateInput { path: String, corpus: String, root: String, vname_path: String },
    #[error("Failed to encode unit: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Builds [`CompilationUnit`]s against a fixed corpus map and pipeline
/// out-dir. Safe to share across worker threads.
#[derive(Debug, Clone)]
pub struct UnitBuilder {
    corpus_map: CorpusMap,
    /// Pipeline-relative build directory the discovered paths are relative
    /// to, e.g. `src/out/Debug`. VName paths are re-rooted here before
    /// corpus resolution so they are stable across checkouts.
    out_dir: String,
}

impl UnitBuilder {
    pub fn new(corpus_map: CorpusMap, out_dir: impl Into<String>) -> Self {
        Self { corpus_map, out_dir: out_dir.into() }
    }

    pub fn corpus_map(&self) -> &CorpusMap {
        &self.corpus_map
    }

    /// Build the unit for one invocation.
    ///
    /// Discovery order is preserved in `required_input`; exact-duplicate
    /// VNames fail the unit with [`IndexError::DuplicateInput`].
    pub fn build(
        &self,
        invocation: &Invocation,
        discoverer: &dyn DependencyDiscoverer,
        hasher: &dyn FileHasher,
    ) -> Result<CompilationUnit, IndexError> {
        let paths = discoverer.discover(invocation)?;

        let mut required_input = Vec::with_capacity(paths.len());
        let mut seen_names = HashSet::new();

        for path in paths {
            let on_disk = resolve_on_disk(&path, &invocation.working_directory);
            let digest = hasher.digest_file(&on_disk)?;

            let v_name = self.corpus_map.resolve(&self.vname_path(
                &path,
                &invocation.working_directory,
            ));
            if !seen_names.insert(v_name.clone()) {
                return Err(IndexError::DuplicateInput {
                    path,
                    corpus: v_name.corpus,
                    root: v_name.root,
                    vname_path: v_name.path,
                });
            }

            required_input.push(RequiredInput { v_name, info: FileInfo { path, digest } });
        }

        let mut details = UnitDetails::default();
        if let Some(build_config) = &invocation.build_config {
            details.attach(BuildDetails::KIND, &BuildDetails::new(build_config))?;
        }

        Ok(CompilationUnit {
            v_name: VName::for_unit(
                &self.corpus_map.corpus,
                &self.corpus_map.root,
                &invocation.language,
            ),
            required_input,
            argument: invocation.arguments.clone(),
            source_file: invocation.source_file.clone(),
            output_key: invocation.output_key.clone(),
            working_directory: invocation.working_directory.to_string_lossy().replace('\\', "/"),
            details,
        })
    }

    /// Compute the stable, pipeline-relative path used for corpus
    /// resolution: the discovered path re-rooted at the out-dir and
    /// lexically normalized.
    fn vname_path(&self, discovered: &str, working_directory: &Path) -> String {
        let relative = if Path::new(discovered).is_absolute() {
            relative_to_lexical(discovered, working_directory)
        } else {
            discovered.to_string()
        };

        if self.out_dir.is_empty() {
            normalize_path(&relative)
        } else {
            normalize_path(&format!("{}/{}", self.out_dir, relative))
        }
    }
}

/// Absolute on-disk location of a discovered path.
pub(crate) fn resolve_on_disk(discovered: &str, working_directory: &Path) -> PathBuf {
    let path = Path::new(discovered);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_directory.join(path)
    }
}

/// Lexical equivalent of making `path` relative to `base`, walking up with
/// `..` where the two diverge. Both sides are normalized first; no
/// filesystem access.
fn relative_to_lexical(path: &str, base: &Path) -> String {
    let path_norm = normalize_path(path);
    let base_norm = normalize_path(&base.to_string_lossy());

    let split = |s: &str| -> Vec<String> {
        s.trim_start_matches('/')
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .map(str::to_string)
            .collect()
    };
    let path_parts = split(&path_norm);
    let base_parts = split(&base_norm);

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = std::iter::repeat("..".to_string())
        .take(base_parts.len() - common)
        .collect();
    parts.extend(path_parts[common..].iter().cloned());

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
