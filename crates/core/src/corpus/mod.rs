//! Corpus resolution: mapping filesystem paths to corpus-qualified names.
//!
//! A [`CorpusMap`] is an explicit immutable configuration object, passed into
//! the unit builder rather than held as module state, so it can be overridden
//! per invocation and exercised directly in tests. It is safe to share
//! read-only across worker threads.

use serde::{Deserialize, Serialize};

use crate::model::VName;

/// Maps one filesystem prefix to a corpus and root.
///
/// Typical use: paths under a toolchain directory map to a toolchain corpus
/// (e.g. `winsdk`) with that directory as root; paths under a sysroot map
/// similarly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMapping {
    /// Normalized, `/`-separated path prefix, matched at component boundaries.
    /// Config files may spell it with a trailing slash or backslashes; it is
    /// normalized on the way in so matching never silently fails.
    #[serde(deserialize_with = "deserialize_prefix")]
    pub prefix: String,
    pub corpus: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root: String,
}

fn deserialize_prefix<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_path(&raw))
}

/// Immutable table resolving normalized paths to (corpus, root) by
/// longest-prefix match, with a primary-corpus fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusMap {
    /// Primary corpus for paths no mapping claims.
    pub corpus: String,
    /// Root applied to primary-corpus names. Empty means no root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<PrefixMapping>,
}

impl CorpusMap {
    pub fn new(corpus: impl Into<String>) -> Self {
        Self { corpus: corpus.into(), root: String::new(), mappings: Vec::new() }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_mapping(
        mut self,
        prefix: impl Into<String>,
        corpus: impl Into<String>,
        root: impl Into<String>,
    ) -> Self {
        self.mappings.push(PrefixMapping {
            prefix: normalize_path(&prefix.into()),
            corpus: corpus.into(),
            root: root.into(),
        });
        self
    }

    /// Resolve a normalized path to a file-level [`VName`].
    ///
    /// The longest matching prefix wins; the matched prefix is stripped from
    /// the name's path. Paths no mapping claims deliberately fall back to the
    /// primary corpus with the configured default root.
    pub fn resolve(&self, normalized_path: &str) -> VName {
        let mut best: Option<&PrefixMapping> = None;
        for mapping in &self.mappings {
            if !prefix_matches(&mapping.prefix, normalized_path) {
                continue;
            }
            if best.map_or(true, |b| mapping.prefix.len() > b.prefix.len()) {
                best = Some(mapping);
            }
        }

        match best {
            Some(mapping) => {
                let rest = normalized_path[mapping.prefix.len()..].trim_start_matches('/');
                VName::for_file(&mapping.corpus, &mapping.root, rest)
            }
            None => VName::for_file(&self.corpus, &self.root, normalized_path),
        }
    }
}

/// True if `path` equals `prefix` or lives underneath it. Matching is done at
/// component boundaries so `src/out` does not claim `src/outer/foo.h`.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Lexically normalize a path: unify separators to `/`, drop `.` and empty
/// components, and collapse `..` against preceding components.
///
/// Mirrors `os.path.normpath` semantics: leading `..` components of relative
/// paths are preserved, `..` at the root of an absolute path is dropped, and
/// a fully collapsed relative path becomes `.`.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for component in unified.split('/') {
        match component {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
