//! Data model for compilation units and their wire format.
//!
//! A [`CompilationUnit`] records one compiler invocation: the corpus-qualified
//! name of the compiled target, the verbatim argument list, and one
//! [`RequiredInput`] per file the compilation transitively depends on. Units
//! are constructed once by the builder and never mutated afterwards.
//!
//! On the wire a unit is a JSON object nested inside a `{"unit": ...}`
//! wrapper, with empty fields omitted. Serialization is deterministic: struct
//! fields keep declaration order and the details map is key-ordered, so the
//! same unit always produces byte-identical output.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A structured, namespaced identifier for a file or compilation unit.
///
/// Empty fields are treated as absent and omitted from serialization. Two
/// VNames are equal iff all fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VName {
    /// Logical project/repository namespace, e.g. `chromium`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub corpus: String,
    /// Optional sub-root, e.g. a build config or a toolchain identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root: String,
    /// Path relative to the root. Set on file-level names only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Source language. Set on unit-level names only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
}

impl VName {
    /// Name for a compilation unit (corpus + language, optional root).
    pub fn for_unit(
        corpus: impl Into<String>,
        root: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            corpus: corpus.into(),
            root: root.into(),
            path: String::new(),
            language: language.into(),
        }
    }

    /// Name for a required input file (corpus + path, optional root).
    pub fn for_file(
        corpus: impl Into<String>,
        root: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            corpus: corpus.into(),
            root: root.into(),
            path: path.into(),
            language: String::new(),
        }
    }
}

/// Where a required input lived at analysis time and what its bytes hashed to.
///
/// `path` is the on-disk path as discovered (relative to the unit's working
/// directory); `digest` is the hex-encoded SHA-256 of the file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub digest: String,
}

/// One input file of a compilation unit: its corpus-qualified name paired
/// with the on-disk location and content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredInput {
    pub v_name: VName,
    pub info: FileInfo,
}

/// Opaque extension map attached to a unit, keyed by a namespaced kind
/// string (e.g. [`BuildDetails::KIND`]). Payloads are stored as raw JSON so
/// consumers that do not know a kind can carry it through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitDetails(BTreeMap<String, serde_json::Value>);

impl UnitDetails {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Attach a typed payload under the given kind, replacing any previous
    /// payload of that kind.
    pub fn attach<T: Serialize>(
        &mut self,
        kind: impl Into<String>,
        payload: &T,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(payload)?;
        self.0.insert(kind.into(), value);
        Ok(())
    }

    /// Decode the payload stored under `kind`, if present.
    pub fn get<T: DeserializeOwned>(&self, kind: &str) -> Option<Result<T, serde_json::Error>> {
        self.0.get(kind).map(|value| serde_json::from_value(value.clone()))
    }

    /// Kinds present in this map, in serialization order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Build-configuration metadata attached to units under
/// [`BuildDetails::KIND`], e.g. `linux-debug`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDetails {
    pub build_config: String,
}

impl BuildDetails {
    pub const KIND: &'static str = "chromium.BuildDetails";

    pub fn new(build_config: impl Into<String>) -> Self {
        Self { build_config: build_config.into() }
    }
}

/// The record of one compiler invocation plus all files it transitively
/// depends on.
///
/// Field order matters for the wire format; `required_input` order reflects
/// discovery order and `argument` order is the original command-line order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub v_name: VName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_input: Vec<RequiredInput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub argument: Vec<String>,
    /// Primary translation unit, relative to the working directory.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_file: String,
    /// Identifier for the expected output artifact, e.g. the object file.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output_key: String,
    /// Directory relative arguments were resolved against.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub working_directory: String,
    #[serde(default, skip_serializing_if = "UnitDetails::is_empty")]
    pub details: UnitDetails,
}

/// Wrapper object used for unit files on disk.
#[derive(Serialize, Deserialize)]
struct UnitWrapper {
    unit: CompilationUnit,
}

impl CompilationUnit {
    /// Serialize to the wire form, a compact `{"unit": ...}` JSON object.
    pub fn to_wire_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&UnitWrapper { unit: self.clone() })
    }

    /// Parse a unit from its wire form.
    pub fn from_wire_json(raw: &str) -> Result<Self, serde_json::Error> {
        let wrapper: UnitWrapper = serde_json::from_str(raw)?;
        Ok(wrapper.unit)
    }
}
