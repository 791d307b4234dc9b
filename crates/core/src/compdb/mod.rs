//! Compilation database ingestion.
//!
//! Parses the JSON compilation database the build system emits (one entry per
//! translation unit) and converts entries into [`Invocation`]s for the unit
//! builder. Conversion does all command-line preprocessing up front — warning
//! stripping, compile-wrapper trimming, output-key extraction — so the
//! builder can copy the argument list verbatim.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builder::Invocation;

/// One compilation database entry, as emitted by gn/ninja.
///
/// Either `command` (a single shell line) or `arguments` (a pre-split argv)
/// is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompDbEntry {
    /// Directory the compiler ran in; relative paths resolve against it.
    pub directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    /// Primary translation unit, relative to `directory`.
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Error)]
pub enum CompDbError {
    #[error("Failed to read compilation database {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse compilation database {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load and parse a compilation database file.
pub fn load_compdb(path: &Path) -> Result<Vec<CompDbEntry>, CompDbError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|source| CompDbError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw)
        .map_err(|source| CompDbError::Parse { path: path.to_path_buf(), source })
}

/// Drop repeated entries for the same translation unit, keeping the first.
///
/// Build systems list the same target more than once (e.g. once per
/// dependent), but there is only one dependency listing per source file.
pub fn dedupe_entries(entries: Vec<CompDbEntry>) -> Vec<CompDbEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert((entry.directory.clone(), entry.file.clone())))
        .collect()
}

/// How a `command` string is tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandStyle {
    /// POSIX shell rules: backslash escapes, single and double quotes.
    #[default]
    Posix,
    /// Windows rules: double quotes group, backslashes are path separators.
    Windows,
}

/// Split a command line into argv tokens.
pub fn split_command(command: &str, style: CommandStyle) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = command.chars().peekable();

    #[derive(PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
    }
    let mut quote = Quote::None;

    while let Some(c) = chars.next() {
        match quote {
            Quote::None => match c {
                ' ' | '\t' | '\n' | '\r' => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                '\'' if style == CommandStyle::Posix => {
                    quote = Quote::Single;
                    in_token = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_token = true;
                }
                '\\' if style == CommandStyle::Posix => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                        in_token = true;
                    }
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.push(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' if style == CommandStyle::Posix
                    && matches!(chars.peek(), Some('"') | Some('\\')) =>
                {
                    // Within double quotes a backslash only escapes `"` and `\`.
                    current.push(chars.next().unwrap_or('\\'));
                }
                _ => current.push(c),
            },
        }
    }

    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Remove warning switches (`-W...`, `/W...`, `-w...`, `/w...`).
///
/// Warnings are disabled wholesale with a trailing `-w` anyway; carrying the
/// per-warning flags would only bloat the index pack.
pub fn strip_warning_switches(arguments: Vec<String>) -> Vec<String> {
    arguments
        .into_iter()
        .filter(|arg| {
            let mut chars = arg.chars();
            let is_warning = matches!(chars.next(), Some('-') | Some('/'))
                && matches!(chars.next(), Some('W') | Some('w'))
                && chars.next().is_some();
            !is_warning
        })
        .collect()
}

/// Shorten the argument list so it starts at the compiler executable.
///
/// Compile commands may be prefixed with a distcc/goma wrapper followed by
/// the path to the actual compiler; everything before the first token
/// containing `marker` is dropped. An argument list with no marker is
/// returned unchanged.
pub fn trim_to_compiler(arguments: Vec<String>, marker: &str) -> Vec<String> {
    match arguments.iter().position(|arg| arg.contains(marker)) {
        Some(index) => arguments.into_iter().skip(index).collect(),
        None => arguments,
    }
}

/// Extract the output artifact path from an argument list (`-o <path>` or
/// the MSVC-style `/Fo<path>`).
pub fn extract_output_key(arguments: &[String]) -> Option<String> {
    let mut iter = arguments.iter().peekable();
    while let Some(arg) = iter.next() {
        if arg == "-o" {
            if let Some(output) = iter.peek() {
                return Some((*output).clone());
            }
        } else if let Some(rest) = arg.strip_prefix("/Fo") {
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    None
}

/// Knobs for converting a compdb entry into an [`Invocation`].
#[derive(Debug, Clone)]
pub struct InvocationOptions {
    pub language: String,
    pub command_style: CommandStyle,
    /// Substring identifying the compiler executable in the argument list.
    pub compiler_marker: String,
    pub build_config: Option<String>,
}

impl Default for InvocationOptions {
    fn default() -> Self {
        Self {
            language: "c++".to_string(),
            command_style: CommandStyle::default(),
            compiler_marker: "clang".to_string(),
            build_config: None,
        }
    }
}

/// Convert a compilation database entry into a builder invocation.
///
/// Tokenizes the command (unless the entry carries a pre-split argv), strips
/// warning switches, trims wrapper executables, extracts the output key, and
/// appends `-w` so the downstream indexer runs warning-free. The resulting
/// argument list is final: the unit builder copies it verbatim.
pub fn entry_to_invocation(entry: &CompDbEntry, options: &InvocationOptions) -> Invocation {
    let raw_arguments = if entry.arguments.is_empty() {
        split_command(entry.command.as_deref().unwrap_or(""), options.command_style)
    } else {
        entry.arguments.clone()
    };

    let stripped = strip_warning_switches(raw_arguments);
    let mut arguments = trim_to_compiler(stripped, &options.compiler_marker);

    let output_key = entry
        .output
        .clone()
        .or_else(|| extract_output_key(&arguments))
        .unwrap_or_default();

    arguments.push("-w".to_string());

    Invocation {
        working_directory: PathBuf::from(&entry.directory),
        source_file: entry.file.clone(),
        arguments,
        output_key,
        language: options.language.clone(),
        build_config: options.build_config.clone(),
    }
}
