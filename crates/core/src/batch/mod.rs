//! Batch orchestration across a whole compilation database.
//!
//! Independent compilations share no mutable state, so units are built in
//! parallel over a shared read-only corpus map; pack writing stays
//! sequential. A failed unit never affects its siblings — whether the batch
//! continues is the configured failure policy's call.

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::builder::{resolve_on_disk, IndexError, Invocation, UnitBuilder};
use crate::compdb::{self, CompDbEntry, InvocationOptions};
use crate::digest::FileHasher;
use crate::discover::DependencyDiscoverer;
use crate::model::CompilationUnit;
use crate::pack::{IndexPackWriter, PackError};

/// What to do when a unit fails to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the whole batch on the first failed unit, before anything is
    /// written.
    #[default]
    FailFast,
    /// Skip failed units, record them in the report, and keep going.
    BestEffort,
}

/// One successfully written unit.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenUnit {
    pub source_file: String,
    pub unit_digest: String,
}

/// One unit that could not be built, reported with its source file and the
/// specific error.
#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    pub source_file: String,
    pub error: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub written: Vec<WrittenUnit>,
    pub failures: Vec<UnitFailure>,
    pub data_files: usize,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Unit for {source_file} failed: {source}")]
    Unit {
        source_file: String,
        #[source]
        source: IndexError,
    },
    #[error(transparent)]
    Pack(#[from] PackError),
}

/// Build units for every compilation database entry and write the resulting
/// index pack.
///
/// Entries are deduplicated first (build systems repeat targets), built in
/// parallel, then written sequentially in entry order so output is
/// deterministic for a given database.
pub fn run_batch(
    entries: Vec<CompDbEntry>,
    options: &InvocationOptions,
    builder: &UnitBuilder,
    discoverer: &dyn DependencyDiscoverer,
    hasher: &dyn FileHasher,
    writer: &mut IndexPackWriter,
    policy: FailurePolicy,
) -> Result<BatchReport, BatchError> {
    let entries = compdb::dedupe_entries(entries);
    let invocations: Vec<Invocation> = entries
        .iter()
        .map(|entry| compdb::entry_to_invocation(entry, options))
        .collect();

    let results: Vec<(Invocation, Result<CompilationUnit, IndexError>)> = invocations
        .into_par_iter()
        .map(|invocation| {
            let result = builder.build(&invocation, discoverer, hasher);
            (invocation, result)
        })
        .collect();

    // Sort successes from failures before writing so fail-fast aborts with
    // an empty pack instead of a partial one.
    let mut built = Vec::new();
    let mut failures = Vec::new();
    for (invocation, result) in results {
        match result {
            Ok(unit) => built.push((invocation, unit)),
            Err(error) => match policy {
                FailurePolicy::FailFast => {
                    return Err(BatchError::Unit {
                        source_file: invocation.source_file,
                        source: error,
                    })
                }
                FailurePolicy::BestEffort => failures.push(UnitFailure {
                    source_file: invocation.source_file,
                    error: error.to_string(),
                }),
            },
        }
    }

    let mut written = Vec::new();
    for (invocation, unit) in built {
        for input in &unit.required_input {
            let on_disk = resolve_on_disk(&input.info.path, &invocation.working_directory);
            writer.write_file_data(&on_disk)?;
        }
        let unit_digest = writer.write_unit(&unit)?;
        written.push(WrittenUnit { source_file: invocation.source_file, unit_digest });
    }

    Ok(BatchReport { written, failures, data_files: writer.data_file_count() })
}
