use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use indexpack_core::batch::{run_batch, FailurePolicy};
use indexpack_core::builder::UnitBuilder;
use indexpack_core::compdb::{load_compdb, CommandStyle, InvocationOptions};
use indexpack_core::corpus::CorpusMap;
use indexpack_core::digest::Sha256Hasher;
use indexpack_core::discover::FilepathsDiscoverer;
use indexpack_core::pack::IndexPackWriter;

use crate::{canonicalize_or_current, load_corpus_map, timestamp};

/// Everything the `generate` subcommand needs.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Path to the compilation database JSON.
    pub compdb: String,
    /// Path of the kzip archive to write.
    pub output: String,
    /// Primary corpus for generated names. Ignored when `corpus_config` is
    /// given.
    pub corpus: Option<String>,
    /// Optional default root for primary-corpus names.
    pub root: Option<String>,
    /// Pipeline-relative build directory compilation ran from.
    pub out_dir: String,
    /// YAML or JSON corpus-map config file (prefix mappings).
    pub corpus_config: Option<String>,
    /// Build configuration recorded in each unit's details.
    pub build_config: Option<String>,
    /// Source language recorded on unit names.
    pub language: String,
    /// Skip failed units instead of aborting the batch.
    pub best_effort: bool,
    /// Worker thread count; defaults to the rayon global default.
    pub jobs: Option<usize>,
    /// Build the index pack here instead of a temporary directory, and keep
    /// it after archiving.
    pub index_dir: Option<String>,
    pub verbose: bool,
}

/// Generate an index pack from a compilation database and archive it.
pub fn generate_command(options: &GenerateOptions) -> Result<()> {
    let corpus_map = match (&options.corpus_config, &options.corpus) {
        (Some(config_path), _) => {
            let path = canonicalize_or_current(config_path)?;
            let mut map = load_corpus_map(&path)?;
            // Inline --root still applies when the config leaves it unset.
            if map.root.is_empty() {
                if let Some(root) = &options.root {
                    map.root = root.clone();
                }
            }
            map
        }
        (None, Some(corpus)) => {
            let mut map = CorpusMap::new(corpus);
            if let Some(root) = &options.root {
                map = map.with_root(root);
            }
            map
        }
        (None, None) => bail!("Either --corpus or --corpus-config is required"),
    };

    if let Some(jobs) = options.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure worker pool")?;
    }

    let compdb_path = canonicalize_or_current(&options.compdb)?;
    let entries = load_compdb(&compdb_path)
        .with_context(|| format!("Failed to load compilation database {}", compdb_path.display()))?;

    println!("{}: Index generation...", timestamp());
    if options.verbose {
        println!("  {} compilation database entries", entries.len());
    }

    let (index_dir, keep_index_dir) = match &options.index_dir {
        Some(dir) => (canonicalize_or_current(dir)?, true),
        None => (scratch_index_dir(), false),
    };

    let builder = UnitBuilder::new(corpus_map, options.out_dir.clone());
    let invocation_options = InvocationOptions {
        language: options.language.clone(),
        command_style: command_style_for_host(),
        build_config: options.build_config.clone(),
        ..InvocationOptions::default()
    };
    let policy = if options.best_effort {
        FailurePolicy::BestEffort
    } else {
        FailurePolicy::FailFast
    };

    let mut writer = IndexPackWriter::create(&index_dir)
        .with_context(|| format!("Failed to create index pack at {}", index_dir.display()))?;

    let report = run_batch(
        entries,
        &invocation_options,
        &builder,
        &FilepathsDiscoverer::default(),
        &Sha256Hasher,
        &mut writer,
        policy,
    )
    .context("Index pack generation failed")?;

    if options.verbose {
        for unit in &report.written {
            println!("  unit {} <- {}", unit.unit_digest, unit.source_file);
        }
    }
    for failure in &report.failures {
        println!("  skipped {}: {}", failure.source_file, failure.error);
    }
    println!(
        "{}: Wrote {} units and {} data files",
        timestamp(),
        report.written.len(),
        report.data_files
    );

    let archive_path = canonicalize_or_current(&options.output)?;
    writer
        .create_archive(&archive_path)
        .with_context(|| format!("Failed to create archive {}", archive_path.display()))?;
    println!("{}: Archived {}", timestamp(), archive_path.display());

    if keep_index_dir {
        println!("  Index pack kept at {}", index_dir.display());
    } else {
        fs::remove_dir_all(&index_dir).with_context(|| {
            format!("Failed to clean up index pack dir {}", index_dir.display())
        })?;
    }

    println!("{}: Done.", timestamp());
    Ok(())
}

/// Scratch location for the pre-archive index pack.
fn scratch_index_dir() -> PathBuf {
    std::env::temp_dir().join(format!(
        "indexpack-{}-{}",
        std::process::id(),
        chrono::Local::now().timestamp_millis()
    ))
}

fn command_style_for_host() -> CommandStyle {
    if cfg!(windows) {
        CommandStyle::Windows
    } else {
        CommandStyle::Posix
    }
}
