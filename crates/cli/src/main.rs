use anyhow::Result;
use clap::{Parser, Subcommand};
use index_packer::commands::{
    generate_command, list_units_command, show_unit_command, GenerateOptions,
};

/// Compilation index pack generator CLI.
///
/// This CLI is a thin wrapper around `indexpack-core`. All substantive logic
/// lives in the library so it can be tested thoroughly and reused from other
/// frontends.
#[derive(Parser, Debug)]
#[command(
    name = "index-packer",
    version = indexpack_core::version(),
    about = "Compilation index pack generator for code-search pipelines",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build compilation units from a compilation database and archive them
    /// as a kzip index pack.
    Generate {
        /// Path to the compilation database JSON.
        #[arg(long)]
        compdb: String,

        /// Path of the kzip archive to generate.
        #[arg(long)]
        output: String,

        /// Corpus to use for generated names (e.g. `chromium`). Required
        /// unless --corpus-config is given.
        #[arg(long)]
        corpus: Option<String>,

        /// Optional default root for generated names (e.g. `linux`).
        #[arg(long)]
        root: Option<String>,

        /// Build output directory compilation was run from, relative to the
        /// pipeline root.
        #[arg(long, default_value = "src/out/Debug")]
        out_dir: String,

        /// YAML or JSON corpus-map config with filesystem-prefix mappings
        /// (toolchain/sysroot corpora).
        #[arg(long)]
        corpus_config: Option<String>,

        /// Build configuration recorded in each unit's details.
        #[arg(long)]
        build_config: Option<String>,

        /// Source language recorded on unit names.
        #[arg(long, default_value = "c++")]
        language: String,

        /// Skip units that fail to build instead of aborting the batch.
        #[arg(long, default_value_t = false)]
        best_effort: bool,

        /// Number of worker threads for unit construction.
        #[arg(long)]
        jobs: Option<usize>,

        /// Build the index pack at this path and keep it after archiving
        /// (defaults to a scratch directory that is cleaned up).
        #[arg(long)]
        index_dir: Option<String>,

        /// Print details of every unit being written.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },

    /// List the compilation units inside a kzip archive.
    ListUnits {
        /// Path to the kzip archive.
        #[arg(long)]
        archive: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print one unit's JSON from a kzip archive.
    ShowUnit {
        /// Path to the kzip archive.
        #[arg(long)]
        archive: String,

        /// Unit digest or source file to select.
        #[arg(long)]
        unit: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            compdb,
            output,
            corpus,
            root,
            out_dir,
            corpus_config,
            build_config,
            language,
            best_effort,
            jobs,
            index_dir,
            verbose,
        } => generate_command(&GenerateOptions {
            compdb,
            output,
            corpus,
            root,
            out_dir,
            corpus_config,
            build_config,
            language,
            best_effort,
            jobs,
            index_dir,
            verbose,
        })?,
        Command::ListUnits { archive, json } => list_units_command(&archive, json)?,
        Command::ShowUnit { archive, unit } => show_unit_command(&archive, &unit)?,
    }

    Ok(())
}
