use anyhow::{anyhow, Context, Result};
use indexpack_core::pack::read_units_from_archive;
use serde::Serialize;

use crate::canonicalize_or_current;

#[derive(Serialize)]
struct UnitSummary {
    digest: String,
    source_file: String,
    argument_count: usize,
    required_inputs: usize,
}

/// List the compilation units inside a kzip archive.
pub fn list_units_command(archive: &str, json: bool) -> Result<()> {
    let archive_path = canonicalize_or_current(archive)?;
    let units = read_units_from_archive(&archive_path)
        .with_context(|| format!("Failed to read archive {}", archive_path.display()))?;

    if json {
        let summaries: Vec<UnitSummary> = units
            .iter()
            .map(|archived| UnitSummary {
                digest: archived.digest.clone(),
                source_file: archived.unit.source_file.clone(),
                argument_count: archived.unit.argument.len(),
                required_inputs: archived.unit.required_input.len(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        println!("Units ({}):", units.len());
        if units.is_empty() {
            println!("  (none)");
            return Ok(());
        }
        for archived in &units {
            println!(
                "  - {} {} ({} inputs)",
                archived.digest,
                archived.unit.source_file,
                archived.unit.required_input.len()
            );
        }
    }

    Ok(())
}

/// Print one unit's JSON, selected by unit digest or source file.
pub fn show_unit_command(archive: &str, selector: &str) -> Result<()> {
    let archive_path = canonicalize_or_current(archive)?;
    let units = read_units_from_archive(&archive_path)
        .with_context(|| format!("Failed to read archive {}", archive_path.display()))?;

    let found = units
        .iter()
        .find(|archived| archived.digest == selector || archived.unit.source_file == selector)
        .ok_or_else(|| {
            anyhow!("No unit matching '{}' in {}", selector, archive_path.display())
        })?;

    println!("{}", serde_json::to_string_pretty(&found.unit)?);
    Ok(())
}
