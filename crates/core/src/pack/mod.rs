//! Index pack output: the on-disk layout and the kzip archive.
//!
//! An index pack is a directory with two subdirectories: `files/` holds one
//! copy of every input file, named by the SHA-256 of its content, and
//! `units/` holds one serialized unit per compilation, named by the SHA-256
//! of the serialized bytes. The archive form (`.kzip`) is a zip whose single
//! top-level directory contains those two subdirectories.

use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::FileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

use crate::digest::sha256_bytes;
use crate::model::CompilationUnit;

/// Logical layout of an index pack on disk.
///
/// Derived from a chosen root path; computing a layout performs no IO.
#[derive(Debug, Clone)]
pub struct PackLayout {
    /// Root directory of the pack (its basename becomes the archive's
    /// top-level directory).
    pub root: PathBuf,
    /// Directory for content-addressed input files.
    pub files_dir: PathBuf,
    /// Directory for serialized compilation units.
    pub units_dir: PathBuf,
}

impl PackLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let files_dir = root.join("files");
        let units_dir = root.join("units");
        Self { root, files_dir, units_dir }
    }
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("Index pack IO failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode unit: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PackError + '_ {
    move |source| PackError::Io { path: path.to_path_buf(), source }
}

/// Writes data files and unit files into a pack directory and turns the
/// result into a kzip archive.
///
/// Data files are deduplicated by digest: the same input shared by many
/// units is stored once.
pub struct IndexPackWriter {
    layout: PackLayout,
    written_files: HashSet<String>,
}

impl IndexPackWriter {
    /// Create the pack directory structure rooted at `root`.
    pub fn create(root: impl AsRef<Path>) -> Result<Self, PackError> {
        let layout = PackLayout::new(root);
        fs::create_dir_all(&layout.files_dir).map_err(io_err(&layout.files_dir))?;
        fs::create_dir_all(&layout.units_dir).map_err(io_err(&layout.units_dir))?;
        Ok(Self { layout, written_files: HashSet::new() })
    }

    pub fn layout(&self) -> &PackLayout {
        &self.layout
    }

    /// Number of distinct data files written so far.
    pub fn data_file_count(&self) -> usize {
        self.written_files.len()
    }

    /// Copy one input file into `files/`, named by its content digest.
    /// Returns the digest; already-written digests are skipped.
    pub fn write_file_data(&mut self, on_disk: &Path) -> Result<String, PackError> {
        let content = fs::read(on_disk).map_err(io_err(on_disk))?;
        let digest = sha256_bytes(&content);
        if self.written_files.insert(digest.clone()) {
            let target = self.layout.files_dir.join(&digest);
            fs::write(&target, &content).map_err(io_err(&target))?;
        }
        Ok(digest)
    }

    /// Serialize one unit into `units/`, named by the digest of its
    /// serialized bytes. Returns that digest.
    pub fn write_unit(&mut self, unit: &CompilationUnit) -> Result<String, PackError> {
        let wire = unit.to_wire_json()?;
        let digest = sha256_bytes(wire.as_bytes());
        let target = self.layout.units_dir.join(&digest);
        fs::write(&target, wire).map_err(io_err(&target))?;
        Ok(digest)
    }

    /// Create the kzip archive at `archive_path`, replacing any existing
    /// file so stale packs are never appended to.
    ///
    /// Entries are written in sorted order so the same pack always produces
    /// the same archive listing.
    pub fn create_archive(&self, archive_path: &Path) -> Result<(), PackError> {
        if archive_path.exists() {
            fs::remove_file(archive_path).map_err(io_err(archive_path))?;
        }

        let file = fs::File::create(archive_path).map_err(io_err(archive_path))?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let root_name = self
            .layout
            .root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "indexpack".to_string());

        zip.add_directory(format!("{root_name}/"), options)?;
        for subdir in ["units", "files"] {
            zip.add_directory(format!("{root_name}/{subdir}/"), options)?;

            let dir = self.layout.root.join(subdir);
            let mut names: Vec<String> = Vec::new();
            for entry in fs::read_dir(&dir).map_err(io_err(&dir))? {
                let entry = entry.map_err(io_err(&dir))?;
                names.push(entry.file_name().to_string_lossy().to_string());
            }
            names.sort();

            for name in names {
                let source = dir.join(&name);
                let content = fs::read(&source).map_err(io_err(&source))?;
                zip.start_file(format!("{root_name}/{subdir}/{name}"), options)?;
                zip.write_all(&content).map_err(io_err(&source))?;
            }
        }

        zip.finish()?;
        Ok(())
    }
}

/// A unit read back from an archive, together with the digest it was stored
/// under.
#[derive(Debug, Clone)]
pub struct ArchivedUnit {
    pub digest: String,
    pub unit: CompilationUnit,
}

/// Read every compilation unit out of a kzip archive, sorted by digest.
pub fn read_units_from_archive(archive_path: &Path) -> Result<Vec<ArchivedUnit>, PackError> {
    let file = fs::File::open(archive_path).map_err(io_err(archive_path))?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut units = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut components = name.split('/');
        // Expected shape: <root>/units/<digest>.
        let is_unit = matches!(
            (components.next(), components.next(), components.next(), components.next()),
            (Some(_), Some("units"), Some(_), None)
        );
        if !is_unit {
            continue;
        }

        let digest = name.rsplit('/').next().unwrap_or_default().to_string();
        let mut raw = String::new();
        entry
            .read_to_string(&mut raw)
            .map_err(io_err(archive_path))?;
        let unit = CompilationUnit::from_wire_json(&raw)?;
        units.push(ArchivedUnit { digest, unit });
    }

    units.sort_by(|a, b| a.digest.cmp(&b.digest));
    Ok(units)
}
