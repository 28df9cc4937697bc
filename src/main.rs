// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
mod args;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::Path;

use args::Args;
use sodep_validator::analysis::{summarize_report, validate_report, LibraryCache, Report};
use sodep_validator::db::{LocalDatabase, SyncDatabase};
use sodep_validator::package::Package;

fn main() -> Result<()> {
    let args = Args::parse();
    let package = extract_package(&args.package)?;
    let cache = if args.skip_system_cache {
        LibraryCache::empty()
    } else {
        build_library_cache()
    };
    let database = LocalDatabase::open(&args.pacman_db).with_context(|| {
        format!(
            "Failed to read installed-package database: {}",
            args.pacman_db.display()
        )
    })?;
    let testing = args
        .testing_db
        .as_deref()
        .map(SyncDatabase::load)
        .transpose()
        .with_context(|| "Failed to read testing sync database")?;

    let report = Report::new(&package, &cache, &database, testing.as_ref());
    write_report_to_file(&report, &args.report)?;
    summarize_report(&report);
    validate_report(&report)
}

/// Get the package from a filepath.
///
/// # Errors
/// Returns an error if the package cannot be extracted or lacks metadata.
fn extract_package(path: &Path) -> Result<Package> {
    eprintln!("Extracting package: package={}", path.display());

    let package = Package::new(path.to_path_buf())
        .with_context(|| format!("Failed to extract package: {}", path.display()))?;

    eprintln!(
        "Extraction completed: package={}, files={}",
        path.display(),
        package.files().len()
    );
    Ok(package)
}

fn build_library_cache() -> LibraryCache {
    let cache = LibraryCache::from_system();
    eprintln!("Library cache built: entries={}", cache.len());
    cache
}

/// Write the report to a file.
///
/// # Errors
/// Returns an error if the report cannot be serialized to JSON or if the file cannot be created.
fn write_report_to_file(report: &Report<'_>, dest: &Path) -> Result<()> {
    eprintln!("Writing report to file: file={}", dest.display());
    let file = File::create(dest)
        .with_context(|| format!("Failed to create JSON output file: {}", dest.display()))?;
    serde_json::to_writer_pretty(file, report)
        .with_context(|| format!("Failed to serialize report to JSON: {}", dest.display()))?;
    Ok(())
}
