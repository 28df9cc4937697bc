// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Formats and prints report summaries to the console.

use comfy_table::{Cell, Table};
use std::path::Path;

use super::utils::find_common_prefix;
use super::{Diagnostic, Report};

/// Summarize the report to the console.
///
/// Prints package info, ELF statistics, diagnostic statistics, the diagnostic
/// lines themselves, and a table of orphaned libraries if any were found.
pub fn summarize_report(report: &Report<'_>) {
    println!("Package: {} ({}-{})", report.package, report.name, report.version);
    println!(
        "Total files: {} ({} symlinks)\n",
        report.totals.files, report.totals.symlinks
    );

    println!("{}\n", elf_table(report));
    println!("{}\n", diagnostics_table(report));

    for diagnostic in &report.diagnostics {
        println!(
            "{} {}: {}",
            report.name,
            diagnostic.severity().tag(),
            diagnostic
        );
    }

    let orphans = orphaned_libraries(report);
    if !orphans.is_empty() {
        println!("\n{}", orphans_table(&orphans));
        println!("\nTotal: {} orphaned library requirement(s)", orphans.len());
    }
}

/// Create a table with the default preset styling.
fn default_table_preset() -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL_CONDENSED)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
    table
}

/// Create a table showing ELF file statistics.
fn elf_table(report: &Report) -> Table {
    let mut table = default_table_preset();
    table
        .set_header(vec![
            Cell::new("ELF Type").add_attribute(comfy_table::Attribute::Bold),
            Cell::new("Count").add_attribute(comfy_table::Attribute::Bold),
        ])
        .add_row(vec![
            Cell::new("Binaries"),
            Cell::new(report.totals.elfs.binaries),
        ])
        .add_row(vec![
            Cell::new("Shared libraries"),
            Cell::new(report.totals.elfs.shared_libraries),
        ])
        .add_row(vec![
            Cell::new("Relocatable"),
            Cell::new(report.totals.elfs.relocatable),
        ])
        .add_row(vec![Cell::new("Core"), Cell::new(report.totals.elfs.core)])
        .add_row(vec![Cell::new("None"), Cell::new(report.totals.elfs.none)])
        .add_row(vec![
            Cell::new("32-bit"),
            Cell::new(report.totals.elfs.elf32),
        ])
        .add_row(vec![
            Cell::new("64-bit"),
            Cell::new(report.totals.elfs.elf64),
        ])
        .add_row(vec![
            Cell::new("Total").add_attribute(comfy_table::Attribute::Bold),
            Cell::new(report.totals.elfs.total).add_attribute(comfy_table::Attribute::Bold),
        ]);
    table
}

/// Create a table showing diagnostic severity statistics.
fn diagnostics_table(report: &Report) -> Table {
    let mut table = default_table_preset();
    table
        .set_header(vec![
            Cell::new("Diagnostics").add_attribute(comfy_table::Attribute::Bold),
            Cell::new("Count").add_attribute(comfy_table::Attribute::Bold),
        ])
        .add_row(vec![
            Cell::new("Info"),
            Cell::new(report.totals.diagnostics.info),
        ])
        .add_row(vec![
            Cell::new("Warning"),
            Cell::new(report.totals.diagnostics.warning),
        ])
        .add_row(vec![
            Cell::new("Error"),
            Cell::new(report.totals.diagnostics.error),
        ])
        .add_row(vec![
            Cell::new("Libraries flagged"),
            Cell::new(report.totals.diagnostics.libraries_flagged),
        ])
        .add_row(vec![
            Cell::new("Total").add_attribute(comfy_table::Attribute::Bold),
            Cell::new(report.totals.diagnostics.total)
                .add_attribute(comfy_table::Attribute::Bold),
        ]);
    table
}

/// Collect orphaned library requirements with their requesting files.
fn orphaned_libraries<'a>(report: &'a Report) -> Vec<(&'a str, &'a [String])> {
    report
        .diagnostics
        .iter()
        .filter_map(|diagnostic| match diagnostic {
            Diagnostic::LibraryNoPackageAssociated { library, files } => {
                Some((library.as_str(), files.as_slice()))
            }
            _ => None,
        })
        .collect()
}

/// Create a table showing orphaned libraries and the files that need them.
fn orphans_table(orphans: &[(&str, &[String])]) -> Table {
    // Find common prefix of the requesting files to strip for cleaner display.
    let paths: Vec<&Path> = orphans
        .iter()
        .flat_map(|(_, files)| files.iter().map(Path::new))
        .collect();
    let common_prefix = find_common_prefix(&paths);

    let mut table = default_table_preset();
    table.set_header(vec![
        Cell::new("Orphaned Library").add_attribute(comfy_table::Attribute::Bold),
        Cell::new("Needed By").add_attribute(comfy_table::Attribute::Bold),
    ]);

    for (library, files) in orphans {
        let files_str = files
            .iter()
            .map(|file| {
                let path = Path::new(file);
                let display = match &common_prefix {
                    Some(prefix) => path.strip_prefix(prefix).unwrap_or(path),
                    None => path,
                };
                display.to_string_lossy().into_owned()
            })
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![Cell::new(library), Cell::new(files_str)]);
    }
    table
}
