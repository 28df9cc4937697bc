// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Validates reports and fails when error diagnostics are present.

use super::{Report, Severity};
use anyhow::Result;

/// Validate the report.
///
/// Warnings and infos are acceptable outcomes of an analysis; only
/// error-severity diagnostics (metadata declared without versions,
/// unanalyzable binaries) fail validation.
///
/// # Errors
/// Returns an error if error diagnostics are present.
pub fn validate_report(report: &Report<'_>) -> Result<()> {
    if report.totals.diagnostics.error > 0 {
        for diagnostic in &report.diagnostics {
            if diagnostic.severity() == Severity::Error {
                eprintln!("ERROR: {}: {}", diagnostic.code(), diagnostic);
            }
        }
        return Err(anyhow::anyhow!(
            "Error diagnostics found in the report: {} error(s)",
            report.totals.diagnostics.error
        ));
    }
    Ok(())
}
