// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Statistics calculation modules for ELF files and diagnostics.

mod diagnostics;
mod elf;

use serde::Serialize;

use crate::analysis::Diagnostic;
use crate::package::Package;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ReportTotals {
    pub(crate) files: usize,
    pub(crate) symlinks: usize,
    pub(crate) elfs: elf::Totals,
    pub(crate) diagnostics: diagnostics::Totals,
}

impl ReportTotals {
    #[must_use]
    pub(crate) fn new(package: &Package, diagnostics: &[Diagnostic]) -> Self {
        Self {
            files: package.files().len(),
            symlinks: package.symlinks().len(),
            elfs: elf::Totals::calculate(&package.elfs()),
            diagnostics: diagnostics::Totals::calculate(diagnostics),
        }
    }
}
