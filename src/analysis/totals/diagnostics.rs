// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use dashmap::DashSet;
use rayon::prelude::*;
use serde::Serialize;
use std::ops::Add;

use crate::analysis::{Diagnostic, Severity};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Totals {
    pub(crate) info: usize,
    pub(crate) warning: usize,
    pub(crate) error: usize,
    pub(crate) libraries_flagged: usize,
    pub(crate) total: usize,
}

impl Totals {
    pub(crate) fn calculate(diagnostics: &[Diagnostic]) -> Self {
        let libraries = DashSet::new();
        let mut totals = diagnostics
            .par_iter()
            .fold(Totals::default, |mut totals, diagnostic| {
                match diagnostic.severity() {
                    Severity::Info => totals.info += 1,
                    Severity::Warning => totals.warning += 1,
                    Severity::Error => totals.error += 1,
                }
                if let Some(library) = diagnostic.library() {
                    libraries.insert(library);
                }
                totals
            })
            .reduce(Totals::default, |a, b| a + b);
        totals.libraries_flagged = libraries.len();
        totals
    }
}

impl Add for Totals {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let info = self.info + other.info;
        let warning = self.warning + other.warning;
        let error = self.error + other.error;
        Self {
            info,
            warning,
            error,
            libraries_flagged: 0, // Handled by the calculate function.
            total: info + warning + error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate() {
        let diagnostics = vec![
            Diagnostic::LibraryNoPackageAssociated {
                library: "libbar.so.5".to_string(),
                files: vec![],
            },
            Diagnostic::LibDependsSatisfied {
                library: "libzzzfoo.so=2-64".to_string(),
                package: "q".to_string(),
                files: vec![],
            },
            Diagnostic::LibDependsWithoutVersion {
                entry: "libfoo.so".to_string(),
            },
        ];
        let totals = Totals::calculate(&diagnostics);
        assert_eq!(totals.info, 1);
        assert_eq!(totals.warning, 1);
        assert_eq!(totals.error, 1);
        assert_eq!(totals.total, 3);
        assert_eq!(totals.libraries_flagged, 2);
    }
}
