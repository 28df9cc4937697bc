// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Report struct and public API for analyzing a package's shared-library
//! dependencies.

mod console;
mod diagnostics;
mod libcache;
mod libkey;
mod reporter;
mod resolver;
mod scanner;
mod totals;
mod utils;
mod validate;

pub use console::summarize_report;
pub use diagnostics::{Diagnostic, Severity};
pub use libcache::LibraryCache;
pub use libkey::LibraryKey;
pub use reporter::DependencyReason;
pub use validate::validate_report;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use crate::db::{LocalDatabase, SyncDatabase};
use crate::package::{Elf, Package};
use reporter::DependencyReasons;
use resolver::resolve;
use scanner::scan_package;
use totals::ReportTotals;

// Use BTreeMap to ensure alphabetical order of files when serializing to JSON.
type ReportFiles<'a> = BTreeMap<&'a Path, &'a Elf>;

/// The full analysis result for one package.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    package: String,
    name: String,
    version: String,
    totals: ReportTotals,
    diagnostics: Vec<Diagnostic>,
    /// Package name → resolved library paths it supplies.
    dependlist: BTreeMap<String, BTreeSet<String>>,
    /// Structured per-package dependency explanations.
    detected_deps: DependencyReasons,
    /// Requirements satisfied by the analyzed package's own files
    /// (rendered key → package-internal path); no external dependency.
    internal: BTreeMap<String, String>,
    /// Requirements with no known owner on the system.
    orphans: Vec<LibraryKey>,
    files: ReportFiles<'a>,
}

impl<'a> Report<'a> {
    /// Analyze a package: scan its binaries, resolve the requirements against
    /// the installed packages, and reconcile against the declared metadata.
    ///
    /// The library cache is built once by the caller and is immutable here;
    /// pass [`LibraryCache::empty`] to analyze without the system registry.
    #[must_use]
    pub fn new(
        package: &'a Package,
        cache: &LibraryCache,
        database: &LocalDatabase,
        testing: Option<&SyncDatabase>,
    ) -> Self {
        let mut scan = scan_package(package, cache);

        // A requirement resolved to a file the package itself ships (via its
        // search-path overrides, or a cache path the package happens to
        // provide) is satisfied internally and takes no part in resolution.
        let file_set: HashSet<String> = package
            .files()
            .keys()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        let internal_keys: Vec<LibraryKey> = scan
            .needed
            .iter()
            .filter(|(_, path)| file_set.contains(*path))
            .map(|(key, _)| key.clone())
            .collect();
        let mut internal = BTreeMap::new();
        for key in internal_keys {
            if let Some(path) = scan.needed.remove(&key) {
                internal.insert(key.to_string(), path);
            }
        }

        let resolution = resolve(&scan.needed, database.packages());
        let (diagnostics, detected_deps) =
            reporter::reconcile(package, &scan, &resolution, database, testing);
        let totals = ReportTotals::new(package, &diagnostics);

        Self {
            package: package
                .path()
                .canonicalize()
                .unwrap_or_else(|_| package.path().to_path_buf())
                .to_string_lossy()
                .to_string(),
            name: package.pkginfo().name().to_string(),
            version: package.pkginfo().version().to_string(),
            totals,
            diagnostics,
            dependlist: resolution.dependlist,
            detected_deps,
            internal,
            orphans: resolution.orphans,
            files: package.elfs().into_iter().collect(),
        }
    }

    /// The diagnostics, in emission order.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The resolved per-package dependency list.
    #[must_use]
    pub fn dependlist(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.dependlist
    }

    /// The structured dependency reasons for higher-level consumers.
    #[must_use]
    pub fn detected_deps(&self) -> &DependencyReasons {
        &self.detected_deps
    }

    /// The orphaned requirements.
    #[must_use]
    pub fn orphans(&self) -> &[LibraryKey] {
        &self.orphans
    }
}
