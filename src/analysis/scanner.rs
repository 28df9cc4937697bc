// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Scans the package's ELF files and accumulates the package-wide maps of
//! needed libraries, requesting files, and provided libraries.

use path_clean::PathClean;
use rayon::prelude::*;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use super::libcache::LibraryCache;
use super::libkey::LibraryKey;
use crate::package::{Elf, Package};

/// Directories whose shared objects count as library provisions. A `DT_SONAME`
/// in a file anywhere else cannot satisfy a runtime dependency by soname.
const LIBRARY_DIRS: [&str; 2] = ["usr/lib", "usr/lib32"];

/// Required library → resolved path (package-relative, no leading `/`).
///
/// The path falls back to the raw linkage name when neither an override nor a
/// cache entry exists; such a path virtually never matches an installed file
/// and surfaces as an orphan after resolution.
pub(crate) type NeededLibraries = BTreeMap<LibraryKey, String>;

/// Resolved path → package files that require it.
pub(crate) type RequesterIndex = BTreeMap<String, BTreeSet<String>>;

/// Provided library → package files that declare it via `DT_SONAME`.
pub(crate) type ProvidedLibraries = BTreeMap<LibraryKey, BTreeSet<String>>;

/// Package-wide accumulation of one scan pass.
#[derive(Debug, Default)]
pub(crate) struct ScanResult {
    pub(crate) needed: NeededLibraries,
    pub(crate) requesters: RequesterIndex,
    pub(crate) provided: ProvidedLibraries,
}

impl ScanResult {
    fn merge(mut self, other: Self) -> Self {
        // Two files can resolve the same key to different paths (one via an
        // override, one via the cache). Keep the lexicographically smallest
        // so the merged view does not depend on the parallel join order.
        for (key, path) in other.needed {
            match self.needed.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(path);
                }
                Entry::Occupied(mut entry) => {
                    if path < *entry.get() {
                        entry.insert(path);
                    }
                }
            }
        }
        for (path, files) in other.requesters {
            self.requesters.entry(path).or_default().extend(files);
        }
        for (key, files) in other.provided {
            self.provided.entry(key).or_default().extend(files);
        }
        self
    }
}

/// Scan every ELF file of the package.
///
/// Files are scanned in parallel; each file accumulates into a private
/// [`ScanResult`] and the partial results are merged after the join, so no
/// ordering is assumed between files. Resolution consults the per-file
/// search-path overrides first, then the class-appropriate cache, then falls
/// back to the raw linkage name.
pub(crate) fn scan_package(package: &Package, cache: &LibraryCache) -> ScanResult {
    let so_files = package.so_files();
    package
        .elfs()
        .par_iter()
        .map(|(path, elf)| {
            let overrides = search_path_overrides(path, elf, &so_files);
            scan_file(path, elf, &overrides, cache)
        })
        .reduce(ScanResult::default, ScanResult::merge)
}

/// Compute the override map of one ELF file from its embedded search paths.
///
/// Every shared object of the package whose directory is named by the file's
/// normalized `RPATH`/`RUNPATH` entries is resolvable without the system
/// cache; the resulting map sends its bare file name to its package-internal
/// path.
fn search_path_overrides(
    logical_path: &Path,
    elf: &Elf,
    so_files: &[String],
) -> HashMap<String, String> {
    let origin = Path::new("/").join(logical_path.parent().unwrap_or_else(|| Path::new("")));
    let search_paths = elf.normalize_paths(&origin.clean());
    if search_paths.is_empty() {
        return HashMap::new();
    }

    let mut overrides = HashMap::new();
    for so_file in so_files {
        let so_path = Path::new(so_file);
        let Some(file_name) = so_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let dir = Path::new("/").join(so_path.parent().unwrap_or_else(|| Path::new("")));
        if search_paths.iter().any(|p| *p == dir) {
            overrides.insert(file_name.to_string(), so_file.clone());
        }
    }
    overrides
}

fn scan_file(
    logical_path: &Path,
    elf: &Elf,
    overrides: &HashMap<String, String>,
    cache: &LibraryCache,
) -> ScanResult {
    let mut result = ScanResult::default();
    let class = elf.class();
    let logical = logical_path.to_string_lossy().into_owned();

    // A DT_SONAME only counts as a provision for files living in the standard
    // library directories.
    if let Some(soname) = elf.soname() {
        if in_library_dir(logical_path) {
            result
                .provided
                .entry(LibraryKey::from_link_name(soname, class))
                .or_default()
                .insert(logical.clone());
        }
    }

    for dependency in elf.dependencies() {
        let key = LibraryKey::from_link_name(dependency, class);
        let resolved = match overrides.get(dependency) {
            Some(path) => path.clone(),
            None => match cache.lookup(class, dependency) {
                Some(path) => strip_root(path),
                // No override and no cache entry: keep the raw name so the
                // requirement still carries a path and failure detection is
                // deferred to resolution.
                None => dependency.clone(),
            },
        };
        result.needed.insert(key, resolved.clone());
        result
            .requesters
            .entry(resolved)
            .or_default()
            .insert(logical.clone());
    }
    result
}

fn in_library_dir(logical_path: &Path) -> bool {
    logical_path
        .parent()
        .and_then(Path::to_str)
        .is_some_and(|dir| LIBRARY_DIRS.contains(&dir))
}

/// Convert an absolute cache path into the package-relative convention.
fn strip_root(path: &Path) -> String {
    let cleaned: PathBuf = path.clean();
    cleaned
        .strip_prefix("/")
        .unwrap_or(&cleaned)
        .to_string_lossy()
        .into_owned()
}
