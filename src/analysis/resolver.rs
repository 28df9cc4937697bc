// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Matches required libraries against the file listings of installed
//! packages, producing the package-level dependency view.

use path_clean::PathClean;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use super::libkey::LibraryKey;
use super::scanner::NeededLibraries;
use crate::db::InstalledPackage;

/// The outcome of matching all required libraries against the installed
/// packages.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Resolution {
    /// Package name → resolved library paths it supplies to this package.
    pub(crate) dependlist: BTreeMap<String, BTreeSet<String>>,
    /// Keys satisfied by a package that also declares the soname provision.
    pub(crate) owners: BTreeMap<LibraryKey, String>,
    /// Keys matched by file path only; the owning package never declares the
    /// provision. The linker still honors these, but the metadata is in debt.
    pub(crate) missing_provides: BTreeMap<LibraryKey, String>,
    /// Keys no installed package file was found to supply.
    pub(crate) orphans: Vec<LibraryKey>,
}

/// Match every required library against the installed package listings.
///
/// Requirements are canonicalized through the filesystem first (dereferencing
/// symlinks the way the runtime linker would), then compared against every
/// installed file whose path mentions `.so`, using exact equality or the
/// ldconfig-symlink rule: the candidate may extend the required path by a
/// strictly numeric dotted suffix (`libgpm.so.1` matches `libgpm.so.1.19.0`).
///
/// Only still-unmatched keys are tested, so the first providing package (in
/// the caller's enumeration order, which [`crate::db::LocalDatabase`] keeps
/// name-sorted) becomes the owner; later candidates are not recorded.
pub(crate) fn resolve(needed: &NeededLibraries, installed: &[InstalledPackage]) -> Resolution {
    let mut resolution = Resolution::default();

    let actual: BTreeMap<&LibraryKey, String> = needed
        .iter()
        .map(|(key, path)| (key, realpath(path)))
        .collect();
    let mut unmatched: BTreeSet<&LibraryKey> = needed.keys().collect();

    'packages: for package in installed {
        let declared: HashSet<LibraryKey> = package
            .provides()
            .iter()
            .filter_map(|entry| LibraryKey::parse(entry))
            .collect();
        for record in package.files() {
            if !record.path.contains(".so") {
                continue;
            }
            let matched: Vec<&LibraryKey> = unmatched
                .iter()
                .filter(|key| versioned_match(&record.path, &actual[**key]))
                .copied()
                .collect();
            for key in matched {
                resolution
                    .dependlist
                    .entry(package.name().to_string())
                    .or_default()
                    .insert(needed[key].clone());
                if declared.contains(key) {
                    resolution
                        .owners
                        .insert(key.clone(), package.name().to_string());
                } else {
                    resolution
                        .missing_provides
                        .insert(key.clone(), package.name().to_string());
                }
                unmatched.remove(key);
            }
            if unmatched.is_empty() {
                break 'packages;
            }
        }
    }

    resolution.orphans = unmatched.into_iter().cloned().collect();
    resolution
}

/// Canonicalize a package-relative path through the filesystem.
///
/// The path is rooted at `/`, symlinks are dereferenced where the target
/// exists on the analysis host, and the leading `/` is stripped again. A path
/// that does not exist is kept in cleaned form; a raw-name fallback therefore
/// passes through unchanged and later surfaces as an orphan.
fn realpath(path: &str) -> String {
    let rooted = Path::new("/").join(path).clean();
    let resolved = fs::canonicalize(&rooted).unwrap_or(rooted);
    resolved
        .strip_prefix("/")
        .unwrap_or(&resolved)
        .to_string_lossy()
        .into_owned()
}

/// The ldconfig-symlink matching rule.
///
/// Packages often ship only `libfoo.so.1.19.0` and rely on ldconfig to create
/// the `libfoo.so.1` symlink everything links against, so a candidate file
/// satisfies a requirement when it equals the required path exactly or
/// extends it by dot-separated, purely numeric segments. The suffix check is
/// anchored to the end of the candidate: `libgpm.so.1abc` must not match a
/// requirement for `libgpm.so.1`.
pub(crate) fn versioned_match(candidate: &str, required: &str) -> bool {
    match candidate.strip_prefix(required) {
        Some("") => true,
        Some(rest) => {
            rest.starts_with('.')
                && rest[1..]
                    .split('.')
                    .all(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
        }
        None => false,
    }
}
