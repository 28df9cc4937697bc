// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Cross-references the resolved dependency view against the package's own
//! declared metadata and produces the ordered diagnostic sequence.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::diagnostics::Diagnostic;
use super::libkey::LibraryKey;
use super::resolver::Resolution;
use super::scanner::ScanResult;
use crate::db::{LocalDatabase, SyncDatabase};
use crate::package::Package;

/// Structured explanation of why the analyzed package depends on another
/// package, attached to the report for higher-level consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyReason {
    /// The resolved library paths the other package supplies.
    pub libraries: Vec<String>,
    /// The package files that need those libraries.
    pub needed_by: Vec<String>,
}

pub(crate) type DependencyReasons = BTreeMap<String, Vec<DependencyReason>>;

/// Produce the diagnostic sequence and the per-package dependency reasons.
///
/// Every categorization rule is independent; none short-circuits another. The
/// ordering of the sequence is deterministic: rules run in a fixed order and
/// each iterates its inputs in sorted order.
pub(crate) fn reconcile(
    package: &Package,
    scan: &ScanResult,
    resolution: &Resolution,
    local: &LocalDatabase,
    testing: Option<&SyncDatabase>,
) -> (Vec<Diagnostic>, DependencyReasons) {
    let mut diagnostics = Vec::new();
    let mut reasons = DependencyReasons::new();
    let pkginfo = package.pkginfo();

    // Unanalyzable ELF files first; one error per file, the run continues.
    let mut invalid = package.invalid_files();
    invalid.sort_by_key(|(path, _)| *path);
    for (path, reason) in invalid {
        diagnostics.push(Diagnostic::UnrecognizedElfClass {
            file: path.to_string_lossy().into_owned(),
            reason: reason.to_string(),
        });
    }

    // Requirements satisfied by the analyzed package itself are not external
    // dependencies; drop them from the declaration bookkeeping.
    let owners: BTreeMap<&LibraryKey, &str> = resolution
        .owners
        .iter()
        .filter(|(_, owner)| *owner != pkginfo.name())
        .map(|(key, owner)| (key, owner.as_str()))
        .collect();
    let missing_provides: BTreeMap<&LibraryKey, &str> = resolution
        .missing_provides
        .iter()
        .filter(|(_, owner)| *owner != pkginfo.name())
        .map(|(key, owner)| (key, owner.as_str()))
        .collect();

    for key in &resolution.orphans {
        let library = scan.needed.get(key).cloned().unwrap_or_default();
        diagnostics.push(Diagnostic::LibraryNoPackageAssociated {
            files: requesting_files(scan, key),
            library,
        });
    }

    for (key, owner) in &missing_provides {
        diagnostics.push(Diagnostic::LibDependsMissingProvides {
            library: key.to_string(),
            package: (*owner).to_string(),
            files: requesting_files(scan, key),
        });
    }

    for (supplier, libraries) in &resolution.dependlist {
        let libraries: Vec<String> = libraries.iter().cloned().collect();
        let needed_by: BTreeSet<String> = libraries
            .iter()
            .filter_map(|library| scan.requesters.get(library))
            .flatten()
            .cloned()
            .collect();
        reasons.entry(supplier.clone()).or_default().push(DependencyReason {
            libraries: libraries.clone(),
            needed_by: needed_by.into_iter().collect(),
        });
        diagnostics.push(Diagnostic::LinkLevelDependence {
            package: supplier.clone(),
            libraries,
        });
    }

    let declared_depends: HashSet<LibraryKey> =
        pkginfo.depends().iter().filter_map(|e| LibraryKey::parse(e)).collect();
    let declared_optdepends: HashSet<LibraryKey> = pkginfo
        .optdepend_names()
        .filter_map(LibraryKey::parse)
        .collect();
    for (key, owner) in &owners {
        let library = key.to_string();
        let package_name = (*owner).to_string();
        let files = requesting_files(scan, key);
        diagnostics.push(if declared_depends.contains(*key) {
            Diagnostic::LibDependsSatisfied {
                library,
                package: package_name,
                files,
            }
        } else if declared_optdepends.contains(*key) {
            Diagnostic::LibDependsOptional {
                library,
                package: package_name,
                files,
            }
        } else {
            Diagnostic::LibDependsNotIncluded {
                library,
                package: package_name,
                files,
            }
        });
    }

    for entry in pkginfo.depends() {
        if entry.contains(".so") {
            let satisfied = LibraryKey::parse(entry)
                .is_some_and(|key| owners.contains_key(&key));
            if !satisfied {
                diagnostics.push(Diagnostic::LibDependsNotNeeded {
                    entry: entry.clone(),
                });
            }
            if entry.ends_with(".so") {
                diagnostics.push(Diagnostic::LibDependsWithoutVersion {
                    entry: entry.clone(),
                });
            }
        }
    }

    // One aggregate line suitable for diffing against the PKGBUILD: soname
    // keys where the owner declares them, plain package names where it does
    // not (those can only be depended on by name).
    let inferred: BTreeSet<String> = owners
        .keys()
        .map(ToString::to_string)
        .chain(missing_provides.values().map(ToString::to_string))
        .collect();
    diagnostics.push(Diagnostic::LibDependsSummary {
        depends: inferred.into_iter().collect::<Vec<_>>().join(" "),
    });

    let declared_provides: HashSet<LibraryKey> =
        pkginfo.provides().iter().filter_map(|e| LibraryKey::parse(e)).collect();
    for (key, files) in &scan.provided {
        let library = key.to_string();
        let files: Vec<String> = files.iter().cloned().collect();
        diagnostics.push(if declared_provides.contains(key) {
            Diagnostic::LibProvidesSatisfied { library, files }
        } else {
            Diagnostic::LibProvidesUnsatisfied { library, files }
        });
    }

    for entry in pkginfo.provides() {
        if entry.contains(".so") {
            let backed = LibraryKey::parse(entry)
                .is_some_and(|key| scan.provided.contains_key(&key));
            if !backed {
                diagnostics.push(Diagnostic::LibProvidesMissing {
                    entry: entry.clone(),
                });
            }
            if entry.ends_with(".so") {
                diagnostics.push(Diagnostic::LibProvidesWithoutVersion {
                    entry: entry.clone(),
                });
            }
        }
    }

    let provided: Vec<String> = scan.provided.keys().map(ToString::to_string).collect();
    diagnostics.push(Diagnostic::LibProvidesSummary {
        provides: provided.join(" "),
    });

    // A supplier that sits in the testing repository at the very version
    // installed locally is pending promotion; depending on it is worth a
    // warning.
    if let Some(testing) = testing {
        for supplier in resolution.dependlist.keys() {
            if let (Some(testing_version), Some(local_version)) =
                (testing.version_of(supplier), local.version_of(supplier))
            {
                if testing_version == local_version {
                    diagnostics.push(Diagnostic::DependencyIsTestingRelease {
                        package: supplier.clone(),
                    });
                }
            }
        }
    }

    (diagnostics, reasons)
}

fn requesting_files(scan: &ScanResult, key: &LibraryKey) -> Vec<String> {
    scan.needed
        .get(key)
        .and_then(|path| scan.requesters.get(path))
        .map(|files| files.iter().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::libcache::LibraryCache;
    use crate::analysis::resolver::resolve;
    use crate::analysis::scanner::scan_package;
    use crate::db::InstalledPackage;
    use crate::package::{Elf, ElfClass, ElfType, PackageFile, PackageFiles, PkgInfo};
    use std::path::PathBuf;

    fn package_of(
        files: Vec<(&str, PackageFile)>,
        depends: &[&str],
        optdepends: &[&str],
        provides: &[&str],
    ) -> Package {
        let files: PackageFiles = files
            .into_iter()
            .map(|(path, file)| (PathBuf::from(path), file))
            .collect();
        Package::new_for_testing(
            PathBuf::from("/test/app-1.0-1-x86_64.pkg.tar.zst"),
            files,
            PkgInfo::new_for_testing("app", "1.0-1", depends, optdepends, provides),
        )
    }

    fn app_binary(dependencies: &[&str]) -> PackageFile {
        PackageFile::Elf(Elf::new_for_testing(
            ElfType::Executable,
            ElfClass::Elf64,
            None,
            dependencies,
            &[],
            &[],
        ))
    }

    fn supplier_q() -> InstalledPackage {
        InstalledPackage::new_for_testing(
            "q",
            "2.0.1-1",
            &["usr/", "usr/lib/", "usr/lib/libzzzfoo.so.2.0.1"],
            &["libzzzfoo.so=2-64"],
        )
    }

    fn run(
        package: &Package,
        installed: Vec<InstalledPackage>,
        testing: Option<&SyncDatabase>,
    ) -> (Vec<Diagnostic>, DependencyReasons) {
        let cache = LibraryCache::parse(
            "\tlibzzzfoo.so.2 (libc6,x86-64) => /usr/lib/libzzzfoo.so.2\n",
        );
        let scan = scan_package(package, &cache);
        let local = LocalDatabase::new_for_testing(installed);
        let resolution = resolve(&scan.needed, local.packages());
        reconcile(package, &scan, &resolution, &local, testing)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<&'static str> {
        diagnostics.iter().map(Diagnostic::code).collect()
    }

    #[test]
    fn test_detected_and_declared_satisfied() {
        let package = package_of(
            vec![("usr/bin/app", app_binary(&["libzzzfoo.so.2"]))],
            &["libzzzfoo.so=2-64"],
            &[],
            &[],
        );
        let (diagnostics, reasons) = run(&package, vec![supplier_q()], None);

        assert!(codes(&diagnostics).contains(&"libdepends-detected-satisfied"));
        assert!(!codes(&diagnostics).contains(&"libdepends-detected-not-included"));
        assert!(codes(&diagnostics).contains(&"link-level-dependence"));

        let reason = &reasons.get("q").unwrap()[0];
        assert_eq!(reason.libraries, vec!["usr/lib/libzzzfoo.so.2"]);
        assert_eq!(reason.needed_by, vec!["usr/bin/app"]);
    }

    #[test]
    fn test_detected_but_not_declared() {
        let package = package_of(
            vec![("usr/bin/app", app_binary(&["libzzzfoo.so.2"]))],
            &[],
            &[],
            &[],
        );
        let (diagnostics, _) = run(&package, vec![supplier_q()], None);
        assert!(codes(&diagnostics).contains(&"libdepends-detected-not-included"));
    }

    #[test]
    fn test_detected_but_optional() {
        let package = package_of(
            vec![("usr/bin/app", app_binary(&["libzzzfoo.so.2"]))],
            &[],
            &["libzzzfoo.so=2-64: mouse support"],
            &[],
        );
        let (diagnostics, _) = run(&package, vec![supplier_q()], None);
        assert!(codes(&diagnostics).contains(&"libdepends-detected-but-optional"));
        assert!(!codes(&diagnostics).contains(&"libdepends-detected-satisfied"));
    }

    #[test]
    fn test_orphan_warning() {
        let package = package_of(
            vec![("usr/bin/app", app_binary(&["libzzzbar.so.5"]))],
            &[],
            &[],
            &[],
        );
        let (diagnostics, _) = run(&package, vec![supplier_q()], None);
        let orphan = diagnostics
            .iter()
            .find(|d| d.code() == "library-no-package-associated")
            .expect("orphan warning expected");
        match orphan {
            Diagnostic::LibraryNoPackageAssociated { library, files } => {
                assert_eq!(library, "libzzzbar.so.5");
                assert_eq!(files, &vec!["usr/bin/app".to_string()]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_missing_provides_note() {
        let supplier = InstalledPackage::new_for_testing(
            "q",
            "2.0.1-1",
            &["usr/lib/libzzzfoo.so.2.0.1"],
            &[],
        );
        let package = package_of(
            vec![("usr/bin/app", app_binary(&["libzzzfoo.so.2"]))],
            &[],
            &[],
            &[],
        );
        let (diagnostics, _) = run(&package, vec![supplier], None);
        let note = diagnostics
            .iter()
            .find(|d| d.code() == "libdepends-missing-provides")
            .expect("missing-provides note expected");
        match note {
            Diagnostic::LibDependsMissingProvides { package, .. } => assert_eq!(package, "q"),
            _ => unreachable!(),
        }
        // The aggregate line suggests the owning package by name instead.
        let summary = diagnostics
            .iter()
            .find(|d| d.code() == "libdepends-as-detected")
            .unwrap();
        match summary {
            Diagnostic::LibDependsSummary { depends } => assert_eq!(depends, "q"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_versionless_declarations() {
        let package = package_of(
            vec![("usr/bin/app", app_binary(&[]))],
            &["libzzzfoo.so"],
            &[],
            &["libother.so"],
        );
        let (diagnostics, _) = run(&package, vec![], None);
        let codes = codes(&diagnostics);
        assert_eq!(
            codes
                .iter()
                .filter(|c| **c == "libdepends-without-version")
                .count(),
            1
        );
        assert_eq!(
            codes
                .iter()
                .filter(|c| **c == "libprovides-without-version")
                .count(),
            1
        );
        // A versionless .so dependency is also never satisfied.
        assert!(codes.contains(&"libdepends-not-needed"));
        assert!(codes.contains(&"libprovides-missing"));
    }

    #[test]
    fn test_declared_dependency_not_needed() {
        let package = package_of(
            vec![("usr/bin/app", app_binary(&[]))],
            &["libzzzfoo.so=2-64", "glibc"],
            &[],
            &[],
        );
        let (diagnostics, _) = run(&package, vec![supplier_q()], None);
        let not_needed: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code() == "libdepends-not-needed")
            .collect();
        // Only the .so entry is checked; plain package names are ignored.
        assert_eq!(not_needed.len(), 1);
    }

    #[test]
    fn test_provides_satisfied_and_unsatisfied() {
        let lib = PackageFile::Elf(Elf::new_for_testing(
            ElfType::SharedObject,
            ElfClass::Elf64,
            Some("libmine.so.3"),
            &[],
            &[],
            &[],
        ));
        let declared = package_of(
            vec![("usr/lib/libmine.so.3.1.0", lib.clone())],
            &[],
            &[],
            &["libmine.so=3-64"],
        );
        let (diagnostics, _) = run(&declared, vec![], None);
        assert!(codes(&diagnostics).contains(&"libprovides-satisfied"));

        let undeclared = package_of(vec![("usr/lib/libmine.so.3.1.0", lib)], &[], &[], &[]);
        let (diagnostics, _) = run(&undeclared, vec![], None);
        assert!(codes(&diagnostics).contains(&"libprovides-unsatisfied"));
        let summary = diagnostics
            .iter()
            .find(|d| d.code() == "libprovides-as-detected")
            .unwrap();
        match summary {
            Diagnostic::LibProvidesSummary { provides } => {
                assert_eq!(provides, "libmine.so=3-64");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_internal_supplier_is_filtered() {
        // The analyzed package is itself installed (an older build): its own
        // name must not show up in the declaration bookkeeping.
        let installed_self = InstalledPackage::new_for_testing(
            "app",
            "0.9-1",
            &["usr/lib/libzzzfoo.so.2.0.0"],
            &["libzzzfoo.so=2-64"],
        );
        let package = package_of(
            vec![("usr/bin/app", app_binary(&["libzzzfoo.so.2"]))],
            &[],
            &[],
            &[],
        );
        let (diagnostics, _) = run(&package, vec![installed_self], None);
        let codes = codes(&diagnostics);
        assert!(!codes.contains(&"libdepends-detected-not-included"));
        let summary = diagnostics
            .iter()
            .find(|d| d.code() == "libdepends-as-detected")
            .unwrap();
        match summary {
            Diagnostic::LibDependsSummary { depends } => assert_eq!(depends, ""),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_testing_release_warning() {
        let package = package_of(
            vec![("usr/bin/app", app_binary(&["libzzzfoo.so.2"]))],
            &["libzzzfoo.so=2-64"],
            &[],
            &[],
        );
        let testing = SyncDatabase::new_for_testing(&[("q", "2.0.1-1")]);
        let (diagnostics, _) = run(&package, vec![supplier_q()], Some(&testing));
        assert!(codes(&diagnostics).contains(&"dependency-is-testing-release"));

        // A different version in testing means the local copy is not the
        // pending one; no warning.
        let testing = SyncDatabase::new_for_testing(&[("q", "2.0.2-1")]);
        let (diagnostics, _) = run(&package, vec![supplier_q()], Some(&testing));
        assert!(!codes(&diagnostics).contains(&"dependency-is-testing-release"));
    }

    #[test]
    fn test_unrecognized_elf_class_reported() {
        let package = package_of(
            vec![(
                "usr/bin/strange",
                PackageFile::Invalid("Unsupported ELF class 7".to_string()),
            )],
            &[],
            &[],
            &[],
        );
        let (diagnostics, _) = run(&package, vec![], None);
        assert_eq!(diagnostics[0].code(), "unrecognized-elf-class");
        assert_eq!(diagnostics[0].severity(), crate::analysis::Severity::Error);
    }

    #[test]
    fn test_diagnostic_sequence_is_deterministic() {
        let package = package_of(
            vec![
                ("usr/bin/app", app_binary(&["libzzzfoo.so.2"])),
                ("usr/bin/other", app_binary(&["libzzzbar.so.5"])),
            ],
            &["libzzzfoo.so=2-64"],
            &[],
            &[],
        );
        let (first, _) = run(&package, vec![supplier_q()], None);
        let (second, _) = run(&package, vec![supplier_q()], None);
        assert_eq!(first, second);
    }
}
