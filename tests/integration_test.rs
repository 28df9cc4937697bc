// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use std::fs;
use std::path::PathBuf;

use sodep_validator::analysis::{LibraryCache, Report};
use sodep_validator::db::LocalDatabase;
use sodep_validator::package::{Package, PackageFile};
use tempfile::TempDir;

fn get_fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Load the generated package fixture, returning None if it doesn't exist.
fn load_fixture_package() -> Option<Package> {
    let package_path = get_fixtures_dir().join("test.pkg.tar.gz");
    if !package_path.exists() {
        eprintln!(
            "Skipping test: fixture {} not found (gcc/bsdtar unavailable at build time)",
            package_path.display()
        );
        return None;
    }
    Some(Package::new(package_path).expect("Should extract package"))
}

/// Create a local database directory with one installed package that supplies
/// the fixture's library from a path that exists nowhere on the build host.
fn fake_local_database() -> (TempDir, LocalDatabase) {
    let db = TempDir::new().unwrap();
    let entry = db.path().join("zzzexample-1.2.3-1");
    fs::create_dir_all(&entry).unwrap();
    fs::write(
        entry.join("desc"),
        "%NAME%\n\
         zzzexample\n\
         \n\
         %VERSION%\n\
         1.2.3-1\n\
         \n\
         %PROVIDES%\n\
         libzzzexample.so=1-64\n\
         libzzzexample.so=1-32\n",
    )
    .unwrap();
    fs::write(
        entry.join("files"),
        "%FILES%\n\
         usr/\n\
         usr/lib/\n\
         usr/lib/zzz-external/\n\
         usr/lib/zzz-external/libzzzexample.so.1.2.3\n",
    )
    .unwrap();
    let database = LocalDatabase::open(db.path()).expect("Should open local database");
    (db, database)
}

/// Registry listing resolving the fixture library for both word sizes, to a
/// directory that does not exist on the build host (keeps canonicalization
/// deterministic).
fn external_cache() -> LibraryCache {
    LibraryCache::parse(
        "\tlibzzzexample.so.1 (libc6,x86-64) => /usr/lib/zzz-external/libzzzexample.so.1\n\
         \tlibzzzexample.so.1 (libc6) => /usr/lib/zzz-external/libzzzexample.so.1\n",
    )
}

#[test]
fn test_package_extraction() {
    let Some(package) = load_fixture_package() else {
        return;
    };

    assert_eq!(package.pkginfo().name(), "testpkg");
    assert_eq!(package.pkginfo().version(), "1.0-1");
    assert_eq!(package.pkginfo().depends(), &["glibc"]);

    let files = package.files();
    assert!(files.contains_key(&PathBuf::from("usr/bin/app")));
    assert!(files.contains_key(&PathBuf::from("usr/lib/libzzzexample.so.1.2.3")));

    // The versioned symlink resolves to the real library, package-relative.
    match files.get(&PathBuf::from("usr/lib/libzzzexample.so.1")) {
        Some(PackageFile::Symlink(target)) => {
            assert_eq!(target, &PathBuf::from("usr/lib/libzzzexample.so.1.2.3"));
        }
        other => panic!("Expected symlink fixture entry, got {other:?}"),
    }

    // Both the executable and the library parse as ELF.
    let elf_count = files
        .values()
        .filter(|f| matches!(f, PackageFile::Elf(_)))
        .count();
    assert_eq!(elf_count, 2);
}

#[test]
fn test_report_resolves_library_to_installed_package() {
    let Some(package) = load_fixture_package() else {
        return;
    };
    let (_db_dir, database) = fake_local_database();

    let report = Report::new(&package, &external_cache(), &database, None);

    // The library requirement resolves through the cache to the external
    // path, which the installed package supplies via a versioned file name.
    let supplied = report
        .dependlist()
        .get("zzzexample")
        .expect("fixture library should resolve to the installed package");
    assert!(supplied.contains("usr/lib/zzz-external/libzzzexample.so.1"));
    assert!(report.detected_deps().contains_key("zzzexample"));

    // .PKGINFO declares only `glibc`, so the soname dependency is detected
    // but not declared.
    assert!(report
        .diagnostics()
        .iter()
        .any(|d| d.code() == "libdepends-detected-not-included"));

    // libc.so.6 has no cache entry and no owner in the fake database.
    assert!(report
        .orphans()
        .iter()
        .any(|key| key.to_string().starts_with("libc.so=6-")));

    // The shipped library carries a DT_SONAME under usr/lib but .PKGINFO
    // declares no provision for it.
    assert!(report
        .diagnostics()
        .iter()
        .any(|d| d.code() == "libprovides-unsatisfied"));
}

#[test]
fn test_report_detects_internally_satisfied_requirement() {
    let Some(package) = load_fixture_package() else {
        return;
    };
    let (_db_dir, database) = fake_local_database();

    // Resolve the library to the versioned symlink the package itself ships:
    // the requirement is then satisfied inside the package and is neither a
    // dependency nor an orphan.
    let cache = LibraryCache::parse(
        "\tlibzzzexample.so.1 (libc6,x86-64) => /usr/lib/libzzzexample.so.1\n\
         \tlibzzzexample.so.1 (libc6) => /usr/lib/libzzzexample.so.1\n",
    );
    let report = Report::new(&package, &cache, &database, None);

    assert!(!report.dependlist().contains_key("zzzexample"));
    assert!(!report
        .orphans()
        .iter()
        .any(|key| key.to_string().starts_with("libzzzexample.so=")));

    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();
    let internal = json["internal"].as_object().unwrap();
    assert_eq!(internal.len(), 1);
    let (key, path) = internal.iter().next().unwrap();
    assert!(key.starts_with("libzzzexample.so=1-"));
    assert_eq!(path, "usr/lib/libzzzexample.so.1");
}

#[test]
fn test_report_json_shape() {
    let Some(package) = load_fixture_package() else {
        return;
    };
    let (_db_dir, database) = fake_local_database();
    let report = Report::new(&package, &external_cache(), &database, None);

    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();
    assert_eq!(json["name"], "testpkg");
    assert_eq!(json["version"], "1.0-1");
    assert!(json["totals"]["files"].as_u64().unwrap() >= 3);
    assert_eq!(json["totals"]["symlinks"], 1);
    assert_eq!(json["totals"]["elfs"]["total"], 2);
    // A PIE executable classifies as a shared object, so only the sum of the
    // two kinds is stable across toolchains.
    assert_eq!(
        json["totals"]["elfs"]["binaries"].as_u64().unwrap()
            + json["totals"]["elfs"]["shared_libraries"].as_u64().unwrap(),
        2
    );
    assert!(json["diagnostics"].as_array().unwrap().iter().all(|d| {
        d["severity"].is_string() && d["code"].is_string() && d["message"].is_string()
    }));
    // Every diagnostic severity sums into the totals.
    let totals = &json["totals"]["diagnostics"];
    assert_eq!(
        totals["info"].as_u64().unwrap()
            + totals["warning"].as_u64().unwrap()
            + totals["error"].as_u64().unwrap(),
        totals["total"].as_u64().unwrap()
    );
}
