// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Build script to generate test fixtures for the `sodep_validator` crate.
//!
//! This script attempts to generate a minimal binary package archive
//! containing an executable and a shared library (requires gcc + bsdtar).
//!
//! If required tools are not available, the script skips fixture generation
//! and emits warnings. Tests gracefully skip when fixtures are missing.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Check if a command is available in PATH.
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run a command, returning false (with a warning) on any failure.
fn run(description: &str, command: &mut Command) -> bool {
    match command.output() {
        Ok(output) if output.status.success() => true,
        Ok(output) => {
            println!(
                "cargo:warning=Fixture step failed ({description}): {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            false
        }
        Err(e) => {
            println!("cargo:warning=Fixture step failed ({description}): {e}");
            false
        }
    }
}

fn generate_package_fixture(fixtures: &Path, out_dir: &Path) {
    if !command_exists("gcc") || !command_exists("bsdtar") {
        println!(
            "cargo:warning=Skipping package fixture generation: gcc and/or bsdtar not available"
        );
        return;
    }

    let work = out_dir.join("fixture-build");
    let _ = fs::remove_dir_all(&work);
    if let Err(e) = fs::create_dir_all(&work) {
        println!("cargo:warning=Failed to create fixture work directory: {e}");
        return;
    }

    // A shared library carrying an SONAME, and an executable linking it.
    let lib_c = work.join("lib.c");
    let app_c = work.join("app.c");
    if fs::write(&lib_c, "int zzzexample_answer(void) { return 42; }\n").is_err()
        || fs::write(
            &app_c,
            "int zzzexample_answer(void);\nint main(void) { return zzzexample_answer(); }\n",
        )
        .is_err()
    {
        println!("cargo:warning=Failed to write fixture sources");
        return;
    }

    let lib_real = work.join("libzzzexample.so.1.2.3");
    if !run(
        "compile shared library",
        Command::new("gcc")
            .arg("-shared")
            .arg("-fPIC")
            .arg("-Wl,-soname,libzzzexample.so.1")
            .arg("-o")
            .arg(&lib_real)
            .arg(&lib_c),
    ) {
        return;
    }
    // Linker name so the executable can be linked against the library.
    let linker_name = work.join("libzzzexample.so");
    let _ = fs::remove_file(&linker_name);
    if let Err(e) = std::os::unix::fs::symlink("libzzzexample.so.1.2.3", &linker_name) {
        println!("cargo:warning=Failed to create linker-name symlink: {e}");
        return;
    }

    let app = work.join("app");
    if !run(
        "compile executable",
        Command::new("gcc")
            .arg(&app_c)
            .arg("-o")
            .arg(&app)
            .arg("-L")
            .arg(&work)
            .arg("-lzzzexample"),
    ) {
        return;
    }

    // Stage the package tree.
    let root = work.join("pkgroot");
    let bin_dir = root.join("usr/bin");
    let lib_dir = root.join("usr/lib");
    if fs::create_dir_all(&bin_dir).is_err() || fs::create_dir_all(&lib_dir).is_err() {
        println!("cargo:warning=Failed to stage fixture package tree");
        return;
    }
    if fs::copy(&app, bin_dir.join("app")).is_err()
        || fs::copy(&lib_real, lib_dir.join("libzzzexample.so.1.2.3")).is_err()
    {
        println!("cargo:warning=Failed to copy fixture binaries");
        return;
    }
    // The versioned symlink ldconfig would otherwise create.
    let versioned = lib_dir.join("libzzzexample.so.1");
    let _ = fs::remove_file(&versioned);
    if let Err(e) = std::os::unix::fs::symlink("libzzzexample.so.1.2.3", &versioned) {
        println!("cargo:warning=Failed to create versioned symlink: {e}");
        return;
    }
    if fs::write(
        root.join(".PKGINFO"),
        "# Generated fixture\n\
         pkgname = testpkg\n\
         pkgver = 1.0-1\n\
         depend = glibc\n",
    )
    .is_err()
    {
        println!("cargo:warning=Failed to write fixture .PKGINFO");
        return;
    }

    let archive = fixtures.join("test.pkg.tar.gz");
    if run(
        "create package archive",
        Command::new("bsdtar")
            .arg("-czf")
            .arg(&archive)
            .arg("-C")
            .arg(&root)
            .arg(".PKGINFO")
            .arg("usr"),
    ) {
        println!("cargo:warning=Generated package fixture: {}", archive.display());
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:warning=CARGO_MANIFEST_DIR not set; skipping fixture generation");
        return;
    };
    let Ok(out_dir) = env::var("OUT_DIR") else {
        println!("cargo:warning=OUT_DIR not set; skipping fixture generation");
        return;
    };

    let fixtures = PathBuf::from(&manifest_dir).join("fixtures");
    if let Err(e) = fs::create_dir_all(&fixtures) {
        println!("cargo:warning=Failed to create fixtures directory: {e}");
        return;
    }

    generate_package_fixture(&fixtures, Path::new(&out_dir));
}
