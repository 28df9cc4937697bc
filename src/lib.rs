// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! A tool for validating shared-library dependencies of binary packages.
//!
//! This crate provides functionality to:
//! - Extract a binary package and parse its ELF files and declared metadata
//! - Build a system-wide library cache from the dynamic linker registry
//! - Match required libraries against the installed-package database
//! - Reconcile the result against the package's declared dependencies and
//!   provisions, producing categorized diagnostics

pub mod analysis;
pub mod db;
pub mod package;

// Re-export key types for convenience
pub use analysis::{
    summarize_report, validate_report, Diagnostic, LibraryCache, LibraryKey, Report, Severity,
};
pub use db::{InstalledPackage, LocalDatabase, SyncDatabase};
pub use package::{Elf, ElfClass, ElfType, Package, PackageFile, PkgInfo};
