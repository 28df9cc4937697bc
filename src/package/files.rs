// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Defines types for different package file types (ELF, Symlink, Invalid, Other).

use path_clean::PathClean;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::elf::{Elf, ElfError};
use super::extractor::{ExtractedFile, PackageError, PackageResult};

/// Represents a file in a package.
#[derive(Debug, Clone, Serialize)]
pub enum PackageFile {
    File,
    /// Stores the normalized package-internal target path of the symlink.
    Symlink(PathBuf),
    Elf(Elf),
    /// A file with ELF magic that cannot be analyzed (unrecognized word-size
    /// class). Surfaced as an error diagnostic; never aborts the run.
    Invalid(String),
}

impl PackageFile {
    /// Create a new package file from an extracted path.
    ///
    /// Files that are not ELF objects (wrong magic, too small, or a malformed
    /// body behind a valid magic) are classified as plain [`PackageFile::File`]
    /// and silently skipped by the analysis.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub(crate) fn new(extracted_file: &ExtractedFile) -> PackageResult<Self> {
        let path = extracted_file.path();
        if path.is_symlink() {
            let target = fs::read_link(path).map_err(|e| PackageError::ReadSymlinkFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
            // Resolve relative targets relative to the symlink's parent directory,
            // and map absolute targets back into the package-relative convention.
            let resolved_target = if target.is_absolute() {
                target
                    .strip_prefix("/")
                    .map(Path::to_path_buf)
                    .unwrap_or(target)
            } else {
                extracted_file
                    .package_path()
                    .parent()
                    .unwrap_or_else(|| Path::new(""))
                    .join(&target)
            };
            return Ok(Self::Symlink(resolved_target.clean()));
        }
        if !Elf::is_invalid_extension(path) {
            return match Elf::from_path(path) {
                Ok(elf) => Ok(Self::Elf(elf)),
                Err(
                    ElfError::NotElfFile { .. }
                    | ElfError::FileTooSmall { .. }
                    | ElfError::ParseFailed { .. }
                    | ElfError::UnknownElfType { .. },
                ) => Ok(Self::File),
                Err(e @ ElfError::UnsupportedClass { .. }) => Ok(Self::Invalid(e.to_string())),
                Err(e) => Err(PackageError::ElfError(e)),
            };
        }
        Ok(Self::File)
    }
}
