// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Manages package lifecycle including extraction directory. Provides API for
//! accessing package files, ELF files, symlinks, and declared metadata.

mod elf;
mod extractor;
mod files;
mod pkginfo;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

pub use elf::{Elf, ElfClass, ElfType};
pub use extractor::{PackageError, PackageResult};
pub(crate) use extractor::extract_archive;
pub use files::PackageFile;
pub use pkginfo::{PkgInfo, PkgInfoError};

/// Collection of files in a package, keyed by their package-internal path.
///
/// Package-internal paths are relative (no leading `/`), matching the archive
/// entry names and the installed-database file listings.
pub type PackageFiles = HashMap<PathBuf, PackageFile>;
pub(crate) type PackageSymlinks<'a> = HashMap<&'a Path, &'a Path>;
pub(crate) type PackageElfs<'a> = HashMap<&'a Path, &'a Elf>;

/// Archive extensions accepted as binary packages. `bsdtar` detects the actual
/// compression from the archive content.
const PACKAGE_EXTENSIONS: [&str; 5] = ["zst", "xz", "gz", "bz2", "tar"];

/// Package struct that manages package life-cycle including extraction directory.
pub struct Package {
    path: PathBuf,
    files: PackageFiles,
    pkginfo: PkgInfo,
}

impl Package {
    /// Create a new package from a filepath.
    ///
    /// # Errors
    /// Returns an error if the package type cannot be determined, the archive
    /// cannot be extracted, or no `.PKGINFO` is present.
    pub fn new(path: PathBuf) -> PackageResult<Self> {
        let (files, pkginfo) = Self::extract(&path)?;
        Ok(Self {
            path,
            files,
            pkginfo,
        })
    }

    /// Get the path to the package.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the files in the package.
    #[must_use]
    pub fn files(&self) -> &PackageFiles {
        &self.files
    }

    /// Get the declared package metadata.
    #[must_use]
    pub fn pkginfo(&self) -> &PkgInfo {
        &self.pkginfo
    }

    /// Get subset of ELF files.
    #[must_use]
    pub(crate) fn elfs(&self) -> PackageElfs<'_> {
        self.files
            .iter()
            .filter_map(|(path, file)| match file {
                PackageFile::Elf(elf) => Some((path.as_path(), elf)),
                _ => None,
            })
            .collect()
    }

    /// Get subset of symlinks.
    #[must_use]
    pub(crate) fn symlinks(&self) -> PackageSymlinks<'_> {
        self.files
            .iter()
            .filter_map(|(path, file)| match file {
                PackageFile::Symlink(symlink) => Some((path.as_path(), symlink.as_path())),
                _ => None,
            })
            .collect()
    }

    /// Files with ELF magic that could not be analyzed, with the reason.
    #[must_use]
    pub(crate) fn invalid_files(&self) -> Vec<(&Path, &str)> {
        self.files
            .iter()
            .filter_map(|(path, file)| match file {
                PackageFile::Invalid(reason) => Some((path.as_path(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// All package-internal paths that look like shared-object files.
    ///
    /// Includes symlinks: the linker follows a versioned symlink just like the
    /// real file, so both count when computing search-path overrides.
    #[must_use]
    pub(crate) fn so_files(&self) -> Vec<String> {
        self.files
            .keys()
            .filter_map(|path| {
                let s = path.to_string_lossy();
                s.contains(".so").then(|| s.into_owned())
            })
            .collect()
    }

    fn extract(path: &Path) -> PackageResult<(PackageFiles, PkgInfo)> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| PackageError::UnsupportedPackageType {
                extension: "unknown".to_string(),
            })?;
        if !PACKAGE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
            return Err(PackageError::UnsupportedPackageType {
                extension: extension.to_string(),
            });
        }

        let dest = TempDir::new().map_err(|e| PackageError::TempDirFailed { source: e })?;
        extractor::extract_archive(path, dest.path())?;

        let pkginfo_path = dest.path().join(".PKGINFO");
        if !pkginfo_path.is_file() {
            return Err(PackageError::MissingPackageInfo {
                path: path.to_path_buf(),
            });
        }
        let pkginfo =
            PkgInfo::from_path(&pkginfo_path).map_err(|e| PackageError::InvalidPackageInfo {
                path: path.to_path_buf(),
                source: e,
            })?;

        let files = extractor::collect_files(&dest, path)?;
        // Explicitly close the temporary directory to prevent any errors from being hidden.
        dest.close()
            .map_err(|e| PackageError::TempDirFailed { source: e })?;
        Ok((files, pkginfo))
    }

    #[cfg(test)]
    /// Create a test package with the given files and metadata.
    /// This is only available in test builds.
    pub(crate) fn new_for_testing(path: PathBuf, files: PackageFiles, pkginfo: PkgInfo) -> Self {
        Self {
            path,
            files,
            pkginfo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_package(files: Vec<(&str, PackageFile)>) -> Package {
        let files: PackageFiles = files
            .into_iter()
            .map(|(path, file)| (PathBuf::from(path), file))
            .collect();
        Package::new_for_testing(
            PathBuf::from("/test/test-1.0-1-x86_64.pkg.tar.zst"),
            files,
            PkgInfo::new_for_testing("test", "1.0-1", &[], &[], &[]),
        )
    }

    #[test]
    fn test_so_files() {
        let package = test_package(vec![
            ("usr/bin/app", PackageFile::File),
            ("usr/lib/libfoo.so.1.2.3", PackageFile::File),
            (
                "usr/lib/libfoo.so.1",
                PackageFile::Symlink(PathBuf::from("usr/lib/libfoo.so.1.2.3")),
            ),
            ("usr/share/doc/readme", PackageFile::File),
        ]);
        let mut so_files = package.so_files();
        so_files.sort();
        assert_eq!(
            so_files,
            vec!["usr/lib/libfoo.so.1", "usr/lib/libfoo.so.1.2.3"]
        );
    }

    #[test]
    fn test_elfs_and_symlinks_partition() {
        let elf = Elf::new_for_testing(
            ElfType::SharedObject,
            ElfClass::Elf64,
            Some("libfoo.so.1"),
            &[],
            &[],
            &[],
        );
        let package = test_package(vec![
            ("usr/lib/libfoo.so.1.2.3", PackageFile::Elf(elf)),
            (
                "usr/lib/libfoo.so.1",
                PackageFile::Symlink(PathBuf::from("usr/lib/libfoo.so.1.2.3")),
            ),
            ("usr/share/doc/readme", PackageFile::File),
        ]);
        assert_eq!(package.elfs().len(), 1);
        assert_eq!(package.symlinks().len(), 1);
        assert!(package.invalid_files().is_empty());
    }

    #[test]
    fn test_invalid_files() {
        let package = test_package(vec![(
            "usr/bin/strange",
            PackageFile::Invalid("Unsupported ELF class 7".to_string()),
        )]);
        let invalid = package.invalid_files();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].0, Path::new("usr/bin/strange"));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = Package::new(PathBuf::from("/tmp/package.rpm"));
        assert!(matches!(
            result,
            Err(PackageError::UnsupportedPackageType { .. })
        ));
    }
}
