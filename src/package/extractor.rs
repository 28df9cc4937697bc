// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Archive extraction via `bsdtar` and collection of the extracted file tree.

use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;
use wait_timeout::ChildExt;
use walkdir::WalkDir;

use super::elf::ElfError;
use super::files::PackageFile;
use super::pkginfo::PkgInfoError;
use super::PackageFiles;

/// Default timeout for archive extraction commands (30 seconds).
pub(crate) const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type for package operations.
pub type PackageResult<T> = std::result::Result<T, PackageError>;

/// Errors that can occur during package operations.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Failed to create/delete temporary directory")]
    TempDirFailed {
        #[source]
        source: std::io::Error,
    },
    #[error("Command not found: {command} (archive: {path:?})")]
    CommandNotFound { command: String, path: PathBuf },
    #[error("Command failed: {command} (archive: {path:?})")]
    CommandFailed {
        command: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Command timed out after {timeout:?}: {command} (archive: {path:?})")]
    CommandTimeout {
        command: String,
        path: PathBuf,
        timeout: Duration,
    },
    #[error("Extraction failed for archive {path:?}: {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },
    #[error("Failed to walk extracted directory: {path:?}")]
    WalkDirFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("Unsupported package type: {extension}")]
    UnsupportedPackageType { extension: String },
    #[error("Failed to read symlink: {path:?}")]
    ReadSymlinkFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Package has no .PKGINFO: {path:?}")]
    MissingPackageInfo { path: PathBuf },
    #[error("Invalid .PKGINFO in package {path:?}")]
    InvalidPackageInfo {
        path: PathBuf,
        #[source]
        source: PkgInfoError,
    },
    #[error("Elf error: {0}")]
    ElfError(#[from] ElfError),
}

/// Wait for a child process to complete with a timeout.
///
/// Uses platform-specific APIs (SIGCHLD on Unix) to wait for the process
/// without polling. If the timeout is reached, the process is killed.
///
/// # Returns
/// - `Ok(ExitStatus)` if the process completed within the timeout
/// - `Err(PackageError::CommandTimeout)` if the process timed out
/// - `Err(PackageError::CommandFailed)` if there was an error waiting for the process
pub(crate) fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    command: &str,
    archive: &Path,
) -> PackageResult<std::process::ExitStatus> {
    // Returns the status if the process completed within the timeout, none otherwise.
    // In the case of an error it propagates the error.
    if let Some(status) = child
        .wait_timeout(timeout)
        .map_err(|e| PackageError::CommandFailed {
            command: command.to_string(),
            path: archive.to_path_buf(),
            source: e,
        })?
    {
        // Check if the process completed successfully or was terminated by a signal.
        if status.code().is_some() {
            Ok(status)
        } else if let Some(signal) = status.signal() {
            Err(PackageError::CommandFailed {
                command: command.to_string(),
                path: archive.to_path_buf(),
                source: std::io::Error::other(format!("Process terminated by signal: {signal}")),
            })
        } else {
            Err(PackageError::CommandFailed {
                command: command.to_string(),
                path: archive.to_path_buf(),
                source: std::io::Error::other("Unknown process termination"),
            })
        }
    } else {
        // Timeout has been reached - kill the process
        let _ = child.kill();
        let _ = child.wait();
        Err(PackageError::CommandTimeout {
            command: command.to_string(),
            path: archive.to_path_buf(),
            timeout,
        })
    }
}

/// Extract a tar archive into `dest` by invoking `bsdtar -x`.
///
/// `bsdtar` detects the compression (gzip, xz, zstd, bzip2, none) from the
/// archive itself, so one invocation covers every package compression pacman
/// produces, and the sync database format as well.
///
/// # Errors
/// Returns an error if `bsdtar` is missing, fails, or exceeds the timeout.
pub(crate) fn extract_archive(archive: &Path, dest: &Path) -> PackageResult<()> {
    let mut child = match std::process::Command::new("bsdtar")
        .arg("-xf")
        .arg(archive)
        .arg("-C")
        .arg(dest)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(PackageError::CommandNotFound {
                    command: "bsdtar".to_string(),
                    path: archive.to_path_buf(),
                });
            }
            return Err(PackageError::CommandFailed {
                command: "bsdtar".to_string(),
                path: archive.to_path_buf(),
                source: e,
            });
        }
    };

    let exit_status = wait_with_timeout(&mut child, DEFAULT_EXTRACTION_TIMEOUT, "bsdtar", archive)?;

    if exit_status.success() {
        Ok(())
    } else {
        Err(PackageError::ExtractionFailed {
            path: archive.to_path_buf(),
            reason: format!(
                "bsdtar exited with non-zero status: {}",
                exit_status.code().unwrap_or(-1)
            ),
        })
    }
}

/// Represents a file extracted from the package.
pub(crate) struct ExtractedFile<'a> {
    extraction_directory: &'a TempDir, // The directory where the package was extracted.
    extracted_path: &'a Path,          // The path to the file within the extraction directory.
}

impl<'a> ExtractedFile<'a> {
    pub(crate) fn new(extraction_directory: &'a TempDir, extracted_path: &'a Path) -> Self {
        Self {
            extraction_directory,
            extracted_path,
        }
    }

    /// Get the path of the file within the extraction directory.
    pub(crate) fn path(&self) -> &Path {
        self.extracted_path
    }

    /// Get the package-internal path of the file.
    ///
    /// Package-internal paths are relative (no leading `/`), matching both
    /// the archive entry names and the file listings of the installed
    /// package database.
    ///
    /// # Panics
    /// Panics if the path cannot be stripped. This should never happen as all
    /// files in the package will be sub-paths of the extraction directory.
    pub(crate) fn package_path(&self) -> PathBuf {
        self.extracted_path
            .strip_prefix(self.extraction_directory.path())
            .unwrap()
            .to_path_buf()
    }
}

/// Walk the extracted directory and collect files.
///
/// # Errors
/// Returns an error if walking the directory fails or no files are found.
pub(crate) fn collect_files(dest: &TempDir, archive: &Path) -> PackageResult<PackageFiles> {
    let mut files = PackageFiles::new();
    for entry in WalkDir::new(dest.path()) {
        let e = entry.map_err(|e| PackageError::WalkDirFailed {
            path: archive.to_path_buf(),
            source: e,
        })?;
        if e.file_type().is_file() || e.file_type().is_symlink() {
            let extracted_file = ExtractedFile::new(dest, e.path());
            let file = PackageFile::new(&extracted_file)?;
            files.insert(extracted_file.package_path(), file);
        }
    }

    if files.is_empty() {
        Err(PackageError::ExtractionFailed {
            path: archive.to_path_buf(),
            reason: "Extraction completed but no files were found".to_string(),
        })
    } else {
        Ok(files)
    }
}
