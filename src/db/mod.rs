// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Readers for the installed-package database (directory-per-package layout
//! with `desc`, `files`, and gzip-compressed `mtree` entries) and for sync
//! database archives.

mod desc;
mod sync;

pub use sync::SyncDatabase;

use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use desc::{parse_sections, single_value};

/// Result type for database operations.
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Errors that can occur while reading package databases.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Failed to read database directory: {path:?}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read database entry: {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Database entry {path:?} is missing its {field} field")]
    MissingField { path: PathBuf, field: &'static str },
    #[error("Failed to extract sync database: {path:?}")]
    ExtractFailed {
        path: PathBuf,
        #[source]
        source: crate::package::PackageError,
    },
}

/// One file owned by an installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub size: u64,
    pub mode: u32,
}

/// An installed package as recorded in the local database.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    name: String,
    version: String,
    files: Vec<FileRecord>,
    provides: Vec<String>,
}

impl InstalledPackage {
    /// The package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full package version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The files owned by the package, in database order.
    #[must_use]
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// The package's declared provisions.
    #[must_use]
    pub fn provides(&self) -> &[String] {
        &self.provides
    }

    /// Read one package from its database directory.
    fn from_dir(dir: &Path) -> DbResult<Self> {
        let desc_path = dir.join("desc");
        let desc_content = fs::read_to_string(&desc_path).map_err(|e| DbError::ReadFailed {
            path: desc_path.clone(),
            source: e,
        })?;
        let sections = parse_sections(&desc_content);
        let name = single_value(&sections, "NAME")
            .ok_or_else(|| DbError::MissingField {
                path: desc_path.clone(),
                field: "NAME",
            })?
            .to_string();
        let version = single_value(&sections, "VERSION")
            .ok_or_else(|| DbError::MissingField {
                path: desc_path,
                field: "VERSION",
            })?
            .to_string();
        let provides = sections.get("PROVIDES").cloned().unwrap_or_default();

        let files_path = dir.join("files");
        let paths = match fs::read_to_string(&files_path) {
            Ok(content) => parse_sections(&content)
                .remove("FILES")
                .unwrap_or_default(),
            // A package without a files entry simply owns no files.
            Err(_) => Vec::new(),
        };

        // File sizes and modes live in the mtree entry; its absence degrades
        // to zeroed metadata, which the dependency matching never consumes.
        let metadata = read_mtree(&dir.join("mtree")).unwrap_or_default();
        let files = paths
            .into_iter()
            .map(|path| {
                let (size, mode) = metadata.get(&path).copied().unwrap_or((0, 0));
                FileRecord { path, size, mode }
            })
            .collect();

        Ok(Self {
            name,
            version,
            files,
            provides,
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_testing(
        name: &str,
        version: &str,
        files: &[&str],
        provides: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            files: files
                .iter()
                .map(|path| FileRecord {
                    path: path.to_string(),
                    size: 0,
                    mode: 0,
                })
                .collect(),
            provides: provides.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Parse a gzip-compressed mtree entry into `path -> (size, mode)`.
///
/// `/set` lines update the running defaults; `./path key=value ...` lines
/// describe one entry each. Only entries with an effective `type=file` are
/// recorded.
fn read_mtree(path: &Path) -> Option<HashMap<String, (u64, u32)>> {
    let file = fs::File::open(path).ok()?;
    let reader = BufReader::new(GzDecoder::new(file));

    let mut metadata = HashMap::new();
    let mut default_size = 0u64;
    let mut default_mode = 0u32;
    let mut default_is_file = false;

    for line in reader.lines() {
        let line = line.ok()?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_ascii_whitespace();
        let first = tokens.next()?;
        if first == "/set" {
            for token in tokens {
                match token.split_once('=') {
                    Some(("mode", value)) => {
                        default_mode = u32::from_str_radix(value, 8).unwrap_or(0);
                    }
                    Some(("size", value)) => default_size = value.parse().unwrap_or(0),
                    Some(("type", value)) => default_is_file = value == "file",
                    _ => {}
                }
            }
            continue;
        }
        let Some(entry_path) = first.strip_prefix("./") else {
            continue;
        };
        let mut size = default_size;
        let mut mode = default_mode;
        let mut is_file = default_is_file;
        for token in tokens {
            match token.split_once('=') {
                Some(("mode", value)) => mode = u32::from_str_radix(value, 8).unwrap_or(0),
                Some(("size", value)) => size = value.parse().unwrap_or(0),
                Some(("type", value)) => is_file = value == "file",
                _ => {}
            }
        }
        if is_file {
            metadata.insert(entry_path.to_string(), (size, mode));
        }
    }
    Some(metadata)
}

/// The local database of installed packages.
///
/// Packages are held in name-sorted order so that dependency resolution is
/// deterministic regardless of directory enumeration order.
pub struct LocalDatabase {
    packages: Vec<InstalledPackage>,
}

impl LocalDatabase {
    /// Read every package from a local database directory.
    ///
    /// Database entries that are unreadable or incomplete are skipped with a
    /// note on stderr; one broken entry must not abort the analysis.
    ///
    /// # Errors
    /// Returns an error if the database directory itself cannot be read.
    pub fn open(dir: &Path) -> DbResult<Self> {
        let entries = fs::read_dir(dir).map_err(|e| DbError::ReadDirFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut packages = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DbError::ReadDirFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_dir() || !path.join("desc").is_file() {
                continue;
            }
            match InstalledPackage::from_dir(&path) {
                Ok(package) => packages.push(package),
                Err(e) => eprintln!("Skipping database entry {}: {e}", path.display()),
            }
        }
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { packages })
    }

    /// The installed packages, sorted by name.
    #[must_use]
    pub fn packages(&self) -> &[InstalledPackage] {
        &self.packages
    }

    /// The installed version of a package, if present.
    #[must_use]
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.packages
            .binary_search_by(|p| p.name.as_str().cmp(name))
            .ok()
            .map(|idx| self.packages[idx].version())
    }

    #[cfg(test)]
    pub(crate) fn new_for_testing(mut packages: Vec<InstalledPackage>) -> Self {
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Self { packages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_package_entry(
        db: &TempDir,
        dir_name: &str,
        desc: &str,
        files: Option<&str>,
        mtree: Option<&str>,
    ) {
        let dir = db.path().join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("desc"), desc).unwrap();
        if let Some(files) = files {
            fs::write(dir.join("files"), files).unwrap();
        }
        if let Some(mtree) = mtree {
            let file = fs::File::create(dir.join("mtree")).unwrap();
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(mtree.as_bytes()).unwrap();
            encoder.finish().unwrap();
        }
    }

    #[test]
    fn test_open_local_database() {
        let db = TempDir::new().unwrap();
        write_package_entry(
            &db,
            "gpm-1.20.7-1",
            "%NAME%\ngpm\n\n%VERSION%\n1.20.7-1\n\n%PROVIDES%\nlibgpm.so=1-64\n",
            Some("%FILES%\nusr/\nusr/lib/\nusr/lib/libgpm.so.1.19.0\n"),
            None,
        );
        write_package_entry(
            &db,
            "acl-2.3.2-1",
            "%NAME%\nacl\n\n%VERSION%\n2.3.2-1\n",
            Some("%FILES%\nusr/lib/libacl.so.1.1.2302\n"),
            None,
        );

        let database = LocalDatabase::open(db.path()).unwrap();
        // Sorted by name regardless of directory order.
        let names: Vec<&str> = database.packages().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["acl", "gpm"]);
        assert_eq!(database.version_of("gpm"), Some("1.20.7-1"));
        assert_eq!(database.version_of("nope"), None);

        let gpm = &database.packages()[1];
        assert_eq!(gpm.provides(), &["libgpm.so=1-64"]);
        assert_eq!(gpm.files().len(), 3);
        assert_eq!(gpm.files()[2].path, "usr/lib/libgpm.so.1.19.0");
    }

    #[test]
    fn test_mtree_metadata_join() {
        let db = TempDir::new().unwrap();
        write_package_entry(
            &db,
            "gpm-1.20.7-1",
            "%NAME%\ngpm\n\n%VERSION%\n1.20.7-1\n",
            Some("%FILES%\nusr/lib/libgpm.so.1.19.0\nusr/share/man/man8/gpm.8.gz\n"),
            Some(
                "#mtree\n\
                 /set type=file uid=0 gid=0 mode=644\n\
                 ./usr type=dir\n\
                 ./usr/lib/libgpm.so.1.19.0 time=1700000000.0 mode=755 size=33footnote\n",
            ),
        );
        // The bogus size token parses to 0; exercise a well-formed one too.
        let db2 = TempDir::new().unwrap();
        write_package_entry(
            &db2,
            "gpm-1.20.7-1",
            "%NAME%\ngpm\n\n%VERSION%\n1.20.7-1\n",
            Some("%FILES%\nusr/lib/libgpm.so.1.19.0\nusr/share/man/man8/gpm.8.gz\n"),
            Some(
                "#mtree\n\
                 /set type=file uid=0 gid=0 mode=644\n\
                 ./usr type=dir\n\
                 ./usr/lib/libgpm.so.1.19.0 time=1700000000.0 mode=755 size=33184\n\
                 ./usr/share/man/man8/gpm.8.gz size=4510\n",
            ),
        );

        let database = LocalDatabase::open(db2.path()).unwrap();
        let gpm = &database.packages()[0];
        assert_eq!(gpm.files()[0].size, 33184);
        assert_eq!(gpm.files()[0].mode, 0o755);
        // Mode falls back to the /set default.
        assert_eq!(gpm.files()[1].size, 4510);
        assert_eq!(gpm.files()[1].mode, 0o644);

        let database = LocalDatabase::open(db.path()).unwrap();
        assert_eq!(database.packages()[0].files()[0].mode, 0o755);
    }

    #[test]
    fn test_missing_mtree_degrades_to_zero() {
        let db = TempDir::new().unwrap();
        write_package_entry(
            &db,
            "acl-2.3.2-1",
            "%NAME%\nacl\n\n%VERSION%\n2.3.2-1\n",
            Some("%FILES%\nusr/lib/libacl.so.1.1.2302\n"),
            None,
        );
        let database = LocalDatabase::open(db.path()).unwrap();
        let record = &database.packages()[0].files()[0];
        assert_eq!((record.size, record.mode), (0, 0));
    }

    #[test]
    fn test_broken_entry_is_skipped() {
        let db = TempDir::new().unwrap();
        write_package_entry(
            &db,
            "good-1.0-1",
            "%NAME%\ngood\n\n%VERSION%\n1.0-1\n",
            None,
            None,
        );
        // desc exists but has no NAME section.
        write_package_entry(&db, "broken-1.0-1", "%VERSION%\n1.0-1\n", None, None);

        let database = LocalDatabase::open(db.path()).unwrap();
        let names: Vec<&str> = database.packages().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["good"]);
    }
}
