// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Parses ELF files to extract the word-size class, `DT_SONAME`, `DT_NEEDED`,
//! `RPATH`, and `RUNPATH` entries. Uses the `goblin` crate for ELF parsing.

use goblin::elf::Elf as GoblinElf;
use path_clean::PathClean;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

type Result<T> = std::result::Result<T, ElfError>;

/// Errors that can occur when parsing ELF files.
#[derive(Debug, Error)]
pub enum ElfError {
    #[error("File is too small to be an ELF file: {path:?}")]
    FileTooSmall { path: PathBuf },
    #[error("File is not an ELF file: {path:?}")]
    NotElfFile { path: PathBuf },
    #[error("Unsupported ELF class {class} in file: {path:?}")]
    UnsupportedClass { path: PathBuf, class: u8 },
    #[error("Failed to open file: {path:?}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read file: {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse ELF file: {path:?}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: goblin::error::Error,
    },
    #[error("Unknown ELF type in file: {path:?}")]
    UnknownElfType { path: PathBuf },
}

/// ELF file type (wrapper around `goblin::elf::header::e_type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ElfType {
    None,
    Relocatable,
    Executable,
    SharedObject,
    Core,
}

/// Word-size class of an ELF object.
///
/// Library resolution is partitioned by this value: the same soname can exist
/// in both classes with different real paths, and a 32-bit requirement must
/// never resolve against a 64-bit cache entry (or vice versa). Any class byte
/// other than the two recognized ones is rejected with
/// [`ElfError::UnsupportedClass`] instead of being mis-tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    /// The word size in bits, as used in dependency key notation (`-32`/`-64`).
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::Elf32 => 32,
            Self::Elf64 => 64,
        }
    }

    /// Parse the bit-size suffix used in declared soname dependencies.
    #[must_use]
    pub(crate) fn from_bits(bits: &str) -> Option<Self> {
        match bits {
            "32" => Some(Self::Elf32),
            "64" => Some(Self::Elf64),
            _ => None,
        }
    }
}

/// Parsed ELF file information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Elf {
    kind: ElfType,
    class: ElfClass,
    soname: Option<String>,
    dependencies: Vec<String>,
    rpath: Vec<String>,
    runpath: Vec<String>,
}

// ELF files typically don't have extensions (aside from .so, .so.x, .so.x.y, etc.), so this is safe.
static INVALID_EXTENSIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "txt", "md", "json", "yaml", "yml", "conf", "cfg", "ini", "toml", "xml", "html", "css",
        "js", "py", "sh", "bash", "zsh", "fish", "csh", "ksh", "pl", "rb", "php", "lua", "tcl",
        "awk", "sed", "perl", "pm", "pod", "gz", "bz2", "xz", "zst", "zip", "tar", "png", "jpg",
        "jpeg", "gif", "svg", "ico", "bmp", "webp", "tiff", "pdf", "ps", "eps", "dvi", "tex",
        "rtf", "odt", "doc", "docx", "mp3", "mp4", "avi", "mkv", "mov", "wav", "flac", "ogg",
        "m4a", "db", "sqlite", "sqlite3", "db3",
    ])
});

impl Elf {
    /// Check if a filepath should be skipped early (before opening) by extension.
    /// This is used to skip files that are clearly not ELF based on extension.
    #[must_use]
    pub(crate) fn is_invalid_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| INVALID_EXTENSIONS.contains(ext.to_ascii_lowercase().as_str()))
    }

    /// Parse an ELF file from a path.
    ///
    /// # Errors
    /// Returns an error if the file is not an ELF file, has an unrecognized
    /// word-size class, or cannot be parsed.
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let bytes = Self::read(path)?;
        Self::parse(path, &bytes)
    }

    /// Get the ELF file type (executable, shared object, etc.).
    #[must_use]
    pub fn kind(&self) -> &ElfType {
        &self.kind
    }

    /// Get the word-size class (32-bit or 64-bit).
    #[must_use]
    pub fn class(&self) -> ElfClass {
        self.class
    }

    /// Get the soname this object declares about itself (`DT_SONAME`), if any.
    #[must_use]
    pub fn soname(&self) -> Option<&str> {
        self.soname.as_deref()
    }

    /// Get the list of dynamic dependencies (`DT_NEEDED` entries).
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Get the RPATH entries from the ELF file.
    #[must_use]
    pub fn rpath(&self) -> &[String] {
        &self.rpath
    }

    /// Get the RUNPATH entries from the ELF file.
    #[must_use]
    pub fn runpath(&self) -> &[String] {
        &self.runpath
    }

    /// Normalize and resolve RPATH and RUNPATH entries into absolute search paths.
    ///
    /// `$ORIGIN` (or `${ORIGIN}`) is replaced with the directory containing the
    /// ELF binary, and the result is cleaned. Relative paths without `$ORIGIN`
    /// are filtered out: the dynamic linker resolves those against the
    /// process's working directory, which is unknown at analysis time.
    ///
    /// If both `RPATH` and `RUNPATH` are present, `RUNPATH` takes precedence
    /// and `RPATH` is ignored, mirroring the dynamic linker.
    #[must_use]
    pub(crate) fn normalize_paths(&self, origin: &Path) -> Vec<PathBuf> {
        // Do not parallelize this, as order is important and the list is
        // typically too small to benefit from it anyway.
        if !self.runpath.is_empty() {
            self.runpath
                .iter()
                .filter_map(|path| Self::normalize_path(origin, path))
                .collect()
        } else if !self.rpath.is_empty() {
            self.rpath
                .iter()
                .filter_map(|path| Self::normalize_path(origin, path))
                .collect()
        } else {
            Vec::new()
        }
    }

    fn normalize_path(origin: &Path, path: &str) -> Option<PathBuf> {
        // Only convert origin to string and perform replacement if needed.
        // The patterns $ORIGIN and ${ORIGIN} are mutually exclusive (different chars after $).
        let resolved = if path.contains("${ORIGIN}") {
            path.replace("${ORIGIN}", &origin.to_string_lossy())
        } else if path.contains("$ORIGIN") {
            path.replace("$ORIGIN", &origin.to_string_lossy())
        } else {
            path.to_string()
        };

        // Absolute paths are always valid.
        if resolved.starts_with('/') {
            return Some(PathBuf::from(resolved).clean());
        }
        // Since we already resolved the $ORIGIN, any path that is still
        // relative is resolved against the CWD by the linker and is useless
        // for analysis.
        None
    }

    /// Reads the entire file at path into bytes if the file is an ELF file.
    ///
    /// # Errors
    /// Returns an error if the file is not an ELF file or cannot be read.
    fn read(path: &Path) -> Result<Vec<u8>> {
        // ELF magic bytes: 0x7f followed by ASCII "ELF"
        // Defined in the ELF specification: e_ident[EI_MAG0..EI_MAG3]
        // Official spec: https://refspecs.linuxbase.org/elf/elf.pdf
        const ELF_MAGIC: [u8; 4] = [0x7f, 0x45, 0x4c, 0x46];

        let metadata = fs::metadata(path).map_err(|e| ElfError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        // Skip files that are too small to be ELF (must be at least ELF header size)
        if metadata.len() < 64 {
            return Err(ElfError::FileTooSmall {
                path: path.to_path_buf(),
            });
        }

        // Open file once and check magic bytes
        let mut file = fs::File::open(path).map_err(|e| ElfError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut magic = [0u8; 4];
        match file.read_exact(&mut magic) {
            Ok(()) => {
                if magic != ELF_MAGIC {
                    return Err(ElfError::NotElfFile {
                        path: path.to_path_buf(),
                    });
                }
            }
            Err(e) => {
                return Err(ElfError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        }

        // Reset to beginning and read entire file
        // Note: goblin requires the full file, but we've at least filtered out non-ELF files
        file.seek(std::io::SeekFrom::Start(0))
            .map_err(|e| ElfError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| ElfError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(bytes)
    }

    /// Determine the word-size class from the identification bytes.
    ///
    /// This is checked before handing the bytes to goblin so that an
    /// unclassifiable word size is reported distinctly from a generally
    /// malformed ELF file.
    fn sniff_class(path: &Path, bytes: &[u8]) -> Result<ElfClass> {
        match bytes[goblin::elf::header::EI_CLASS] {
            goblin::elf::header::ELFCLASS32 => Ok(ElfClass::Elf32),
            goblin::elf::header::ELFCLASS64 => Ok(ElfClass::Elf64),
            class => Err(ElfError::UnsupportedClass {
                path: path.to_path_buf(),
                class,
            }),
        }
    }

    fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
        let class = Self::sniff_class(path, bytes)?;
        let elf = GoblinElf::parse(bytes).map_err(|e| ElfError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut soname = None;
        let mut dependencies = Vec::new();
        let mut rpath = Vec::new();
        let mut runpath = Vec::new();

        // Only the dynamic section is of interest; other sections are ignored.
        if let Some(dynamic) = &elf.dynamic {
            for dyn_entry in &dynamic.dyns {
                let Ok(strtab_idx) = usize::try_from(dyn_entry.d_val) else {
                    continue;
                };
                match dyn_entry.d_tag {
                    goblin::elf::dynamic::DT_NEEDED => {
                        if let Some(dep_name) = elf.dynstrtab.get_at(strtab_idx) {
                            dependencies.push(dep_name.to_string());
                        }
                    }
                    goblin::elf::dynamic::DT_SONAME => {
                        if let Some(name) = elf.dynstrtab.get_at(strtab_idx) {
                            soname = Some(name.to_string());
                        }
                    }
                    goblin::elf::dynamic::DT_RPATH => {
                        if let Some(rpath_str) = elf.dynstrtab.get_at(strtab_idx) {
                            rpath.extend(
                                rpath_str
                                    .split(':')
                                    .map(|s: &str| s.to_string())
                                    .filter(|s: &String| !s.is_empty()),
                            );
                        }
                    }
                    goblin::elf::dynamic::DT_RUNPATH => {
                        if let Some(runpath_str) = elf.dynstrtab.get_at(strtab_idx) {
                            runpath.extend(
                                runpath_str
                                    .split(':')
                                    .map(|s: &str| s.to_string())
                                    .filter(|s: &String| !s.is_empty()),
                            );
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Self {
            kind: match elf.header.e_type {
                goblin::elf::header::ET_NONE => ElfType::None,
                goblin::elf::header::ET_REL => ElfType::Relocatable,
                goblin::elf::header::ET_EXEC => ElfType::Executable,
                goblin::elf::header::ET_DYN => ElfType::SharedObject,
                goblin::elf::header::ET_CORE => ElfType::Core,
                _ => {
                    return Err(ElfError::UnknownElfType {
                        path: path.to_path_buf(),
                    });
                }
            },
            class,
            soname,
            dependencies,
            rpath,
            runpath,
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_testing(
        kind: ElfType,
        class: ElfClass,
        soname: Option<&str>,
        dependencies: &[&str],
        rpath: &[&str],
        runpath: &[&str],
    ) -> Self {
        Self {
            kind,
            class,
            soname: soname.map(str::to_string),
            dependencies: dependencies.iter().map(|s| s.to_string()).collect(),
            rpath: rpath.iter().map(|s| s.to_string()).collect(),
            runpath: runpath.iter().map(|s| s.to_string()).collect(),
        }
    }
}
