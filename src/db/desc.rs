// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Parses the section-based text format used by the package database
//! (`desc` and `files` entries): a `%SECTION%` header line followed by one
//! value per line, terminated by a blank line.

use std::collections::HashMap;

pub(crate) type Sections = HashMap<String, Vec<String>>;

/// Split a `desc`/`files` style document into its sections.
///
/// Unknown sections are kept; values preserve their order of appearance.
pub(crate) fn parse_sections(content: &str) -> Sections {
    let mut sections = Sections::new();
    let mut current: Option<String> = None;
    for line in content.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            current = None;
            continue;
        }
        if line.len() > 2 && line.starts_with('%') && line.ends_with('%') {
            let name = line[1..line.len() - 1].to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        if let Some(name) = &current {
            if let Some(values) = sections.get_mut(name) {
                values.push(line.to_string());
            }
        }
    }
    sections
}

/// First value of a section, if present.
pub(crate) fn single_value<'a>(sections: &'a Sections, name: &str) -> Option<&'a str> {
    sections
        .get(name)
        .and_then(|values| values.first())
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let sections = parse_sections(
            "%NAME%\n\
             gpm\n\
             \n\
             %VERSION%\n\
             1.20.7-1\n\
             \n\
             %PROVIDES%\n\
             libgpm.so=1-64\n\
             gpm-headers\n",
        );
        assert_eq!(single_value(&sections, "NAME"), Some("gpm"));
        assert_eq!(single_value(&sections, "VERSION"), Some("1.20.7-1"));
        assert_eq!(
            sections.get("PROVIDES").unwrap(),
            &["libgpm.so=1-64", "gpm-headers"]
        );
        assert_eq!(single_value(&sections, "DEPENDS"), None);
    }

    #[test]
    fn test_parse_sections_preserves_order() {
        let sections = parse_sections(
            "%FILES%\n\
             usr/\n\
             usr/lib/\n\
             usr/lib/libgpm.so.1.19.0\n\
             usr/lib/libgpm.so.1\n",
        );
        assert_eq!(
            sections.get("FILES").unwrap(),
            &[
                "usr/",
                "usr/lib/",
                "usr/lib/libgpm.so.1.19.0",
                "usr/lib/libgpm.so.1"
            ]
        );
    }

    #[test]
    fn test_parse_sections_empty() {
        assert!(parse_sections("").is_empty());
        // A stray value without a section header is dropped.
        assert!(parse_sections("orphan line\n").is_empty());
    }
}
