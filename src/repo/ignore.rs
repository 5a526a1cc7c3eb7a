//! Ignore rules and add-globs for working trees, using globset

use crate::error::RepoError;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::Path;

/// Name of the per-repository ignore file
pub const IGNORE_FILE_NAME: &str = ".keepsyncignore";

/// Name of the repository state directory
pub const ARCHIVE_DIR_NAME: &str = ".archive";

/// Decides which working-tree files are never indexed
pub struct IgnoreMatcher {
	/// User patterns from the ignore file, matched against every path component
	component_set: GlobSet,

	/// Built-in exclusions, matched against the whole path
	always_exclude: GlobSet,
}

impl IgnoreMatcher {
	pub fn new(patterns: &[String]) -> Result<Self, RepoError> {
		let always_exclude = build_glob_set(
			&[
				ARCHIVE_DIR_NAME.to_string(),
				format!("{}/**", ARCHIVE_DIR_NAME),
				IGNORE_FILE_NAME.to_string(),
			],
			true,
		)?;
		let component_set = build_glob_set(patterns, false)?;
		Ok(Self { component_set, always_exclude })
	}

	/// Load patterns from the ignore file in `root`; missing file means no patterns
	pub fn load(root: &Path) -> Result<Self, RepoError> {
		let path = root.join(IGNORE_FILE_NAME);
		let patterns = if path.is_file() { parse_ignore_file(&fs::read_to_string(path)?) } else { Vec::new() };
		Self::new(&patterns)
	}

	/// `path` is root relative and slash separated
	pub fn is_ignored(&self, path: &str) -> bool {
		if self.always_exclude.is_match(path) {
			return true;
		}
		path.split('/').any(|part| self.component_set.is_match(part))
	}
}

/// Non-empty, non-comment lines of an ignore file
pub fn parse_ignore_file(text: &str) -> Vec<String> {
	text.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.map(String::from)
		.collect()
}

/// Root relative globs selecting files to add
///
/// A glob matching a directory selects everything below it; `.` selects all.
pub struct AddGlobs {
	set: GlobSet,
	match_all: bool,
}

impl AddGlobs {
	pub fn new(globs: &[String]) -> Result<Self, RepoError> {
		let match_all = globs.iter().any(|g| g == "." || g.is_empty());
		let set = build_glob_set(globs, true)?;
		Ok(Self { set, match_all })
	}

	pub fn is_match(&self, path: &str) -> bool {
		if self.match_all {
			return true;
		}
		let mut prefix = String::new();
		for part in path.split('/') {
			if !prefix.is_empty() {
				prefix.push('/');
			}
			prefix.push_str(part);
			if self.set.is_match(&prefix) {
				return true;
			}
		}
		false
	}
}

fn build_glob_set(patterns: &[String], literal_separator: bool) -> Result<GlobSet, RepoError> {
	let mut builder = GlobSetBuilder::new();

	for pattern in patterns {
		let glob = if literal_separator {
			GlobBuilder::new(pattern).literal_separator(true).build()
		} else {
			Glob::new(pattern)
		}
		.map_err(|e| RepoError::InvalidPath { path: pattern.clone(), reason: e.to_string() })?;

		builder.add(glob);
	}

	builder
		.build()
		.map_err(|e| RepoError::InvalidPath { path: patterns.join(" "), reason: e.to_string() })
}


// vim: ts=4
