//! The archive containing the current directory
//!
//! Command arguments are relative to the working directory, which may be a
//! subdirectory of the archive root; archive paths are root relative.

use crate::config::Config;
use crate::error::{RepoError, SyncError};
use crate::repo::FilesRepo;
use std::path::{Component, Path};
use std::sync::Arc;

pub struct WorkingArchive {
	pub repo: Arc<FilesRepo>,
	working_subdirectory: Vec<String>,
}

impl WorkingArchive {
	pub async fn open(cwd: &Path, config: &Config) -> Result<Self, SyncError> {
		let repo = FilesRepo::find(cwd).await?.with_buffer_size(config.copy_buffer_size);
		let relative = cwd.strip_prefix(repo.root()).map_err(|e| RepoError::InvalidPath {
			path: cwd.display().to_string(),
			reason: e.to_string(),
		})?;
		let working_subdirectory = relative
			.components()
			.filter_map(|c| match c {
				Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
				_ => None,
			})
			.collect();
		Ok(Self { repo: Arc::new(repo), working_subdirectory })
	}

	pub fn working_subdirectory(&self) -> &[String] {
		&self.working_subdirectory
	}

	/// Root relative form of a working-directory relative path or glob; `.` is the root
	pub fn to_archive_path(&self, path: &str) -> Result<String, SyncError> {
		to_archive_path(&self.working_subdirectory, path)
	}

	/// Working-directory relative form of a root relative path
	pub fn to_relative_path(&self, archive_path: &str) -> String {
		to_relative_path(&self.working_subdirectory, archive_path)
	}
}

pub(crate) fn to_archive_path(working_subdirectory: &[String], path: &str) -> Result<String, SyncError> {
	let mut parts: Vec<&str> = working_subdirectory.iter().map(String::as_str).collect();
	for part in path.split('/') {
		match part {
			"" | "." => {}
			".." => {
				if parts.pop().is_none() {
					return Err(RepoError::InvalidPath {
						path: path.to_string(),
						reason: "outside of the archive".to_string(),
					}
					.into());
				}
			}
			part => parts.push(part),
		}
	}
	Ok(if parts.is_empty() { ".".to_string() } else { parts.join("/") })
}

pub(crate) fn to_relative_path(working_subdirectory: &[String], archive_path: &str) -> String {
	let target: Vec<&str> = archive_path.split('/').collect();
	let common = working_subdirectory
		.iter()
		.zip(&target)
		.take_while(|(dir, part)| dir.as_str() == **part)
		.count();

	let mut parts = vec![".."; working_subdirectory.len() - common];
	parts.extend(&target[common..]);
	if parts.is_empty() {
		".".to_string()
	} else {
		parts.join("/")
	}
}


// vim: ts=4
