//! `status`: working-tree files missing from the index

use crate::cli::{Console, WorkingArchive};
use crate::config::Config;
use crate::error::SyncError;
use crate::repo::ignore::AddGlobs;
use crate::repo::{LocalRepo, Repo};
use std::path::Path;

pub async fn run(cwd: &Path, config: &Config, console: &Console, globs: &[String]) -> Result<i32, SyncError> {
	let archive = WorkingArchive::open(cwd, config).await?;
	let archive_globs = if globs.is_empty() {
		vec![".".to_string()]
	} else {
		globs.iter().map(|glob| archive.to_archive_path(glob)).collect::<Result<Vec<_>, _>>()?
	};

	let mut unindexed = Vec::new();
	for path in archive.repo.find_all_files(&archive_globs).await? {
		if !archive.repo.contains(&path).await? {
			unindexed.push(path);
		}
	}
	if !unindexed.is_empty() {
		console.println("");
		console.println("Files not added to the archive:");
		for path in &unindexed {
			console.println(format!("\t{}", archive.to_relative_path(path)));
		}
		console.println("");
	}

	let indexed = archive.repo.indexed_filenames().await?;
	if globs.is_empty() {
		console.println(format!("Total indexed files in archive: {}", indexed.len()));
	} else {
		let matcher = AddGlobs::new(&archive_globs)?;
		let matching = indexed.iter().filter(|path| matcher.is_match(path)).count();
		console.println(format!("Files indexed in archive matching globs: {}", matching));
	}
	Ok(0)
}

// vim: ts=4
