//! `init`: create an archive in the working directory

use crate::cli::Console;
use crate::error::SyncError;
use crate::repo::{FilesRepo, Repo};
use crate::types::RepositoryMetadata;
use std::path::Path;
use uuid::Uuid;

pub async fn run(cwd: &Path, console: &Console) -> Result<i32, SyncError> {
	let repo = FilesRepo::create(cwd).await?;
	let group_id = Uuid::new_v4().to_string();
	repo.update_metadata(Box::new(move |mut metadata: RepositoryMetadata| {
		metadata.association_group_id = Some(group_id);
		metadata
	}))
	.await?;
	console.println(format!("Initialized empty archive in {}", repo.root().display()));
	Ok(0)
}

// vim: ts=4
