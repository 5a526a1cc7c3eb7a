//! Repository capability and its backends
//!
//! The engine only talks to [`Repo`]; index updates additionally need the
//! working-tree operations of [`LocalRepo`].

pub mod files;
pub mod ignore;
pub mod memory;
pub mod registry;

use crate::error::RepoError;
use crate::types::{Checksum, FileInfo, Loadable, RepoIndex, RepositoryMetadata};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::watch;

pub use files::FilesRepo;
pub use memory::InMemoryRepo;
pub use registry::RepositoryRegistry;

/// Byte stream of a stored file
pub type FileStream = Box<dyn AsyncRead + Send + Unpin>;

/// Observable index of a repository
pub type IndexWatch = watch::Receiver<Loadable<Arc<RepoIndex>>>;

/// Transformation applied by [`Repo::update_metadata`]
pub type MetadataTransform = Box<dyn FnOnce(RepositoryMetadata) -> RepositoryMetadata + Send>;

/// Storage backend holding one copy of an archive
#[async_trait]
pub trait Repo: Send + Sync {
	/// Location for messages and logs
	fn name(&self) -> String;

	/// Current index (full rescan where the backend needs one)
	async fn index(&self) -> Result<RepoIndex, RepoError>;

	/// Index observable; updated after every mutation
	fn index_watch(&self) -> IndexWatch;

	/// Whether `path` is indexed and readable
	async fn contains(&self, path: &str) -> Result<bool, RepoError>;

	async fn open(&self, path: &str) -> Result<(FileInfo, FileStream), RepoError>;

	/// Store a new file. Fails with `DestinationExists` if `path` is occupied and
	/// with `ChecksumMismatch` if the bytes differ from `info`; nothing is left
	/// behind on failure.
	async fn save(&self, path: &str, info: FileInfo, stream: FileStream) -> Result<(), RepoError>;

	/// Fails with `DestinationExists` if `to` is occupied
	async fn move_file(&self, from: &str, to: &str) -> Result<(), RepoError>;

	async fn delete(&self, path: &str) -> Result<(), RepoError>;

	async fn get_metadata(&self) -> Result<RepositoryMetadata, RepoError>;

	/// Fails with `UnsupportedFeature` where metadata cannot be stored
	async fn update_metadata(&self, transform: MetadataTransform) -> Result<(), RepoError>;
}

/// Repository with a working tree that can be indexed in place
#[async_trait]
pub trait LocalRepo: Repo {
	/// Working-tree files matching root relative `globs`, ignore rules applied
	async fn find_all_files(&self, globs: &[String]) -> Result<Vec<String>, RepoError>;

	/// Sorted paths of the index
	async fn indexed_filenames(&self) -> Result<Vec<String>, RepoError>;

	async fn verify_file_exists(&self, path: &str) -> Result<bool, RepoError>;

	/// Checksum recorded in the index
	async fn file_checksum(&self, path: &str) -> Result<Checksum, RepoError>;

	/// Checksum of the working-tree file
	async fn compute_file_checksum(&self, path: &str) -> Result<Checksum, RepoError>;

	/// Index the working-tree file at `path`
	async fn add(&self, path: &str) -> Result<(), RepoError>;

	/// Drop `path` from the index, leaving the working tree alone
	async fn remove(&self, path: &str) -> Result<(), RepoError>;
}

/// Normalized repository path; the index store and the ignore file are not addressable
pub(crate) fn checked_path(path: &str) -> Result<String, RepoError> {
	let normalized = crate::types::normalize_path(path)
		.map_err(|reason| RepoError::InvalidPath { path: path.to_string(), reason })?;
	let first = normalized.split('/').next().unwrap_or_default();
	if first == ignore::ARCHIVE_DIR_NAME || normalized == ignore::IGNORE_FILE_NAME {
		return Err(RepoError::InvalidPath { path: path.to_string(), reason: "reserved path".to_string() });
	}
	Ok(normalized)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_checked_path_rejects_reserved() {
		assert_eq!(checked_path("./dir//a").unwrap(), "dir/a");
		assert!(matches!(checked_path("../a"), Err(RepoError::InvalidPath { .. })));
		for reserved in &[".archive", ".archive/checksums/evil.checksum", "x/../.archive/metadata.json", ".keepsyncignore"] {
			assert!(matches!(checked_path(reserved), Err(RepoError::InvalidPath { .. })), "{}", reserved);
		}
		assert_eq!(checked_path("dir/.archive").unwrap(), "dir/.archive");
		assert_eq!(checked_path("dir/.keepsyncignore").unwrap(), "dir/.keepsyncignore");
	}
}

// vim: ts=4
