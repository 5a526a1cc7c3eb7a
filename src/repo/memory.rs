//! In-memory repository backend

use super::{checked_path, FileStream, IndexWatch, MetadataTransform, Repo};
use crate::error::RepoError;
use crate::types::{Checksum, FileEntry, FileInfo, Loadable, RepoIndex, RepositoryMetadata};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;
use tokio::sync::watch;

struct StoredFile {
	content: Arc<Vec<u8>>,
	checksum: Checksum,
}

#[derive(Default)]
struct MemoryState {
	files: BTreeMap<String, StoredFile>,
	metadata: RepositoryMetadata,
}

/// Repository kept entirely in memory
pub struct InMemoryRepo {
	name: String,
	state: Mutex<MemoryState>,
	index_tx: watch::Sender<Loadable<Arc<RepoIndex>>>,
	metadata_supported: bool,
}

impl InMemoryRepo {
	pub fn new(name: impl Into<String>) -> Self {
		let (index_tx, _) = watch::channel(Loadable::Loaded(Arc::new(RepoIndex::default())));
		Self {
			name: name.into(),
			state: Mutex::new(MemoryState::default()),
			index_tx,
			metadata_supported: true,
		}
	}

	/// Repository pre-filled with `(path, content)` pairs
	pub fn with_files<P, C>(name: impl Into<String>, files: &[(P, C)]) -> Self
	where
		P: AsRef<str>,
		C: AsRef<[u8]>,
	{
		let repo = Self::new(name);
		for (path, content) in files {
			repo.put(path.as_ref(), content.as_ref());
		}
		repo
	}

	/// Metadata updates fail with `UnsupportedFeature`
	pub fn without_metadata_support(mut self) -> Self {
		self.metadata_supported = false;
		self
	}

	/// Store or replace a file directly, bypassing the no-overwrite rule
	pub fn put(&self, path: &str, content: &[u8]) {
		{
			let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
			state.files.insert(
				path.to_string(),
				StoredFile { content: Arc::new(content.to_vec()), checksum: Checksum::of(content) },
			);
		}
		self.publish();
	}

	/// Content of a file, if present
	pub fn get(&self, path: &str) -> Option<Vec<u8>> {
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		state.files.get(path).map(|f| f.content.as_ref().clone())
	}

	/// Sorted paths of all files
	pub fn paths(&self) -> Vec<String> {
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		state.files.keys().cloned().collect()
	}

	fn snapshot(&self) -> RepoIndex {
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		RepoIndex::new(
			state
				.files
				.iter()
				.map(|(path, f)| FileEntry::new(path.clone(), Some(f.content.len() as u64), f.checksum))
				.collect(),
		)
	}

	fn publish(&self) {
		let index = Arc::new(self.snapshot());
		self.index_tx.send_replace(Loadable::Loaded(index));
	}
}

#[async_trait]
impl Repo for InMemoryRepo {
	fn name(&self) -> String {
		self.name.clone()
	}

	async fn index(&self) -> Result<RepoIndex, RepoError> {
		Ok(self.snapshot())
	}

	fn index_watch(&self) -> IndexWatch {
		self.index_tx.subscribe()
	}

	async fn contains(&self, path: &str) -> Result<bool, RepoError> {
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		Ok(state.files.contains_key(path))
	}

	async fn open(&self, path: &str) -> Result<(FileInfo, FileStream), RepoError> {
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		let file = state.files.get(path).ok_or_else(|| RepoError::NotFound { path: path.to_string() })?;
		let info = FileInfo { length: Some(file.content.len() as u64), checksum: file.checksum };
		let content = file.content.as_ref().clone();
		Ok((info, Box::new(Cursor::new(content))))
	}

	async fn save(&self, path: &str, info: FileInfo, mut stream: FileStream) -> Result<(), RepoError> {
		let path = checked_path(path)?;
		if self.contains(&path).await? {
			return Err(RepoError::DestinationExists { path });
		}

		let mut content = Vec::new();
		stream.read_to_end(&mut content).await?;
		let actual = Checksum::of(&content);
		if actual != info.checksum {
			return Err(RepoError::ChecksumMismatch {
				path,
				expected: info.checksum.to_hex(),
				actual: actual.to_hex(),
			});
		}

		{
			let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
			if state.files.contains_key(&path) {
				return Err(RepoError::DestinationExists { path });
			}
			state.files.insert(path, StoredFile { content: Arc::new(content), checksum: actual });
		}
		self.publish();
		Ok(())
	}

	async fn move_file(&self, from: &str, to: &str) -> Result<(), RepoError> {
		let to = checked_path(to)?;
		{
			let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
			if state.files.contains_key(&to) {
				return Err(RepoError::DestinationExists { path: to });
			}
			let file =
				state.files.remove(from).ok_or_else(|| RepoError::NotFound { path: from.to_string() })?;
			state.files.insert(to, file);
		}
		self.publish();
		Ok(())
	}

	async fn delete(&self, path: &str) -> Result<(), RepoError> {
		{
			let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
			state.files.remove(path).ok_or_else(|| RepoError::NotFound { path: path.to_string() })?;
		}
		self.publish();
		Ok(())
	}

	async fn get_metadata(&self) -> Result<RepositoryMetadata, RepoError> {
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		Ok(state.metadata.clone())
	}

	async fn update_metadata(&self, transform: MetadataTransform) -> Result<(), RepoError> {
		if !self.metadata_supported {
			return Err(RepoError::UnsupportedFeature { feature: "repository metadata".to_string() });
		}
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		let old = std::mem::take(&mut state.metadata);
		state.metadata = transform(old);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn info_of(content: &[u8]) -> FileInfo {
		FileInfo { length: Some(content.len() as u64), checksum: Checksum::of(content) }
	}

	#[tokio::test]
	async fn test_save_and_open() {
		let repo = InMemoryRepo::new("mem");
		repo.save("dir/a", info_of(b"hello"), Box::new(Cursor::new(b"hello".to_vec()))).await.unwrap();

		let (info, mut stream) = repo.open("dir/a").await.unwrap();
		let mut content = Vec::new();
		stream.read_to_end(&mut content).await.unwrap();
		assert_eq!(content, b"hello");
		assert_eq!(info.length, Some(5));
	}

	#[tokio::test]
	async fn test_save_never_overwrites() {
		let repo = InMemoryRepo::with_files("mem", &[("a", "old")]);
		let err = repo.save("a", info_of(b"new"), Box::new(Cursor::new(b"new".to_vec()))).await;
		assert!(matches!(err, Err(RepoError::DestinationExists { .. })));
		assert_eq!(repo.get("a").unwrap(), b"old");
	}

	#[tokio::test]
	async fn test_save_checksum_mismatch_leaves_nothing() {
		let repo = InMemoryRepo::new("mem");
		let err = repo.save("a", info_of(b"good"), Box::new(Cursor::new(b"bad".to_vec()))).await;
		assert!(matches!(err, Err(RepoError::ChecksumMismatch { .. })));
		assert!(repo.get("a").is_none());

		repo.save("a", info_of(b"good"), Box::new(Cursor::new(b"good".to_vec()))).await.unwrap();
		assert_eq!(repo.get("a").unwrap(), b"good");
	}

	#[tokio::test]
	async fn test_move_never_overwrites() {
		let repo = InMemoryRepo::with_files("mem", &[("a", "A"), ("b", "B")]);
		let err = repo.move_file("a", "b").await;
		assert!(matches!(err, Err(RepoError::DestinationExists { .. })));
		assert_eq!(repo.get("b").unwrap(), b"B");
		assert_eq!(repo.get("a").unwrap(), b"A");
	}

	#[tokio::test]
	async fn test_index_watch_follows_mutations() {
		let repo = InMemoryRepo::with_files("mem", &[("a", "A")]);
		let mut rx = repo.index_watch();
		repo.delete("a").await.unwrap();
		rx.changed().await.unwrap();
		let index = rx.borrow().as_loaded().cloned().unwrap();
		assert!(index.is_empty());
	}

	#[tokio::test]
	async fn test_metadata_unsupported() {
		let repo = InMemoryRepo::new("mem").without_metadata_support();
		let err = repo.update_metadata(Box::new(|m| m)).await;
		assert!(matches!(err, Err(RepoError::UnsupportedFeature { .. })));

		let repo = InMemoryRepo::new("mem");
		repo.update_metadata(Box::new(|mut m: RepositoryMetadata| {
			m.association_group_id = Some("g".into());
			m
		}))
		.await
		.unwrap();
		assert_eq!(repo.get_metadata().await.unwrap().association_group_id.as_deref(), Some("g"));
	}
}

// vim: ts=4
