//! Plain filesystem repository
//!
//! Layout under the repository root:
//!
//! ```text
//! <root>/<path>                          working tree
//! <root>/.archive/checksums/<path>.checksum   index entry, hex checksum
//! <root>/.archive/metadata.json          repository metadata
//! <root>/.archive/tmp/                   in-flight saves
//! <root>/.keepsyncignore                 ignore patterns
//! ```

use super::ignore::{AddGlobs, IgnoreMatcher, ARCHIVE_DIR_NAME};
use super::{checked_path, FileStream, IndexWatch, LocalRepo, MetadataTransform, Repo};
use crate::error::RepoError;
use crate::logging::*;
use crate::types::{Checksum, FileEntry, FileInfo, Loadable, RepoIndex, RepositoryMetadata};
use async_trait::async_trait;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs as afs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;
use uuid::Uuid;

const CHECKSUMS_DIR_NAME: &str = "checksums";
const CHECKSUM_SUFFIX: &str = ".checksum";
const METADATA_FILE_NAME: &str = "metadata.json";
const TMP_DIR_NAME: &str = "tmp";
const DEFAULT_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Repository stored as plain files with a checksum index beside them
pub struct FilesRepo {
	root: PathBuf,
	index_tx: watch::Sender<Loadable<Arc<RepoIndex>>>,
	buffer_size: usize,
}

impl FilesRepo {
	fn new(root: PathBuf) -> Self {
		let (index_tx, _) = watch::channel(Loadable::Loading);
		Self { root, index_tx, buffer_size: DEFAULT_BUFFER_SIZE }
	}

	/// Initialize a new repository in `root`
	pub async fn create(root: impl Into<PathBuf>) -> Result<Self, RepoError> {
		let repo = Self::new(root.into());
		if repo.checksums_dir().is_dir() {
			return Err(RepoError::DestinationExists { path: repo.archive_dir().display().to_string() });
		}
		afs::create_dir_all(repo.checksums_dir()).await?;
		repo.refresh().await?;
		info!("Initialized repository in {}", repo.root.display());
		Ok(repo)
	}

	/// Open an existing repository rooted exactly at `root`
	pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RepoError> {
		let repo = Self::new(root.into());
		if !repo.checksums_dir().is_dir() {
			return Err(RepoError::Unavailable {
				reason: format!("no repository at {}", repo.root.display()),
			});
		}
		repo.refresh().await?;
		Ok(repo)
	}

	/// Open the repository containing `start`, searching parent directories
	pub async fn find(start: &Path) -> Result<Self, RepoError> {
		for dir in start.ancestors() {
			if dir.join(ARCHIVE_DIR_NAME).join(CHECKSUMS_DIR_NAME).is_dir() {
				return Self::open(dir).await;
			}
		}
		Err(RepoError::Unavailable { reason: format!("not inside a repository: {}", start.display()) })
	}

	pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
		self.buffer_size = buffer_size.max(1);
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn archive_dir(&self) -> PathBuf {
		self.root.join(ARCHIVE_DIR_NAME)
	}

	fn checksums_dir(&self) -> PathBuf {
		self.archive_dir().join(CHECKSUMS_DIR_NAME)
	}

	fn checksum_path(&self, path: &str) -> PathBuf {
		self.checksums_dir().join(format!("{}{}", path, CHECKSUM_SUFFIX))
	}

	fn metadata_path(&self) -> PathBuf {
		self.archive_dir().join(METADATA_FILE_NAME)
	}

	/// Rescan the index store and publish the result if it changed
	pub async fn refresh(&self) -> Result<RepoIndex, RepoError> {
		let root = self.root.clone();
		let checksums_dir = self.checksums_dir();
		let index = blocking(move || scan_index(&root, &checksums_dir)).await?;

		self.index_tx.send_if_modified(|current| {
			let unchanged = matches!(current, Loadable::Loaded(existing) if **existing == index);
			if !unchanged {
				*current = Loadable::Loaded(Arc::new(index.clone()));
			}
			!unchanged
		});
		Ok(index)
	}

	/// Apply a single-path change to the published index; rescans if none is loaded yet
	async fn apply_to_index(&self, change: impl FnOnce(&mut RepoIndex) + Send) -> Result<(), RepoError> {
		let applied = self.index_tx.send_if_modified(|current| {
			let next = match current {
				Loadable::Loaded(index) => {
					let mut next = RepoIndex::clone(index);
					change(&mut next);
					next
				}
				_ => return false,
			};
			*current = Loadable::Loaded(Arc::new(next));
			true
		});
		if !applied {
			self.refresh().await?;
		}
		Ok(())
	}

	async fn read_checksum(&self, path: &str) -> Result<Checksum, RepoError> {
		let text = match afs::read_to_string(self.checksum_path(path)).await {
			Ok(text) => text,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(RepoError::NotFound { path: path.to_string() })
			}
			Err(e) => return Err(e.into()),
		};
		Checksum::from_hex(&text)
			.map_err(|e| RepoError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
	}

	async fn write_checksum(&self, path: &str, checksum: &Checksum) -> Result<(), RepoError> {
		let checksum_path = self.checksum_path(path);
		if let Some(parent) = checksum_path.parent() {
			afs::create_dir_all(parent).await?;
		}
		afs::write(checksum_path, checksum.to_hex()).await?;
		Ok(())
	}

	async fn remove_checksum(&self, path: &str) -> Result<(), RepoError> {
		match afs::remove_file(self.checksum_path(path)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				Err(RepoError::NotFound { path: path.to_string() })
			}
			Err(e) => Err(e.into()),
		}
	}

	/// Path is taken by a working-tree entry or an index entry
	fn is_occupied(&self, path: &str) -> bool {
		fs::symlink_metadata(self.root.join(path)).is_ok() || self.checksum_path(path).exists()
	}

	/// Stream into `tmp` while hashing, then verify against `info`
	async fn write_verified(
		&self,
		tmp: &Path,
		info: &FileInfo,
		mut stream: FileStream,
	) -> Result<Checksum, RepoError> {
		let mut file = afs::OpenOptions::new().write(true).create_new(true).open(tmp).await?;
		let mut hasher = blake3::Hasher::new();
		let mut buffer = vec![0u8; self.buffer_size];

		loop {
			let read = stream.read(&mut buffer).await?;
			if read == 0 {
				break;
			}
			hasher.update(&buffer[..read]);
			file.write_all(&buffer[..read]).await?;
		}
		file.sync_all().await?;

		let actual = Checksum::from_hasher(&hasher);
		if actual != info.checksum {
			return Err(RepoError::ChecksumMismatch {
				path: tmp.display().to_string(),
				expected: info.checksum.to_hex(),
				actual: actual.to_hex(),
			});
		}
		Ok(actual)
	}

	/// Move `src` to `dst`, refusing to replace anything.
	///
	/// The hard link fails if `dst` appeared since the occupancy check.
	async fn place(&self, src: &Path, dst: &Path, path: &str) -> Result<(), RepoError> {
		if self.is_occupied(path) {
			return Err(RepoError::DestinationExists { path: path.to_string() });
		}
		if let Some(parent) = dst.parent() {
			afs::create_dir_all(parent).await?;
		}
		match afs::hard_link(src, dst).await {
			Ok(()) => {}
			Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
				return Err(RepoError::DestinationExists { path: path.to_string() })
			}
			Err(e) => return Err(e.into()),
		}
		afs::remove_file(src).await?;
		Ok(())
	}
}

#[async_trait]
impl Repo for FilesRepo {
	fn name(&self) -> String {
		self.root.display().to_string()
	}

	async fn index(&self) -> Result<RepoIndex, RepoError> {
		self.refresh().await
	}

	fn index_watch(&self) -> IndexWatch {
		self.index_tx.subscribe()
	}

	async fn contains(&self, path: &str) -> Result<bool, RepoError> {
		let path = checked_path(path)?;
		Ok(self.checksum_path(&path).is_file() && self.root.join(&path).is_file())
	}

	async fn open(&self, path: &str) -> Result<(FileInfo, FileStream), RepoError> {
		let path = checked_path(path)?;
		let checksum = self.read_checksum(&path).await?;
		let file = match afs::File::open(self.root.join(&path)).await {
			Ok(file) => file,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(RepoError::NotFound { path })
			}
			Err(e) => return Err(e.into()),
		};
		let length = file.metadata().await?.len();
		Ok((FileInfo { length: Some(length), checksum }, Box::new(file)))
	}

	async fn save(&self, path: &str, info: FileInfo, stream: FileStream) -> Result<(), RepoError> {
		let path = checked_path(path)?;
		if self.is_occupied(&path) {
			return Err(RepoError::DestinationExists { path });
		}

		let tmp_dir = self.archive_dir().join(TMP_DIR_NAME);
		afs::create_dir_all(&tmp_dir).await?;
		let tmp = tmp_dir.join(format!("{}.tmp", Uuid::new_v4()));

		let checksum = match self.write_verified(&tmp, &info, stream).await {
			Ok(checksum) => checksum,
			Err(e) => {
				debug!("Save of {} not completed, cleaning up {}", path, tmp.display());
				let _ = afs::remove_file(&tmp).await;
				return Err(match e {
					RepoError::ChecksumMismatch { expected, actual, .. } => {
						RepoError::ChecksumMismatch { path, expected, actual }
					}
					e => e,
				});
			}
		};

		let dst = self.root.join(&path);
		if let Err(e) = self.place(&tmp, &dst, &path).await {
			let _ = afs::remove_file(&tmp).await;
			return Err(e);
		}

		if let Err(e) = self.write_checksum(&path, &checksum).await {
			let _ = afs::remove_file(&dst).await;
			return Err(e);
		}

		let size = info.length.or_else(|| fs::metadata(&dst).ok().map(|m| m.len()));
		self.apply_to_index(move |index| index.insert(FileEntry::new(path, size, checksum))).await
	}

	async fn move_file(&self, from: &str, to: &str) -> Result<(), RepoError> {
		let from = checked_path(from)?;
		let to = checked_path(to)?;
		if self.is_occupied(&to) {
			return Err(RepoError::DestinationExists { path: to });
		}

		let checksum = self.read_checksum(&from).await?;
		let src = self.root.join(&from);
		if !src.is_file() {
			return Err(RepoError::NotFound { path: from });
		}

		let dst = self.root.join(&to);
		self.place(&src, &dst, &to).await?;
		self.write_checksum(&to, &checksum).await?;
		self.remove_checksum(&from).await?;

		self.apply_to_index(move |index| {
			let size = index.remove(&from).and_then(|entry| entry.size);
			index.insert(FileEntry::new(to, size, checksum));
		})
		.await
	}

	async fn delete(&self, path: &str) -> Result<(), RepoError> {
		let path = checked_path(path)?;
		let full = self.root.join(&path);
		if !full.is_file() {
			return Err(RepoError::NotFound { path });
		}
		afs::remove_file(&full).await?;
		match self.remove_checksum(&path).await {
			Ok(()) | Err(RepoError::NotFound { .. }) => {}
			Err(e) => return Err(e),
		}

		self.apply_to_index(move |index| {
			index.remove(&path);
		})
		.await
	}

	async fn get_metadata(&self) -> Result<RepositoryMetadata, RepoError> {
		match afs::read_to_string(self.metadata_path()).await {
			Ok(text) => Ok(serde_json::from_str(&text)?),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(RepositoryMetadata::default()),
			Err(e) => Err(e.into()),
		}
	}

	async fn update_metadata(&self, transform: MetadataTransform) -> Result<(), RepoError> {
		let old = self.get_metadata().await?;
		let text = serde_json::to_string_pretty(&transform(old))?;

		let tmp = self.archive_dir().join(format!("{}.{}.tmp", METADATA_FILE_NAME, Uuid::new_v4()));
		afs::write(&tmp, text).await?;
		if let Err(e) = afs::rename(&tmp, self.metadata_path()).await {
			let _ = afs::remove_file(&tmp).await;
			return Err(e.into());
		}
		Ok(())
	}
}

#[async_trait]
impl LocalRepo for FilesRepo {
	async fn find_all_files(&self, globs: &[String]) -> Result<Vec<String>, RepoError> {
		let root = self.root.clone();
		let globs = globs.to_vec();
		blocking(move || {
			let ignore = IgnoreMatcher::load(&root)?;
			let add_globs = AddGlobs::new(&globs)?;

			let mut files = Vec::new();
			walk_files(&root, &root, &|dir| dir == ARCHIVE_DIR_NAME, &mut files)?;
			files.retain(|path| !ignore.is_ignored(path) && add_globs.is_match(path));
			files.sort();
			Ok(files)
		})
		.await
	}

	async fn indexed_filenames(&self) -> Result<Vec<String>, RepoError> {
		Ok(self.index().await?.paths())
	}

	async fn verify_file_exists(&self, path: &str) -> Result<bool, RepoError> {
		let path = checked_path(path)?;
		Ok(self.root.join(path).is_file())
	}

	async fn file_checksum(&self, path: &str) -> Result<Checksum, RepoError> {
		self.read_checksum(&checked_path(path)?).await
	}

	async fn compute_file_checksum(&self, path: &str) -> Result<Checksum, RepoError> {
		let full = self.root.join(checked_path(path)?);
		let buffer_size = self.buffer_size;
		blocking(move || compute_checksum(&full, buffer_size)).await
	}

	async fn add(&self, path: &str) -> Result<(), RepoError> {
		let path = checked_path(path)?;
		let checksum = self.compute_file_checksum(&path).await?;
		self.write_checksum(&path, &checksum).await?;
		let size = fs::metadata(self.root.join(&path)).ok().map(|m| m.len());
		self.apply_to_index(move |index| index.insert(FileEntry::new(path, size, checksum))).await
	}

	async fn remove(&self, path: &str) -> Result<(), RepoError> {
		let path = checked_path(path)?;
		self.remove_checksum(&path).await?;
		self.apply_to_index(move |index| {
			index.remove(&path);
		})
		.await
	}
}

async fn blocking<T, F>(f: F) -> Result<T, RepoError>
where
	T: Send + 'static,
	F: FnOnce() -> Result<T, RepoError> + Send + 'static,
{
	tokio::task::spawn_blocking(f)
		.await
		.map_err(|e| RepoError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?
}

/// Read the index store into a [`RepoIndex`]
fn scan_index(root: &Path, checksums_dir: &Path) -> Result<RepoIndex, RepoError> {
	let mut checksum_files = Vec::new();
	walk_files(checksums_dir, checksums_dir, &|_| false, &mut checksum_files)?;

	let mut entries = Vec::with_capacity(checksum_files.len());
	for checksum_file in checksum_files {
		let path = match checksum_file.strip_suffix(CHECKSUM_SUFFIX) {
			Some(path) => path.to_string(),
			None => continue,
		};
		let text = fs::read_to_string(checksums_dir.join(&checksum_file))?;
		let checksum = match Checksum::from_hex(&text) {
			Ok(checksum) => checksum,
			Err(e) => {
				warn!("Skipping corrupt index entry {}: {}", checksum_file, e);
				continue;
			}
		};
		let size = fs::metadata(root.join(&path)).ok().filter(|m| m.is_file()).map(|m| m.len());
		entries.push(FileEntry::new(path, size, checksum));
	}
	Ok(RepoIndex::new(entries))
}

/// Collect regular files below `dir` as slash separated paths relative to `base`.
///
/// Top level directories for which `skip_top` returns true are not entered.
fn walk_files(
	dir: &Path,
	base: &Path,
	skip_top: &dyn Fn(&str) -> bool,
	out: &mut Vec<String>,
) -> Result<(), RepoError> {
	let entries = match fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
		Err(e) => return Err(e.into()),
	};

	for entry in entries {
		let entry = entry?;
		let path = entry.path();
		let file_type = entry.file_type()?;

		let rel = match relative_slash_path(&path, base) {
			Some(rel) => rel,
			None => {
				warn!("Skipping non UTF-8 path {}", path.display());
				continue;
			}
		};

		if file_type.is_dir() {
			if dir == base && skip_top(&rel) {
				continue;
			}
			walk_files(&path, base, skip_top, out)?;
		} else if file_type.is_file() {
			out.push(rel);
		}
	}
	Ok(())
}

fn relative_slash_path(path: &Path, base: &Path) -> Option<String> {
	let rel = path.strip_prefix(base).ok()?;
	let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
	Some(parts?.join("/"))
}

fn compute_checksum(path: &Path, buffer_size: usize) -> Result<Checksum, RepoError> {
	let mut file = match fs::File::open(path) {
		Ok(file) => file,
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			return Err(RepoError::NotFound { path: path.display().to_string() })
		}
		Err(e) => return Err(e.into()),
	};
	let mut hasher = blake3::Hasher::new();
	let mut buffer = vec![0u8; buffer_size];
	loop {
		let read = file.read(&mut buffer)?;
		if read == 0 {
			break;
		}
		hasher.update(&buffer[..read]);
	}
	Ok(Checksum::from_hasher(&hasher))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;
	use tempfile::TempDir;

	fn info_of(content: &[u8]) -> FileInfo {
		FileInfo { length: Some(content.len() as u64), checksum: Checksum::of(content) }
	}

	fn stream(content: &[u8]) -> FileStream {
		Box::new(Cursor::new(content.to_vec()))
	}

	async fn indexed_repo(dir: &TempDir, files: &[(&str, &str)]) -> FilesRepo {
		let repo = FilesRepo::create(dir.path()).await.unwrap();
		for (path, content) in files {
			let full = dir.path().join(path);
			fs::create_dir_all(full.parent().unwrap()).unwrap();
			fs::write(&full, content).unwrap();
			repo.add(path).await.unwrap();
		}
		repo
	}

	#[tokio::test]
	async fn test_create_and_index() {
		let dir = TempDir::new().unwrap();
		let repo = indexed_repo(&dir, &[("a", "A"), ("dir/b", "B")]).await;

		let index = repo.index().await.unwrap();
		assert_eq!(index.paths(), vec!["a", "dir/b"]);
		assert_eq!(index.by_path("dir/b").unwrap().checksum, Checksum::of(b"B"));
		assert_eq!(index.by_path("a").unwrap().size, Some(1));

		assert!(FilesRepo::create(dir.path()).await.is_err());
		assert!(FilesRepo::open(dir.path()).await.is_ok());
	}

	#[tokio::test]
	async fn test_find_from_subdirectory() {
		let dir = TempDir::new().unwrap();
		indexed_repo(&dir, &[("dir/b", "B")]).await;
		let repo = FilesRepo::find(&dir.path().join("dir")).await.unwrap();
		assert_eq!(repo.root(), dir.path());
	}

	#[tokio::test]
	async fn test_save_verifies_and_never_overwrites() {
		let dir = TempDir::new().unwrap();
		let repo = indexed_repo(&dir, &[("a", "old")]).await;

		let err = repo.save("a", info_of(b"new"), stream(b"new")).await;
		assert!(matches!(err, Err(RepoError::DestinationExists { .. })));
		assert_eq!(fs::read_to_string(dir.path().join("a")).unwrap(), "old");

		let err = repo.save("x/b", info_of(b"good"), stream(b"bad")).await;
		assert!(matches!(err, Err(RepoError::ChecksumMismatch { ref path, .. }) if path == "x/b"));
		assert!(!dir.path().join("x/b").exists());
		let leftovers = fs::read_dir(dir.path().join(".archive/tmp")).unwrap().count();
		assert_eq!(leftovers, 0);

		repo.save("x/b", info_of(b"good"), stream(b"good")).await.unwrap();
		assert_eq!(fs::read_to_string(dir.path().join("x/b")).unwrap(), "good");
		assert!(repo.contains("x/b").await.unwrap());
	}

	#[tokio::test]
	async fn test_move_and_delete() {
		let dir = TempDir::new().unwrap();
		let repo = indexed_repo(&dir, &[("a", "A"), ("b", "B")]).await;

		let err = repo.move_file("a", "b").await;
		assert!(matches!(err, Err(RepoError::DestinationExists { .. })));
		assert_eq!(fs::read_to_string(dir.path().join("b")).unwrap(), "B");

		repo.move_file("a", "moved/a").await.unwrap();
		assert_eq!(repo.indexed_filenames().await.unwrap(), vec!["b", "moved/a"]);
		assert_eq!(fs::read_to_string(dir.path().join("moved/a")).unwrap(), "A");

		repo.delete("b").await.unwrap();
		assert!(!dir.path().join("b").exists());
		assert_eq!(repo.indexed_filenames().await.unwrap(), vec!["moved/a"]);
	}

	#[tokio::test]
	async fn test_open_streams_content() {
		let dir = TempDir::new().unwrap();
		let repo = indexed_repo(&dir, &[("a", "content")]).await;
		let (info, mut s) = repo.open("a").await.unwrap();
		let mut out = Vec::new();
		s.read_to_end(&mut out).await.unwrap();
		assert_eq!(out, b"content");
		assert_eq!(info, info_of(b"content"));
		assert!(matches!(repo.open("missing").await, Err(RepoError::NotFound { .. })));
	}

	#[tokio::test]
	async fn test_find_all_files_applies_ignore_and_globs() {
		let dir = TempDir::new().unwrap();
		let repo = indexed_repo(&dir, &[]).await;
		for path in &["a", "dir/b", "dir/c.tmp", "other/d"] {
			let full = dir.path().join(path);
			fs::create_dir_all(full.parent().unwrap()).unwrap();
			fs::write(full, path).unwrap();
		}
		fs::write(dir.path().join(".keepsyncignore"), "*.tmp\n").unwrap();

		let all = repo.find_all_files(&[".".to_string()]).await.unwrap();
		assert_eq!(all, vec!["a", "dir/b", "other/d"]);

		let some = repo.find_all_files(&["dir".to_string()]).await.unwrap();
		assert_eq!(some, vec!["dir/b"]);
	}

	#[tokio::test]
	async fn test_metadata_roundtrip() {
		let dir = TempDir::new().unwrap();
		let repo = indexed_repo(&dir, &[]).await;
		assert_eq!(repo.get_metadata().await.unwrap(), RepositoryMetadata::default());
		repo.update_metadata(Box::new(|mut m: RepositoryMetadata| {
			m.association_group_id = Some("group".into());
			m
		}))
		.await
		.unwrap();
		assert_eq!(repo.get_metadata().await.unwrap().association_group_id.as_deref(), Some("group"));
	}

	#[tokio::test]
	async fn test_index_store_is_not_addressable() {
		let dir = TempDir::new().unwrap();
		let repo = indexed_repo(&dir, &[]).await;
		let text = Checksum::of(b"x").to_hex();

		let err = repo.save(".archive/checksums/evil.checksum", info_of(text.as_bytes()), stream(text.as_bytes())).await;
		assert!(matches!(err, Err(RepoError::InvalidPath { .. })));
		let err = repo.save(".keepsyncignore", info_of(b"*"), stream(b"*")).await;
		assert!(matches!(err, Err(RepoError::InvalidPath { .. })));
		assert!(!dir.path().join(".archive/checksums/evil.checksum").exists());
		assert!(repo.index().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_published_index_follows_mutations() {
		let dir = TempDir::new().unwrap();
		let repo = indexed_repo(&dir, &[("a", "A"), ("b", "B")]).await;
		let rx = repo.index_watch();

		repo.save("dir/c", info_of(b"CC"), stream(b"CC")).await.unwrap();
		repo.move_file("a", "moved/a").await.unwrap();
		repo.delete("b").await.unwrap();

		let published = match &*rx.borrow() {
			Loadable::Loaded(index) => RepoIndex::clone(index),
			_ => panic!("index not loaded"),
		};
		assert_eq!(published.paths(), vec!["dir/c", "moved/a"]);
		assert_eq!(published.by_path("dir/c").unwrap().size, Some(2));
		assert_eq!(published.by_path("moved/a").unwrap().size, Some(1));
		assert_eq!(published, repo.refresh().await.unwrap());
	}

	#[tokio::test]
	async fn test_remove_keeps_working_file() {
		let dir = TempDir::new().unwrap();
		let repo = indexed_repo(&dir, &[("a", "A")]).await;
		repo.remove("a").await.unwrap();
		assert!(repo.indexed_filenames().await.unwrap().is_empty());
		assert!(repo.verify_file_exists("a").await.unwrap());
		assert!(matches!(repo.remove("a").await, Err(RepoError::NotFound { .. })));
	}
}

// vim: ts=4
