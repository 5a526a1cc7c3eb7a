//! Core data types: checksums, file entries and repository indexes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::{TryFrom, TryInto};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Content checksum (BLAKE3, 256 bit); the identity of a file's content
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Checksum([u8; 32]);

impl Checksum {
	pub fn from_bytes(bytes: [u8; 32]) -> Self {
		Checksum(bytes)
	}

	/// Checksum of an in-memory buffer
	pub fn of(data: &[u8]) -> Self {
		Checksum(*blake3::hash(data).as_bytes())
	}

	pub fn from_hasher(hasher: &blake3::Hasher) -> Self {
		Checksum(*hasher.finalize().as_bytes())
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}

	pub fn from_hex(text: &str) -> Result<Self, String> {
		let bytes = hex::decode(text.trim()).map_err(|e| format!("invalid checksum: {}", e))?;
		let bytes: [u8; 32] = bytes
			.as_slice()
			.try_into()
			.map_err(|_| format!("invalid checksum length: {}", bytes.len()))?;
		Ok(Checksum(bytes))
	}
}

impl fmt::Display for Checksum {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

impl fmt::Debug for Checksum {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Checksum({})", &self.to_hex()[..12])
	}
}

impl From<Checksum> for String {
	fn from(c: Checksum) -> String {
		c.to_hex()
	}
}

impl TryFrom<String> for Checksum {
	type Error = String;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		Checksum::from_hex(&s)
	}
}

/// One file of a repository index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
	/// Relative, slash separated path
	pub path: String,

	/// Size in bytes, if the backend knows it
	pub size: Option<u64>,

	pub checksum: Checksum,
}

impl FileEntry {
	pub fn new(path: impl Into<String>, size: Option<u64>, checksum: Checksum) -> Self {
		Self { path: path.into(), size, checksum }
	}
}

/// Immutable snapshot of a repository's file set, ordered and unique by path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoIndex {
	files: Vec<FileEntry>,
}

impl RepoIndex {
	/// Build an index; entries are sorted by path and later duplicates dropped
	pub fn new(mut files: Vec<FileEntry>) -> Self {
		files.sort_by(|a, b| a.path.cmp(&b.path));
		files.dedup_by(|later, earlier| later.path == earlier.path);
		Self { files }
	}

	pub fn files(&self) -> &[FileEntry] {
		&self.files
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}

	pub fn by_path(&self, path: &str) -> Option<&FileEntry> {
		self.files
			.binary_search_by(|entry| entry.path.as_str().cmp(path))
			.ok()
			.map(|i| &self.files[i])
	}

	pub fn contains_path(&self, path: &str) -> bool {
		self.by_path(path).is_some()
	}

	/// Insert `entry`, replacing the entry at the same path
	pub fn insert(&mut self, entry: FileEntry) {
		match self.files.binary_search_by(|existing| existing.path.cmp(&entry.path)) {
			Ok(i) => self.files[i] = entry,
			Err(i) => self.files.insert(i, entry),
		}
	}

	pub fn remove(&mut self, path: &str) -> Option<FileEntry> {
		let i = self.files.binary_search_by(|entry| entry.path.as_str().cmp(path)).ok()?;
		Some(self.files.remove(i))
	}

	/// Entries grouped by checksum, each group in path order
	pub fn by_checksum(&self) -> BTreeMap<Checksum, Vec<&FileEntry>> {
		let mut groups: BTreeMap<Checksum, Vec<&FileEntry>> = BTreeMap::new();
		for entry in &self.files {
			groups.entry(entry.checksum).or_default().push(entry);
		}
		groups
	}

	/// Paths holding the given content
	pub fn paths_with_checksum(&self, checksum: &Checksum) -> Vec<&str> {
		self.files
			.iter()
			.filter(|entry| &entry.checksum == checksum)
			.map(|entry| entry.path.as_str())
			.collect()
	}

	pub fn paths(&self) -> Vec<String> {
		self.files.iter().map(|entry| entry.path.clone()).collect()
	}

	pub fn total_size(&self) -> u64 {
		self.files.iter().filter_map(|entry| entry.size).sum()
	}
}

/// Metadata accompanying a file stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
	pub length: Option<u64>,
	pub checksum: Checksum,
}

/// Small repository-level key/value metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoryMetadata {
	/// Identifier shared by all repositories holding copies of the same archive
	pub association_group_id: Option<String>,
}

/// Value of an observable that may still be loading or be unreachable
#[derive(Debug, Clone)]
pub enum Loadable<T> {
	Loading,
	NotAvailable,
	Failed(Arc<dyn Error + Send + Sync>),
	Loaded(T),
}

impl<T> Loadable<T> {
	pub fn is_loaded(&self) -> bool {
		matches!(self, Loadable::Loaded(_))
	}

	pub fn as_loaded(&self) -> Option<&T> {
		match self {
			Loadable::Loaded(value) => Some(value),
			_ => None,
		}
	}

	pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Loadable<U> {
		match self {
			Loadable::Loading => Loadable::Loading,
			Loadable::NotAvailable => Loadable::NotAvailable,
			Loadable::Failed(e) => Loadable::Failed(e),
			Loadable::Loaded(value) => Loadable::Loaded(f(value)),
		}
	}
}

/// Normalize a repository path: slash separated, no empty, `.` or leading parts
pub fn normalize_path(path: &str) -> Result<String, String> {
	let mut parts: Vec<&str> = Vec::new();
	for part in path.split(|c| c == '/' || c == '\\') {
		match part {
			"" | "." => {}
			".." => {
				if parts.pop().is_none() {
					return Err("path escapes repository root".to_string());
				}
			}
			part => parts.push(part),
		}
	}
	if parts.is_empty() {
		return Err("empty path".to_string());
	}
	Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entry(path: &str, content: &[u8]) -> FileEntry {
		FileEntry::new(path, Some(content.len() as u64), Checksum::of(content))
	}

	#[test]
	fn test_checksum_hex_roundtrip() {
		let c = Checksum::of(b"hello");
		assert_eq!(Checksum::from_hex(&c.to_hex()).unwrap(), c);
		assert!(Checksum::from_hex("abcd").is_err());
		assert!(Checksum::from_hex("zz").is_err());
	}

	#[test]
	fn test_index_insert_and_remove_keep_order() {
		let mut index = RepoIndex::new(vec![entry("a", b"1"), entry("c", b"3")]);
		index.insert(entry("b", b"2"));
		index.insert(entry("a", b"changed"));
		assert_eq!(index.paths(), vec!["a", "b", "c"]);
		assert_eq!(index.by_path("a").unwrap().checksum, Checksum::of(b"changed"));

		assert_eq!(index.remove("b").unwrap().path, "b");
		assert!(index.remove("b").is_none());
		assert_eq!(index.paths(), vec!["a", "c"]);
	}

	#[test]
	fn test_index_sorted_unique() {
		let index = RepoIndex::new(vec![entry("b", b"1"), entry("a", b"2"), entry("b", b"3")]);
		assert_eq!(index.paths(), vec!["a", "b"]);
		assert_eq!(index.by_path("b").unwrap().checksum, Checksum::of(b"1"));
		assert!(index.by_path("c").is_none());
	}

	#[test]
	fn test_index_by_checksum() {
		let index = RepoIndex::new(vec![entry("x/a", b"same"), entry("a", b"same"), entry("b", b"other")]);
		let groups = index.by_checksum();
		assert_eq!(groups.len(), 2);
		let same: Vec<&str> =
			groups[&Checksum::of(b"same")].iter().map(|e| e.path.as_str()).collect();
		assert_eq!(same, vec!["a", "x/a"]);
		assert_eq!(index.total_size(), 13);
	}

	#[test]
	fn test_normalize_path() {
		assert_eq!(normalize_path("./a//b/").unwrap(), "a/b");
		assert_eq!(normalize_path("a/../b").unwrap(), "b");
		assert!(normalize_path("../a").is_err());
		assert!(normalize_path(".").is_err());
	}

	#[test]
	fn test_metadata_json() {
		let meta = RepositoryMetadata { association_group_id: Some("g1".into()) };
		let json = serde_json::to_string(&meta).unwrap();
		assert_eq!(json, r#"{"associationGroupId":"g1"}"#);
	}
}

// vim: ts=4
