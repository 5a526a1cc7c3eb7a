//! Content-addressed comparison of two repository indexes
//!
//! Files are matched by checksum, never by path. A checksum present on both
//! sides under differing filename sets is a [`Relocation`]; one present on a
//! single side only lands in that side's unmatched extras.

pub mod report;

use crate::error::RepoError;
use crate::repo::Repo;
use crate::types::{Checksum, FileEntry, RepoIndex};
use std::collections::{BTreeSet, HashSet};

pub use report::{path_diff, ComparisonReport};

/// Content present on one side only
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtraGroup {
	pub checksum: Checksum,
	pub file_size: Option<u64>,
	/// Sorted, never empty
	pub filenames: Vec<String>,
}

/// Kind of a relocation, derived from copy counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelocationKind {
	Move,
	DuplicateIncrease,
	DuplicateDecrease,
}

/// Content present on both sides under differing filenames
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relocation {
	pub checksum: Checksum,
	pub file_size: Option<u64>,
	pub base_filenames: Vec<String>,
	pub other_filenames: Vec<String>,
	extra_base_locations: Vec<String>,
	extra_other_locations: Vec<String>,
}

impl Relocation {
	pub fn new(
		checksum: Checksum,
		file_size: Option<u64>,
		mut base_filenames: Vec<String>,
		mut other_filenames: Vec<String>,
	) -> Self {
		base_filenames.sort();
		other_filenames.sort();

		let base_set: HashSet<&String> = base_filenames.iter().collect();
		let other_set: HashSet<&String> = other_filenames.iter().collect();
		let extra_base_locations =
			base_filenames.iter().filter(|f| !other_set.contains(f)).cloned().collect();
		let extra_other_locations =
			other_filenames.iter().filter(|f| !base_set.contains(f)).cloned().collect();

		Self {
			checksum,
			file_size,
			base_filenames,
			other_filenames,
			extra_base_locations,
			extra_other_locations,
		}
	}

	/// Base paths missing in other, sorted
	pub fn extra_base_locations(&self) -> &[String] {
		&self.extra_base_locations
	}

	/// Other paths missing in base, sorted
	pub fn extra_other_locations(&self) -> &[String] {
		&self.extra_other_locations
	}

	/// Base holds more copies than other
	pub fn is_increasing_duplicates(&self) -> bool {
		self.extra_base_locations.len() > self.extra_other_locations.len()
	}

	/// Other holds more copies than base
	pub fn is_decreasing_duplicates(&self) -> bool {
		self.extra_other_locations.len() > self.extra_base_locations.len()
	}

	pub fn kind(&self) -> RelocationKind {
		if self.is_increasing_duplicates() {
			RelocationKind::DuplicateIncrease
		} else if self.is_decreasing_duplicates() {
			RelocationKind::DuplicateDecrease
		} else {
			RelocationKind::Move
		}
	}

	/// Bytes a full additive resolution would transfer
	pub fn bytes_to_copy(&self) -> Option<u64> {
		self.file_size.map(|size| size * self.extra_base_locations.len() as u64)
	}

	/// One-line human readable description
	pub fn describe(&self) -> String {
		let from = filenames_print(&self.extra_other_locations);
		let to = filenames_print(&self.extra_base_locations);
		match self.kind() {
			RelocationKind::Move => format!("move {} -> {}", from, to),
			RelocationKind::DuplicateIncrease => {
				format!("duplicate increase {} -> {}", filenames_print(&self.other_filenames), to)
			}
			RelocationKind::DuplicateDecrease => {
				format!("duplicate decrease {} -> {}", from, filenames_print(&self.base_filenames))
			}
		}
	}
}

/// Outcome of comparing a base index against an other index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComparisonResult {
	pub all_base_files: Vec<String>,
	pub all_other_files: Vec<String>,
	/// Sorted by first base filename
	pub relocations: Vec<Relocation>,
	/// Other paths of relocated content whose path holds different content in base
	pub new_content_after_move: Vec<String>,
	/// Other-only paths whose path holds different content in base
	pub new_content_to_overwrite: Vec<String>,
	/// Sorted by first filename
	pub unmatched_base_extras: Vec<ExtraGroup>,
	/// Sorted by first filename
	pub unmatched_other_extras: Vec<ExtraGroup>,
}

impl ComparisonResult {
	pub fn has_relocations(&self) -> bool {
		!self.relocations.is_empty()
	}

	/// Nothing differs between the two sides
	pub fn is_fully_synced(&self) -> bool {
		self.relocations.is_empty()
			&& self.unmatched_base_extras.is_empty()
			&& self.unmatched_other_extras.is_empty()
	}

	/// Number of base files with no counterpart content in other
	pub fn missing_base_in_other(&self) -> usize {
		self.unmatched_base_extras.iter().map(|g| g.filenames.len()).sum()
	}

	/// Number of other files with no counterpart content in base
	pub fn missing_other_in_base(&self) -> usize {
		self.unmatched_other_extras.iter().map(|g| g.filenames.len()).sum()
	}
}

/// Compare two indexes. Pure and deterministic.
pub fn compare(base: &RepoIndex, other: &RepoIndex) -> ComparisonResult {
	let base_groups = base.by_checksum();
	let other_groups = other.by_checksum();

	let all_checksums: BTreeSet<&Checksum> = base_groups.keys().chain(other_groups.keys()).collect();

	let mut relocations = Vec::new();
	let mut unmatched_base_extras = Vec::new();
	let mut unmatched_other_extras = Vec::new();

	for checksum in all_checksums {
		let base_entries = base_groups.get(checksum);
		let other_entries = other_groups.get(checksum);

		let file_size = base_entries
			.into_iter()
			.chain(other_entries)
			.flatten()
			.find_map(|entry| entry.size);

		match (base_entries, other_entries) {
			(Some(base_entries), Some(other_entries)) => {
				let relocation = Relocation::new(
					*checksum,
					file_size,
					paths_of(base_entries),
					paths_of(other_entries),
				);
				if !relocation.extra_base_locations.is_empty()
					|| !relocation.extra_other_locations.is_empty()
				{
					relocations.push(relocation);
				}
			}
			(Some(entries), None) => unmatched_base_extras.push(extra_group(*checksum, file_size, entries)),
			(None, Some(entries)) => {
				unmatched_other_extras.push(extra_group(*checksum, file_size, entries))
			}
			(None, None) => {}
		}
	}

	relocations.sort_by(|a, b| a.base_filenames[0].cmp(&b.base_filenames[0]));
	unmatched_base_extras.sort_by(|a, b| a.filenames[0].cmp(&b.filenames[0]));
	unmatched_other_extras.sort_by(|a, b| a.filenames[0].cmp(&b.filenames[0]));

	let new_content_after_move = relocations
		.iter()
		.flat_map(|relocation| {
			relocation
				.other_filenames
				.iter()
				.filter(move |path| differs_in(base, path, &relocation.checksum))
				.cloned()
		})
		.collect();

	let new_content_to_overwrite = unmatched_other_extras
		.iter()
		.flat_map(|group| {
			group.filenames.iter().filter(move |path| differs_in(base, path, &group.checksum)).cloned()
		})
		.collect();

	ComparisonResult {
		all_base_files: base.paths(),
		all_other_files: other.paths(),
		relocations,
		new_content_after_move,
		new_content_to_overwrite,
		unmatched_base_extras,
		unmatched_other_extras,
	}
}

/// Fetch both indexes and compare them
pub async fn compare_repos(base: &dyn Repo, other: &dyn Repo) -> Result<ComparisonResult, RepoError> {
	let base_index = base.index().await?;
	let other_index = other.index().await?;
	Ok(compare(&base_index, &other_index))
}

fn paths_of(entries: &[&FileEntry]) -> Vec<String> {
	entries.iter().map(|entry| entry.path.clone()).collect()
}

fn extra_group(checksum: Checksum, file_size: Option<u64>, entries: &[&FileEntry]) -> ExtraGroup {
	let mut filenames = paths_of(entries);
	filenames.sort();
	ExtraGroup { checksum, file_size, filenames }
}

fn differs_in(index: &RepoIndex, path: &str, checksum: &Checksum) -> bool {
	index.by_path(path).map(|entry| &entry.checksum != checksum).unwrap_or(false)
}

pub(crate) fn filenames_print(filenames: &[String]) -> String {
	if filenames.len() == 1 {
		filenames[0].clone()
	} else {
		format!("{{{}}}", filenames.join(", "))
	}
}


// vim: ts=4
