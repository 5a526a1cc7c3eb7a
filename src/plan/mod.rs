//! Sync discovery: turns a comparison into an ordered, inspectable plan
//!
//! A plan always holds three groups in fixed order: additive relocations,
//! move-apply (with relocations the mode refuses to resolve), new files.

use crate::compare::{ComparisonResult, ExtraGroup, Relocation, RelocationKind};
use crate::error::{RelocationRefusal, SyncError};
use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};

/// Policy for resolving relocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationSyncMode {
	/// Never resolve relocations automatically
	Disabled,

	/// Store missing locations as extra copies; never move or delete
	AdditiveDuplicating,

	/// Move files in the destination to match the source
	Move { allow_duplicate_increase: bool, allow_duplicate_reduction: bool },
}

impl Default for RelocationSyncMode {
	fn default() -> Self {
		RelocationSyncMode::Disabled
	}
}

impl RelocationSyncMode {
	/// Whether a move-mode can resolve this relocation
	fn can_apply(&self, relocation: &Relocation) -> bool {
		match self {
			RelocationSyncMode::Move { allow_duplicate_increase, allow_duplicate_reduction } => {
				match relocation.kind() {
					RelocationKind::Move => true,
					RelocationKind::DuplicateIncrease => *allow_duplicate_increase,
					RelocationKind::DuplicateDecrease => *allow_duplicate_reduction,
				}
			}
			_ => false,
		}
	}
}

/// One unit of work in a plan
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyncOperation {
	/// Create every missing base location of the content in the destination
	AdditiveReplication(Relocation),

	/// Move (and duplicate or delete where allowed) destination files to match base
	RelocationApply(Relocation),

	/// Copy content missing from the destination
	CopyNewFile(ExtraGroup),
}

impl SyncOperation {
	/// Bytes this operation transfers, if sizes are known
	pub fn bytes_to_copy(&self) -> Option<u64> {
		match self {
			SyncOperation::AdditiveReplication(r) => r.bytes_to_copy(),
			SyncOperation::RelocationApply(r) => {
				let copies = r.extra_base_locations().len().saturating_sub(r.extra_other_locations().len());
				r.file_size.map(|size| size * copies as u64)
			}
			SyncOperation::CopyNewFile(g) => g.file_size.map(|size| size * g.filenames.len() as u64),
		}
	}

	pub fn describe(&self) -> String {
		match self {
			SyncOperation::AdditiveReplication(r) => {
				format!("duplicate to {}", crate::compare::filenames_print(r.extra_base_locations()))
			}
			SyncOperation::RelocationApply(r) => r.describe(),
			SyncOperation::CopyNewFile(g) => {
				format!("upload {}", crate::compare::filenames_print(&g.filenames))
			}
		}
	}
}

/// Kind of a plan group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncGroupKind {
	AdditiveRelocations,
	MoveApply,
	NewFiles,
}

impl fmt::Display for SyncGroupKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncGroupKind::AdditiveRelocations => write!(f, "additive relocations"),
			SyncGroupKind::MoveApply => write!(f, "moves"),
			SyncGroupKind::NewFiles => write!(f, "new files"),
		}
	}
}

/// Group of operations sharing one confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncGroup {
	AdditiveRelocations { operations: Vec<SyncOperation> },
	MoveApply { operations: Vec<SyncOperation>, to_ignore: Vec<Relocation> },
	NewFiles { operations: Vec<SyncOperation> },
}

impl SyncGroup {
	pub fn kind(&self) -> SyncGroupKind {
		match self {
			SyncGroup::AdditiveRelocations { .. } => SyncGroupKind::AdditiveRelocations,
			SyncGroup::MoveApply { .. } => SyncGroupKind::MoveApply,
			SyncGroup::NewFiles { .. } => SyncGroupKind::NewFiles,
		}
	}

	pub fn operations(&self) -> &[SyncOperation] {
		match self {
			SyncGroup::AdditiveRelocations { operations }
			| SyncGroup::MoveApply { operations, .. }
			| SyncGroup::NewFiles { operations } => operations,
		}
	}

	pub fn to_ignore(&self) -> &[Relocation] {
		match self {
			SyncGroup::MoveApply { to_ignore, .. } => to_ignore,
			_ => &[],
		}
	}

	pub fn is_empty(&self) -> bool {
		self.operations().is_empty()
	}
}

/// Which operations of a plan an execution may perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationSubset {
	All,
	Only(HashSet<SyncOperation>),
}

impl OperationSubset {
	pub fn contains(&self, operation: &SyncOperation) -> bool {
		match self {
			OperationSubset::All => true,
			OperationSubset::Only(set) => set.contains(operation),
		}
	}
}

impl Default for OperationSubset {
	fn default() -> Self {
		OperationSubset::All
	}
}

/// Counts describing a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanSummary {
	pub duplications: usize,
	pub moves: usize,
	pub ignored: usize,
	pub new_files: usize,
	pub bytes_to_copy: Option<u64>,
}

/// Ordered set of pending operations derived from a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSyncPlan {
	mode: RelocationSyncMode,
	groups: Vec<SyncGroup>,
}

/// Planner bound to one relocation mode
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncPlanner {
	mode: RelocationSyncMode,
}

impl SyncPlanner {
	pub fn new(mode: RelocationSyncMode) -> Self {
		Self { mode }
	}

	pub fn prepare_from_comparison(&self, result: &ComparisonResult) -> PreparedSyncPlan {
		prepare_from_comparison(result, self.mode)
	}
}

/// Build a plan for `result` under `mode`
pub fn prepare_from_comparison(
	result: &ComparisonResult,
	mode: RelocationSyncMode,
) -> PreparedSyncPlan {
	let mut additive = Vec::new();
	let mut to_apply = Vec::new();
	let mut to_ignore = Vec::new();

	for relocation in &result.relocations {
		match mode {
			RelocationSyncMode::AdditiveDuplicating => {
				additive.push(SyncOperation::AdditiveReplication(relocation.clone()))
			}
			_ if mode.can_apply(relocation) => {
				to_apply.push(SyncOperation::RelocationApply(relocation.clone()))
			}
			_ => to_ignore.push(relocation.clone()),
		}
	}

	let new_files =
		result.unmatched_base_extras.iter().cloned().map(SyncOperation::CopyNewFile).collect();

	PreparedSyncPlan {
		mode,
		groups: vec![
			SyncGroup::AdditiveRelocations { operations: additive },
			SyncGroup::MoveApply { operations: to_apply, to_ignore },
			SyncGroup::NewFiles { operations: new_files },
		],
	}
}

impl PreparedSyncPlan {
	pub fn mode(&self) -> RelocationSyncMode {
		self.mode
	}

	/// Always three groups: additive relocations, move-apply, new files
	pub fn groups(&self) -> &[SyncGroup] {
		&self.groups
	}

	pub fn is_no_op(&self) -> bool {
		self.groups.iter().all(SyncGroup::is_empty)
	}

	pub fn operations(&self) -> impl Iterator<Item = &SyncOperation> {
		self.groups.iter().flat_map(|g| g.operations())
	}

	pub fn ignored_relocations(&self) -> &[Relocation] {
		self.groups.iter().map(SyncGroup::to_ignore).find(|i| !i.is_empty()).unwrap_or(&[])
	}

	/// Why relocations were left unresolved, if any were
	pub fn refusal(&self) -> Option<RelocationRefusal> {
		let ignored = self.ignored_relocations();
		if ignored.is_empty() {
			return None;
		}
		if self.mode == RelocationSyncMode::Disabled {
			return Some(RelocationRefusal::Disabled);
		}
		if ignored.iter().any(Relocation::is_increasing_duplicates) {
			Some(RelocationRefusal::DuplicateIncrease)
		} else {
			Some(RelocationRefusal::DuplicateReduction)
		}
	}

	/// Fail when the mode left relocations unresolved
	pub fn ensure_no_ignored(&self) -> Result<(), SyncError> {
		match self.refusal() {
			Some(refusal) => Err(SyncError::IgnoredRelocations {
				refusal,
				count: self.ignored_relocations().len(),
			}),
			None => Ok(()),
		}
	}

	pub fn summary(&self) -> PlanSummary {
		let mut summary = PlanSummary::default();
		for group in &self.groups {
			let count = group.operations().len();
			match group.kind() {
				SyncGroupKind::AdditiveRelocations => summary.duplications += count,
				SyncGroupKind::MoveApply => summary.moves += count,
				SyncGroupKind::NewFiles => summary.new_files += count,
			}
			summary.ignored += group.to_ignore().len();
		}
		summary.bytes_to_copy = sum_bytes(self.operations());
		summary
	}

	/// Human readable description of the plan
	pub fn write_summary(&self, out: &mut dyn Write) -> io::Result<()> {
		let summary = self.summary();
		writeln!(out, "Relocations to duplicate: {}", summary.duplications)?;
		writeln!(out, "Relocations to move: {}", summary.moves)?;
		writeln!(out, "Relocations ignored: {}", summary.ignored)?;
		writeln!(out, "New files to upload: {}", summary.new_files)?;
		for group in &self.groups {
			for operation in group.operations() {
				writeln!(out, "\t{}", operation.describe())?;
			}
			for relocation in group.to_ignore() {
				writeln!(out, "\tignored: {}", relocation.describe())?;
			}
		}
		Ok(())
	}
}

/// Sum of transfer sizes; unknown if any operation's size is unknown
pub fn sum_bytes<'a, I>(operations: I) -> Option<u64>
where
	I: IntoIterator<Item = &'a SyncOperation>,
{
	operations
		.into_iter()
		.try_fold(0u64, |acc, op| op.bytes_to_copy().map(|bytes| acc + bytes))
}


// vim: ts=4
