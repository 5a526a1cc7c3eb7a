//! Index update ("add") for repositories with a working tree
//!
//! Preparation discovers unindexed working-tree files matching the add-globs.
//! When moves are checked, an unindexed file whose checksum equals the one of
//! an indexed-but-missing file is reported as a move of that file instead of
//! a new file.

use crate::error::{RepoError, SyncError};
use crate::job::{
	CancelHandle, ExecutionState, Job, JobEvent, JobOutcome, NoopObserver, SyncObserver,
	wait_for_outcome,
};
use crate::logging::*;
use crate::repo::LocalRepo;
use crate::types::Checksum;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Characters rejected in filenames
pub const ILLEGAL_CHARACTERS: [char; 6] = [':', '?', '<', '>', '*', '|'];

/// Index entry to move to a new working-tree location
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexMove {
	pub from: String,
	pub to: String,
}

/// Result of preparing an index update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexUpdatePlan {
	/// Sorted
	pub new_files: Vec<String>,
	pub moves: Vec<IndexMove>,

	/// Indexed files missing from the working tree and not matched by a move
	pub missing_files: Vec<String>,

	/// Rejected files and why
	pub error_files: BTreeMap<String, String>,
}

/// Which parts of a plan an execution may perform; `None` selects everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexUpdateSelection {
	pub moves: Option<HashSet<IndexMove>>,
	pub new_files: Option<HashSet<String>>,
}

impl IndexUpdateSelection {
	pub fn includes_move(&self, m: &IndexMove) -> bool {
		self.moves.as_ref().map(|s| s.contains(m)).unwrap_or(true)
	}

	pub fn includes_file(&self, path: &str) -> bool {
		self.new_files.as_ref().map(|s| s.contains(path)).unwrap_or(true)
	}
}

fn illegal_character(path: &str) -> Option<char> {
	ILLEGAL_CHARACTERS.iter().copied().find(|c| path.contains(*c))
}

/// Compute what an add of `globs` would do
pub async fn prepare(
	repo: &dyn LocalRepo,
	globs: &[String],
	disable_moves_check: bool,
) -> Result<IndexUpdatePlan, RepoError> {
	let mut plan = IndexUpdatePlan::default();

	let mut candidates = Vec::new();
	for path in repo.find_all_files(globs).await? {
		if repo.contains(&path).await? {
			continue;
		}
		match illegal_character(&path) {
			Some(c) => {
				plan.error_files.insert(path.clone(), format!("{} contains illegal character {}", path, c));
			}
			None => candidates.push(path),
		}
	}
	debug!("{} unindexed files to check", candidates.len());

	if disable_moves_check {
		plan.new_files = candidates;
		plan.new_files.sort();
		return Ok(plan);
	}

	let mut missing: BTreeMap<Checksum, VecDeque<String>> = BTreeMap::new();
	for path in repo.indexed_filenames().await? {
		if !repo.verify_file_exists(&path).await? {
			let checksum = repo.file_checksum(&path).await?;
			missing.entry(checksum).or_default().push_back(path);
		}
	}

	for path in candidates {
		let checksum = repo.compute_file_checksum(&path).await?;
		match missing.get_mut(&checksum).and_then(VecDeque::pop_front) {
			Some(from) => plan.moves.push(IndexMove { from, to: path }),
			None => plan.new_files.push(path),
		}
	}

	plan.new_files.sort();
	plan.missing_files = missing.into_iter().flat_map(|(_, paths)| paths).collect();
	plan.missing_files.sort();
	Ok(plan)
}

impl IndexUpdatePlan {
	pub fn is_empty(&self) -> bool {
		self.new_files.is_empty() && self.moves.is_empty()
	}

	/// Re-index moved files: index the new location, then drop the old one
	pub async fn execute_moves_reindex(
		&self,
		repo: &dyn LocalRepo,
		selection: &IndexUpdateSelection,
		observer: &dyn SyncObserver,
		cancel: &CancelHandle,
	) -> Result<(), SyncError> {
		for m in self.moves.iter().filter(|m| selection.includes_move(m)) {
			cancel.check()?;
			repo.add(&m.to).await?;
			repo.remove(&m.from).await?;
			debug!("Index moved: {} -> {}", m.from, m.to);
			observer.on_event(JobEvent::FileMoved { from: m.from.clone(), to: m.to.clone() });
		}
		Ok(())
	}

	pub async fn execute_add_new_files(
		&self,
		repo: &dyn LocalRepo,
		selection: &IndexUpdateSelection,
		observer: &dyn SyncObserver,
		cancel: &CancelHandle,
	) -> Result<(), SyncError> {
		for path in self.new_files.iter().filter(|p| selection.includes_file(p)) {
			cancel.check()?;
			repo.add(path).await?;
			debug!("Indexed: {}", path);
			observer.on_event(JobEvent::FileIndexed { path: path.clone() });
		}
		Ok(())
	}

	/// Moves first, then new files
	pub async fn execute(
		&self,
		repo: &dyn LocalRepo,
		selection: &IndexUpdateSelection,
		observer: &dyn SyncObserver,
		cancel: &CancelHandle,
	) -> Result<(), SyncError> {
		self.execute_moves_reindex(repo, selection, observer, cancel).await?;
		self.execute_add_new_files(repo, selection, observer, cancel).await
	}

	/// Human readable preparation summary; `transform_path` maps root relative paths for display
	pub fn write_summary(&self, out: &mut dyn Write, transform_path: &dyn Fn(&str) -> String) -> io::Result<()> {
		if !self.error_files.is_empty() {
			writeln!(out, "Files with invalid names, not added:")?;
			for reason in self.error_files.values() {
				writeln!(out, "\t{}", reason)?;
			}
			writeln!(out)?;
		}

		if !self.missing_files.is_empty() {
			writeln!(out, "Missing indexed files not matched by add:")?;
			for path in &self.missing_files {
				writeln!(out, "\t{}", transform_path(path))?;
			}
			writeln!(out)?;
		}

		writeln!(out, "New files to be indexed:")?;
		for path in &self.new_files {
			writeln!(out, "\t{}", transform_path(path))?;
		}

		if !self.moves.is_empty() {
			writeln!(out)?;
			writeln!(out, "Files to be moved:")?;
			for m in &self.moves {
				writeln!(out, "\t{} -> {}", transform_path(&m.from), transform_path(&m.to))?;
			}
		}
		Ok(())
	}
}

/// Index update registered with the per-repository guard
pub struct IndexUpdateJob {
	id: Uuid,
	repo: Arc<dyn LocalRepo>,
	plan: Arc<IndexUpdatePlan>,
	selection: IndexUpdateSelection,
	observer: Arc<dyn SyncObserver>,
	cancel: CancelHandle,
	started: AtomicBool,
	state_tx: watch::Sender<ExecutionState>,
}

impl IndexUpdateJob {
	pub fn new(repo: Arc<dyn LocalRepo>, plan: Arc<IndexUpdatePlan>, selection: IndexUpdateSelection) -> Self {
		let (state_tx, _) = watch::channel(ExecutionState::NotStarted);
		Self {
			id: Uuid::new_v4(),
			repo,
			plan,
			selection,
			observer: Arc::new(NoopObserver),
			cancel: CancelHandle::default(),
			started: AtomicBool::new(false),
			state_tx,
		}
	}

	pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
		self.observer = observer;
		self
	}

	pub fn plan(&self) -> &IndexUpdatePlan {
		&self.plan
	}

	pub fn state_watch(&self) -> watch::Receiver<ExecutionState> {
		self.state_tx.subscribe()
	}
}

#[async_trait]
impl Job for IndexUpdateJob {
	fn id(&self) -> Uuid {
		self.id
	}

	async fn run(&self) -> JobOutcome {
		if self.started.swap(true, Ordering::SeqCst) {
			return wait_for_outcome(self.state_tx.subscribe()).await;
		}

		info!("Index update {} started for {}", self.id, self.repo.name());
		self.state_tx.send_replace(ExecutionState::Running);
		let outcome =
			match self.plan.execute(self.repo.as_ref(), &self.selection, self.observer.as_ref(), &self.cancel).await {
				Ok(()) => JobOutcome::Success,
				Err(SyncError::Cancelled) => JobOutcome::Cancelled,
				Err(e) => {
					warn!("Index update {} failed: {}", self.id, e.chain());
					JobOutcome::Failed(Arc::new(e))
				}
			};
		self.state_tx.send_replace(ExecutionState::Finished { outcome: outcome.clone(), progress: Default::default() });
		outcome
	}

	fn cancel(&self) {
		self.cancel.cancel();
	}

	fn state(&self) -> ExecutionState {
		self.state_tx.borrow().clone()
	}
}


// vim: ts=4
