//! Per-pair sync sessions
//!
//! Each ordered pair keeps one background comparison that follows both index
//! observables. Preparation is refused while a job for the pair is registered,
//! and a comparison only yields a plan while both indexes it was computed from
//! are still the ones the backends publish.

use crate::compare::{compare, ComparisonResult};
use crate::config::Config;
use crate::error::SyncError;
use crate::guard::{LaunchedJob, PairKey, UniqueJobGuard};
use crate::job::{Job, JobOptions, Prompter, SyncJob, SyncObserver};
use crate::logging::*;
use crate::plan::{OperationSubset, PreparedSyncPlan, RelocationSyncMode, SyncPlanner};
use crate::repo::registry::RepoId;
use crate::repo::{IndexWatch, Repo, RepositoryRegistry};
use crate::types::{Loadable, RepoIndex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Comparison of a pair together with the index snapshots it was computed from
#[derive(Debug, Clone)]
pub struct PublishedComparison {
	pub result: Loadable<Arc<ComparisonResult>>,
	inputs: Option<(Arc<RepoIndex>, Arc<RepoIndex>)>,
}

impl PublishedComparison {
	fn without_inputs(result: Loadable<Arc<ComparisonResult>>) -> Self {
		Self { result, inputs: None }
	}

	/// Computed from exactly the indexes `base` and `other` currently publish
	fn is_current(&self, base: &dyn Repo, other: &dyn Repo) -> bool {
		let (base_input, other_input) = match &self.inputs {
			Some(inputs) => inputs,
			None => return false,
		};
		let same = |repo: &dyn Repo, input: &Arc<RepoIndex>| match &*repo.index_watch().borrow() {
			Loadable::Loaded(index) => Arc::ptr_eq(index, input),
			_ => false,
		};
		same(base, base_input) && same(other, other_input)
	}
}

/// Observable comparison of a pair
pub type ComparisonWatch = watch::Receiver<PublishedComparison>;

/// Guard shared by all sync sessions
pub type SyncJobGuard = UniqueJobGuard<PairKey, SyncJob>;

/// Guard for index updates and add-and-push, keyed by the local repository
pub type LocalJobGuard = UniqueJobGuard<RepoId, dyn Job>;

/// Hands out one session per ordered repository pair
pub struct SyncService {
	registry: Arc<RepositoryRegistry>,
	guard: Arc<SyncJobGuard>,
	local_guard: Arc<LocalJobGuard>,
	config: Config,
	pairs: Mutex<HashMap<PairKey, Arc<RepoToRepoSync>>>,
}

impl SyncService {
	pub fn new(registry: Arc<RepositoryRegistry>, config: Config) -> Self {
		Self {
			registry,
			guard: Arc::new(UniqueJobGuard::new()),
			local_guard: Arc::new(UniqueJobGuard::new()),
			config,
			pairs: Mutex::new(HashMap::new()),
		}
	}

	pub fn registry(&self) -> &Arc<RepositoryRegistry> {
		&self.registry
	}

	pub fn guard(&self) -> &Arc<SyncJobGuard> {
		&self.guard
	}

	/// Session for `base -> other`; must be called from within a tokio runtime
	pub fn pair(&self, base: &str, other: &str) -> Arc<RepoToRepoSync> {
		let key = PairKey::new(base, other);
		let mut pairs = self.pairs.lock().unwrap_or_else(|e| e.into_inner());
		pairs
			.entry(key.clone())
			.or_insert_with(|| {
				Arc::new(RepoToRepoSync::new(key, self.registry.clone(), self.guard.clone(), &self.config))
			})
			.clone()
	}

	pub fn current_job(&self, base: &str, other: &str) -> Option<Arc<SyncJob>> {
		self.guard.current_job(&PairKey::new(base, other))
	}

	/// Start an index update or add-and-push of `repo_id`; one at a time per repository
	pub fn start_local_job(&self, repo_id: &str, job: Arc<dyn Job>) -> Result<LaunchedJob<dyn Job>, SyncError> {
		self.local_guard.launch(repo_id.to_string(), job)
	}

	pub fn current_local_job(&self, repo_id: &str) -> Option<Arc<dyn Job>> {
		self.local_guard.current_job(&repo_id.to_string())
	}
}

/// Summary of a pair's comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareState {
	pub base_total: usize,
	pub missing_base_in_other: usize,
	pub other_total: usize,
	pub missing_other_in_base: usize,
	pub relocations: usize,
	pub fully_synced: bool,
}

impl CompareState {
	fn of(result: &ComparisonResult) -> Self {
		Self {
			base_total: result.all_base_files.len(),
			missing_base_in_other: result.missing_base_in_other(),
			other_total: result.all_other_files.len(),
			missing_other_in_base: result.missing_other_in_base(),
			relocations: result.relocations.len(),
			fully_synced: result.is_fully_synced(),
		}
	}
}

/// Whether a pair can be synced right now
pub enum PreparationState {
	/// A job for the pair is registered; no new plan is built
	JobRunning(Arc<SyncJob>),
	Loading,
	NotAvailable,
	Failed(Arc<dyn std::error::Error + Send + Sync>),
	Prepared(PreparedSync),
}

/// Plan ready to execute against live repository handles
pub struct PreparedSync {
	pub comparison: Arc<ComparisonResult>,
	pub plan: Arc<PreparedSyncPlan>,
	key: PairKey,
	base: Arc<dyn Repo>,
	other: Arc<dyn Repo>,
	guard: Arc<SyncJobGuard>,
	options: JobOptions,
}

impl PreparedSync {
	/// Register a job for the pair and start it
	pub fn start_execution(
		&self,
		subset: OperationSubset,
		prompter: Arc<dyn Prompter>,
		observer: Arc<dyn SyncObserver>,
	) -> Result<LaunchedJob<SyncJob>, SyncError> {
		let job = SyncJob::new(self.plan.clone(), self.base.clone(), self.other.clone(), subset)
			.with_options(self.options)
			.with_prompter(prompter)
			.with_observer(observer);
		self.guard.launch(self.key.clone(), Arc::new(job))
	}
}

/// Comparison and preparation for one ordered pair
pub struct RepoToRepoSync {
	key: PairKey,
	registry: Arc<RepositoryRegistry>,
	guard: Arc<SyncJobGuard>,
	options: JobOptions,
	comparison_rx: ComparisonWatch,
	task: JoinHandle<()>,
}

impl RepoToRepoSync {
	fn new(key: PairKey, registry: Arc<RepositoryRegistry>, guard: Arc<SyncJobGuard>, config: &Config) -> Self {
		let (tx, comparison_rx) = watch::channel(PublishedComparison::without_inputs(Loadable::Loading));
		let base_rx = registry.index_watch(&key.base);
		let other_rx = registry.index_watch(&key.other);
		let task = tokio::spawn(run_comparison(base_rx, other_rx, tx, config.compare_throttle()));

		Self { key, registry, guard, options: JobOptions::from_config(config), comparison_rx, task }
	}

	pub fn key(&self) -> &PairKey {
		&self.key
	}

	pub fn comparison_watch(&self) -> ComparisonWatch {
		self.comparison_rx.clone()
	}

	pub fn comparison(&self) -> Loadable<Arc<ComparisonResult>> {
		self.comparison_rx.borrow().result.clone()
	}

	pub fn compare_state(&self) -> Loadable<CompareState> {
		self.comparison().map(|result| CompareState::of(&result))
	}

	pub fn current_job(&self) -> Option<Arc<SyncJob>> {
		self.guard.current_job(&self.key)
	}

	/// Plan against the current comparison.
	///
	/// Reports `Loading` while the comparison lags behind either index, e.g.
	/// right after a job changed the destination.
	pub fn prepare(&self, mode: RelocationSyncMode) -> PreparationState {
		if let Some(job) = self.current_job() {
			return PreparationState::JobRunning(job);
		}

		let published = self.comparison_rx.borrow().clone();
		let comparison = match published.result.clone() {
			Loadable::Loading => return PreparationState::Loading,
			Loadable::NotAvailable => return PreparationState::NotAvailable,
			Loadable::Failed(e) => return PreparationState::Failed(e),
			Loadable::Loaded(comparison) => comparison,
		};
		let (base, other) = match (self.registry.handle(&self.key.base), self.registry.handle(&self.key.other)) {
			(Some(base), Some(other)) => (base, other),
			_ => return PreparationState::NotAvailable,
		};
		if !published.is_current(base.as_ref(), other.as_ref()) {
			debug!("Comparison of {} is behind its indexes", self.key);
			return PreparationState::Loading;
		}

		let plan = Arc::new(SyncPlanner::new(mode).prepare_from_comparison(&comparison));
		PreparationState::Prepared(PreparedSync {
			comparison,
			plan,
			key: self.key.clone(),
			base,
			other,
			guard: self.guard.clone(),
			options: self.options,
		})
	}

	/// Wait until the pair can be prepared; a failed comparison is returned as error
	pub async fn prepare_when_ready(&self, mode: RelocationSyncMode) -> Result<PreparedSync, SyncError> {
		let mut comparison_rx = self.comparison_rx.clone();
		let mut job_rx = self.guard.subscribe(&self.key);
		loop {
			match self.prepare(mode) {
				PreparationState::Prepared(prepared) => return Ok(prepared),
				PreparationState::Failed(e) => {
					return Err(SyncError::Other { message: format!("comparison of {} failed: {}", self.key, e) })
				}
				_ => {}
			}
			tokio::select! {
				changed = comparison_rx.changed() => changed.map_err(|_| SyncError::Other {
					message: format!("comparison of {} stopped", self.key),
				})?,
				changed = job_rx.changed() => changed.map_err(|_| SyncError::Other {
					message: format!("job guard of {} dropped", self.key),
				})?,
			}
		}
	}
}

impl Drop for RepoToRepoSync {
	fn drop(&mut self) {
		self.task.abort();
	}
}

/// Recompute the comparison whenever either index changes, at most once per `throttle`
async fn run_comparison(
	mut base_rx: IndexWatch,
	mut other_rx: IndexWatch,
	tx: watch::Sender<PublishedComparison>,
	throttle: Duration,
) {
	loop {
		let base = base_rx.borrow_and_update().clone();
		let other = other_rx.borrow_and_update().clone();

		let next = match (base, other) {
			(Loadable::Loaded(base), Loadable::Loaded(other)) => {
				let inputs = (base.clone(), other.clone());
				match tokio::task::spawn_blocking(move || compare(&base, &other)).await {
					Ok(result) => PublishedComparison { result: Loadable::Loaded(Arc::new(result)), inputs: Some(inputs) },
					Err(e) => {
						warn!("Comparison failed: {}", e);
						PublishedComparison::without_inputs(Loadable::Failed(Arc::new(SyncError::from(e))))
					}
				}
			}
			(Loadable::Failed(e), _) | (_, Loadable::Failed(e)) => PublishedComparison::without_inputs(Loadable::Failed(e)),
			(Loadable::NotAvailable, _) | (_, Loadable::NotAvailable) => {
				PublishedComparison::without_inputs(Loadable::NotAvailable)
			}
			_ => PublishedComparison::without_inputs(Loadable::Loading),
		};
		tx.send_replace(next);

		tokio::select! {
			_ = tx.closed() => break,
			_ = tokio::time::sleep(throttle) => {}
		}
		tokio::select! {
			_ = tx.closed() => break,
			changed = base_rx.changed() => if changed.is_err() { break },
			changed = other_rx.changed() => if changed.is_err() { break },
		}
	}
	debug!("Comparison task stopped");
}


// vim: ts=4
