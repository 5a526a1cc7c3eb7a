//! Execution engine: runs a prepared plan against two repositories
//!
//! Groups run in plan order and operations in list order; one confirmation is
//! asked per group that has selected operations. The first failure aborts the
//! rest of the plan, keeping the work already done.

pub mod observer;
pub mod progress;

pub use observer::{AlwaysConfirm, JobEvent, NoopObserver, Prompter, SyncObserver};
pub use progress::{CopyProgress, GroupProgress, ProgressSnapshot, ProgressTracker};

use crate::compare::{ExtraGroup, Relocation};
use crate::config::Config;
use crate::error::SyncError;
use crate::logging::*;
use crate::plan::{OperationSubset, PreparedSyncPlan, SyncOperation};
use crate::repo::{FileStream, Repo};
use crate::types::FileInfo;
use async_trait::async_trait;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, BufReader, ReadBuf};
use tokio::sync::watch;
use uuid::Uuid;

/// Terminal result of a job
#[derive(Debug, Clone)]
pub enum JobOutcome {
	Success,
	Failed(Arc<SyncError>),
	Cancelled,
}

impl JobOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, JobOutcome::Success)
	}
}

/// Lifecycle of a job; `Finished` is final
#[derive(Debug, Clone)]
pub enum ExecutionState {
	NotStarted,
	Running,
	Finished { outcome: JobOutcome, progress: ProgressSnapshot },
}

impl ExecutionState {
	pub fn outcome(&self) -> Option<&JobOutcome> {
		match self {
			ExecutionState::Finished { outcome, .. } => Some(outcome),
			_ => None,
		}
	}

	pub fn is_finished(&self) -> bool {
		self.outcome().is_some()
	}
}

/// Outcome once `rx` reaches `Finished`; a job dropped before that counts as cancelled
pub async fn wait_for_outcome(mut rx: watch::Receiver<ExecutionState>) -> JobOutcome {
	loop {
		let outcome = rx.borrow_and_update().outcome().cloned();
		if let Some(outcome) = outcome {
			return outcome;
		}
		if rx.changed().await.is_err() {
			return JobOutcome::Cancelled;
		}
	}
}

/// Unit of work that can be registered with a [`crate::guard::UniqueJobGuard`]
#[async_trait]
pub trait Job: Send + Sync + 'static {
	fn id(&self) -> Uuid;

	/// Run to a terminal state; a second call waits for the first
	async fn run(&self) -> JobOutcome;

	fn cancel(&self);

	fn state(&self) -> ExecutionState;
}

/// Cooperative cancellation flag shared with a running job
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
	flag: Arc<AtomicBool>,
}

impl CancelHandle {
	pub fn cancel(&self) {
		self.flag.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.flag.load(Ordering::SeqCst)
	}

	pub(crate) fn check(&self) -> Result<(), SyncError> {
		if self.is_cancelled() {
			Err(SyncError::Cancelled)
		} else {
			Ok(())
		}
	}
}

/// Tunables of an execution
#[derive(Debug, Clone, Copy)]
pub struct JobOptions {
	pub buffer_size: usize,
	pub progress_interval: Duration,
}

impl Default for JobOptions {
	fn default() -> Self {
		Self { buffer_size: 2 * 1024 * 1024, progress_interval: Duration::from_millis(100) }
	}
}

impl JobOptions {
	pub fn from_config(config: &Config) -> Self {
		Self { buffer_size: config.copy_buffer_size, progress_interval: config.progress_interval() }
	}
}

/// Execution of one prepared plan from `base` into `other`
pub struct SyncJob {
	id: Uuid,
	plan: Arc<PreparedSyncPlan>,
	base: Arc<dyn Repo>,
	other: Arc<dyn Repo>,
	subset: OperationSubset,
	prompter: Arc<dyn Prompter>,
	observer: Arc<dyn SyncObserver>,
	options: JobOptions,
	cancel: CancelHandle,
	started: AtomicBool,
	state_tx: watch::Sender<ExecutionState>,
	progress_tx: Arc<watch::Sender<ProgressSnapshot>>,
	tracker: Arc<Mutex<ProgressTracker>>,
	log: Mutex<Vec<String>>,
}

impl SyncJob {
	pub fn new(
		plan: Arc<PreparedSyncPlan>,
		base: Arc<dyn Repo>,
		other: Arc<dyn Repo>,
		subset: OperationSubset,
	) -> Self {
		let options = JobOptions::default();
		let tracker = ProgressTracker::new(&plan, &subset, options.progress_interval);
		let (state_tx, _) = watch::channel(ExecutionState::NotStarted);
		let (progress_tx, _) = watch::channel(tracker.snapshot());

		Self {
			id: Uuid::new_v4(),
			plan,
			base,
			other,
			subset,
			prompter: Arc::new(AlwaysConfirm),
			observer: Arc::new(NoopObserver),
			options,
			cancel: CancelHandle::default(),
			started: AtomicBool::new(false),
			state_tx,
			progress_tx: Arc::new(progress_tx),
			tracker: Arc::new(Mutex::new(tracker)),
			log: Mutex::new(Vec::new()),
		}
	}

	pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
		self.prompter = prompter;
		self
	}

	pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
		self.observer = observer;
		self
	}

	pub fn with_options(mut self, options: JobOptions) -> Self {
		self.options = options;
		let tracker = ProgressTracker::new(&self.plan, &self.subset, options.progress_interval);
		self.progress_tx.send_replace(tracker.snapshot());
		self.tracker = Arc::new(Mutex::new(tracker));
		self
	}

	pub fn plan(&self) -> &PreparedSyncPlan {
		&self.plan
	}

	pub fn cancel_handle(&self) -> CancelHandle {
		self.cancel.clone()
	}

	pub fn state_watch(&self) -> watch::Receiver<ExecutionState> {
		self.state_tx.subscribe()
	}

	pub fn progress_watch(&self) -> watch::Receiver<ProgressSnapshot> {
		self.progress_tx.subscribe()
	}

	/// Log lines written so far
	pub fn log_lines(&self) -> Vec<String> {
		self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	/// Wait for a terminal state
	pub async fn wait(&self) -> JobOutcome {
		wait_for_outcome(self.state_tx.subscribe()).await
	}

	fn tracker(&self) -> MutexGuard<'_, ProgressTracker> {
		self.tracker.lock().unwrap_or_else(|e| e.into_inner())
	}

	fn log_line(&self, line: String) {
		debug!("{}", line);
		self.log.lock().unwrap_or_else(|e| e.into_inner()).push(line);
	}

	fn record(&self, event: JobEvent, line: String) {
		self.log_line(line);
		self.observer.on_event(event);
	}

	fn publish_progress(&self) {
		let snapshot = self.tracker().snapshot();
		self.progress_tx.send_replace(snapshot.clone());
		self.observer.on_event(JobEvent::Progress(snapshot));
	}

	async fn execute(&self) -> Result<(), SyncError> {
		for (index, group) in self.plan.groups().iter().enumerate() {
			let selected: Vec<&SyncOperation> =
				group.operations().iter().filter(|op| self.subset.contains(op)).collect();
			if selected.is_empty() {
				continue;
			}

			self.cancel.check()?;
			if !self.prompter.confirm(group).await? {
				self.log_line(format!("{} abandoned", group.kind()));
				return Err(SyncError::Cancelled);
			}
			self.observer.on_event(JobEvent::GroupStarted { kind: group.kind(), operations: selected.len() });

			for operation in selected {
				self.cancel.check()?;
				debug!("Executing {}", operation.describe());
				match operation {
					SyncOperation::AdditiveReplication(relocation) => {
						self.additive_replication(relocation).await?
					}
					SyncOperation::RelocationApply(relocation) => self.relocation_apply(relocation).await?,
					SyncOperation::CopyNewFile(group) => self.copy_new_file(group).await?,
				}
				self.tracker().operation_completed(index);
				self.publish_progress();
			}
		}
		Ok(())
	}

	async fn copy_new_file(&self, group: &ExtraGroup) -> Result<(), SyncError> {
		for filename in &group.filenames {
			self.cancel.check()?;
			let (info, stream) = self.base.open(filename).await?;
			self.store(info, stream, filename).await?;
		}
		Ok(())
	}

	async fn additive_replication(&self, relocation: &Relocation) -> Result<(), SyncError> {
		for path in relocation.extra_base_locations() {
			self.store_relocated(relocation, path).await?;
		}
		Ok(())
	}

	async fn relocation_apply(&self, relocation: &Relocation) -> Result<(), SyncError> {
		let extra_base = relocation.extra_base_locations();
		let extra_other = relocation.extra_other_locations();

		if relocation.is_increasing_duplicates() {
			for path in &extra_base[extra_other.len()..] {
				self.store_relocated(relocation, path).await?;
			}
		} else if relocation.is_decreasing_duplicates() {
			for path in &extra_other[extra_base.len()..] {
				self.cancel.check()?;
				self.other.delete(path).await?;
				self.record(JobEvent::FileDeleted { path: path.clone() }, format!("file deleted: {}", path));
			}
		}

		for (from, to) in extra_other.iter().zip(extra_base.iter()) {
			self.cancel.check()?;
			self.other.move_file(from, to).await?;
			self.record(
				JobEvent::FileMoved { from: from.clone(), to: to.clone() },
				format!("file moved: {} -> {}", from, to),
			);
		}
		Ok(())
	}

	/// Store relocated content at `path`, reading a copy already in `other` when possible
	async fn store_relocated(&self, relocation: &Relocation, path: &str) -> Result<(), SyncError> {
		self.cancel.check()?;
		let local = match relocation.other_filenames.first() {
			Some(local) => match self.other.open(local).await {
				Ok(opened) => Some(opened),
				Err(e) => {
					warn!("Copy {} in {} unreadable, reading from {}: {}", local, self.other.name(), self.base.name(), e);
					None
				}
			},
			None => None,
		};
		let (info, stream) = match local {
			Some(opened) => opened,
			None => self.base.open(path).await?,
		};
		self.store(info, stream, path).await
	}

	async fn store(&self, info: FileInfo, stream: FileStream, path: &str) -> Result<(), SyncError> {
		self.tracker().copy_started(path, info.length);
		let tracked = TrackedReader::new(stream, self.cancel.clone(), self.progress_callback(path));
		let reader = BufReader::with_capacity(self.options.buffer_size, tracked);
		let result = self.other.save(path, info, Box::new(reader)).await;
		self.tracker().copy_finished(path);

		match result {
			Ok(()) => {
				self.record(JobEvent::FileStored { path: path.to_string() }, format!("file stored: {}", path));
				Ok(())
			}
			Err(_) if self.cancel.is_cancelled() => Err(SyncError::Cancelled),
			Err(e) => Err(e.into()),
		}
	}

	fn progress_callback(&self, path: &str) -> Box<dyn FnMut(u64) + Send> {
		let tracker = self.tracker.clone();
		let progress_tx = self.progress_tx.clone();
		let observer = self.observer.clone();
		let path = path.to_string();
		Box::new(move |bytes| {
			let snapshot = {
				let mut tracker = tracker.lock().unwrap_or_else(|e| e.into_inner());
				if !tracker.copy_advanced(&path, bytes) {
					return;
				}
				tracker.snapshot()
			};
			progress_tx.send_replace(snapshot.clone());
			observer.on_event(JobEvent::Progress(snapshot));
		})
	}
}

#[async_trait]
impl Job for SyncJob {
	fn id(&self) -> Uuid {
		self.id
	}

	async fn run(&self) -> JobOutcome {
		if self.started.swap(true, Ordering::SeqCst) {
			return self.wait().await;
		}

		info!("Job {} started: {} -> {}", self.id, self.base.name(), self.other.name());
		self.state_tx.send_replace(ExecutionState::Running);

		let outcome = match self.execute().await {
			Ok(()) => JobOutcome::Success,
			Err(SyncError::Cancelled) => JobOutcome::Cancelled,
			Err(_) if self.cancel.is_cancelled() => JobOutcome::Cancelled,
			Err(e) => {
				warn!("Job {} failed: {}", self.id, e.chain());
				self.log_line(format!("failed: {}", e));
				JobOutcome::Failed(Arc::new(e))
			}
		};

		info!("Job {} finished: {:?}", self.id, outcome);
		let progress = self.tracker().snapshot();
		self.progress_tx.send_replace(progress.clone());
		self.state_tx.send_replace(ExecutionState::Finished { outcome: outcome.clone(), progress });
		outcome
	}

	fn cancel(&self) {
		self.cancel.cancel();
	}

	fn state(&self) -> ExecutionState {
		self.state_tx.borrow().clone()
	}
}

/// Stream wrapper reporting read bytes and failing once cancelled
pub(crate) struct TrackedReader {
	inner: FileStream,
	cancel: CancelHandle,
	on_read: Box<dyn FnMut(u64) + Send>,
}

impl TrackedReader {
	pub(crate) fn new(inner: FileStream, cancel: CancelHandle, on_read: Box<dyn FnMut(u64) + Send>) -> Self {
		Self { inner, cancel, on_read }
	}
}

impl AsyncRead for TrackedReader {
	fn poll_read(
		mut self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &mut ReadBuf<'_>,
	) -> Poll<io::Result<()>> {
		if self.cancel.is_cancelled() {
			return Poll::Ready(Err(io::Error::new(io::ErrorKind::Interrupted, "copy cancelled")));
		}

		let before = buf.filled().len();
		let this = &mut *self;
		match Pin::new(&mut this.inner).poll_read(cx, buf) {
			Poll::Ready(Ok(())) => {
				let read = buf.filled().len() - before;
				if read > 0 {
					(this.on_read)(read as u64);
				}
				Poll::Ready(Ok(()))
			}
			other => other,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::compare::compare_repos;
	use crate::plan::{prepare_from_comparison, RelocationSyncMode, SyncGroup, SyncGroupKind};
	use crate::repo::InMemoryRepo;
	use std::io::Cursor;
	use tokio::io::AsyncReadExt;

	const MOVES: RelocationSyncMode =
		RelocationSyncMode::Move { allow_duplicate_increase: true, allow_duplicate_reduction: true };

	async fn job_for(base: &Arc<InMemoryRepo>, other: &Arc<InMemoryRepo>, mode: RelocationSyncMode) -> SyncJob {
		let result = compare_repos(base.as_ref(), other.as_ref()).await.unwrap();
		let plan = Arc::new(prepare_from_comparison(&result, mode));
		SyncJob::new(plan, base.clone(), other.clone(), OperationSubset::All)
	}

	struct Decline;

	#[async_trait]
	impl Prompter for Decline {
		async fn confirm(&self, _group: &SyncGroup) -> Result<bool, SyncError> {
			Ok(false)
		}
	}

	#[tokio::test]
	async fn test_copy_new_files() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("a", "A"), ("b", "B"), ("c", "B")]));
		let other = Arc::new(InMemoryRepo::with_files("other", &[("a", "A")]));

		let job = job_for(&base, &other, RelocationSyncMode::Disabled).await;
		assert!(job.run().await.is_success());
		assert_eq!(other.paths(), vec!["a", "b", "c"]);
		assert_eq!(job.log_lines(), vec!["file stored: b", "file stored: c"]);

		match job.state() {
			ExecutionState::Finished { progress, .. } => {
				assert_eq!(progress.operations_completed(), 1);
				assert_eq!(progress.bytes_copied, 2);
			}
			other => panic!("unexpected {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_relocation_apply_increase_uses_local_copy() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("a", "A"), ("copies/a", "A"), ("moved", "M")]));
		let other = Arc::new(InMemoryRepo::with_files("other", &[("old", "M"), ("x/a", "A")]));

		let job = job_for(&base, &other, MOVES).await;
		// bytes for the duplicate must come from `other`
		base.delete("copies/a").await.unwrap();
		assert!(job.run().await.is_success());

		assert_eq!(other.paths(), vec!["a", "copies/a", "moved"]);
		assert_eq!(
			job.log_lines(),
			vec!["file stored: copies/a", "file moved: x/a -> a", "file moved: old -> moved"]
		);
	}

	#[tokio::test]
	async fn test_relocation_apply_decrease() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("a", "A")]));
		let other = Arc::new(InMemoryRepo::with_files("other", &[("b", "A"), ("c", "A")]));

		let job = job_for(&base, &other, MOVES).await;
		assert!(job.run().await.is_success());
		assert_eq!(other.paths(), vec!["a"]);
		assert_eq!(job.log_lines(), vec!["file deleted: c", "file moved: b -> a"]);
	}

	#[tokio::test]
	async fn test_additive_never_moves_or_deletes() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("a", "A")]));
		let other = Arc::new(InMemoryRepo::with_files("other", &[("b", "A"), ("c", "A")]));

		let job = job_for(&base, &other, RelocationSyncMode::AdditiveDuplicating).await;
		assert!(job.run().await.is_success());
		assert_eq!(other.paths(), vec!["a", "b", "c"]);
	}

	#[tokio::test]
	async fn test_declined_group_cancels() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("a", "A")]));
		let other = Arc::new(InMemoryRepo::new("other"));

		let job = job_for(&base, &other, RelocationSyncMode::Disabled).await.with_prompter(Arc::new(Decline));
		assert!(matches!(job.run().await, JobOutcome::Cancelled));
		assert!(other.paths().is_empty());
		assert_eq!(job.log_lines(), vec!["new files abandoned"]);
	}

	#[tokio::test]
	async fn test_failure_aborts_rest_of_plan() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("a", "A"), ("b", "B"), ("c", "C")]));
		let other = Arc::new(InMemoryRepo::new("other"));

		let job = job_for(&base, &other, RelocationSyncMode::Disabled).await;
		// occupy `b` after planning so its save collides
		other.put("b", b"other content");

		match job.run().await {
			JobOutcome::Failed(e) => assert!(e.chain().contains("Destination exists: b")),
			other => panic!("unexpected {:?}", other),
		}
		assert_eq!(other.get("a").unwrap(), b"A");
		assert_eq!(other.get("b").unwrap(), b"other content");
		assert!(other.get("c").is_none());
	}

	#[tokio::test]
	async fn test_cancel_at_operation_boundary() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("a", "A"), ("b", "B")]));
		let other = Arc::new(InMemoryRepo::new("other"));

		let job = job_for(&base, &other, RelocationSyncMode::Disabled).await;
		let cancel = job.cancel_handle();
		let job = job.with_observer(Arc::new(move |event: JobEvent| {
			if let JobEvent::FileStored { .. } = event {
				cancel.cancel();
			}
		}));

		assert!(matches!(job.run().await, JobOutcome::Cancelled));
		assert_eq!(other.paths(), vec!["a"]);
	}

	#[tokio::test]
	async fn test_subset_skips_unselected() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("a", "A"), ("b", "B")]));
		let other = Arc::new(InMemoryRepo::new("other"));

		let result = compare_repos(base.as_ref(), other.as_ref()).await.unwrap();
		let plan = Arc::new(prepare_from_comparison(&result, RelocationSyncMode::Disabled));
		let second = plan.operations().nth(1).unwrap().clone();
		let subset = OperationSubset::Only(vec![second].into_iter().collect());

		let job = SyncJob::new(plan, base.clone(), other.clone(), subset);
		assert!(job.run().await.is_success());
		assert_eq!(other.paths(), vec!["b"]);
	}

	/// Confirms every group, remembering the order of the questions
	#[derive(Default)]
	struct RecordingPrompter(Mutex<Vec<SyncGroupKind>>);

	#[async_trait]
	impl Prompter for RecordingPrompter {
		async fn confirm(&self, group: &SyncGroup) -> Result<bool, SyncError> {
			self.0.lock().unwrap().push(group.kind());
			Ok(true)
		}
	}

	fn recorded_events(events: &Arc<Mutex<Vec<String>>>) -> Arc<dyn SyncObserver> {
		let events = events.clone();
		Arc::new(move |event: JobEvent| {
			let line = match event {
				JobEvent::GroupStarted { kind, operations } => format!("{} ({})", kind, operations),
				JobEvent::FileStored { path } => format!("stored {}", path),
				JobEvent::FileMoved { from, to } => format!("moved {} -> {}", from, to),
				JobEvent::FileDeleted { path } => format!("deleted {}", path),
				_ => return,
			};
			events.lock().unwrap().push(line);
		})
	}

	#[tokio::test]
	async fn test_groups_run_in_plan_order() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("fresh", "F"), ("moved", "M"), ("z-new", "Z")]));
		let other = Arc::new(InMemoryRepo::with_files("other", &[("old", "M")]));

		let prompter = Arc::new(RecordingPrompter::default());
		let events = Arc::new(Mutex::new(Vec::new()));
		let job = job_for(&base, &other, MOVES)
			.await
			.with_prompter(prompter.clone())
			.with_observer(recorded_events(&events));
		assert!(job.run().await.is_success());

		assert_eq!(*prompter.0.lock().unwrap(), vec![SyncGroupKind::MoveApply, SyncGroupKind::NewFiles]);
		assert_eq!(
			*events.lock().unwrap(),
			vec!["moves (1)", "moved old -> moved", "new files (2)", "stored fresh", "stored z-new"]
		);
	}

	#[tokio::test]
	async fn test_additive_group_runs_before_new_files() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("fresh", "F"), ("moved", "M")]));
		let other = Arc::new(InMemoryRepo::with_files("other", &[("old", "M")]));

		let events = Arc::new(Mutex::new(Vec::new()));
		let job = job_for(&base, &other, RelocationSyncMode::AdditiveDuplicating)
			.await
			.with_observer(recorded_events(&events));
		assert!(job.run().await.is_success());

		assert_eq!(
			*events.lock().unwrap(),
			vec!["additive relocations (1)", "stored moved", "new files (1)", "stored fresh"]
		);
		assert_eq!(other.paths(), vec!["fresh", "moved", "old"]);
	}

	#[tokio::test]
	async fn test_wait_for_outcome_of_finished_and_dropped_jobs() {
		let (tx, rx) = watch::channel(ExecutionState::Running);
		let waiter = tokio::spawn(wait_for_outcome(rx));
		tx.send_replace(ExecutionState::Finished { outcome: JobOutcome::Success, progress: Default::default() });
		assert!(waiter.await.unwrap().is_success());

		let (tx, rx) = watch::channel(ExecutionState::NotStarted);
		drop(tx);
		assert!(matches!(wait_for_outcome(rx).await, JobOutcome::Cancelled));
	}

	#[tokio::test]
	async fn test_progress_seeded_from_options_tracker() {
		let base = Arc::new(InMemoryRepo::with_files("base", &[("a", "A"), ("b", "BB")]));
		let other = Arc::new(InMemoryRepo::new("other"));

		let options = JobOptions { buffer_size: 1, progress_interval: Duration::from_secs(60) };
		let job = job_for(&base, &other, RelocationSyncMode::Disabled).await.with_options(options);
		let initial = job.progress_watch().borrow().clone();
		assert_eq!(initial, job.tracker().snapshot());
		assert_eq!(initial.operations_total(), 2);
		assert_eq!(initial.bytes_total, Some(3));

		assert!(job.run().await.is_success());
		assert_eq!(other.paths(), vec!["a", "b"]);
	}

	#[tokio::test]
	async fn test_tracked_reader_stops_when_cancelled() {
		let cancel = CancelHandle::default();
		let counted = Arc::new(Mutex::new(0u64));
		let sink = counted.clone();
		let mut reader = TrackedReader::new(
			Box::new(Cursor::new(vec![7u8; 64])),
			cancel.clone(),
			Box::new(move |n: u64| *sink.lock().unwrap() += n),
		);

		let mut buf = [0u8; 16];
		assert_eq!(reader.read(&mut buf).await.unwrap(), 16);
		assert_eq!(*counted.lock().unwrap(), 16);

		cancel.cancel();
		let err = reader.read(&mut buf).await.unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::Interrupted);
	}
}

// vim: ts=4
