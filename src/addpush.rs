//! Add and push: index update, then propagation of its moves and new files
//!
//! Destinations are served in parallel; within one destination moves run first,
//! then copies, in plan order. A failing destination does not stop the others.

use crate::error::SyncError;
use crate::indexupdate::{IndexMove, IndexUpdatePlan, IndexUpdateSelection};
use crate::job::{
	CancelHandle, ExecutionState, Job, JobOptions, JobOutcome, NoopObserver, SyncObserver, TrackedReader,
	wait_for_outcome,
};
use crate::logging::*;
use crate::repo::{LocalRepo, Repo};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::watch;
use uuid::Uuid;

/// Push status of one destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushProgress {
	pub moved: Vec<IndexMove>,
	pub added: Vec<String>,
	pub error: Option<String>,
	pub finished: bool,
}

/// Push status of every destination, keyed by destination id
pub type PushStatus = BTreeMap<String, PushProgress>;

pub struct AddAndPushJob {
	id: Uuid,
	repo: Arc<dyn LocalRepo>,
	plan: Arc<IndexUpdatePlan>,
	selection: IndexUpdateSelection,
	destinations: Vec<(String, Arc<dyn Repo>)>,
	observer: Arc<dyn SyncObserver>,
	options: JobOptions,
	cancel: CancelHandle,
	started: AtomicBool,
	state_tx: watch::Sender<ExecutionState>,
	push_tx: watch::Sender<PushStatus>,
}

impl AddAndPushJob {
	pub fn new(
		repo: Arc<dyn LocalRepo>,
		plan: Arc<IndexUpdatePlan>,
		selection: IndexUpdateSelection,
		destinations: Vec<(String, Arc<dyn Repo>)>,
	) -> Self {
		let status = destinations.iter().map(|(id, _)| (id.clone(), PushProgress::default())).collect();
		let (state_tx, _) = watch::channel(ExecutionState::NotStarted);
		let (push_tx, _) = watch::channel(status);
		Self {
			id: Uuid::new_v4(),
			repo,
			plan,
			selection,
			destinations,
			observer: Arc::new(NoopObserver),
			options: JobOptions::default(),
			cancel: CancelHandle::default(),
			started: AtomicBool::new(false),
			state_tx,
			push_tx,
		}
	}

	pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
		self.observer = observer;
		self
	}

	pub fn with_options(mut self, options: JobOptions) -> Self {
		self.options = options;
		self
	}

	pub fn push_status(&self) -> PushStatus {
		self.push_tx.borrow().clone()
	}

	pub fn push_watch(&self) -> watch::Receiver<PushStatus> {
		self.push_tx.subscribe()
	}

	fn update_status<F: FnOnce(&mut PushProgress)>(&self, destination: &str, f: F) {
		self.push_tx.send_modify(|status| {
			if let Some(progress) = status.get_mut(destination) {
				f(progress);
			}
		});
	}

	async fn execute(&self) -> Result<(), SyncError> {
		self.plan.execute(self.repo.as_ref(), &self.selection, self.observer.as_ref(), &self.cancel).await?;

		let moves: Vec<&IndexMove> = self.plan.moves.iter().filter(|m| self.selection.includes_move(m)).collect();
		let files: Vec<&String> =
			self.plan.new_files.iter().filter(|f| self.selection.includes_file(f)).collect();
		let (moves, files) = (&moves, &files);

		let pushes = self.destinations.iter().map(|(id, destination)| async move {
			let result = self.push_to(id, destination.as_ref(), moves, files).await;
			self.update_status(id, |progress| {
				progress.finished = true;
				if let Err(e) = &result {
					progress.error = Some(e.to_string());
				}
			});
			result
		});

		let mut first_error = None;
		for result in join_all(pushes).await {
			match result {
				Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
				Err(e) if first_error.is_none() => first_error = Some(e),
				_ => {}
			}
		}
		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}

	async fn push_to(
		&self,
		id: &str,
		destination: &dyn Repo,
		moves: &[&IndexMove],
		files: &[&String],
	) -> Result<(), SyncError> {
		debug!("Pushing to {}", id);
		for m in moves {
			self.cancel.check()?;
			destination.move_file(&m.from, &m.to).await?;
			debug!("moved: {} - {} -> {}", id, m.from, m.to);
			self.update_status(id, |progress| progress.moved.push((*m).clone()));
		}

		for file in files {
			self.cancel.check()?;
			let (info, stream) = self.repo.open(file).await?;
			let tracked = TrackedReader::new(stream, self.cancel.clone(), Box::new(|_| {}));
			let reader = BufReader::with_capacity(self.options.buffer_size, tracked);
			match destination.save(file, info, Box::new(reader)).await {
				Ok(()) => {}
				Err(_) if self.cancel.is_cancelled() => return Err(SyncError::Cancelled),
				Err(e) => return Err(e.into()),
			}
			debug!("copied: {} - {}", id, file);
			self.update_status(id, |progress| progress.added.push((*file).clone()));
		}
		Ok(())
	}
}

#[async_trait]
impl Job for AddAndPushJob {
	fn id(&self) -> Uuid {
		self.id
	}

	async fn run(&self) -> JobOutcome {
		if self.started.swap(true, Ordering::SeqCst) {
			return wait_for_outcome(self.state_tx.subscribe()).await;
		}

		info!("Add and push {} started: {} to {} destinations", self.id, self.repo.name(), self.destinations.len());
		self.state_tx.send_replace(ExecutionState::Running);
		let outcome = match self.execute().await {
			Ok(()) => JobOutcome::Success,
			Err(SyncError::Cancelled) => JobOutcome::Cancelled,
			Err(e) => {
				warn!("Add and push {} failed: {}", self.id, e.chain());
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
