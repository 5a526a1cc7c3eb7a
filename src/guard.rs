//! At most one live job per key
//!
//! Keys are ordered repository pairs for sync jobs and single repositories for
//! index updates. A registration lives from `launch` until the job reaches a
//! terminal state.

use crate::error::SyncError;
use crate::job::{Job, JobOutcome};
use crate::logging::*;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Ordered repository pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
	pub base: String,
	pub other: String,
}

impl PairKey {
	pub fn new(base: impl Into<String>, other: impl Into<String>) -> Self {
		Self { base: base.into(), other: other.into() }
	}
}

impl Display for PairKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} -> {}", self.base, self.other)
	}
}

/// Job registered with a guard
pub struct LaunchedJob<J: ?Sized> {
	pub job: Arc<J>,
	handle: JoinHandle<JobOutcome>,
}

impl<J: ?Sized> LaunchedJob<J> {
	/// Outcome of the job, available once its registration is removed
	pub async fn finished(self) -> Result<JobOutcome, SyncError> {
		Ok(self.handle.await?)
	}
}

/// Registry enforcing a single live job per key
pub struct UniqueJobGuard<K, J: ?Sized> {
	slots: Arc<Mutex<HashMap<K, watch::Sender<Option<Arc<J>>>>>>,
}

impl<K, J: ?Sized> Default for UniqueJobGuard<K, J> {
	fn default() -> Self {
		Self { slots: Arc::new(Mutex::new(HashMap::new())) }
	}
}

impl<K, J> UniqueJobGuard<K, J>
where
	K: Hash + Eq + Clone + Display + Send + 'static,
	J: Job + ?Sized,
{
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `job` under `key` and run it in the background
	pub fn launch(&self, key: K, job: Arc<J>) -> Result<LaunchedJob<J>, SyncError> {
		{
			let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
			let slot = slots.entry(key.clone()).or_insert_with(|| watch::channel(None).0);
			if slot.borrow().is_some() {
				return Err(SyncError::JobAlreadyRunning { key: key.to_string() });
			}
			slot.send_replace(Some(job.clone()));
		}
		debug!("Job {} registered for {}", job.id(), key);

		let slots = self.slots.clone();
		let running = job.clone();
		let handle = tokio::spawn(async move {
			let outcome = job.run().await;
			let mut slots = slots.lock().unwrap_or_else(|e| e.into_inner());
			if let Some(slot) = slots.get_mut(&key) {
				let current = slot.borrow().as_ref().map(|j| Arc::ptr_eq(j, &job)).unwrap_or(false);
				if current {
					slot.send_replace(None);
				}
			}
			debug!("Job {} released {}", job.id(), key);
			outcome
		});
		Ok(LaunchedJob { job: running, handle })
	}

	pub fn current_job(&self, key: &K) -> Option<Arc<J>> {
		let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
		slots.get(key).and_then(|slot| slot.borrow().clone())
	}

	/// Observable of the live job under `key`
	pub fn subscribe(&self, key: &K) -> watch::Receiver<Option<Arc<J>>> {
		let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
		slots.entry(key.clone()).or_insert_with(|| watch::channel(None).0).subscribe()
	}
}


// vim: ts=4
