//! Job events and group confirmation

use super::progress::ProgressSnapshot;
use crate::error::SyncError;
use crate::plan::{SyncGroup, SyncGroupKind};
use async_trait::async_trait;

/// Event emitted while a job executes
#[derive(Debug, Clone)]
pub enum JobEvent {
	/// A group with selected operations is about to run
	GroupStarted { kind: SyncGroupKind, operations: usize },

	/// A file was written to its destination
	FileStored { path: String },

	FileMoved { from: String, to: String },

	FileDeleted { path: String },

	/// A working-tree file was recorded in the index
	FileIndexed { path: String },

	/// Throttled progress report
	Progress(ProgressSnapshot),
}

/// Receives job events
pub trait SyncObserver: Send + Sync {
	fn on_event(&self, _event: JobEvent) {}
}

impl<T: Fn(JobEvent) + Send + Sync> SyncObserver for T {
	fn on_event(&self, event: JobEvent) {
		self(event);
	}
}

/// Observer ignoring every event
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Asked once before each group that has selected operations
#[async_trait]
pub trait Prompter: Send + Sync {
	/// `Ok(false)` stops the job as cancelled
	async fn confirm(&self, group: &SyncGroup) -> Result<bool, SyncError>;
}

/// Prompter approving every group
pub struct AlwaysConfirm;

#[async_trait]
impl Prompter for AlwaysConfirm {
	async fn confirm(&self, _group: &SyncGroup) -> Result<bool, SyncError> {
		Ok(true)
	}
}

// vim: ts=4
