//! Progress tracking for sync jobs
//!
//! Tracks per-group operation counts, byte-level progress of in-flight copies,
//! and derives transfer speed and remaining time from the bytes still to copy.

use crate::plan::{sum_bytes, OperationSubset, PreparedSyncPlan, SyncGroupKind};
use std::fmt;
use std::time::{Duration, Instant};

/// Bytes per megabyte for display conversions
pub const BYTES_PER_MB: f64 = 1_000_000.0;

/// Completed and total operations of one plan group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupProgress {
	pub kind: SyncGroupKind,
	pub total: usize,
	pub completed: usize,
}

/// Byte progress of a copy in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyProgress {
	pub path: String,
	pub bytes_copied: u64,
	pub total_bytes: Option<u64>,
}

/// Point-in-time view of a job's progress
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressSnapshot {
	pub groups: Vec<GroupProgress>,
	pub in_flight: Vec<CopyProgress>,
	pub bytes_copied: u64,

	/// Unknown when any selected operation has an unknown size
	pub bytes_total: Option<u64>,

	/// Bytes per second since the job started
	pub speed: Option<f64>,
	pub time_estimated: Option<Duration>,
}

impl ProgressSnapshot {
	pub fn operations_total(&self) -> usize {
		self.groups.iter().map(|g| g.total).sum()
	}

	pub fn operations_completed(&self) -> usize {
		self.groups.iter().map(|g| g.completed).sum()
	}
}

impl fmt::Display for ProgressSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{} operations", self.operations_completed(), self.operations_total())?;
		write!(f, ", {:.1} MB", self.bytes_copied as f64 / BYTES_PER_MB)?;
		if let Some(total) = self.bytes_total {
			write!(f, " of {:.1} MB", total as f64 / BYTES_PER_MB)?;
		}
		if let Some(speed) = self.speed {
			write!(f, ", {:.1} MB/s", speed / BYTES_PER_MB)?;
		}
		if let Some(eta) = self.time_estimated {
			let secs = eta.as_secs();
			write!(f, ", ETA {:02}:{:02}", secs / 60, secs % 60)?;
		}
		Ok(())
	}
}

/// Mutable progress state of one job
#[derive(Debug)]
pub struct ProgressTracker {
	started: Instant,
	last_publish: Option<Instant>,
	interval: Duration,
	snapshot: ProgressSnapshot,
}

impl ProgressTracker {
	/// Totals count only operations selected by `subset`
	pub fn new(plan: &PreparedSyncPlan, subset: &OperationSubset, interval: Duration) -> Self {
		let groups = plan
			.groups()
			.iter()
			.map(|g| GroupProgress {
				kind: g.kind(),
				total: g.operations().iter().filter(|op| subset.contains(op)).count(),
				completed: 0,
			})
			.collect();
		let bytes_total = sum_bytes(plan.operations().filter(|op| subset.contains(op)));

		Self {
			started: Instant::now(),
			last_publish: None,
			interval,
			snapshot: ProgressSnapshot { groups, bytes_total, ..Default::default() },
		}
	}

	pub fn operation_completed(&mut self, group: usize) {
		if let Some(g) = self.snapshot.groups.get_mut(group) {
			g.completed += 1;
		}
	}

	pub fn copy_started(&mut self, path: &str, total_bytes: Option<u64>) {
		self.snapshot.in_flight.push(CopyProgress {
			path: path.to_string(),
			bytes_copied: 0,
			total_bytes,
		});
	}

	/// Record `bytes` more for `path`; true when a throttled report is due
	pub fn copy_advanced(&mut self, path: &str, bytes: u64) -> bool {
		if let Some(copy) = self.snapshot.in_flight.iter_mut().find(|c| c.path == path) {
			copy.bytes_copied += bytes;
		}
		self.snapshot.bytes_copied += bytes;

		let now = Instant::now();
		match self.last_publish {
			Some(last) if now.duration_since(last) < self.interval => false,
			_ => {
				self.last_publish = Some(now);
				true
			}
		}
	}

	/// Drop a finished (or failed) copy; bytes of a failed copy stay counted
	pub fn copy_finished(&mut self, path: &str) {
		self.snapshot.in_flight.retain(|c| c.path != path);
	}

	pub fn snapshot(&self) -> ProgressSnapshot {
		let mut snapshot = self.snapshot.clone();
		let elapsed = self.started.elapsed().as_secs_f64();
		if elapsed > 0.0 && snapshot.bytes_copied > 0 {
			let speed = snapshot.bytes_copied as f64 / elapsed;
			snapshot.speed = Some(speed);
			snapshot.time_estimated = snapshot.bytes_total.map(|total| {
				let remaining = total.saturating_sub(snapshot.bytes_copied);
				Duration::from_secs_f64(remaining as f64 / speed)
			});
		}
		snapshot
	}
}


// vim: ts=4
