//! Library API tests on file archives
//!
//! This test suite covers:
//! - One-shot compare, plan and execute
//! - Sync sessions following index changes
//! - Job guard exclusivity
//! - Add and push to several archives

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;

use async_trait::async_trait;
use keepsync::addpush::AddAndPushJob;
use keepsync::compare::compare_repos;
use keepsync::config::Config;
use keepsync::error::SyncError;
use keepsync::indexupdate::{self, IndexUpdateJob, IndexUpdateSelection};
use keepsync::job::{AlwaysConfirm, Job, JobEvent, JobOutcome, NoopObserver, Prompter, SyncJob};
use keepsync::orchestrator::{CompareState, RepoToRepoSync, SyncService};
use keepsync::plan::{OperationSubset, RelocationSyncMode, SyncGroup, SyncPlanner};
use keepsync::repo::{FilesRepo, LocalRepo, Repo, RepositoryRegistry};
use keepsync::{Loadable, RelocationRefusal};

// ============================================================================
// Helper Functions for Test Setup
// ============================================================================

fn create_test_file(dir: &Path, name: &str, content: &str) {
	let path = dir.join(name);
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(path, content).unwrap();
}

async fn archive_with(dir: &TempDir, files: &[(&str, &str)]) -> Arc<FilesRepo> {
	let repo = FilesRepo::create(dir.path()).await.unwrap();
	for (name, content) in files {
		create_test_file(dir.path(), name, content);
		repo.add(name).await.unwrap();
	}
	Arc::new(repo)
}

/// Holds the first confirmation until the sender is dropped, then declines
struct WaitThenDecline(Mutex<Option<oneshot::Receiver<()>>>);

#[async_trait]
impl Prompter for WaitThenDecline {
	async fn confirm(&self, _group: &SyncGroup) -> Result<bool, SyncError> {
		let rx = self.0.lock().unwrap().take();
		if let Some(rx) = rx {
			let _ = rx.await;
		}
		Ok(false)
	}
}

async fn wait_for_state(pair: &RepoToRepoSync, f: impl Fn(&CompareState) -> bool) -> CompareState {
	let mut rx = pair.comparison_watch();
	tokio::time::timeout(Duration::from_secs(10), async {
		loop {
			if let Loadable::Loaded(state) = pair.compare_state() {
				if f(&state) {
					return state;
				}
			}
			rx.changed().await.unwrap();
		}
	})
	.await
	.expect("timed out waiting for comparison")
}

// ============================================================================
// One-shot sync
// ============================================================================

#[tokio::test]
async fn test_compare_plan_execute() {
	let base_dir = TempDir::new().unwrap();
	let other_dir = TempDir::new().unwrap();
	let base = archive_with(&base_dir, &[("a", "A"), ("photos/b", "B"), ("photos/copy-of-b", "B")]).await;
	let other = archive_with(&other_dir, &[("old/a", "A"), ("b", "B")]).await;

	let comparison = compare_repos(base.as_ref(), other.as_ref()).await.unwrap();
	assert_eq!(comparison.relocations.len(), 2);
	assert!(!comparison.is_fully_synced());

	let mode = RelocationSyncMode::Move { allow_duplicate_increase: true, allow_duplicate_reduction: false };
	let plan = SyncPlanner::new(mode).prepare_from_comparison(&comparison);
	assert!(plan.refusal().is_none());

	let job = SyncJob::new(Arc::new(plan), base.clone(), other.clone(), OperationSubset::All);
	assert!(job.run().await.is_success());

	let after = compare_repos(base.as_ref(), other.as_ref()).await.unwrap();
	assert!(after.is_fully_synced(), "left over: {:?}", after);
	assert_eq!(fs::read_to_string(other_dir.path().join("photos/copy-of-b")).unwrap(), "B");
}

#[tokio::test]
async fn test_refused_plan_reports_why() {
	let base_dir = TempDir::new().unwrap();
	let other_dir = TempDir::new().unwrap();
	let base = archive_with(&base_dir, &[("new-name", "A"), ("fresh", "F")]).await;
	let other = archive_with(&other_dir, &[("old-name", "A")]).await;

	let comparison = compare_repos(base.as_ref(), other.as_ref()).await.unwrap();
	let plan = SyncPlanner::new(RelocationSyncMode::Disabled).prepare_from_comparison(&comparison);
	assert_eq!(plan.refusal(), Some(RelocationRefusal::Disabled));
	assert!(plan.refusal().unwrap().hint().contains("--resolve-moves"));
	assert!(matches!(plan.ensure_no_ignored(), Err(SyncError::IgnoredRelocations { count: 1, .. })));
	assert!(!plan.is_no_op());
}

// ============================================================================
// Sync sessions
// ============================================================================

#[tokio::test]
async fn test_session_follows_index_changes() {
	let base_dir = TempDir::new().unwrap();
	let other_dir = TempDir::new().unwrap();
	let base = archive_with(&base_dir, &[("a", "A"), ("b", "B")]).await;
	let other = archive_with(&other_dir, &[("a", "A")]).await;

	let config = Config { compare_throttle_ms: 10, ..Config::default() };
	let registry = Arc::new(RepositoryRegistry::new());
	registry.connect("base", base.clone());
	registry.connect("backup", other.clone());
	let service = SyncService::new(registry, config);
	let pair = service.pair("base", "backup");

	let state = wait_for_state(&pair, |_| true).await;
	assert_eq!(state.missing_base_in_other, 1);

	let prepared = pair.prepare_when_ready(RelocationSyncMode::Disabled).await.unwrap();
	let launched = prepared
		.start_execution(OperationSubset::All, Arc::new(AlwaysConfirm), Arc::new(NoopObserver))
		.unwrap();
	assert!(launched.finished().await.unwrap().is_success());
	wait_for_state(&pair, |state| state.fully_synced).await;

	create_test_file(base_dir.path(), "c", "C");
	base.add("c").await.unwrap();
	let state = wait_for_state(&pair, |state| !state.fully_synced).await;
	assert_eq!(state.base_total, 3);
	assert_eq!(state.missing_base_in_other, 1);
}

#[tokio::test]
async fn test_one_job_per_pair() {
	let base_dir = TempDir::new().unwrap();
	let other_dir = TempDir::new().unwrap();
	let base = archive_with(&base_dir, &[("a", "A")]).await;
	let other = archive_with(&other_dir, &[]).await;

	let registry = Arc::new(RepositoryRegistry::new());
	registry.connect("base", base);
	registry.connect("backup", other);
	let service = SyncService::new(registry, Config::default());
	let pair = service.pair("base", "backup");

	let first = pair.prepare_when_ready(RelocationSyncMode::Disabled).await.unwrap();
	let second = pair.prepare_when_ready(RelocationSyncMode::Disabled).await.unwrap();

	// The first job waits on its confirmation until the sender is dropped
	let (tx, rx) = oneshot::channel::<()>();
	let prompter = WaitThenDecline(Mutex::new(Some(rx)));
	let launched = first.start_execution(OperationSubset::All, Arc::new(prompter), Arc::new(NoopObserver)).unwrap();

	let err = second
		.start_execution(OperationSubset::All, Arc::new(AlwaysConfirm), Arc::new(NoopObserver))
		.err()
		.unwrap();
	assert!(matches!(err, SyncError::JobAlreadyRunning { .. }), "{}", err);
	assert!(service.current_job("base", "backup").is_some());

	drop(tx);
	assert!(matches!(launched.finished().await.unwrap(), JobOutcome::Cancelled));
	assert!(service.current_job("base", "backup").is_none());
}

#[tokio::test]
async fn test_one_index_update_per_repository() {
	let dir = TempDir::new().unwrap();
	let local = archive_with(&dir, &[]).await;
	create_test_file(dir.path(), "a", "A");
	create_test_file(dir.path(), "b", "B");

	let service = SyncService::new(Arc::new(RepositoryRegistry::new()), Config::default());
	let plan = Arc::new(indexupdate::prepare(local.as_ref(), &[".".to_string()], false).await.unwrap());
	let first = Arc::new(IndexUpdateJob::new(local.clone(), plan.clone(), IndexUpdateSelection::default()));
	let second = Arc::new(IndexUpdateJob::new(local.clone(), plan, IndexUpdateSelection::default()));

	// Registration happens before the job gets to run
	let launched = service.start_local_job("local", first).unwrap();
	let err = service.start_local_job("local", second.clone()).err().unwrap();
	assert!(matches!(err, SyncError::JobAlreadyRunning { .. }), "{}", err);
	assert!(service.current_local_job("local").is_some());

	assert!(launched.finished().await.unwrap().is_success());
	assert!(service.current_local_job("local").is_none());
	assert_eq!(local.indexed_filenames().await.unwrap(), vec!["a", "b"]);
}

// ============================================================================
// Add and push
// ============================================================================

#[tokio::test]
async fn test_add_and_push_to_archives() {
	let local_dir = TempDir::new().unwrap();
	let first_dir = TempDir::new().unwrap();
	let second_dir = TempDir::new().unwrap();
	let local = archive_with(&local_dir, &[("old", "moved")]).await;
	archive_with(&first_dir, &[("old", "moved")]).await;
	archive_with(&second_dir, &[("old", "moved")]).await;

	fs::rename(local_dir.path().join("old"), local_dir.path().join("new")).unwrap();
	create_test_file(local_dir.path(), "fresh", "fresh");

	let plan = indexupdate::prepare(local.as_ref(), &[".".to_string()], false).await.unwrap();
	let events = Arc::new(Mutex::new(Vec::new()));
	let recorded = events.clone();
	let first: Arc<dyn Repo> = Arc::new(FilesRepo::open(first_dir.path()).await.unwrap());
	let second: Arc<dyn Repo> = Arc::new(FilesRepo::open(second_dir.path()).await.unwrap());
	let job = AddAndPushJob::new(
		local.clone(),
		Arc::new(plan),
		IndexUpdateSelection::default(),
		vec![("first".to_string(), first), ("second".to_string(), second)],
	)
	.with_observer(Arc::new(move |event: JobEvent| recorded.lock().unwrap().push(event)));

	assert!(job.run().await.is_success());
	assert_eq!(local.indexed_filenames().await.unwrap(), vec!["fresh", "new"]);
	for dir in &[&first_dir, &second_dir] {
		let repo = FilesRepo::open(dir.path()).await.unwrap();
		assert_eq!(repo.indexed_filenames().await.unwrap(), vec!["fresh", "new"]);
	}
	let events = events.lock().unwrap();
	assert!(events.iter().any(|e| matches!(e, JobEvent::FileMoved { from, to } if from == "old" && to == "new")));
	assert!(events.iter().any(|e| matches!(e, JobEvent::FileIndexed { path } if path == "fresh")));
}

// vim: ts=4
