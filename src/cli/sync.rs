//! `compare`, `push` and `pull` against another archive

use crate::cli::{Console, ConsolePrompter, SyncLogger, WorkingArchive};
use crate::compare::{compare_repos, ComparisonReport};
use crate::config::Config;
use crate::error::SyncError;
use crate::job::{AlwaysConfirm, JobOutcome, Prompter};
use crate::logging::*;
use crate::orchestrator::SyncService;
use crate::plan::OperationSubset;
use crate::repo::{FilesRepo, RepositoryRegistry};
use std::path::Path;
use std::sync::Arc;

const CURRENT: &str = "current";
const OTHER: &str = "other";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Push,
	Pull,
}

impl Direction {
	fn operation(self) -> &'static str {
		match self {
			Direction::Push => "push",
			Direction::Pull => "pull",
		}
	}

	/// Source and destination ids
	fn pair(self) -> (&'static str, &'static str) {
		match self {
			Direction::Push => (CURRENT, OTHER),
			Direction::Pull => (OTHER, CURRENT),
		}
	}
}

async fn open_other(cwd: &Path, config: &Config, other: &str) -> Result<FilesRepo, SyncError> {
	Ok(FilesRepo::open(cwd.join(other)).await?.with_buffer_size(config.copy_buffer_size))
}

pub async fn compare(cwd: &Path, config: &Config, console: &Console, other: &str) -> Result<i32, SyncError> {
	let archive = WorkingArchive::open(cwd, config).await?;
	let other = open_other(cwd, config, other).await?;
	let result = compare_repos(archive.repo.as_ref(), &other).await?;
	console.write_with(|out| ComparisonReport::new(&result, CURRENT, OTHER).write_all(out))?;
	Ok(0)
}

pub async fn run(
	cwd: &Path,
	config: &Config,
	console: &Console,
	other: &str,
	direction: Direction,
) -> Result<i32, SyncError> {
	let archive = WorkingArchive::open(cwd, config).await?;
	let other = open_other(cwd, config, other).await?;

	let registry = Arc::new(RepositoryRegistry::new());
	registry.connect(CURRENT, archive.repo.clone());
	registry.connect(OTHER, Arc::new(other));
	let service = SyncService::new(registry, config.clone());

	let (base, destination) = direction.pair();
	let operation = direction.operation();
	let prepared = service.pair(base, destination).prepare_when_ready(config.relocation_mode()).await?;
	console.write_with(|out| ComparisonReport::new(&prepared.comparison, base, destination).write_all(out))?;

	if let Some(refusal) = prepared.plan.refusal() {
		console.println(refusal.to_string());
		console.println(refusal.hint());
		return Ok(1);
	}
	if prepared.plan.is_no_op() {
		console.println(format!("No changes to {}", operation));
		return Ok(0);
	}

	let prompter: Arc<dyn Prompter> = if config.assume_yes {
		Arc::new(AlwaysConfirm)
	} else {
		Arc::new(ConsolePrompter::new(console.clone(), operation))
	};
	let launched =
		prepared.start_execution(OperationSubset::All, prompter, Arc::new(SyncLogger::new(console.clone())))?;

	match launched.finished().await? {
		JobOutcome::Success => {
			info!("{} finished", operation);
			Ok(0)
		}
		JobOutcome::Cancelled => {
			console.println(format!("{} cancelled", operation));
			Ok(0)
		}
		JobOutcome::Failed(e) => {
			console.println(format!("Error: {}", e.chain()));
			Ok(1)
		}
	}
}

// vim: ts=4
