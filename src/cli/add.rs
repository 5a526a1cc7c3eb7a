//! `add`: index new and moved working-tree files

use crate::cli::archive::to_relative_path;
use crate::cli::{Console, WorkingArchive};
use crate::config::Config;
use crate::error::SyncError;
use crate::indexupdate::{self, IndexUpdateSelection};
use crate::job::{CancelHandle, JobEvent, SyncObserver};
use crate::logging::*;
use std::path::Path;

pub struct AddOptions {
	pub globs: Vec<String>,
	pub disable_moves_check: bool,
	pub print_summary: bool,
}

/// Prints index updates relative to the working directory
struct AddLogger {
	console: Console,
	working_subdirectory: Vec<String>,
}

impl SyncObserver for AddLogger {
	fn on_event(&self, event: JobEvent) {
		let relative = |path: &str| to_relative_path(&self.working_subdirectory, path);
		match event {
			JobEvent::FileMoved { from, to } => {
				self.console.println(format!("moved: {} to {}", relative(&from), relative(&to)))
			}
			JobEvent::FileIndexed { path } => self.console.println(format!("added: {}", relative(&path))),
			_ => {}
		}
	}
}

pub async fn run(cwd: &Path, config: &Config, console: &Console, options: AddOptions) -> Result<i32, SyncError> {
	let archive = WorkingArchive::open(cwd, config).await?;
	let globs = if options.globs.is_empty() {
		vec![archive.to_archive_path(".")?]
	} else {
		options.globs.iter().map(|glob| archive.to_archive_path(glob)).collect::<Result<Vec<_>, _>>()?
	};
	debug!("Add globs: {:?}", globs);

	let plan = indexupdate::prepare(archive.repo.as_ref(), &globs, options.disable_moves_check).await?;
	if options.print_summary {
		console.write_with(|out| plan.write_summary(out, &|path: &str| archive.to_relative_path(path)))?;
		console.println("");
	}

	let logger = AddLogger {
		console: console.clone(),
		working_subdirectory: archive.working_subdirectory().to_vec(),
	};
	let cancel = CancelHandle::default();
	let selection = IndexUpdateSelection::default();

	if !plan.moves.is_empty() {
		let confirmed = config.assume_yes || console.ask_for_confirmation("\nDo want to perform move?").await?;
		if confirmed {
			console.println("proceeding ...");
			plan.execute_moves_reindex(archive.repo.as_ref(), &selection, &logger, &cancel).await?;
			console.println("finished moving files");
		} else {
			console.println("skipping moves");
		}
	}

	if !plan.new_files.is_empty() {
		plan.execute_add_new_files(archive.repo.as_ref(), &selection, &logger, &cancel).await?;
		console.println("finished adding files");
	}
	Ok(0)
}

// vim: ts=4
