//! Command line interface
//!
//! Commands run against the archive containing the working directory; the
//! other archive of `compare`, `push` and `pull` is given as a directory.

mod add;
pub mod archive;
pub mod console;
mod init;
mod status;
mod sync;

pub use archive::WorkingArchive;
pub use console::{Console, ConsolePrompter, SyncLogger};

use crate::config::Config;
use crate::error::SyncError;
use crate::logging::*;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::Path;

fn globs_arg() -> Arg {
	Arg::new("globs").help("Paths or globs, relative to the working directory").action(ArgAction::Append).num_args(0..)
}

fn sync_command(name: &'static str, about: &'static str) -> Command {
	Command::new(name)
		.about(about)
		.arg(Arg::new("other").required(true).help("Directory of the other archive"))
		.arg(
			Arg::new("resolve-moves")
				.long("resolve-moves")
				.action(ArgAction::SetTrue)
				.help("Resolve relocations by moving files"),
		)
		.arg(
			Arg::new("additive-duplicating")
				.long("additive-duplicating")
				.action(ArgAction::SetTrue)
				.help("Resolve relocations by storing extra copies"),
		)
		.arg(
			Arg::new("allow-duplicate-increase")
				.long("allow-duplicate-increase")
				.action(ArgAction::SetTrue)
				.help("Allow moves that increase the number of copies"),
		)
		.arg(
			Arg::new("allow-duplicate-reduction")
				.long("allow-duplicate-reduction")
				.action(ArgAction::SetTrue)
				.help("Allow moves that delete extra copies"),
		)
}

pub fn build_cli() -> Command {
	Command::new("keepsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Content addressed archive synchronization")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.global(true)
				.help("Config file"),
		)
		.arg(
			Arg::new("yes")
				.short('y')
				.long("yes")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Answer yes to every confirmation"),
		)
		.subcommand(Command::new("init").about("Create an archive in the working directory"))
		.subcommand(
			Command::new("add")
				.about("Add files to the archive index")
				.arg(globs_arg())
				.arg(
					Arg::new("disable-moves-check")
						.long("disable-moves-check")
						.action(ArgAction::SetTrue)
						.help("Treat every unindexed file as new"),
				)
				.arg(
					Arg::new("do-not-print-preparation-summary")
						.long("do-not-print-preparation-summary")
						.action(ArgAction::SetTrue)
						.help("Skip the summary of the prepared changes"),
				),
		)
		.subcommand(Command::new("status").about("Show files not added to the archive").arg(globs_arg()))
		.subcommand(
			Command::new("compare")
				.about("Compare the archive with another one")
				.arg(Arg::new("other").required(true).help("Directory of the other archive")),
		)
		.subcommand(sync_command("push", "Push changes to another archive"))
		.subcommand(sync_command("pull", "Pull changes from another archive"))
}

/// Working-directory relative globs of a subcommand
fn globs(matches: &ArgMatches) -> Vec<String> {
	matches.get_many::<String>("globs").map(|globs| globs.cloned().collect()).unwrap_or_default()
}

/// Merge the sync flags of a subcommand into `config`
fn apply_sync_flags(config: &mut Config, matches: &ArgMatches) {
	config.resolve_moves |= matches.get_flag("resolve-moves");
	config.additive_duplicating |= matches.get_flag("additive-duplicating");
	config.allow_duplicate_increase |= matches.get_flag("allow-duplicate-increase");
	config.allow_duplicate_reduction |= matches.get_flag("allow-duplicate-reduction");
}

/// Parse `args`, run the command and return the process exit code
pub async fn run<I, T>(args: I, cwd: &Path, console: Console) -> i32
where
	I: IntoIterator<Item = T>,
	T: Into<OsString> + Clone,
{
	let matches = match build_cli().try_get_matches_from(args) {
		Ok(matches) => matches,
		Err(e) => {
			console.println(e.to_string().trim_end());
			return if e.use_stderr() { 2 } else { 0 };
		}
	};
	run_matches(&matches, cwd, console).await
}

/// Run already parsed arguments and return the process exit code
pub async fn run_matches(matches: &ArgMatches, cwd: &Path, console: Console) -> i32 {
	match dispatch(matches, cwd, &console).await {
		Ok(code) => code,
		Err(e) => {
			error!("Command failed: {}", e);
			console.println(format!("Error: {}", e.chain()));
			1
		}
	}
}

/// Config file given with `--config`; global arguments are propagated to the subcommand
pub fn config_path(matches: &ArgMatches) -> Option<&Path> {
	let sub = matches.subcommand().map(|(_, sub)| sub).unwrap_or(matches);
	sub.get_one::<String>("config").map(Path::new)
}

async fn dispatch(matches: &ArgMatches, cwd: &Path, console: &Console) -> Result<i32, SyncError> {
	let (command, sub) = match matches.subcommand() {
		Some(subcommand) => subcommand,
		None => return Err(SyncError::Other { message: "command required".to_string() }),
	};

	let mut config = Config::load(config_path(matches))?;
	config.assume_yes |= sub.get_flag("yes");
	debug!("Running {} in {}", command, cwd.display());

	match command {
		"init" => init::run(cwd, console).await,
		"add" => {
			let options = add::AddOptions {
				globs: globs(sub),
				disable_moves_check: sub.get_flag("disable-moves-check"),
				print_summary: !sub.get_flag("do-not-print-preparation-summary"),
			};
			add::run(cwd, &config, console, options).await
		}
		"status" => status::run(cwd, &config, console, &globs(sub)).await,
		"compare" => sync::compare(cwd, &config, console, other(sub)?).await,
		"push" => {
			apply_sync_flags(&mut config, sub);
			sync::run(cwd, &config, console, other(sub)?, sync::Direction::Push).await
		}
		"pull" => {
			apply_sync_flags(&mut config, sub);
			sync::run(cwd, &config, console, other(sub)?, sync::Direction::Pull).await
		}
		unknown => Err(SyncError::Other { message: format!("unknown command: {}", unknown) }),
	}
}

fn other(matches: &ArgMatches) -> Result<&str, SyncError> {
	matches
		.get_one::<String>("other")
		.map(|s| s.as_str())
		.ok_or_else(|| SyncError::Other { message: "other archive argument required".to_string() })
}


// vim: ts=4
