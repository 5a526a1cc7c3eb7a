use keepsync::cli::{self, Console};
use keepsync::config::Config;
use keepsync::logging::init_tracing;
use std::env;

#[tokio::main]
async fn main() {
	let matches = cli::build_cli().get_matches();

	// a broken config is reported by the command itself
	let log_level = Config::load(cli::config_path(&matches))
		.map(|config| config.log_level)
		.unwrap_or_else(|_| Config::default().log_level);
	init_tracing(&log_level);

	let cwd = match env::current_dir() {
		Ok(cwd) => cwd,
		Err(e) => {
			eprintln!("Cannot determine working directory: {}", e);
			std::process::exit(1);
		}
	};
	let code = cli::run_matches(&matches, &cwd, Console::stdio()).await;
	std::process::exit(code);
}

// vim: ts=4
