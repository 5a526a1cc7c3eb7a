//! Configuration for keepsync
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (~/.config/keepsync/config.toml, or --config)
//! 3. Environment variables (KEEPSYNC_* prefix)
//! 4. CLI flags (highest priority)

use crate::error::SyncError;
use crate::plan::RelocationSyncMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of environment variables overriding config values
pub const ENV_PREFIX: &str = "KEEPSYNC_";

/// Configuration for comparison and sync operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// COMPARISON
	// ========================================================================
	/// Pause after each comparison recomputation, coalescing index bursts
	pub compare_throttle_ms: u64,

	// ========================================================================
	// RELOCATION POLICY
	// ========================================================================
	/// Resolve relocations by moving files in the destination
	pub resolve_moves: bool,

	/// Resolve relocations by storing extra copies, never moving or deleting
	pub additive_duplicating: bool,

	/// Allow relocations that increase the number of copies
	pub allow_duplicate_increase: bool,

	/// Allow relocations that reduce the number of copies
	pub allow_duplicate_reduction: bool,

	// ========================================================================
	// EXECUTION
	// ========================================================================
	/// Buffer size for file copies
	pub copy_buffer_size: usize,

	/// Minimum interval between byte-level progress reports
	pub progress_interval_ms: u64,

	/// Answer every confirmation prompt with yes
	pub assume_yes: bool,

	// ========================================================================
	// LOGGING
	// ========================================================================
	/// Log level used when RUST_LOG is not set
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			compare_throttle_ms: 500,
			resolve_moves: false,
			additive_duplicating: false,
			allow_duplicate_increase: false,
			allow_duplicate_reduction: false,
			copy_buffer_size: 2 * 1024 * 1024,
			progress_interval_ms: 100,
			assume_yes: false,
			log_level: "warn".to_string(),
		}
	}
}

impl Config {
	/// Default location of the config file
	pub fn default_path() -> Option<PathBuf> {
		std::env::var("HOME")
			.ok()
			.map(|home| PathBuf::from(home).join(".config").join("keepsync").join("config.toml"))
	}

	/// Load configuration: defaults, then file, then environment.
	///
	/// An explicitly given file must exist; the default file is optional.
	pub fn load(path: Option<&Path>) -> Result<Self, SyncError> {
		let mut config = match path {
			Some(path) => Self::from_file(path)?,
			None => match Self::default_path() {
				Some(path) if path.is_file() => Self::from_file(&path)?,
				_ => Self::default(),
			},
		};
		config.apply_env(std::env::vars())?;
		config.validate()?;
		Ok(config)
	}

	/// Parse a TOML config file
	pub fn from_file(path: &Path) -> Result<Self, SyncError> {
		let text = fs::read_to_string(path).map_err(|e| SyncError::InvalidConfig {
			message: format!("cannot read {}: {}", path.display(), e),
		})?;
		Self::from_toml(&text)
	}

	/// Parse TOML text
	pub fn from_toml(text: &str) -> Result<Self, SyncError> {
		toml::from_str(text).map_err(|e| SyncError::InvalidConfig { message: e.to_string() })
	}

	/// Override values from `KEEPSYNC_*` variables
	pub fn apply_env<I>(&mut self, vars: I) -> Result<(), SyncError>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		for (key, value) in vars {
			let name = match key.strip_prefix(ENV_PREFIX) {
				Some(name) => name,
				None => continue,
			};
			match name {
				"COMPARE_THROTTLE_MS" => self.compare_throttle_ms = parse_env(&key, &value)?,
				"RESOLVE_MOVES" => self.resolve_moves = parse_env_bool(&key, &value)?,
				"ADDITIVE_DUPLICATING" => self.additive_duplicating = parse_env_bool(&key, &value)?,
				"ALLOW_DUPLICATE_INCREASE" => {
					self.allow_duplicate_increase = parse_env_bool(&key, &value)?
				}
				"ALLOW_DUPLICATE_REDUCTION" => {
					self.allow_duplicate_reduction = parse_env_bool(&key, &value)?
				}
				"COPY_BUFFER_SIZE" => self.copy_buffer_size = parse_env(&key, &value)?,
				"PROGRESS_INTERVAL_MS" => self.progress_interval_ms = parse_env(&key, &value)?,
				"ASSUME_YES" => self.assume_yes = parse_env_bool(&key, &value)?,
				"LOG_LEVEL" => self.log_level = value,
				_ => {}
			}
		}
		Ok(())
	}

	/// Reject values the engine cannot work with
	pub fn validate(&self) -> Result<(), SyncError> {
		if self.copy_buffer_size == 0 {
			return Err(SyncError::InvalidConfig {
				message: "copyBufferSize must be greater than zero".to_string(),
			});
		}
		Ok(())
	}

	pub fn compare_throttle(&self) -> Duration {
		Duration::from_millis(self.compare_throttle_ms)
	}

	pub fn progress_interval(&self) -> Duration {
		Duration::from_millis(self.progress_interval_ms)
	}

	/// Relocation mode selected by the flags; additive duplicating wins over moves
	pub fn relocation_mode(&self) -> RelocationSyncMode {
		if self.additive_duplicating {
			RelocationSyncMode::AdditiveDuplicating
		} else if self.resolve_moves {
			RelocationSyncMode::Move {
				allow_duplicate_increase: self.allow_duplicate_increase,
				allow_duplicate_reduction: self.allow_duplicate_reduction,
			}
		} else {
			RelocationSyncMode::Disabled
		}
	}
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SyncError> {
	value
		.trim()
		.parse()
		.map_err(|_| SyncError::InvalidConfig { message: format!("{}: invalid value {:?}", key, value) })
}

fn parse_env_bool(key: &str, value: &str) -> Result<bool, SyncError> {
	match value.trim().to_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" | "" => Ok(false),
		_ => Err(SyncError::InvalidConfig { message: format!("{}: invalid value {:?}", key, value) }),
	}
}


// vim: ts=4
