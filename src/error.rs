//! Error types for keepsync operations

use std::error::Error;
use std::fmt;
use std::io;

/// Errors raised by repository backends
#[derive(Debug)]
pub enum RepoError {
	/// Backend is disconnected, locked or otherwise not reachable right now
	Unavailable { reason: String },

	/// Target path of a save or move is already occupied
	DestinationExists { path: String },

	/// Streamed bytes do not match the claimed checksum
	ChecksumMismatch { path: String, expected: String, actual: String },

	/// Backend cannot perform this operation at all
	UnsupportedFeature { feature: String },

	/// Path is not present in the repository
	NotFound { path: String },

	/// Path escapes the repository root or contains forbidden parts
	InvalidPath { path: String, reason: String },

	/// I/O error
	Io(io::Error),
}

impl RepoError {
	/// True for errors that go away on their own (reconnect, unlock)
	pub fn is_transient(&self) -> bool {
		matches!(self, RepoError::Unavailable { .. })
	}
}

impl fmt::Display for RepoError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RepoError::Unavailable { reason } => write!(f, "Repository not available: {}", reason),
			RepoError::DestinationExists { path } => write!(f, "Destination exists: {}", path),
			RepoError::ChecksumMismatch { path, expected, actual } => write!(
				f,
				"Copied file {} has wrong checksum: got={}, expected={}",
				path, actual, expected
			),
			RepoError::UnsupportedFeature { feature } => {
				write!(f, "Unsupported feature: {}", feature)
			}
			RepoError::NotFound { path } => write!(f, "File not found: {}", path),
			RepoError::InvalidPath { path, reason } => {
				write!(f, "Invalid path {}: {}", path, reason)
			}
			RepoError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for RepoError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			RepoError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for RepoError {
	fn from(e: io::Error) -> Self {
		RepoError::Io(e)
	}
}

impl From<serde_json::Error> for RepoError {
	fn from(e: serde_json::Error) -> Self {
		RepoError::Io(io::Error::new(io::ErrorKind::InvalidData, e))
	}
}

/// Why a plan refuses to run with relocations left in its ignore list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationRefusal {
	/// Relocation resolution is disabled altogether
	Disabled,

	/// At least one relocation would increase duplication
	DuplicateIncrease,

	/// At least one relocation would reduce duplication
	DuplicateReduction,
}

impl RelocationRefusal {
	/// Hint telling the user which switch resolves the refusal
	pub fn hint(&self) -> &'static str {
		match self {
			RelocationRefusal::Disabled => {
				"Enable relocations with --resolve-moves, or switch to --additive-duplicating mode"
			}
			RelocationRefusal::DuplicateIncrease => {
				"Enable duplication increase with --allow-duplicate-increase, or switch to --additive-duplicating mode"
			}
			RelocationRefusal::DuplicateReduction => {
				"Enable duplication reduction with --allow-duplicate-reduction, or switch to --additive-duplicating mode"
			}
		}
	}
}

impl fmt::Display for RelocationRefusal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RelocationRefusal::Disabled => write!(f, "relocations disabled but present"),
			RelocationRefusal::DuplicateIncrease => write!(f, "duplicate increase is not allowed"),
			RelocationRefusal::DuplicateReduction => {
				write!(f, "duplicate reduction is not allowed")
			}
		}
	}
}

/// Main error type for sync operations
#[derive(Debug)]
pub enum SyncError {
	/// Backend error (nested)
	Repo(RepoError),

	/// Plan holds relocations the chosen mode cannot resolve
	IgnoredRelocations { refusal: RelocationRefusal, count: usize },

	/// Another job is registered under the same key
	JobAlreadyRunning { key: String },

	/// Execution was cancelled
	Cancelled,

	/// I/O error
	Io(io::Error),

	/// Invalid configuration
	InvalidConfig { message: String },

	/// Generic error message
	Other { message: String },
}

impl SyncError {
	/// Render the error followed by its cause chain, one cause per line
	pub fn chain(&self) -> String {
		let mut out = self.to_string();
		let mut cause = self.source();
		while let Some(e) = cause {
			out.push_str("\ncaused by: ");
			out.push_str(&e.to_string());
			cause = e.source();
		}
		out
	}
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Repo(e) => write!(f, "Repository error: {}", e),
			SyncError::IgnoredRelocations { refusal, count } => {
				write!(f, "{} ignored relocations detected: {}", count, refusal)
			}
			SyncError::JobAlreadyRunning { key } => write!(f, "A job is already running for {}", key),
			SyncError::Cancelled => write!(f, "Operation cancelled"),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Repo(e) => Some(e),
			SyncError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<RepoError> for SyncError {
	fn from(e: RepoError) -> Self {
		SyncError::Repo(e)
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<String> for SyncError {
	fn from(e: String) -> Self {
		SyncError::Other { message: e }
	}
}

impl From<tokio::task::JoinError> for SyncError {
	fn from(e: tokio::task::JoinError) -> Self {
		SyncError::Other { message: format!("Background task failed: {}", e) }
	}
}


// vim: ts=4
