//! # keepsync - content addressed archive synchronization
//!
//! keepsync keeps several copies of a file archive in sync. Every archive
//! holds an index of root relative paths and content checksums; two archives
//! are compared by content, so renamed or duplicated files are recognized as
//! relocations instead of new files.
//!
//! ## Pushing an archive
//!
//! ```rust,ignore
//! use keepsync::{compare::compare_repos, plan::{RelocationSyncMode, SyncPlanner}};
//! use keepsync::job::{Job, SyncJob};
//! use keepsync::repo::FilesRepo;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let base = Arc::new(FilesRepo::open("./photos").await?);
//!     let backup = Arc::new(FilesRepo::open("/mnt/backup/photos").await?);
//!     let comparison = compare_repos(base.as_ref(), backup.as_ref()).await?;
//!     let plan = SyncPlanner::new(RelocationSyncMode::AdditiveDuplicating).prepare_from_comparison(&comparison);
//!     let job = SyncJob::new(Arc::new(plan), base, backup, Default::default());
//!     println!("{:?}", job.run().await);
//!     Ok(())
//! }
//! ```
//!
//! Long running sessions go through [`orchestrator::SyncService`], which keeps
//! comparisons current as indexes change and runs at most one job per pair.

pub mod addpush;
pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod guard;
pub mod indexupdate;
pub mod job;
pub mod logging;
pub mod orchestrator;
pub mod plan;
pub mod repo;
pub mod types;

// Re-export commonly used types and functions
pub use config::Config;
pub use error::{RelocationRefusal, RepoError, SyncError};
pub use types::{Checksum, FileEntry, FileInfo, Loadable, RepoIndex, RepositoryMetadata};

// vim: ts=4
