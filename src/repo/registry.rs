//! Registry of known repositories and their connection state
//!
//! A repository id stays valid while its backend comes and goes; the index
//! observable handed out for an id reports `NotAvailable` while disconnected.

use super::{IndexWatch, Repo};
use crate::logging::*;
use crate::types::{Loadable, RepoIndex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Identifier of a registered repository
pub type RepoId = String;

struct RegistryEntry {
	index_tx: Arc<watch::Sender<Loadable<Arc<RepoIndex>>>>,
	handle: Option<Arc<dyn Repo>>,
	forwarder: Option<JoinHandle<()>>,
	/// Cleared on detach so a forwarder mid-flight cannot publish stale values
	live: Arc<Mutex<bool>>,
}

impl RegistryEntry {
	fn new() -> Self {
		let (index_tx, _) = watch::channel(Loadable::NotAvailable);
		Self {
			index_tx: Arc::new(index_tx),
			handle: None,
			forwarder: None,
			live: Arc::new(Mutex::new(false)),
		}
	}

	fn detach(&mut self) {
		*self.live.lock().unwrap_or_else(|e| e.into_inner()) = false;
		if let Some(forwarder) = self.forwarder.take() {
			forwarder.abort();
		}
		self.handle = None;
		self.index_tx.send_replace(Loadable::NotAvailable);
	}
}

#[derive(Default)]
pub struct RepositoryRegistry {
	entries: Mutex<HashMap<RepoId, RegistryEntry>>,
}

impl RepositoryRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Attach a backend to `id`, replacing any previous one.
	///
	/// Must be called from within a tokio runtime.
	pub fn connect(&self, id: &str, repo: Arc<dyn Repo>) {
		let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
		let entry = entries.entry(id.to_string()).or_insert_with(RegistryEntry::new);
		entry.detach();

		let live = Arc::new(Mutex::new(true));
		entry.live = live.clone();

		let tx = entry.index_tx.clone();
		let mut source = repo.index_watch();
		entry.forwarder = Some(tokio::spawn(async move {
			loop {
				let value = source.borrow_and_update().clone();
				{
					let live = live.lock().unwrap_or_else(|e| e.into_inner());
					if !*live {
						break;
					}
					tx.send_replace(value);
				}
				if source.changed().await.is_err() {
					break;
				}
			}
		}));
		entry.handle = Some(repo);
		debug!("Repository {} connected", id);
	}

	/// Detach the backend of `id`; observers see `NotAvailable`
	pub fn disconnect(&self, id: &str) {
		let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
		if let Some(entry) = entries.get_mut(id) {
			entry.detach();
			debug!("Repository {} disconnected", id);
		}
	}

	/// Connected backend of `id`
	pub fn handle(&self, id: &str) -> Option<Arc<dyn Repo>> {
		let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
		entries.get(id).and_then(|entry| entry.handle.clone())
	}

	/// Index observable of `id`; unknown ids are registered as disconnected
	pub fn index_watch(&self, id: &str) -> IndexWatch {
		let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
		entries.entry(id.to_string()).or_insert_with(RegistryEntry::new).index_tx.subscribe()
	}

	pub fn ids(&self) -> Vec<RepoId> {
		let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
		let mut ids: Vec<RepoId> = entries.keys().cloned().collect();
		ids.sort();
		ids
	}
}

impl Drop for RepositoryRegistry {
	fn drop(&mut self) {
		let entries = self.entries.get_mut().unwrap_or_else(|e| e.into_inner());
		for entry in entries.values_mut() {
			if let Some(forwarder) = entry.forwarder.take() {
				forwarder.abort();
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::repo::InMemoryRepo;
	use std::time::Duration;

	async fn wait_for<F: Fn(&Loadable<Arc<RepoIndex>>) -> bool>(rx: &mut IndexWatch, f: F) {
		tokio::time::timeout(Duration::from_secs(5), async {
			loop {
				if f(&*rx.borrow_and_update()) {
					return;
				}
				rx.changed().await.unwrap();
			}
		})
		.await
		.expect("timed out waiting for index state");
	}

	#[tokio::test]
	async fn test_connect_disconnect() {
		let registry = RepositoryRegistry::new();
		let mut rx = registry.index_watch("backup");
		assert!(matches!(*rx.borrow(), Loadable::NotAvailable));
		assert!(registry.handle("backup").is_none());

		let repo = Arc::new(InMemoryRepo::with_files("mem", &[("a", "A")]));
		registry.connect("backup", repo.clone());
		wait_for(&mut rx, |v| v.as_loaded().map(|i| i.len() == 1).unwrap_or(false)).await;
		assert!(registry.handle("backup").is_some());

		repo.put("b", b"B");
		wait_for(&mut rx, |v| v.as_loaded().map(|i| i.len() == 2).unwrap_or(false)).await;

		registry.disconnect("backup");
		wait_for(&mut rx, |v| matches!(v, Loadable::NotAvailable)).await;
		assert!(registry.handle("backup").is_none());
		assert_eq!(registry.ids(), vec!["backup"]);
	}
}

// vim: ts=4
