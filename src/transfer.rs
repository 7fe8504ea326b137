//! Transfer planner/executor
//!
//! Turns a [`DiffResult`](crate::reconcile::DiffResult) into encrypt, transfer,
//! decrypt and delete operations. Remote blobs are content addressed: the
//! manifests handed to the bulk transfer are built from the hash indexes of
//! the diff sets, not from file names.
//!
//! Bookkeeping (the `local`/`remote` snapshots of the run state) is only
//! advanced after the operation it describes has succeeded.

use filetime::{set_file_mtime, FileTime};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use crate::config::{RepoSettings, RunOptions};
use crate::error::{Result, SyncError};
use crate::external::Collaborators;
use crate::hasher;
use crate::logging::*;
use crate::metadata;
use crate::paths::is_path_safe;
use crate::reconcile::DiffSet;
use crate::state::RunState;
use crate::types::Snapshot;
use crate::workspace::{blob_name, Workspace, DATA_DIR};

/// Name of the encrypted remote index, in the staging area and remotely
pub const INDEX_NAME: &str = "index.dat.gpg";

/// Outcome of an upload or download
#[derive(Debug, Default)]
pub struct TransferReport {
	/// Files uploaded or installed
	pub done: usize,
	/// Per-file problems; the run continued past them
	pub problems: Vec<SyncError>,
}

/// Everything the executor needs besides the run state
pub struct Transfer<'a> {
	pub tools: &'a Collaborators,
	pub workspace: &'a Workspace,
	pub settings: &'a RepoSettings,
	pub options: &'a RunOptions,
}

fn staged_blob(hash: &str) -> String {
	format!("{}/{}", DATA_DIR, blob_name(hash))
}

/// Hash to path index over several diff sets
fn merged_index(sets: &[&DiffSet]) -> BTreeMap<String, String> {
	let mut index = BTreeMap::new();
	for set in sets {
		for (hash, path) in &set.by_hash {
			index.entry(hash.clone()).or_insert_with(|| path.clone());
		}
	}
	index
}

fn merged_paths(sets: &[&DiffSet]) -> Vec<String> {
	let all: BTreeSet<&String> = sets.iter().flat_map(|s| s.iter()).collect();
	all.into_iter().cloned().collect()
}

impl<'a> Transfer<'a> {
	pub fn new(
		tools: &'a Collaborators,
		workspace: &'a Workspace,
		settings: &'a RepoSettings,
		options: &'a RunOptions,
	) -> Self {
		Transfer { tools, workspace, settings, options }
	}

	fn bw_limit(&self) -> Option<u32> {
		self.options.limit_bw
	}

	// ========================================================================
	// REMOTE INDEX
	// ========================================================================

	/// Fetch the encrypted remote index into the staging area
	pub async fn fetch_index(&self) -> Result<()> {
		self.workspace.create()?;
		self.tools
			.transfer
			.pull(
				&self.settings.remote_dir,
				self.workspace.root(),
				&[INDEX_NAME.to_string()],
				self.bw_limit(),
			)
			.await
	}

	/// Decrypt and parse the fetched remote index
	pub async fn read_index(&self) -> Result<Snapshot> {
		let cipher = self.workspace.index_cipher();
		if !cipher.exists() {
			return Err(SyncError::FileNotFound { path: cipher });
		}
		let plain = self.workspace.index_plain();
		self.tools.cipher.decrypt(&cipher, &plain).await?;
		metadata::load(&plain)
	}

	/// Encrypt the remote snapshot and push it as the new remote index
	pub async fn write_index(&self, remote: &Snapshot) -> Result<()> {
		self.workspace.create()?;
		let plain = self.workspace.index_plain();
		let cipher = self.workspace.index_cipher();
		metadata::save(remote, &plain)?;
		self.tools.cipher.encrypt(&plain, &cipher, &self.settings.recipients).await?;
		self.tools
			.transfer
			.push(
				self.workspace.root(),
				&self.settings.remote_dir,
				&[INDEX_NAME.to_string()],
				self.bw_limit(),
			)
			.await
	}

	// ========================================================================
	// UPLOAD
	// ========================================================================

	/// Encrypt and push every local-only or newer-local file
	pub async fn upload(&self, state: &mut RunState) -> Result<TransferReport> {
		let mut report = TransferReport::default();
		let sets = [&state.diff.local_only, &state.diff.newer_local];
		let paths = merged_paths(&sets);

		if paths.is_empty() || !state.really_do {
			return Ok(report);
		}
		if self.options.size_control {
			info!("Size control: {} files would be uploaded", paths.len());
			return Ok(report);
		}

		self.workspace.create()?;
		let index = merged_index(&sets);

		for (hash, path) in &index {
			let blob = self.workspace.blob_path(hash);
			if blob.exists() {
				debug!("[SKIP] {} already encrypted", path);
				continue;
			}
			println!("[GPG] {}", path);
			let plain = self.settings.local_dir.join(path);
			// A blob only takes its final name once encryption has finished
			let partial = blob.with_extension("gpg.tmp");
			self.tools.cipher.encrypt(&plain, &partial, &self.settings.recipients).await?;
			fs::rename(&partial, &blob)?;
		}

		let manifest: Vec<String> = index.keys().map(|h| staged_blob(h)).collect();
		self.tools
			.transfer
			.push(self.workspace.root(), &self.settings.remote_dir, &manifest, self.bw_limit())
			.await?;

		for path in &paths {
			if let Some(record) = state.local.get(path).cloned() {
				state.remote.insert(path, record);
				report.done += 1;
			}
		}
		info!("Uploaded {} files ({} blobs)", report.done, manifest.len());
		Ok(report)
	}

	// ========================================================================
	// DOWNLOAD
	// ========================================================================

	/// Fetch, decrypt, verify and install every remote-only or newer-remote file
	pub async fn download(&self, state: &mut RunState) -> Result<TransferReport> {
		let mut report = TransferReport::default();
		let sets = [&state.diff.remote_only, &state.diff.newer_remote];
		let paths = merged_paths(&sets);

		if paths.is_empty() || !state.really_do {
			return Ok(report);
		}

		self.workspace.create()?;
		let index = merged_index(&sets);
		let candidates: Vec<String> = index.keys().map(|h| blob_name(h)).collect();
		let present = self
			.tools
			.remote
			.list_present(&self.settings.remote_data_dir(), &candidates)
			.await?;
		if present.len() < candidates.len() {
			let missing = candidates.len() - present.len();
			warn!("{} of {} blobs are missing remotely", missing, candidates.len());
		}

		if !present.is_empty() {
			let manifest: Vec<String> =
				present.iter().map(|name| format!("{}/{}", DATA_DIR, name)).collect();
			self.tools
				.transfer
				.pull(&self.settings.remote_dir, self.workspace.root(), &manifest, self.bw_limit())
				.await?;
		}

		for path in &paths {
			if !is_path_safe(path) {
				warn!("Refusing to install unsafe path {:?}", path);
				continue;
			}
			let record = match state.remote.get(path) {
				Some(r) => r.clone(),
				None => continue,
			};
			let hash = match record.hash() {
				Some(h) => h.to_string(),
				None => continue,
			};

			println!("[DOWN] {}", path);
			let blob = self.workspace.blob_path(&hash);
			if !blob.exists() {
				println!("[MISS] {}", path);
				state.remote.remove(path);
				report.problems.push(SyncError::MissingRemoteBlob { path: path.clone(), hash });
				continue;
			}

			let scratch = self.workspace.scratch_path();
			self.tools.cipher.decrypt(&blob, &scratch).await?;
			let actual = hasher::hash_file(&scratch)?;
			if actual != hash {
				println!("[NOOK] {}", path);
				remove_if_exists(&scratch)?;
				report.problems.push(SyncError::IntegrityMismatch {
					path: path.clone(),
					expected: hash,
					actual,
				});
				continue;
			}

			install(&scratch, &self.settings.local_dir.join(path), record.mtime)?;
			state.local.insert(path, record);
			report.done += 1;
		}

		info!("Installed {} files, {} problems", report.done, report.problems.len());
		Ok(report)
	}

	// ========================================================================
	// DELETIONS
	// ========================================================================

	fn deletions_allowed(&self, state: &RunState) -> bool {
		state.really_do && !self.options.safe && !self.options.size_control
	}

	/// Delete the remote blobs of remote-only and superseded (newer local) files
	///
	/// Blobs still referenced by a remote entry outside that set are kept.
	pub async fn nuke_remote(&self, state: &mut RunState) -> Result<usize> {
		if !self.deletions_allowed(state) {
			return Ok(0);
		}
		let paths = merged_paths(&[&state.diff.remote_only, &state.diff.newer_local]);
		if paths.is_empty() {
			return Ok(0);
		}

		let doomed: BTreeSet<&String> = paths.iter().collect();
		let retained: BTreeSet<&str> = state
			.remote
			.iter()
			.filter(|(p, _)| !doomed.contains(p))
			.filter_map(|(_, r)| r.hash())
			.collect();
		let names: BTreeSet<String> = paths
			.iter()
			.filter_map(|p| state.remote.hash_of(p))
			.filter(|h| !retained.contains(h))
			.map(blob_name)
			.collect();
		let names: Vec<String> = names.into_iter().collect();

		self.tools.remote.delete(&self.settings.remote_data_dir(), &names).await?;

		for path in &paths {
			state.remote.remove(path);
		}
		info!("Deleted {} remote blobs for {} files", names.len(), paths.len());
		Ok(paths.len())
	}

	/// Delete local files that are absent remotely
	pub async fn nuke_local(&self, state: &mut RunState) -> Result<usize> {
		if !self.deletions_allowed(state) {
			return Ok(0);
		}
		let paths: Vec<String> = state.diff.local_only.iter().cloned().collect();
		let mut deleted = Vec::new();

		for path in &paths {
			if !is_path_safe(path) {
				warn!("Refusing to delete unsafe path {:?}", path);
				continue;
			}
			let full = self.settings.local_dir.join(path);
			debug!("[DEL] {}", full.display());
			remove_if_exists(&full)?;
			deleted.push(path);
		}

		for path in &deleted {
			state.local.remove(path);
		}
		Ok(deleted.len())
	}
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
	match fs::remove_file(path) {
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
		other => other,
	}
}

/// Move `from` to `to` (creating parents) and set its mtime
fn install(from: &Path, to: &Path, mtime: i64) -> io::Result<()> {
	if let Some(parent) = to.parent() {
		fs::create_dir_all(parent)?;
	}
	if fs::rename(from, to).is_err() {
		// Staging area on another filesystem
		fs::copy(from, to)?;
		fs::remove_file(from)?;
	}
	set_file_mtime(to, FileTime::from_unix_time(mtime, 0))
}


// vim: ts=4
