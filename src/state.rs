//! Run state and its checkpoint
//!
//! The whole in-memory state of a run is saved as JSON after every step, so
//! an interrupted run can pick up where it stopped without downloading,
//! hashing or comparing again.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::RunOptions;
use crate::error::{Result, SyncError};
use crate::logging::*;
use crate::reconcile::DiffResult;
use crate::types::Snapshot;
use crate::walker::WalkStats;

/// Bumped whenever the checkpoint layout changes
pub const CHECKPOINT_VERSION: u32 = 1;

/// Resumable steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
	DownloadIndex,
	ReadRemoteIndex,
	ReadLocalLog,
	WalkLocalTree,
	SaveLocalLog,
	Compare,
	SortDiff,
	NukeRemote,
	Upload,
	NukeLocal,
	Download,
	SaveRemoteIndex,
}

impl Step {
	/// Progress line printed when the step starts (or is skipped)
	pub fn describe(&self) -> &'static str {
		match self {
			Step::DownloadIndex => "Downloading index.dat...",
			Step::ReadRemoteIndex => "Reading remote index...",
			Step::ReadLocalLog => "Reading local log...",
			Step::WalkLocalTree => "Finding new/different local files...",
			Step::SaveLocalLog => "Saving local data...",
			Step::Compare => "Comparing remote/local...",
			Step::SortDiff => "Sorting differences...",
			Step::NukeRemote => "Deleting remote files...",
			Step::Upload => "Uploading...",
			Step::NukeLocal => "Deleting local files...",
			Step::Download => "Downloading...",
			Step::SaveRemoteIndex => "Saving index.dat remotely...",
		}
	}

	/// Timing milestone recorded once the step is over
	pub fn milestone(&self) -> &'static str {
		match self {
			Step::DownloadIndex => "Download remote index",
			Step::ReadRemoteIndex => "Read remote index",
			Step::ReadLocalLog => "Initialize",
			Step::WalkLocalTree => "Dir walk",
			Step::SaveLocalLog => "Save local hash",
			Step::Compare => "Compare",
			Step::SortDiff => "Sort diff",
			Step::NukeRemote => "Nuke up",
			Step::Upload => "Upload",
			Step::NukeLocal => "Nuke local",
			Step::Download => "Download",
			Step::SaveRemoteIndex => "Save remote index",
		}
	}
}

/// Everything a run accumulates for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
	pub version: u32,
	pub repo: String,
	/// Options of the invocation that last touched this state
	pub options: RunOptions,
	/// Local log as read at the start of the run
	pub read: Snapshot,
	/// Local tree
	pub local: Snapshot,
	/// Remote index
	pub remote: Snapshot,
	pub diff: DiffResult,
	pub stats: WalkStats,
	/// Destructive actions confirmed by the operator
	pub really_do: bool,
	pub completed: BTreeSet<Step>,
}

impl RunState {
	pub fn new(repo: &str, options: RunOptions) -> Self {
		RunState {
			version: CHECKPOINT_VERSION,
			repo: repo.to_string(),
			options,
			read: Snapshot::new(),
			local: Snapshot::new(),
			remote: Snapshot::new(),
			diff: DiffResult::default(),
			stats: WalkStats::default(),
			really_do: false,
			completed: BTreeSet::new(),
		}
	}

	pub fn is_done(&self, step: Step) -> bool {
		self.completed.contains(&step)
	}

	pub fn mark_done(&mut self, step: Step) {
		self.completed.insert(step);
	}

	/// Forget `step` and everything after it
	pub fn invalidate_from(&mut self, step: Step) {
		self.completed = self.completed.iter().copied().filter(|s| *s < step).collect();
	}

	/// Replace the recorded options with the ones of the current invocation
	///
	/// The comparison depends on direction, forced rehash and equal-mtime
	/// handling; if any of those changed, it is redone.
	pub fn merge_options(&mut self, fresh: RunOptions) {
		let old = &self.options;
		if old.direction != fresh.direction {
			info!("Resuming as {} (checkpoint was {})", fresh.direction, old.direction);
		}
		let recompare = old.direction != fresh.direction
			|| old.force_hash != fresh.force_hash
			|| old.update_equals != fresh.update_equals;
		if recompare && self.is_done(Step::Compare) {
			debug!("Options changed, comparing again");
			self.invalidate_from(Step::Compare);
			self.diff = DiffResult::default();
		}
		self.options = fresh;
	}
}

/// Loads and saves the checkpoint file
#[derive(Debug, Clone)]
pub struct CheckpointStore {
	path: PathBuf,
}

impl CheckpointStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		CheckpointStore { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Saved state, if any
	pub async fn load(&self) -> Result<Option<RunState>> {
		if !self.path.exists() {
			return Ok(None);
		}

		let contents = tokio::fs::read_to_string(&self.path).await?;
		let state: RunState = serde_json::from_str(&contents)?;
		if state.version != CHECKPOINT_VERSION {
			return Err(SyncError::StateCorrupted {
				message: format!(
					"{} has version {}, expected {}",
					self.path.display(),
					state.version,
					CHECKPOINT_VERSION
				),
			});
		}
		Ok(Some(state))
	}

	pub async fn save(&self, state: &RunState) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		let json = serde_json::to_string(state)?;
		let mut tmp = self.path.as_os_str().to_owned();
		tmp.push(".tmp");
		tokio::fs::write(&tmp, json).await?;
		tokio::fs::rename(&tmp, &self.path).await?;
		Ok(())
	}

	pub async fn clear(&self) -> Result<()> {
		if self.path.exists() {
			tokio::fs::remove_file(&self.path).await?;
		}
		Ok(())
	}
}


// vim: ts=4
