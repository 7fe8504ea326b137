//! Run controller
//!
//! Drives one repository through the step sequence
//!
//! ```text
//! DownloadIndex -> ReadRemoteIndex -> ReadLocalLog -> WalkLocalTree -> SaveLocalLog
//!     -> Compare -> SortDiff -> confirm -> (NukeRemote -> Upload | NukeLocal -> Download)
//!     -> SaveRemoteIndex -> cleanup
//! ```
//!
//! The run state is checkpointed after every step. A step already recorded as
//! completed is skipped on the next invocation unless `--fresh` is given. Any
//! fatal error leaves the checkpoint (and the crash marker, if an external
//! command failed) in place.

use crate::config::{RepoSettings, RunOptions};
use crate::error::{Result, SyncError};
use crate::external::Collaborators;
use crate::last_action::LastAction;
use crate::logging::*;
use crate::metadata;
use crate::prompt::Prompt;
use crate::reconcile::{self, CompareOptions, Direction};
use crate::report;
use crate::state::{CheckpointStore, RunState, Step};
use crate::timing::Timing;
use crate::transfer::Transfer;
use crate::types::Snapshot;
use crate::walker;
use crate::workspace::Workspace;

/// What a run did
#[derive(Debug, Default)]
pub struct RunSummary {
	pub repo: String,
	/// No difference in the run's direction
	pub up_to_date: bool,
	/// Operator confirmed the plan
	pub confirmed: bool,
	/// Files uploaded or installed
	pub transferred: usize,
	/// Files deleted locally, or whose remote blobs were deleted
	pub deleted: usize,
	/// Per-file problems (integrity mismatches, missing blobs)
	pub problems: Vec<SyncError>,
	/// Staging area cleaned up and checkpoint removed
	pub cleaned: bool,
}

pub struct Controller {
	settings: RepoSettings,
	options: RunOptions,
	tools: Collaborators,
	prompt: Box<dyn Prompt>,
	workspace: Workspace,
	checkpoint: CheckpointStore,
	marker: LastAction,
	state: RunState,
}

impl Controller {
	pub fn new(
		settings: RepoSettings,
		options: RunOptions,
		tools: Collaborators,
		prompt: Box<dyn Prompt>,
	) -> Self {
		let workspace = Workspace::new(&settings.work_dir);
		let checkpoint = CheckpointStore::new(workspace.checkpoint_path());
		let marker = LastAction::new(&settings.marker_path);
		let state = RunState::new(&settings.name, options.clone());
		Controller { settings, options, tools, prompt, workspace, checkpoint, marker, state }
	}

	pub fn state(&self) -> &RunState {
		&self.state
	}

	/// Print the step header and tell whether it has to run
	fn begin(&self, step: Step) -> bool {
		if self.state.is_done(step) {
			println!("[AVOIDED] {}", step.describe());
			false
		} else {
			println!("{}", step.describe());
			true
		}
	}

	/// Record `step` as completed and checkpoint
	async fn finish(&mut self, step: Step, timing: &mut Timing) -> Result<()> {
		self.state.mark_done(step);
		self.checkpoint.save(&self.state).await?;
		timing.milestone(step.milestone());
		Ok(())
	}

	/// Previous checkpoint merged with the current options, or a new state
	async fn restore(&mut self) -> Result<()> {
		if self.options.fresh {
			self.checkpoint.clear().await?;
			return Ok(());
		}
		match self.checkpoint.load().await? {
			Some(mut saved) if saved.repo == self.settings.name => {
				info!("Resuming from {}", self.checkpoint.path().display());
				saved.merge_options(self.options.clone());
				self.state = saved;
			}
			Some(saved) => {
				warn!("Ignoring checkpoint of repository {}", saved.repo);
			}
			None => {}
		}
		Ok(())
	}

	pub async fn run(&mut self, timing: &mut Timing) -> Result<RunSummary> {
		self.marker.check()?;
		if !self.settings.local_dir.is_dir() {
			return Err(SyncError::config(format!(
				"Required local dir {} not present",
				self.settings.local_dir.display()
			)));
		}

		self.restore().await?;
		timing.milestone("Read confs");
		println!(
			"\n[REPO] {} ({} <-> {})",
			self.settings.name,
			self.settings.local_dir.display(),
			self.settings.remote_dir
		);

		self.read_both_sides(timing).await?;
		self.compare(timing).await?;

		let mut summary = RunSummary { repo: self.settings.name.clone(), ..Default::default() };
		let direction = self.options.direction;

		self.state.really_do = false;
		print!("{}", report::enumerate(&self.state.diff, &self.options));
		println!("{}", self.summary_text());

		let any_diff = self.state.diff.pending(direction) > 0;
		summary.up_to_date = !any_diff;
		if any_diff {
			self.state.really_do = self.prompt.confirm("\nAct accordingly");
			summary.confirmed = self.state.really_do;
			self.checkpoint.save(&self.state).await?;
		}

		if self.state.really_do {
			match direction {
				Direction::Upload => self.upload_branch(&mut summary, timing).await?,
				Direction::Download => self.download_branch(&mut summary, timing).await?,
			}
			self.save_remote_index(timing).await?;
			println!("{}", self.summary_text());
		}

		for problem in &summary.problems {
			warn!("{}", problem);
		}

		if self.state.really_do || !any_diff {
			println!("Cleaning up...");
			self.cleanup().await?;
			summary.cleaned = true;
		}
		timing.milestone("Finalize");

		Ok(summary)
	}

	fn summary_text(&self) -> String {
		report::summary(
			&self.state.diff,
			&self.state.local,
			&self.state.remote,
			&self.state.stats,
			&self.options,
			self.state.really_do,
		)
	}

	async fn read_both_sides(&mut self, timing: &mut Timing) -> Result<()> {
		if self.begin(Step::DownloadIndex) {
			if self.options.new_repo {
				info!("New repository, no remote index to fetch");
			} else {
				let xfer = Transfer::new(&self.tools, &self.workspace, &self.settings, &self.options);
				xfer.fetch_index().await?;
			}
		}
		self.finish(Step::DownloadIndex, timing).await?;

		if self.begin(Step::ReadRemoteIndex) {
			self.state.remote = if self.options.new_repo {
				Snapshot::new()
			} else {
				let xfer = Transfer::new(&self.tools, &self.workspace, &self.settings, &self.options);
				xfer.read_index().await?
			};
			debug!("Remote index has {} entries", self.state.remote.len());
		}
		self.finish(Step::ReadRemoteIndex, timing).await?;

		if self.begin(Step::ReadLocalLog) {
			self.state.read = metadata::load_or_empty(&self.settings.log_path)?;
			debug!("Local log has {} entries", self.state.read.len());
		}
		self.finish(Step::ReadLocalLog, timing).await?;

		if self.begin(Step::WalkLocalTree) {
			let (local, stats) = walker::walk(
				&self.settings.local_dir,
				&self.settings.excludes,
				&self.state.read,
				self.options.force_hash,
			)?;
			self.state.local = local;
			self.state.stats = stats;
		}
		self.finish(Step::WalkLocalTree, timing).await?;

		if self.begin(Step::SaveLocalLog) {
			metadata::save(&self.state.local, &self.settings.log_path)?;
		}
		self.finish(Step::SaveLocalLog, timing).await
	}

	async fn compare(&mut self, timing: &mut Timing) -> Result<()> {
		if self.begin(Step::Compare) {
			let opts = CompareOptions::for_run(
				self.options.direction,
				self.options.force_hash,
				self.options.update_equals,
				self.settings.equal_mtime_policy,
			);
			self.state.diff = reconcile::compare(
				&self.state.local,
				&self.state.remote,
				&self.settings.excludes,
				&opts,
			);
		}
		self.finish(Step::Compare, timing).await?;

		if self.begin(Step::SortDiff) {
			self.state.diff.sort();
		}
		self.finish(Step::SortDiff, timing).await
	}

	async fn upload_branch(&mut self, summary: &mut RunSummary, timing: &mut Timing) -> Result<()> {
		if !self.options.safe {
			if self.begin(Step::NukeRemote) {
				let xfer = Transfer::new(&self.tools, &self.workspace, &self.settings, &self.options);
				summary.deleted = xfer.nuke_remote(&mut self.state).await?;
			}
			self.finish(Step::NukeRemote, timing).await?;
		}

		if self.begin(Step::Upload) {
			let xfer = Transfer::new(&self.tools, &self.workspace, &self.settings, &self.options);
			let report = xfer.upload(&mut self.state).await?;
			summary.transferred = report.done;
			summary.problems.extend(report.problems);
		}
		self.finish(Step::Upload, timing).await
	}

	async fn download_branch(&mut self, summary: &mut RunSummary, timing: &mut Timing) -> Result<()> {
		if !self.options.safe {
			if self.begin(Step::NukeLocal) {
				let xfer = Transfer::new(&self.tools, &self.workspace, &self.settings, &self.options);
				summary.deleted = xfer.nuke_local(&mut self.state).await?;
			}
			self.finish(Step::NukeLocal, timing).await?;
		}

		if self.begin(Step::Download) {
			let xfer = Transfer::new(&self.tools, &self.workspace, &self.settings, &self.options);
			let report = xfer.download(&mut self.state).await?;
			summary.transferred = report.done;
			summary.problems.extend(report.problems);
		}
		self.finish(Step::Download, timing).await?;

		// Installed files carry the remote mtimes now
		metadata::save(&self.state.local, &self.settings.log_path)
	}

	async fn save_remote_index(&mut self, timing: &mut Timing) -> Result<()> {
		if self.options.size_control {
			println!("[AVOIDED] {}", Step::SaveRemoteIndex.describe());
			return Ok(());
		}
		if self.begin(Step::SaveRemoteIndex) {
			let xfer = Transfer::new(&self.tools, &self.workspace, &self.settings, &self.options);
			xfer.write_index(&self.state.remote).await?;
		}
		self.finish(Step::SaveRemoteIndex, timing).await
	}

	async fn cleanup(&mut self) -> Result<()> {
		self.checkpoint.clear().await?;
		if self.options.keep {
			info!("Keeping {}", self.workspace.root().display());
		} else {
			self.workspace.remove()?;
		}
		self.marker.clear()?;
		Ok(())
	}
}

// vim: ts=4
