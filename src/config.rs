//! Configuration for gipsync
//!
//! Everything lives in one configuration directory (`$GIPSYNC_DIR`, else
//! `~/.gipsync`):
//!
//! ```text
//! config.toml         global preferences (server, recipients, ...)
//! <repo>.toml         one file per repository
//! <repo>.excludes     optional extra exclusion patterns, one per line
//! <repo>.log          local content log, written by gipsync
//! <repo>.last_action  crash marker, present only while a command runs
//! ```
//!
//! Command line flags are kept apart in [`RunOptions`]; they are recorded in
//! the checkpoint and replaced by the fresh ones when a run resumes.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::exclude::{ExcludeMatcher, PatternMode};
use crate::reconcile::{Direction, EqualMtimePolicy};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "GIPSYNC_DIR";

// ============================================================================
// GLOBAL PREFERENCES
// ============================================================================

/// Contents of `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Prefs {
	/// ssh host holding the remote repositories; unset means `remoteRoot` is a local path
	pub server: Option<String>,

	/// Directory (on the server) containing all repositories
	pub remote_root: String,

	/// GPG identities every blob is encrypted to
	pub recipients: Vec<String>,

	/// Repositories processed by `gipsync all`
	pub all: Vec<String>,

	/// Locally mounted remote cache, used by `--delete`
	pub pivot_dir: Option<PathBuf>,

	/// Base of the staging directories, defaults to `<configdir>/work`
	pub work_dir: Option<PathBuf>,

	pub gpg_command: String,
	pub rsync_command: String,
	pub sftp_command: String,
}

impl Default for Prefs {
	fn default() -> Self {
		Prefs {
			server: None,
			remote_root: String::new(),
			recipients: Vec::new(),
			all: Vec::new(),
			pivot_dir: None,
			work_dir: None,
			gpg_command: "gpg".to_string(),
			rsync_command: "rsync".to_string(),
			sftp_command: "sftp".to_string(),
		}
	}
}

// ============================================================================
// PER-REPOSITORY CONFIGURATION
// ============================================================================

/// Contents of `<repo>.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepoConfig {
	/// Local directory to sync (`~` is expanded)
	pub local_dir: Option<String>,

	/// Repository directory, relative to `remoteRoot`
	pub repo_dir: Option<String>,

	/// Exclusion patterns
	pub exclude: Vec<String>,

	pub exclude_mode: PatternMode,

	/// How `--update-equals` resolves equal-mtime conflicts
	pub equal_mtime_policy: EqualMtimePolicy,
}

/// Fully resolved settings for one repository
#[derive(Debug, Clone)]
pub struct RepoSettings {
	pub name: String,
	pub local_dir: PathBuf,
	/// Repository directory on the remote side (under the server, if any)
	pub remote_dir: String,
	pub recipients: Vec<String>,
	pub excludes: ExcludeMatcher,
	pub equal_mtime_policy: EqualMtimePolicy,
	/// Local content log
	pub log_path: PathBuf,
	/// Staging directory of this repository
	pub work_dir: PathBuf,
	/// Crash marker
	pub marker_path: PathBuf,
}

impl RepoSettings {
	/// Remote directory holding the blobs
	pub fn remote_data_dir(&self) -> String {
		format!("{}/{}", self.remote_dir.trim_end_matches('/'), crate::workspace::DATA_DIR)
	}
}

// ============================================================================
// RUN OPTIONS (COMMAND LINE)
// ============================================================================

/// Per-invocation flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunOptions {
	pub direction: Direction,
	/// Never delete anything
	pub safe: bool,
	/// Report what an upload would send, without encrypting or transferring
	pub size_control: bool,
	pub force_hash: bool,
	/// Bandwidth cap in KB/s
	pub limit_bw: Option<u32>,
	/// Ignore any checkpoint
	pub fresh: bool,
	/// Resolve equal-mtime conflicts
	pub update_equals: bool,
	/// Keep the staging directory after a successful run
	pub keep: bool,
	pub timing: bool,
	/// Remote repository does not exist yet
	pub new_repo: bool,
	pub verbosity: u8,
}

// ============================================================================
// CONFIGURATION DIRECTORY
// ============================================================================

#[derive(Debug, Clone)]
pub struct ConfigDir {
	root: PathBuf,
}

impl ConfigDir {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		ConfigDir { root: root.into() }
	}

	/// `$GIPSYNC_DIR` or `~/.gipsync`, created if missing
	pub fn locate() -> Result<Self> {
		let root = match env::var_os(CONFIG_DIR_ENV) {
			Some(dir) => PathBuf::from(dir),
			None => {
				let home = env::var_os("HOME")
					.ok_or_else(|| SyncError::config("could not determine HOME directory"))?;
				PathBuf::from(home).join(".gipsync")
			}
		};

		match fs::metadata(&root) {
			Ok(meta) if meta.is_dir() => {}
			Ok(_) => {
				return Err(SyncError::config(format!(
					"{} exists, but it is not a directory",
					root.display()
				)))
			}
			Err(_) => fs::create_dir_all(&root)?,
		}

		Ok(ConfigDir { root })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Global preferences; a missing `config.toml` gives the defaults
	pub fn load_prefs(&self) -> Result<Prefs> {
		let path = self.root.join("config.toml");
		match read_optional(&path)? {
			Some(text) => parse_toml(&text, &path),
			None => Ok(Prefs::default()),
		}
	}

	pub fn load_repo(&self, name: &str) -> Result<RepoConfig> {
		let path = self.root.join(format!("{}.toml", name));
		match read_optional(&path)? {
			Some(text) => parse_toml(&text, &path),
			None => Err(SyncError::config(format!(
				"no configuration for repository {} ({})",
				name,
				path.display()
			))),
		}
	}

	/// Patterns from `<repo>.excludes`; blank lines and `#` comments are skipped
	pub fn load_excludes(&self, name: &str) -> Result<Vec<String>> {
		let path = self.root.join(format!("{}.excludes", name));
		let text = read_optional(&path)?.unwrap_or_default();
		Ok(text
			.lines()
			.map(str::trim_end)
			.filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
			.map(String::from)
			.collect())
	}

	/// Load and validate everything needed to sync `name`
	pub fn settings(&self, prefs: &Prefs, name: &str) -> Result<RepoSettings> {
		let repo = self.load_repo(name)?;
		let extra = self.load_excludes(name)?;
		self.check(prefs, name, repo, extra)
	}

	/// Validate required keys and resolve paths
	pub fn check(
		&self,
		prefs: &Prefs,
		name: &str,
		repo: RepoConfig,
		extra_excludes: Vec<String>,
	) -> Result<RepoSettings> {
		let local_dir = repo
			.local_dir
			.filter(|d| !d.is_empty())
			.ok_or_else(|| SyncError::config(format!("{}: localDir is not set", name)))?;
		let repo_dir = repo
			.repo_dir
			.filter(|d| !d.is_empty())
			.ok_or_else(|| SyncError::config(format!("{}: repoDir is not set", name)))?;
		if prefs.recipients.is_empty() {
			return Err(SyncError::config("recipients is not set in config.toml"));
		}

		let remote_dir = if prefs.remote_root.is_empty() {
			repo_dir
		} else {
			format!("{}/{}", prefs.remote_root.trim_end_matches('/'), repo_dir)
		};

		let mut patterns = repo.exclude;
		patterns.extend(extra_excludes);
		let excludes = ExcludeMatcher::new(&patterns, repo.exclude_mode)?;

		let work_base = prefs.work_dir.clone().unwrap_or_else(|| self.root.join("work"));

		Ok(RepoSettings {
			name: name.to_string(),
			local_dir: expand_home(&local_dir),
			remote_dir,
			recipients: prefs.recipients.clone(),
			excludes,
			equal_mtime_policy: repo.equal_mtime_policy,
			log_path: self.root.join(format!("{}.log", name)),
			work_dir: work_base.join(name),
			marker_path: self.root.join(format!("{}.last_action", name)),
		})
	}
}

fn read_optional(path: &Path) -> Result<Option<String>> {
	match fs::read_to_string(path) {
		Ok(text) => Ok(Some(text)),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(e.into()),
	}
}

fn parse_toml<T: serde::de::DeserializeOwned>(text: &str, path: &Path) -> Result<T> {
	toml::from_str(text)
		.map_err(|e| SyncError::config(format!("{}: {}", path.display(), e)))
}

/// Expand a leading `~/`
pub fn expand_home(path: &str) -> PathBuf {
	if path == "~" || path.starts_with("~/") {
		if let Some(home) = env::var_os("HOME") {
			return PathBuf::from(home).join(path.trim_start_matches('~').trim_start_matches('/'));
		}
	}
	PathBuf::from(path)
}


// vim: ts=4
