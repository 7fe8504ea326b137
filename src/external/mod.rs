//! External collaborators
//!
//! Encryption, bulk transfer and remote listing/deletion are delegated to
//! external programs. The run controller only sees the traits below, so tests
//! (and alternative transports) can swap them for in-process versions.

use async_trait::async_trait;
use std::path::Path;

use crate::config::Prefs;
use crate::error::Result;
use crate::last_action::LastAction;

pub mod gpg;
pub mod local;
pub mod rsync;
pub mod runner;
pub mod sftp;

pub use gpg::Gpg;
pub use local::LocalStore;
pub use rsync::Rsync;
pub use runner::CommandRunner;
pub use sftp::Sftp;

/// Encrypts to a set of recipients and decrypts with the operator's key
#[async_trait]
pub trait Cipher: Send + Sync {
	async fn encrypt(&self, plain: &Path, cipher: &Path, recipients: &[String]) -> Result<()>;

	async fn decrypt(&self, cipher: &Path, plain: &Path) -> Result<()>;
}

/// Mirrors named files (relative paths) between a local and a remote directory
#[async_trait]
pub trait BulkTransfer: Send + Sync {
	async fn push(
		&self,
		local_dir: &Path,
		remote_dir: &str,
		files: &[String],
		bw_limit: Option<u32>,
	) -> Result<()>;

	async fn pull(
		&self,
		remote_dir: &str,
		local_dir: &Path,
		files: &[String],
		bw_limit: Option<u32>,
	) -> Result<()>;
}

/// Presence checks and deletions in a remote directory
#[async_trait]
pub trait RemoteStore: Send + Sync {
	/// Subset of `candidates` that exists in `dir`
	async fn list_present(&self, dir: &str, candidates: &[String]) -> Result<Vec<String>>;

	/// Delete `names` from `dir` in one batch
	async fn delete(&self, dir: &str, names: &[String]) -> Result<()>;
}

/// The set of collaborators one run works with
pub struct Collaborators {
	pub cipher: Box<dyn Cipher>,
	pub transfer: Box<dyn BulkTransfer>,
	pub remote: Box<dyn RemoteStore>,
}

impl Collaborators {
	/// gpg, rsync and sftp (or the local filesystem when no server is set)
	pub fn from_prefs(prefs: &Prefs, marker: LastAction) -> Self {
		let runner = CommandRunner::new(marker);
		let server = prefs.server.clone().filter(|s| !s.is_empty());

		let remote: Box<dyn RemoteStore> = match &server {
			Some(host) => Box::new(Sftp::new(prefs.sftp_command.clone(), host.clone(), runner.clone())),
			None => Box::new(LocalStore),
		};

		Collaborators {
			cipher: Box::new(Gpg::new(prefs.gpg_command.clone(), runner.clone())),
			transfer: Box::new(Rsync::new(prefs.rsync_command.clone(), server, runner)),
			remote,
		}
	}
}

// vim: ts=4
