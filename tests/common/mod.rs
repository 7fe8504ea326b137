//! Shared fixtures for the integration tests
//!
//! The external programs are replaced by in-process collaborators: the
//! "cipher" copies bytes, the "bulk transfer" copies files between two local
//! directories, and the remote store is the filesystem-backed one.

#![allow(dead_code)]

use async_trait::async_trait;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use gipsync::config::{ConfigDir, Prefs, RepoConfig, RepoSettings, RunOptions};
use gipsync::controller::{Controller, RunSummary};
use gipsync::error::{Result, SyncError};
use gipsync::external::{BulkTransfer, Cipher, Collaborators, LocalStore};
use gipsync::metadata;
use gipsync::prompt::Scripted;
use gipsync::timing::Timing;
use gipsync::types::Snapshot;

pub const REPO: &str = "music";

fn copy_file(from: &Path, to: &Path) -> Result<()> {
	if let Some(parent) = to.parent() {
		fs::create_dir_all(parent)?;
	}
	fs::copy(from, to)?;
	Ok(())
}

/// "Encrypts" by copying
pub struct CopyCipher;

#[async_trait]
impl Cipher for CopyCipher {
	async fn encrypt(&self, plain: &Path, cipher: &Path, _recipients: &[String]) -> Result<()> {
		copy_file(plain, cipher)
	}

	async fn decrypt(&self, cipher: &Path, plain: &Path) -> Result<()> {
		copy_file(cipher, plain)
	}
}

/// Decrypts every blob (but not the index) to altered content
pub struct CorruptingCipher;

#[async_trait]
impl Cipher for CorruptingCipher {
	async fn encrypt(&self, plain: &Path, cipher: &Path, _recipients: &[String]) -> Result<()> {
		copy_file(plain, cipher)
	}

	async fn decrypt(&self, cipher: &Path, plain: &Path) -> Result<()> {
		copy_file(cipher, plain)?;
		if cipher.file_name().and_then(|n| n.to_str()) != Some("index.dat.gpg") {
			let mut bytes = fs::read(plain)?;
			bytes.extend_from_slice(b" (bit rot)");
			fs::write(plain, bytes)?;
		}
		Ok(())
	}
}

/// Dies halfway through every encryption, leaving a truncated output file
pub struct TruncatingCipher;

#[async_trait]
impl Cipher for TruncatingCipher {
	async fn encrypt(&self, plain: &Path, cipher: &Path, _recipients: &[String]) -> Result<()> {
		let bytes = fs::read(plain)?;
		fs::write(cipher, &bytes[..bytes.len() / 2])?;
		Err(SyncError::ExternalTool { command: "gpg".to_string(), status: Some(2) })
	}

	async fn decrypt(&self, cipher: &Path, plain: &Path) -> Result<()> {
		copy_file(cipher, plain)
	}
}

/// Copies listed files between two local directories
#[derive(Default)]
pub struct DirTransfer {
	/// Every push fails like rsync exiting with 12
	pub fail_push: bool,
}

impl DirTransfer {
	fn mirror(&self, from: &Path, to: &Path, files: &[String]) -> Result<()> {
		for name in files {
			let src = from.join(name);
			if !src.exists() {
				return Err(SyncError::ExternalTool {
					command: format!("copy {}", src.display()),
					status: Some(23),
				});
			}
			copy_file(&src, &to.join(name))?;
		}
		Ok(())
	}
}

#[async_trait]
impl BulkTransfer for DirTransfer {
	async fn push(
		&self,
		local_dir: &Path,
		remote_dir: &str,
		files: &[String],
		_bw_limit: Option<u32>,
	) -> Result<()> {
		if self.fail_push {
			return Err(SyncError::ExternalTool { command: "rsync".to_string(), status: Some(12) });
		}
		self.mirror(local_dir, Path::new(remote_dir), files)
	}

	async fn pull(
		&self,
		remote_dir: &str,
		local_dir: &Path,
		files: &[String],
		_bw_limit: Option<u32>,
	) -> Result<()> {
		self.mirror(Path::new(remote_dir), local_dir, files)
	}
}

pub fn stub_tools() -> Collaborators {
	Collaborators {
		cipher: Box::new(CopyCipher),
		transfer: Box::new(DirTransfer::default()),
		remote: Box::new(LocalStore),
	}
}

/// A configuration directory, a local tree and a "remote" directory
pub struct Fixture {
	pub tmp: TempDir,
	pub cfg: ConfigDir,
	pub settings: RepoSettings,
}

impl Fixture {
	pub fn new() -> Self {
		let tmp = TempDir::new().unwrap();
		let conf = tmp.path().join("conf");
		let local = tmp.path().join("local");
		let remote_root = tmp.path().join("remote");
		for dir in [&conf, &local, &remote_root].iter() {
			fs::create_dir_all(dir).unwrap();
		}

		let cfg = ConfigDir::new(&conf);
		let prefs = Prefs {
			remote_root: remote_root.display().to_string(),
			recipients: vec!["tester@example.org".to_string()],
			..Default::default()
		};
		let repo = RepoConfig {
			local_dir: Some(local.display().to_string()),
			repo_dir: Some(REPO.to_string()),
			exclude: vec![".git".to_string()],
			..Default::default()
		};
		let settings = cfg.check(&prefs, REPO, repo, Vec::new()).unwrap();
		Fixture { tmp, cfg, settings }
	}

	pub fn local(&self) -> &Path {
		&self.settings.local_dir
	}

	pub fn remote(&self) -> PathBuf {
		PathBuf::from(&self.settings.remote_dir)
	}

	pub fn checkpoint(&self) -> PathBuf {
		self.settings.work_dir.join("checkpoint.json")
	}

	pub fn write_local(&self, rel: &str, content: &str, mtime: i64) {
		let path = self.local().join(rel);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).unwrap();
		}
		fs::write(&path, content).unwrap();
		set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
	}

	pub fn remove_local(&self, rel: &str) {
		fs::remove_file(self.local().join(rel)).unwrap();
	}

	/// Remote index as last pushed (the copy cipher leaves it readable)
	pub fn remote_index(&self) -> Snapshot {
		metadata::load(&self.remote().join("index.dat.gpg")).unwrap()
	}

	pub fn remote_blob(&self, hash: &str) -> PathBuf {
		self.remote().join("data").join(format!("{}.gpg", hash))
	}

	pub async fn run(&self, options: RunOptions, answers: &[&str]) -> Result<RunSummary> {
		self.run_with(stub_tools(), options, answers).await
	}

	pub async fn run_with(
		&self,
		tools: Collaborators,
		options: RunOptions,
		answers: &[&str],
	) -> Result<RunSummary> {
		let mut controller = Controller::new(
			self.settings.clone(),
			options,
			tools,
			Box::new(Scripted::new(answers)),
		);
		controller.run(&mut Timing::new()).await
	}
}

// vim: ts=4
