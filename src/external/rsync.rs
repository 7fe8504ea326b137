//! rsync bulk transfer
//!
//! Only the named files are mirrored (`--files-from`), never the whole tree.

use async_trait::async_trait;
use std::path::Path;

use super::runner::CommandRunner;
use super::BulkTransfer;
use crate::error::Result;
use crate::logging::*;

pub struct Rsync {
	program: String,
	/// ssh host; `None` means the remote root is a local (mounted) path
	server: Option<String>,
	runner: CommandRunner,
}

impl Rsync {
	pub fn new(program: impl Into<String>, server: Option<String>, runner: CommandRunner) -> Self {
		Rsync { program: program.into(), server, runner }
	}

	fn remote_spec(&self, dir: &str) -> String {
		match &self.server {
			Some(host) => format!("{}:{}/", host, dir.trim_end_matches('/')),
			None => format!("{}/", dir.trim_end_matches('/')),
		}
	}

	async fn mirror(&self, from: String, to: String, files: &[String], bw: Option<u32>) -> Result<()> {
		if files.is_empty() {
			debug!("Nothing to transfer from {}", from);
			return Ok(());
		}
		let list = file_list(files);
		self.runner.run(&self.program, &rsync_args(&from, &to, bw), Some(&list)).await?;
		Ok(())
	}
}

/// `rsync -rto [--bwlimit=N] --files-from=- FROM TO`
pub fn rsync_args(from: &str, to: &str, bw_limit: Option<u32>) -> Vec<String> {
	let mut args = vec!["-rto".to_string()];
	if let Some(kbps) = bw_limit {
		args.push(format!("--bwlimit={}", kbps));
	}
	args.push("--files-from=-".to_string());
	args.push(from.to_string());
	args.push(to.to_string());
	args
}

/// Newline separated list fed to `--files-from=-`
pub fn file_list(files: &[String]) -> String {
	let mut list = files.join("\n");
	list.push('\n');
	list
}

fn local_spec(dir: &Path) -> String {
	format!("{}/", dir.display().to_string().trim_end_matches('/'))
}

#[async_trait]
impl BulkTransfer for Rsync {
	async fn push(
		&self,
		local_dir: &Path,
		remote_dir: &str,
		files: &[String],
		bw_limit: Option<u32>,
	) -> Result<()> {
		self.mirror(local_spec(local_dir), self.remote_spec(remote_dir), files, bw_limit).await
	}

	async fn pull(
		&self,
		remote_dir: &str,
		local_dir: &Path,
		files: &[String],
		bw_limit: Option<u32>,
	) -> Result<()> {
		self.mirror(self.remote_spec(remote_dir), local_spec(local_dir), files, bw_limit).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::last_action::LastAction;

	#[test]
	fn test_args_with_bwlimit() {
		assert_eq!(
			rsync_args("/w/music/", "host:repos/music/", Some(150)).join(" "),
			"-rto --bwlimit=150 --files-from=- /w/music/ host:repos/music/"
		);
		assert_eq!(rsync_args("a/", "b/", None).join(" "), "-rto --files-from=- a/ b/");
	}

	#[test]
	fn test_remote_spec() {
		let runner = CommandRunner::new(LastAction::new("/tmp/unused"));
		let ssh = Rsync::new("rsync", Some("backup.example".to_string()), runner.clone());
		assert_eq!(ssh.remote_spec("repos/music/"), "backup.example:repos/music/");
		let local = Rsync::new("rsync", None, runner);
		assert_eq!(local.remote_spec("/mnt/repos/music"), "/mnt/repos/music/");
		assert_eq!(local_spec(Path::new("/w/music/")), "/w/music/");
	}

	#[test]
	fn test_file_list() {
		let files = vec!["data/a.gpg".to_string(), "index.dat.gpg".to_string()];
		assert_eq!(file_list(&files), "data/a.gpg\nindex.dat.gpg\n");
	}
}

// vim: ts=4
