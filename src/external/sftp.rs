//! Remote blob store over an sftp batch session
//!
//! Commands are prefixed with `-` so a missing file does not abort the batch.

use async_trait::async_trait;
use std::collections::BTreeSet;

use super::runner::CommandRunner;
use super::RemoteStore;
use crate::error::Result;
use crate::logging::*;

pub struct Sftp {
	program: String,
	server: String,
	runner: CommandRunner,
}

impl Sftp {
	pub fn new(program: impl Into<String>, server: impl Into<String>, runner: CommandRunner) -> Self {
		Sftp { program: program.into(), server: server.into(), runner }
	}

	async fn batch(&self, script: &str) -> Result<String> {
		let args = vec!["-b".to_string(), "-".to_string(), self.server.clone()];
		self.runner.run(&self.program, &args, Some(script)).await
	}
}

/// One `-<command> dir/name` line per name
pub fn batch_script(command: &str, dir: &str, names: &[String]) -> String {
	let dir = dir.trim_end_matches('/');
	names.iter().map(|n| format!("-{} {}/{}\n", command, dir, n)).collect()
}

/// Names from `candidates` that appear in the output of an `ls` batch
pub fn parse_listing(output: &str, candidates: &[String]) -> Vec<String> {
	let wanted: BTreeSet<&str> = candidates.iter().map(String::as_str).collect();
	let mut found: BTreeSet<String> = BTreeSet::new();

	for line in output.lines() {
		let line = line.trim();
		if line.is_empty() || line.starts_with("sftp>") {
			continue;
		}
		for token in line.split_whitespace() {
			let name = token.rsplit('/').next().unwrap_or(token);
			if wanted.contains(name) {
				found.insert(name.to_string());
			}
		}
	}

	found.into_iter().collect()
}

#[async_trait]
impl RemoteStore for Sftp {
	async fn list_present(&self, dir: &str, candidates: &[String]) -> Result<Vec<String>> {
		if candidates.is_empty() {
			return Ok(Vec::new());
		}
		let output = self.batch(&batch_script("ls", dir, candidates)).await?;
		let present = parse_listing(&output, candidates);
		debug!("{} of {} blobs present under {}", present.len(), candidates.len(), dir);
		Ok(present)
	}

	async fn delete(&self, dir: &str, names: &[String]) -> Result<()> {
		if names.is_empty() {
			return Ok(());
		}
		self.batch(&batch_script("rm", dir, names)).await?;
		Ok(())
	}
}


// vim: ts=4
