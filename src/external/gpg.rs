//! GnuPG cipher

use async_trait::async_trait;
use std::path::Path;

use super::runner::CommandRunner;
use super::Cipher;
use crate::error::{Result, SyncError};

pub struct Gpg {
	program: String,
	runner: CommandRunner,
}

impl Gpg {
	pub fn new(program: impl Into<String>, runner: CommandRunner) -> Self {
		Gpg { program: program.into(), runner }
	}
}

/// `gpg --yes -q -r R1 -r R2 -o out -e in`
pub fn encrypt_args(plain: &Path, cipher: &Path, recipients: &[String]) -> Vec<String> {
	let mut args = vec!["--yes".to_string(), "-q".to_string()];
	for r in recipients {
		args.push("-r".to_string());
		args.push(r.clone());
	}
	args.push("-o".to_string());
	args.push(cipher.display().to_string());
	args.push("-e".to_string());
	args.push(plain.display().to_string());
	args
}

/// `gpg --yes -q -o out -d in`
pub fn decrypt_args(cipher: &Path, plain: &Path) -> Vec<String> {
	vec![
		"--yes".to_string(),
		"-q".to_string(),
		"-o".to_string(),
		plain.display().to_string(),
		"-d".to_string(),
		cipher.display().to_string(),
	]
}

#[async_trait]
impl Cipher for Gpg {
	async fn encrypt(&self, plain: &Path, cipher: &Path, recipients: &[String]) -> Result<()> {
		if recipients.is_empty() {
			return Err(SyncError::config("no GPG recipients configured"));
		}
		self.runner.run(&self.program, &encrypt_args(plain, cipher, recipients), None).await?;
		Ok(())
	}

	async fn decrypt(&self, cipher: &Path, plain: &Path) -> Result<()> {
		self.runner.run(&self.program, &decrypt_args(cipher, plain), None).await?;
		Ok(())
	}
}


// vim: ts=4
