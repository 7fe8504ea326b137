//! Crash marker
//!
//! The command line of every external command is written here before it is
//! spawned and removed once it exits successfully. A marker left behind means
//! the previous run died half-way through that command.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

#[derive(Debug, Clone)]
pub struct LastAction {
	path: PathBuf,
}

impl LastAction {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		LastAction { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Fail with operator instructions if a previous command never finished
	pub fn check(&self) -> Result<()> {
		match fs::read_to_string(&self.path) {
			Ok(command) if !command.trim().is_empty() => Err(SyncError::PendingAction {
				marker: self.path.clone(),
				command: command.trim_end().to_string(),
			}),
			Ok(_) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}

	pub fn record(&self, command: &str) -> io::Result<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)?;
			}
		}
		fs::write(&self.path, format!("{}\n", command))
	}

	pub fn clear(&self) -> io::Result<()> {
		match fs::remove_file(&self.path) {
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			other => other,
		}
	}
}


// vim: ts=4
