//! Working/staging directory of one repository
//!
//! ```text
//! <work>/<repo>/
//!     data/<hash>.gpg     encrypted blobs waiting for upload, or just downloaded
//!     tmp                 decryption scratch file
//!     index.dat           plaintext remote index
//!     index.dat.gpg       encrypted remote index
//!     checkpoint.json     resumable run state
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the blob directory, locally and on the remote side
pub const DATA_DIR: &str = "data";

/// Remote and staging name of the encrypted blob for `hash`
pub fn blob_name(hash: &str) -> String {
	format!("{}.gpg", hash)
}

#[derive(Debug, Clone)]
pub struct Workspace {
	root: PathBuf,
}

impl Workspace {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Workspace { root: root.into() }
	}

	/// Create the directory layout if missing
	pub fn create(&self) -> io::Result<()> {
		fs::create_dir_all(self.data_dir())
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn data_dir(&self) -> PathBuf {
		self.root.join(DATA_DIR)
	}

	pub fn blob_path(&self, hash: &str) -> PathBuf {
		self.data_dir().join(blob_name(hash))
	}

	pub fn scratch_path(&self) -> PathBuf {
		self.root.join("tmp")
	}

	pub fn index_plain(&self) -> PathBuf {
		self.root.join("index.dat")
	}

	pub fn index_cipher(&self) -> PathBuf {
		self.root.join("index.dat.gpg")
	}

	pub fn checkpoint_path(&self) -> PathBuf {
		self.root.join("checkpoint.json")
	}

	/// Delete the whole staging tree
	pub fn remove(&self) -> io::Result<()> {
		match fs::remove_dir_all(&self.root) {
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			other => other,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn test_layout() {
		let ws = Workspace::new("/work/music");
		assert_eq!(ws.blob_path("abc"), PathBuf::from("/work/music/data/abc.gpg"));
		assert_eq!(ws.index_cipher(), PathBuf::from("/work/music/index.dat.gpg"));
		assert_eq!(ws.checkpoint_path(), PathBuf::from("/work/music/checkpoint.json"));
	}

	#[test]
	fn test_create_and_remove() {
		let dir = TempDir::new().unwrap();
		let ws = Workspace::new(dir.path().join("repo"));
		ws.create().unwrap();
		assert!(ws.data_dir().is_dir());
		ws.remove().unwrap();
		assert!(!ws.root().exists());
		// Removing twice is fine
		ws.remove().unwrap();
	}
}

// vim: ts=4
