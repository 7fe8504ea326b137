//! Error types for gipsync operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for sync operations
#[derive(Debug)]
pub enum SyncError {
	/// Missing or invalid configuration key
	Config { message: String },

	/// A metadata line that does not split into `name|hash:size:mtime`
	MalformedEntry { path: PathBuf, line: usize, content: String },

	/// A metadata file that had to exist is missing
	FileNotFound { path: PathBuf },

	/// An external command (gpg, rsync, sftp) failed or could not be spawned
	ExternalTool { command: String, status: Option<i32> },

	/// Decrypted content does not hash to the value recorded in the remote index
	IntegrityMismatch { path: String, expected: String, actual: String },

	/// The remote index lists a hash that has no blob in the remote store
	MissingRemoteBlob { path: String, hash: String },

	/// A previous run was interrupted inside an external command
	PendingAction { marker: PathBuf, command: String },

	/// Exclusion pattern could not be compiled
	InvalidPattern { pattern: String, message: String },

	/// Checkpoint could not be read back
	StateCorrupted { message: String },

	/// I/O error
	Io(io::Error),
}

impl SyncError {
	pub fn config(message: impl Into<String>) -> Self {
		SyncError::Config { message: message.into() }
	}

	/// Per-file problems are reported and skipped; everything else aborts the run
	pub fn is_per_file(&self) -> bool {
		matches!(self, SyncError::IntegrityMismatch { .. } | SyncError::MissingRemoteBlob { .. })
	}
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Config { message } => write!(f, "Configuration error: {}", message),
			SyncError::MalformedEntry { path, line, content } => {
				write!(f, "Malformed entry at {}:{}: {:?}", path.display(), line, content)
			}
			SyncError::FileNotFound { path } => {
				write!(f, "Can't read from non-existent file {}", path.display())
			}
			SyncError::ExternalTool { command, status } => match status {
				Some(code) => write!(f, "Error running command (exit {}):\n{}", code, command),
				None => write!(f, "Error running command:\n{}", command),
			},
			SyncError::IntegrityMismatch { path, expected, actual } => {
				write!(f, "Integrity mismatch for {}: expected {}, got {}", path, expected, actual)
			}
			SyncError::MissingRemoteBlob { path, hash } => {
				write!(f, "Remote blob {} for {} is missing", hash, path)
			}
			SyncError::PendingAction { marker, command } => write!(
				f,
				"Command aborted in a previous run:\n\n{}\n\n\
				 Please do the following:\n \
				 1 - Bring the above command to end by hand\n \
				 2 - Delete file {}\n \
				 3 - Run gipsync again.",
				command,
				marker.display()
			),
			SyncError::InvalidPattern { pattern, message } => {
				write!(f, "Invalid exclusion pattern {:?}: {}", pattern, message)
			}
			SyncError::StateCorrupted { message } => write!(f, "Checkpoint corrupted: {}", message),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<serde_json::Error> for SyncError {
	fn from(e: serde_json::Error) -> Self {
		SyncError::StateCorrupted { message: e.to_string() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_per_file_classification() {
		let mismatch = SyncError::IntegrityMismatch {
			path: "a".to_string(),
			expected: "x".to_string(),
			actual: "y".to_string(),
		};
		let missing = SyncError::MissingRemoteBlob { path: "a".to_string(), hash: "x".to_string() };
		assert!(mismatch.is_per_file());
		assert!(missing.is_per_file());
		assert!(!SyncError::config("REPODIR").is_per_file());
		assert!(!SyncError::ExternalTool { command: "rsync".to_string(), status: Some(23) }
			.is_per_file());
	}

	#[test]
	fn test_pending_action_mentions_marker() {
		let err = SyncError::PendingAction {
			marker: PathBuf::from("/tmp/music.last_action"),
			command: "rsync -rto a b".to_string(),
		};
		let text = err.to_string();
		assert!(text.contains("rsync -rto a b"));
		assert!(text.contains("/tmp/music.last_action"));
	}
}

// vim: ts=4
