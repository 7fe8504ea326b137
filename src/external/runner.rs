//! Spawns external commands under the crash marker

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Result, SyncError};
use crate::last_action::LastAction;
use crate::logging::*;

/// Runs one external command at a time, recording it in the crash marker
#[derive(Debug, Clone)]
pub struct CommandRunner {
	marker: LastAction,
}

impl CommandRunner {
	pub fn new(marker: LastAction) -> Self {
		CommandRunner { marker }
	}

	/// Run `program` to completion and return its stdout
	///
	/// The marker is cleared only when the command exits with status 0.
	pub async fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> Result<String> {
		let line = render_command(program, args, stdin);
		debug!("Running: {}", line);
		self.marker.record(&line)?;

		let mut child = Command::new(program)
			.args(args)
			.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.spawn()
			.map_err(|e| {
				error!("Failed to spawn {}: {}", program, e);
				SyncError::ExternalTool { command: line.clone(), status: None }
			})?;

		if let Some(input) = stdin {
			if let Some(mut pipe) = child.stdin.take() {
				pipe.write_all(input.as_bytes()).await?;
				pipe.shutdown().await?;
			}
		}

		let output = child.wait_with_output().await?;
		if !output.status.success() {
			return Err(SyncError::ExternalTool { command: line, status: output.status.code() });
		}

		self.marker.clear()?;
		Ok(String::from_utf8_lossy(&output.stdout).into_owned())
	}
}

/// Shell-like rendering of a command, with stdin as a here-document
pub fn render_command(program: &str, args: &[String], stdin: Option<&str>) -> String {
	let mut line = quote(program);
	for arg in args {
		line.push(' ');
		line.push_str(&quote(arg));
	}
	if let Some(input) = stdin {
		line.push_str(" <<'EOF'\n");
		line.push_str(input);
		if !input.ends_with('\n') {
			line.push('\n');
		}
		line.push_str("EOF");
	}
	line
}

fn quote(arg: &str) -> String {
	let plain = !arg.is_empty()
		&& arg.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
	if plain {
		arg.to_string()
	} else {
		format!("'{}'", arg.replace('\'', r"'\''"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn args(a: &[&str]) -> Vec<String> {
		a.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn test_render_command() {
		assert_eq!(
			render_command("gpg", &args(&["-r", "me@host", "-o", "/w/a b"]), None),
			"gpg -r me@host -o '/w/a b'"
		);
		assert_eq!(
			render_command("rsync", &args(&["--files-from=-"]), Some("data/x.gpg")),
			"rsync --files-from=- <<'EOF'\ndata/x.gpg\nEOF"
		);
		assert_eq!(quote("it's"), r"'it'\''s'");
	}

	#[tokio::test]
	async fn test_success_clears_marker() {
		let dir = TempDir::new().unwrap();
		let marker = LastAction::new(dir.path().join("r.last_action"));
		let runner = CommandRunner::new(marker.clone());

		let out = runner.run("sh", &args(&["-c", "cat"]), Some("hello\n")).await.unwrap();
		assert_eq!(out, "hello\n");
		assert!(!marker.path().exists());
	}

	#[tokio::test]
	async fn test_failure_keeps_marker() {
		let dir = TempDir::new().unwrap();
		let marker = LastAction::new(dir.path().join("r.last_action"));
		let runner = CommandRunner::new(marker.clone());

		let err = runner.run("sh", &args(&["-c", "exit 3"]), None).await.unwrap_err();
		match err {
			SyncError::ExternalTool { status, .. } => assert_eq!(status, Some(3)),
			other => panic!("unexpected error: {}", other),
		}
		assert!(matches!(marker.check(), Err(SyncError::PendingAction { .. })));
	}

	#[tokio::test]
	async fn test_spawn_failure() {
		let dir = TempDir::new().unwrap();
		let runner = CommandRunner::new(LastAction::new(dir.path().join("m")));
		let err = runner.run("/nonexistent/gipsync-tool", &[], None).await.unwrap_err();
		assert!(matches!(err, SyncError::ExternalTool { status: None, .. }));
	}
}

// vim: ts=4
