//! Human-readable plan and summary
//!
//! Both functions return the text instead of printing it, the controller
//! decides where it goes.

use crate::config::RunOptions;
use crate::reconcile::{DiffResult, DiffSet, Direction};
use crate::types::Snapshot;
use crate::walker::WalkStats;

const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];

/// `1536` -> `1.50 kB` (1024 based)
pub fn human_size(bytes: u64) -> String {
	let mut size = bytes as f64;
	let mut unit = 0;
	while size > 1024.0 && unit < UNITS.len() - 1 {
		size /= 1024.0;
		unit += 1;
	}
	format!("{:.2} {}", size, UNITS[unit])
}

fn tagged(out: &mut String, tag: &str, set: &DiffSet) {
	if set.is_empty() {
		return;
	}
	out.push('\n');
	for path in set.iter() {
		out.push_str(&format!("{} {}\n", tag, path));
	}
}

/// One tagged line per planned action
pub fn enumerate(diff: &DiffResult, opts: &RunOptions) -> String {
	let mut out = String::new();
	match opts.direction {
		Direction::Upload => {
			if !opts.safe {
				tagged(&mut out, "[DEL]", &diff.remote_only);
			}
			let (up, sync) =
				if opts.size_control { ("[FKUP]", "[FKSY]") } else { ("[UP]", "[SYNC]") };
			tagged(&mut out, up, &diff.local_only);
			tagged(&mut out, sync, &diff.newer_local);
		}
		Direction::Download => {
			if !opts.safe {
				tagged(&mut out, "[DEL]", &diff.local_only);
			}
			tagged(&mut out, "[DOWN]", &diff.remote_only);
			tagged(&mut out, "[SYNC]", &diff.newer_remote);
		}
	}
	out
}

fn row(out: &mut String, label: &str, value: String) {
	out.push_str(&format!("{:30}: {}\n", label, value));
}

/// Counts and byte totals of the plan, or `Up to date!`
pub fn summary(
	diff: &DiffResult,
	local: &Snapshot,
	remote: &Snapshot,
	stats: &WalkStats,
	opts: &RunOptions,
	really_do: bool,
) -> String {
	if diff.is_up_to_date() {
		return "Up to date!\n".to_string();
	}

	let (up_msg, dn_msg, rm_msg) = if really_do {
		("uploaded", "downloaded", "deleted")
	} else {
		("to upload", "to download", "to delete")
	};

	let mut out = String::from("\n");
	row(&mut out, "Number of files considered", stats.files_walked.to_string());
	row(&mut out, "Number of hashes calculated", stats.hashes_computed.to_string());

	match opts.direction {
		Direction::Upload => {
			let count = diff.local_only.len() + diff.newer_local.len();
			let bytes = local.size_of(diff.local_only.iter().chain(diff.newer_local.iter()));
			row(
				&mut out,
				&format!("Number of files {}", up_msg),
				format!("{} ({})", count, human_size(bytes)),
			);
			if !opts.safe {
				let bytes = remote.size_of(diff.remote_only.iter());
				row(
					&mut out,
					&format!("Number of files {}", rm_msg),
					format!("{} ({})", diff.remote_only.len(), human_size(bytes)),
				);
			}
			row(&mut out, "Diff files, newer in repo", diff.newer_remote.len().to_string());
		}
		Direction::Download => {
			let count = diff.remote_only.len() + diff.newer_remote.len();
			let bytes = remote.size_of(diff.remote_only.iter().chain(diff.newer_remote.iter()));
			row(
				&mut out,
				&format!("Number of files {}", dn_msg),
				format!("{} ({})", count, human_size(bytes)),
			);
			if !opts.safe {
				let bytes = local.size_of(diff.local_only.iter());
				row(
					&mut out,
					&format!("Number of files {}", rm_msg),
					format!("{} ({})", diff.local_only.len(), human_size(bytes)),
				);
			}
			row(&mut out, "Diff files, newer locally", diff.newer_local.len().to_string());
		}
	}

	if !diff.conflicts.is_empty() {
		row(&mut out, "Same mtime, different hash", diff.conflicts.len().to_string());
	}
	out
}


// vim: ts=4
