//! Reconciliation engine
//!
//! Compares a local and a remote snapshot and classifies every differing
//! path into exactly one of four categories. Pure: no I/O besides logging.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::exclude::ExcludeMatcher;
use crate::logging::*;
use crate::types::{FileRecord, Snapshot};

/// Direction of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
	/// Local tree is pushed to the remote store
	Upload,

	/// Remote store is pulled into the local tree
	#[default]
	Download,
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Direction::Upload => write!(f, "upload"),
			Direction::Download => write!(f, "download"),
		}
	}
}

/// Resolution of hash conflicts with identical mtimes, when resolution is allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EqualMtimePolicy {
	/// Side being written by this run loses: upload favours local, download remote
	#[default]
	FollowDirection,

	/// Local copy always wins
	PreferLocal,

	/// Remote copy always wins
	PreferRemote,
}

impl FromStr for EqualMtimePolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"follow-direction" | "direction" => Ok(Self::FollowDirection),
			"prefer-local" | "local" => Ok(Self::PreferLocal),
			"prefer-remote" | "remote" => Ok(Self::PreferRemote),
			_ => Err(format!(
				"Unknown equal mtime policy: {}. Valid options: follow-direction, prefer-local, prefer-remote",
				s
			)),
		}
	}
}

/// Knobs of a single comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareOptions {
	pub direction: Direction,
	/// Any hash difference is classified as newer locally, whatever the mtimes say
	pub prefer_local: bool,
	/// Resolve equal-mtime conflicts instead of leaving them alone
	pub allow_equal_mtime_update: bool,
	pub equal_mtime_policy: EqualMtimePolicy,
}

impl CompareOptions {
	/// Options for a run: forcing a rehash on upload makes local authoritative
	pub fn for_run(
		direction: Direction,
		force_hash: bool,
		update_equals: bool,
		policy: EqualMtimePolicy,
	) -> Self {
		CompareOptions {
			direction,
			prefer_local: direction == Direction::Upload && force_hash,
			allow_equal_mtime_update: update_equals,
			equal_mtime_policy: policy,
		}
	}

	fn resolve_tie(&self) -> Side {
		match self.equal_mtime_policy {
			EqualMtimePolicy::PreferLocal => Side::Local,
			EqualMtimePolicy::PreferRemote => Side::Remote,
			EqualMtimePolicy::FollowDirection => match self.direction {
				Direction::Upload => Side::Local,
				Direction::Download => Side::Remote,
			},
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
	Local,
	Remote,
}

/// One category of differences: sorted paths plus a hash to path index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSet {
	pub paths: Vec<String>,
	pub by_hash: BTreeMap<String, String>,
}

impl DiffSet {
	pub fn insert(&mut self, path: &str, hash: &str) {
		self.paths.push(path.to_string());
		self.by_hash.insert(hash.to_string(), path.to_string());
	}

	pub fn sort(&mut self) {
		self.paths.sort();
		self.paths.dedup();
	}

	pub fn len(&self) -> usize {
		self.paths.len()
	}

	pub fn is_empty(&self) -> bool {
		self.paths.is_empty()
	}

	pub fn contains(&self, path: &str) -> bool {
		self.paths.iter().any(|p| p == path)
	}

	pub fn iter(&self) -> std::slice::Iter<'_, String> {
		self.paths.iter()
	}

	/// Distinct content hashes referenced by this set
	pub fn hashes(&self) -> impl Iterator<Item = &String> {
		self.by_hash.keys()
	}
}

/// Four disjoint categories of differences, plus the equal-mtime conflicts seen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
	pub local_only: DiffSet,
	pub remote_only: DiffSet,
	pub newer_local: DiffSet,
	pub newer_remote: DiffSet,
	/// Differing hashes with identical mtimes, resolved or not
	pub conflicts: Vec<String>,
}

impl DiffResult {
	pub fn sort(&mut self) {
		self.local_only.sort();
		self.remote_only.sort();
		self.newer_local.sort();
		self.newer_remote.sort();
		self.conflicts.sort();
		self.conflicts.dedup();
	}

	/// Nothing to transfer or delete in either direction
	pub fn is_up_to_date(&self) -> bool {
		self.local_only.is_empty()
			&& self.remote_only.is_empty()
			&& self.newer_local.is_empty()
			&& self.newer_remote.is_empty()
	}

	/// Number of files a run in `direction` would act on (transfers and deletions)
	pub fn pending(&self, direction: Direction) -> usize {
		match direction {
			Direction::Upload => {
				self.local_only.len() + self.remote_only.len() + self.newer_local.len()
			}
			Direction::Download => {
				self.local_only.len() + self.remote_only.len() + self.newer_remote.len()
			}
		}
	}
}

/// Hashed record on one side; hash-less records count as absent
fn hashed<'a>(snapshot: &'a Snapshot, path: &str) -> Option<(&'a FileRecord, &'a str)> {
	snapshot.get(path).and_then(|r| r.hash().map(|h| (r, h)))
}

/// Classify every path of `local` and `remote`
pub fn compare(
	local: &Snapshot,
	remote: &Snapshot,
	excludes: &ExcludeMatcher,
	opts: &CompareOptions,
) -> DiffResult {
	let mut diff = DiffResult::default();

	for (path, lrec) in local {
		let lhash = match lrec.hash() {
			Some(h) => h,
			None => continue,
		};

		let (rrec, rhash) = match hashed(remote, path) {
			Some(r) => r,
			None => {
				diff.local_only.insert(path, lhash);
				continue;
			}
		};

		if lhash == rhash {
			continue;
		}

		debug!("[DIFF] {} local mtime {} remote mtime {}", path, lrec.mtime, rrec.mtime);

		if lrec.mtime == rrec.mtime {
			warn!("Same mtime but different hash for {} (mtime {})", path, lrec.mtime);
			diff.conflicts.push(path.clone());
		}

		let winner = if opts.prefer_local {
			Some(Side::Local)
		} else if lrec.mtime < rrec.mtime {
			Some(Side::Remote)
		} else if lrec.mtime > rrec.mtime {
			Some(Side::Local)
		} else if opts.allow_equal_mtime_update {
			Some(opts.resolve_tie())
		} else {
			None
		};

		match winner {
			Some(Side::Local) => diff.newer_local.insert(path, lhash),
			Some(Side::Remote) => diff.newer_remote.insert(path, rhash),
			None => {}
		}
	}

	for (path, rrec) in remote {
		let rhash = match rrec.hash() {
			Some(h) => h,
			None => continue,
		};
		if hashed(local, path).is_some() {
			continue;
		}
		if excludes.is_excluded(path) {
			trace!("[EXCL] {} (remote)", path);
			continue;
		}
		diff.remote_only.insert(path, rhash);
	}

	diff.sort();
	diff
}


// vim: ts=4
