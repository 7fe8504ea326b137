//! Local tree walk
//!
//! Produces the local snapshot, re-hashing only files whose mtime differs
//! from the prior snapshot (or every file when forced).

use serde::{Deserialize, Serialize};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::error::Result;
use crate::exclude::ExcludeMatcher;
use crate::hasher;
use crate::logging::*;
use crate::paths;
use crate::types::{FileRecord, Snapshot};

/// Counters accumulated during a walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkStats {
	/// Every non-directory entry visited, whatever happened to it
	pub files_walked: u64,
	/// Files whose content was hashed
	pub hashes_computed: u64,
}

/// Walk `root` and build the current local snapshot
pub fn walk(
	root: &Path,
	excludes: &ExcludeMatcher,
	prior: &Snapshot,
	force_hash: bool,
) -> Result<(Snapshot, WalkStats)> {
	let mut walker = Walker { excludes, prior, force_hash, stats: WalkStats::default() };
	let mut snapshot = Snapshot::new();

	// The root itself must be readable; unreadable subdirectories are only warned about
	fs::read_dir(root)?;
	walker.scan_dir(root, "", &mut snapshot)?;

	debug!(
		"Walked {} files under {}, hashed {}",
		walker.stats.files_walked,
		root.display(),
		walker.stats.hashes_computed
	);
	Ok((snapshot, walker.stats))
}

struct Walker<'a> {
	excludes: &'a ExcludeMatcher,
	prior: &'a Snapshot,
	force_hash: bool,
	stats: WalkStats,
}

impl<'a> Walker<'a> {
	fn scan_dir(&mut self, dir: &Path, rel_dir: &str, snapshot: &mut Snapshot) -> Result<()> {
		if !rel_dir.is_empty() && self.excludes.is_excluded(rel_dir) {
			trace!("[EXCL] {}/", rel_dir);
			return Ok(());
		}

		let read = match fs::read_dir(dir) {
			Ok(r) => r,
			Err(e) => {
				warn!("Cannot read directory {}: {}", dir.display(), e);
				return Ok(());
			}
		};

		let mut entries: Vec<fs::DirEntry> = read
			.filter_map(|entry| match entry {
				Ok(e) => Some(e),
				Err(e) => {
					debug!("Error reading directory entry in {}: {}", dir.display(), e);
					None
				}
			})
			.collect();
		entries.sort_by_key(|e| e.file_name());

		for entry in entries {
			let path = entry.path();
			let name = entry.file_name();
			let name = match name.to_str() {
				Some(n) => n,
				None => {
					warn!("Skipping non UTF-8 name {}", path.display());
					continue;
				}
			};
			let rel = paths::join(rel_dir, name);

			let meta = match fs::symlink_metadata(&path) {
				Ok(m) => m,
				Err(e) => {
					warn!("Cannot access {}: {}", path.display(), e);
					continue;
				}
			};

			if meta.is_dir() {
				self.scan_dir(&path, &rel, snapshot)?;
				continue;
			}

			self.stats.files_walked += 1;

			if meta.file_type().is_symlink() || !meta.is_file() || self.excludes.is_excluded(&rel) {
				trace!("[SKIP] {}", rel);
				continue;
			}

			let mtime = meta.mtime();
			let prior = self.prior;
			let unchanged = if self.force_hash {
				None
			} else {
				prior.get(&rel).filter(|r| r.hash.is_some() && r.mtime == mtime)
			};

			match unchanged {
				Some(record) => {
					trace!("[SKIP] {}", rel);
					snapshot.insert(&rel, record.clone());
				}
				None => {
					debug!("[HASH] {}", rel);
					let hash = hasher::hash_file(&path)?;
					self.stats.hashes_computed += 1;
					snapshot.insert(&rel, FileRecord::new(hash, meta.len(), mtime));
				}
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::exclude::PatternMode;
	use filetime::{set_file_mtime, FileTime};
	use tempfile::TempDir;

	fn write(root: &Path, rel: &str, content: &str, mtime: i64) {
		let path = root.join(rel);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(&path, content).unwrap();
		set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
	}

	#[test]
	fn test_walk_hashes_new_files() {
		let dir = TempDir::new().unwrap();
		write(dir.path(), "a.txt", "alpha", 100);
		write(dir.path(), "sub/b.txt", "beta", 200);

		let (snap, stats) =
			walk(dir.path(), &ExcludeMatcher::none(), &Snapshot::new(), false).unwrap();
		assert_eq!(stats, WalkStats { files_walked: 2, hashes_computed: 2 });
		assert_eq!(snap.get("a.txt"), Some(&FileRecord::new(hasher::hash_bytes(b"alpha"), 5, 100)));
		assert_eq!(snap.get("sub/b.txt").map(|r| r.mtime), Some(200));
	}

	#[test]
	fn test_unchanged_mtime_is_not_rehashed() {
		let dir = TempDir::new().unwrap();
		write(dir.path(), "same.txt", "same", 100);
		write(dir.path(), "touched.txt", "old", 100);
		let none = ExcludeMatcher::none();

		let (first, _) = walk(dir.path(), &none, &Snapshot::new(), false).unwrap();
		write(dir.path(), "touched.txt", "new", 300);

		let (second, stats) = walk(dir.path(), &none, &first, false).unwrap();
		assert_eq!(stats, WalkStats { files_walked: 2, hashes_computed: 1 });
		assert_eq!(second.get("same.txt"), first.get("same.txt"));
		assert_eq!(second.hash_of("touched.txt"), Some(hasher::hash_bytes(b"new").as_str()));

		let (_, forced) = walk(dir.path(), &none, &second, true).unwrap();
		assert_eq!(forced.hashes_computed, 2);
	}

	#[test]
	fn test_backslash_name_is_one_file() {
		let dir = TempDir::new().unwrap();
		write(dir.path(), "a\\b.txt", "odd", 100);
		let none = ExcludeMatcher::none();

		let (first, _) = walk(dir.path(), &none, &Snapshot::new(), false).unwrap();
		assert_eq!(first.paths().cloned().collect::<Vec<_>>(), vec!["a\\b.txt".to_string()]);

		let (second, stats) = walk(dir.path(), &none, &first, false).unwrap();
		assert_eq!(stats, WalkStats { files_walked: 1, hashes_computed: 0 });
		assert_eq!(second, first);
	}

	#[test]
	fn test_excluded_directory_is_pruned() {
		let dir = TempDir::new().unwrap();
		write(dir.path(), "keep.txt", "k", 1);
		write(dir.path(), "cache/x.bin", "x", 1);
		write(dir.path(), "cache/deep/y.bin", "y", 1);
		let ex = ExcludeMatcher::new(&["cache".to_string()], PatternMode::Substring).unwrap();

		let (snap, stats) = walk(dir.path(), &ex, &Snapshot::new(), false).unwrap();
		assert_eq!(snap.paths().cloned().collect::<Vec<_>>(), vec!["keep.txt".to_string()]);
		assert_eq!(stats.files_walked, 1);
	}

	#[test]
	fn test_excluded_file_counts_as_walked() {
		let dir = TempDir::new().unwrap();
		write(dir.path(), "keep.txt", "k", 1);
		write(dir.path(), "skip.tmp", "s", 1);
		let ex = ExcludeMatcher::new(&[".tmp".to_string()], PatternMode::Substring).unwrap();

		let (snap, stats) = walk(dir.path(), &ex, &Snapshot::new(), false).unwrap();
		assert_eq!(snap.len(), 1);
		assert_eq!(stats, WalkStats { files_walked: 2, hashes_computed: 1 });
	}

	#[test]
	fn test_symlinks_are_skipped() {
		let dir = TempDir::new().unwrap();
		write(dir.path(), "real.txt", "r", 1);
		std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
			.unwrap();

		let (snap, _) = walk(dir.path(), &ExcludeMatcher::none(), &Snapshot::new(), false).unwrap();
		assert!(snap.contains("real.txt"));
		assert!(!snap.contains("link.txt"));
	}

	#[test]
	fn test_missing_root_is_error() {
		let dir = TempDir::new().unwrap();
		let missing = dir.path().join("gone");
		assert!(walk(&missing, &ExcludeMatcher::none(), &Snapshot::new(), false).is_err());
	}
}

// vim: ts=4
