//! Remote cache purge (`--delete <MB>`)
//!
//! Frees space in the locally mounted remote store by deleting blobs oldest
//! first. Only files inside directories named `data` are candidates.

use std::collections::VecDeque;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, SyncError};
use crate::logging::*;
use crate::prompt::Prompt;
use crate::report::human_size;
use crate::workspace::DATA_DIR;

const MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBlob {
	pub path: PathBuf,
	pub size: u64,
	pub mtime: i64,
}

/// Every regular file in a `data` directory under `root`, oldest first
pub fn collect_blobs(root: &Path) -> Result<Vec<CachedBlob>> {
	let mut blobs = Vec::new();
	collect_into(root, &mut blobs)?;
	blobs.sort_by(|a, b| a.mtime.cmp(&b.mtime).then_with(|| a.path.cmp(&b.path)));
	Ok(blobs)
}

fn collect_into(dir: &Path, blobs: &mut Vec<CachedBlob>) -> Result<()> {
	let in_data = dir.file_name().map_or(false, |n| n == DATA_DIR);
	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let meta = fs::symlink_metadata(entry.path())?;
		if meta.is_dir() {
			collect_into(&entry.path(), blobs)?;
		} else if in_data && meta.is_file() {
			blobs.push(CachedBlob { path: entry.path(), size: meta.len(), mtime: meta.mtime() });
		}
	}
	Ok(())
}

/// Delete from the front of `blobs` until more than `bytes` are freed
///
/// Returns the bytes freed. `total` and `now` only affect the progress lines.
pub fn delete_oldest(
	blobs: &mut VecDeque<CachedBlob>,
	bytes: u64,
	total: usize,
	now: i64,
) -> Result<u64> {
	let mut freed = 0u64;
	while let Some(blob) = blobs.pop_front() {
		freed += blob.size;
		let age_days = (now - blob.mtime) as f64 / 86400.0;
		let name = blob.path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
		println!(
			"{:>4}/{}  {}  {:>10}  {:>10}  {:>6.2} d",
			total - blobs.len(),
			total,
			name,
			human_size(blob.size),
			human_size(freed),
			age_days
		);
		fs::remove_file(&blob.path)?;
		if freed > bytes {
			break;
		}
	}
	Ok(freed)
}

/// Interactive purge loop; returns the total number of bytes freed
pub fn run(pivot: &Path, megabytes: f64, prompt: &mut dyn Prompt) -> Result<u64> {
	if !pivot.is_dir() {
		return Err(SyncError::config(format!(
			"Can not find dir {}. Is it mounted?",
			pivot.display()
		)));
	}

	let mut blobs: VecDeque<CachedBlob> = collect_blobs(pivot)?.into();
	let total = blobs.len();
	info!("{} cached blobs under {}", total, pivot.display());

	let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0);
	let mut wanted = megabytes;
	let mut freed = 0;
	loop {
		freed += delete_oldest(&mut blobs, (wanted * MB) as u64, total, now)?;
		if blobs.is_empty() {
			break;
		}
		let answer = prompt.ask("How many MBs do you want to delete?: ");
		match answer.and_then(|a| a.trim().parse::<f64>().ok()) {
			Some(mb) if mb > 0.0 => wanted = mb,
			_ => break,
		}
	}
	Ok(freed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::prompt::Scripted;
	use filetime::{set_file_mtime, FileTime};
	use tempfile::TempDir;

	fn blob(root: &Path, rel: &str, size: usize, mtime: i64) {
		let path = root.join(rel);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(&path, vec![0u8; size]).unwrap();
		set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
	}

	#[test]
	fn test_collect_only_data_dirs() {
		let dir = TempDir::new().unwrap();
		blob(dir.path(), "music/data/new.gpg", 10, 300);
		blob(dir.path(), "music/data/old.gpg", 10, 100);
		blob(dir.path(), "music/index.dat.gpg", 10, 50);
		blob(dir.path(), "docs/data/mid.gpg", 10, 200);

		let blobs = collect_blobs(dir.path()).unwrap();
		let names: Vec<_> =
			blobs.iter().map(|b| b.path.file_name().unwrap().to_string_lossy().into_owned()).collect();
		assert_eq!(names, vec!["old.gpg", "mid.gpg", "new.gpg"]);
	}

	#[test]
	fn test_delete_until_exceeded() {
		let dir = TempDir::new().unwrap();
		blob(dir.path(), "r/data/a", 100, 1);
		blob(dir.path(), "r/data/b", 100, 2);
		blob(dir.path(), "r/data/c", 100, 3);

		let mut blobs: VecDeque<CachedBlob> = collect_blobs(dir.path()).unwrap().into();
		let freed = delete_oldest(&mut blobs, 150, 3, 10).unwrap();
		assert_eq!(freed, 200);
		assert_eq!(blobs.len(), 1);
		assert!(dir.path().join("r/data/c").exists());
		assert!(!dir.path().join("r/data/a").exists());
	}

	#[test]
	fn test_delete_everything_in_order() {
		let dir = TempDir::new().unwrap();
		for i in 0..200 {
			blob(dir.path(), &format!("r/data/{:03}", i), 1, i as i64);
		}

		let mut blobs: VecDeque<CachedBlob> = collect_blobs(dir.path()).unwrap().into();
		assert_eq!(blobs.front().map(|b| b.mtime), Some(0));
		let freed = delete_oldest(&mut blobs, u64::MAX, 200, 500).unwrap();
		assert_eq!(freed, 200);
		assert!(blobs.is_empty());
		assert_eq!(fs::read_dir(dir.path().join("r/data")).unwrap().count(), 0);
	}

	#[test]
	fn test_run_prompts_for_more() {
		let dir = TempDir::new().unwrap();
		let mb = 1024 * 1024;
		blob(dir.path(), "r/data/a", mb, 1);
		blob(dir.path(), "r/data/b", mb, 2);
		blob(dir.path(), "r/data/c", mb, 3);

		// 0.5 MB removes one file, then the answer "0.5" removes another, then "no" stops
		let mut prompt = Scripted::new(&["0.5", "no"]);
		let freed = run(dir.path(), 0.5, &mut prompt).unwrap();
		assert_eq!(freed, 2 * mb as u64);
		assert_eq!(prompt.asked.len(), 2);
		assert!(dir.path().join("r/data/c").exists());
	}

	#[test]
	fn test_missing_pivot() {
		let dir = TempDir::new().unwrap();
		let err = run(&dir.path().join("unmounted"), 1.0, &mut Scripted::default()).unwrap_err();
		assert!(err.to_string().contains("Is it mounted?"));
	}
}

// vim: ts=4
