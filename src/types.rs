//! File records and snapshots

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::paths;

/// Known state of one file along one axis (log, local tree or remote index)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
	/// Hex content digest; absent when the file was never hashed
	#[serde(rename = "h")]
	pub hash: Option<String>,
	#[serde(rename = "sz")]
	pub size: u64,
	/// Seconds since the epoch
	#[serde(rename = "mt")]
	pub mtime: i64,
}

impl FileRecord {
	pub fn new(hash: impl Into<String>, size: u64, mtime: i64) -> Self {
		FileRecord { hash: Some(hash.into()), size, mtime }
	}

	pub fn hash(&self) -> Option<&str> {
		self.hash.as_deref()
	}
}

/// Mapping from normalized relative path to FileRecord
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
	files: BTreeMap<String, FileRecord>,
}

impl Snapshot {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert (or replace) the record for `path`; the key is normalized first
	pub fn insert(&mut self, path: &str, record: FileRecord) -> Option<FileRecord> {
		self.files.insert(paths::normalize(path), record)
	}

	pub fn get(&self, path: &str) -> Option<&FileRecord> {
		self.files.get(paths::normalize(path).as_str())
	}

	pub fn remove(&mut self, path: &str) -> Option<FileRecord> {
		self.files.remove(paths::normalize(path).as_str())
	}

	pub fn contains(&self, path: &str) -> bool {
		self.files.contains_key(paths::normalize(path).as_str())
	}

	/// Hash recorded for `path`, if the file is present and hashed
	pub fn hash_of(&self, path: &str) -> Option<&str> {
		self.get(path).and_then(|r| r.hash())
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}

	pub fn iter(&self) -> btree_map::Iter<'_, String, FileRecord> {
		self.files.iter()
	}

	pub fn paths(&self) -> btree_map::Keys<'_, String, FileRecord> {
		self.files.keys()
	}

	/// Total size of the given paths that are present in this snapshot
	pub fn size_of<'a, I>(&self, paths: I) -> u64
	where
		I: IntoIterator<Item = &'a String>,
	{
		paths.into_iter().filter_map(|p| self.get(p)).map(|r| r.size).sum()
	}
}

impl<'a> IntoIterator for &'a Snapshot {
	type Item = (&'a String, &'a FileRecord);
	type IntoIter = btree_map::Iter<'a, String, FileRecord>;

	fn into_iter(self) -> Self::IntoIter {
		self.files.iter()
	}
}

impl std::iter::FromIterator<(String, FileRecord)> for Snapshot {
	fn from_iter<T: IntoIterator<Item = (String, FileRecord)>>(iter: T) -> Self {
		let mut snapshot = Snapshot::new();
		for (path, record) in iter {
			snapshot.insert(&path, record);
		}
		snapshot
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_keys_are_normalized() {
		let mut s = Snapshot::new();
		s.insert("./docs//a.txt", FileRecord::new("h1", 3, 100));
		assert!(s.contains("docs/a.txt"));
		assert_eq!(s.hash_of("docs/a.txt"), Some("h1"));
		assert_eq!(s.len(), 1);
	}

	#[test]
	fn test_backslash_is_part_of_the_name() {
		let mut s = Snapshot::new();
		s.insert("a\\b.txt", FileRecord::new("h1", 3, 100));
		s.insert("a/b.txt", FileRecord::new("h2", 3, 100));
		assert_eq!(s.len(), 2);
		assert_eq!(s.hash_of("a\\b.txt"), Some("h1"));
		assert_eq!(s.hash_of("./a/b.txt"), Some("h2"));
		assert!(s.remove("a\\b.txt").is_some());
		assert!(!s.contains("a\\b.txt"));
	}

	#[test]
	fn test_replace_not_mutate() {
		let mut s = Snapshot::new();
		s.insert("a", FileRecord::new("h1", 3, 100));
		let old = s.insert("a", FileRecord::new("h2", 4, 200));
		assert_eq!(old, Some(FileRecord::new("h1", 3, 100)));
		assert_eq!(s.get("a").map(|r| r.mtime), Some(200));
	}

	#[test]
	fn test_size_of() {
		let s: Snapshot = vec![
			("a".to_string(), FileRecord::new("h1", 10, 1)),
			("b".to_string(), FileRecord::new("h2", 5, 1)),
		]
		.into_iter()
		.collect();
		let wanted = vec!["a".to_string(), "b".to_string(), "missing".to_string()];
		assert_eq!(s.size_of(&wanted), 15);
	}

	#[test]
	fn test_unhashed_record() {
		let mut s = Snapshot::new();
		s.insert("a", FileRecord { hash: None, size: 0, mtime: 0 });
		assert!(s.contains("a"));
		assert_eq!(s.hash_of("a"), None);
	}
}

// vim: ts=4
