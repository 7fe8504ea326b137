//! Relative path normalization and safety checks
//!
//! Snapshot keys are relative, forward-slash separated and never carry a
//! leading `./` or a trailing slash.

use std::path::{Component, Path};

/// Normalize a relative path key
///
/// Only `/` separates components; `\` is an ordinary filename character.
pub fn normalize(path: &str) -> String {
	let mut trimmed = path;
	while let Some(rest) = trimmed.strip_prefix("./") {
		trimmed = rest;
	}
	let parts: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty() && *p != ".").collect();
	parts.join("/")
}

/// Join a relative directory key and an entry name
pub fn join(dir: &str, name: &str) -> String {
	if dir.is_empty() {
		name.to_string()
	} else {
		format!("{}/{}", dir, name)
	}
}

/// Check if a path is safe (relative, no parent directory references)
pub fn is_path_safe(path: &str) -> bool {
	let p = Path::new(path);
	!path.is_empty()
		&& !p.is_absolute()
		&& !p.components().any(|c| matches!(c, Component::ParentDir | Component::RootDir))
}


// vim: ts=4
