//! Exclusion patterns
//!
//! Patterns are matched by substring containment against the relative path
//! unless the repository opts into glob semantics.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::SyncError;

/// How exclusion patterns are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PatternMode {
	/// Pattern excludes any path containing it
	#[default]
	Substring,

	/// Pattern is a glob matched against the whole relative path
	Glob,
}

impl FromStr for PatternMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"substring" | "contains" => Ok(Self::Substring),
			"glob" => Ok(Self::Glob),
			_ => Err(format!("Unknown exclude mode: {}. Valid options: substring, glob", s)),
		}
	}
}

/// Compiled exclusion patterns for one repository
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
	patterns: Vec<String>,
	globs: Option<GlobSet>,
}

impl ExcludeMatcher {
	/// Build a matcher; empty patterns are dropped
	pub fn new(patterns: &[String], mode: PatternMode) -> Result<Self, SyncError> {
		let patterns: Vec<String> = patterns.iter().filter(|p| !p.is_empty()).cloned().collect();

		let globs = match mode {
			PatternMode::Substring => None,
			PatternMode::Glob => Some(Self::build_glob_set(&patterns)?),
		};

		Ok(Self { patterns, globs })
	}

	/// A matcher that excludes nothing
	pub fn none() -> Self {
		Self { patterns: Vec::new(), globs: None }
	}

	fn build_glob_set(patterns: &[String]) -> Result<GlobSet, SyncError> {
		let mut builder = GlobSetBuilder::new();
		for pattern in patterns {
			let glob = Glob::new(pattern).map_err(|e| SyncError::InvalidPattern {
				pattern: pattern.clone(),
				message: e.to_string(),
			})?;
			builder.add(glob);
		}
		builder.build().map_err(|e| SyncError::InvalidPattern {
			pattern: patterns.join(", "),
			message: e.to_string(),
		})
	}

	/// Check a relative path (file or directory) against every pattern
	pub fn is_excluded(&self, path: &str) -> bool {
		match &self.globs {
			Some(set) => set.is_match(path),
			None => self.patterns.iter().any(|p| path.contains(p.as_str())),
		}
	}

	pub fn patterns(&self) -> &[String] {
		&self.patterns
	}
}


// vim: ts=4
