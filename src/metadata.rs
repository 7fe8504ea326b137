//! Metadata store: the flat `name|hash:size:mtime` snapshot format
//!
//! One record per line. The name ends at the first `|`, so file names
//! containing `|` cannot be represented; such names are a known limitation
//! of the format and are not escaped. Blank lines and lines starting with
//! `#` are ignored. Size and mtime are written as integers but fractional
//! values (as produced by older writers) are accepted and truncated.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{Result, SyncError};
use crate::types::{FileRecord, Snapshot};

/// Separates the path from the fields
pub const RECORD_SEPARATOR: char = '|';

/// Separates hash, size and mtime
pub const FIELD_SEPARATOR: char = ':';

/// Parse snapshot text; `source` is only used for error messages
pub fn parse(content: &str, source: &Path) -> Result<Snapshot> {
	let mut snapshot = Snapshot::new();

	for (idx, line) in content.lines().enumerate() {
		if line.trim().is_empty() || line.starts_with('#') {
			continue;
		}
		let malformed = || SyncError::MalformedEntry {
			path: source.to_path_buf(),
			line: idx + 1,
			content: line.to_string(),
		};

		let (name, value) = line.split_once(RECORD_SEPARATOR).ok_or_else(malformed)?;
		let fields: Vec<&str> = value.split(FIELD_SEPARATOR).collect();
		if name.is_empty() || fields.len() < 3 {
			return Err(malformed());
		}

		let hash = match fields[0] {
			"" | "None" => None,
			h => Some(h.to_string()),
		};
		let size = parse_number(fields[1]).filter(|n| *n >= 0).ok_or_else(malformed)? as u64;
		let mtime = parse_number(fields[2]).ok_or_else(malformed)?;

		snapshot.insert(name, FileRecord { hash, size, mtime });
	}

	Ok(snapshot)
}

/// Integer field, tolerating a fractional part
fn parse_number(field: &str) -> Option<i64> {
	let field = field.trim();
	field.parse::<i64>().ok().or_else(|| {
		field.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)
	})
}

/// Render one line per record
pub fn render(snapshot: &Snapshot) -> String {
	let mut out = String::new();
	for (name, record) in snapshot {
		out.push_str(&format!(
			"{}{}{}{}{}{}{}\n",
			name,
			RECORD_SEPARATOR,
			record.hash().unwrap_or(""),
			FIELD_SEPARATOR,
			record.size,
			FIELD_SEPARATOR,
			record.mtime
		));
	}
	out
}

/// Load a snapshot that must exist
pub fn load(path: &Path) -> Result<Snapshot> {
	match fs::read_to_string(path) {
		Ok(content) => parse(&content, path),
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			Err(SyncError::FileNotFound { path: path.to_path_buf() })
		}
		Err(e) => Err(e.into()),
	}
}

/// Load a snapshot, treating a missing file as empty (first run of a repo)
pub fn load_or_empty(path: &Path) -> Result<Snapshot> {
	match load(path) {
		Err(SyncError::FileNotFound { .. }) => Ok(Snapshot::new()),
		other => other,
	}
}

/// Save a snapshot, replacing `path` only once the new content is fully written
pub fn save(snapshot: &Snapshot, path: &Path) -> Result<()> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)?;
		}
	}
	let mut tmp = path.as_os_str().to_owned();
	tmp.push(".tmp");
	{
		let mut f = fs::File::create(&tmp)?;
		f.write_all(render(snapshot).as_bytes())?;
		f.sync_all()?;
	}
	fs::rename(&tmp, path)?;
	Ok(())
}


// vim: ts=4
