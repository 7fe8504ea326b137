//! Content hashing
//!
//! Files are streamed through BLAKE3 in fixed-size chunks so input size is
//! unbounded. The hex digest is used both for change detection and as the
//! content-addressed name of remote blobs.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer size for streaming hashes
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Hash a file's content, returning the lowercase hex digest
pub fn hash_file(path: &Path) -> io::Result<String> {
	let mut file = File::open(path)?;
	hash_reader(&mut file)
}

/// Hash everything readable from `reader`
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<String> {
	let mut hasher = blake3::Hasher::new();
	let mut buf = vec![0u8; CHUNK_SIZE];
	loop {
		let n = match reader.read(&mut buf) {
			Ok(0) => break,
			Ok(n) => n,
			Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
			Err(e) => return Err(e),
		};
		hasher.update(&buf[..n]);
	}
	Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Hash an in-memory buffer
pub fn hash_bytes(buf: &[u8]) -> String {
	hex::encode(blake3::hash(buf).as_bytes())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_file_matches_buffer_hash() {
		let mut f = NamedTempFile::new().unwrap();
		f.write_all(b"hello world").unwrap();
		f.flush().unwrap();
		assert_eq!(hash_file(f.path()).unwrap(), hash_bytes(b"hello world"));
	}

	#[test]
	fn test_multi_chunk_file() {
		let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
		let mut f = NamedTempFile::new().unwrap();
		f.write_all(&data).unwrap();
		f.flush().unwrap();
		assert_eq!(hash_file(f.path()).unwrap(), hash_bytes(&data));
	}

	#[test]
	fn test_empty_and_digest_shape() {
		let f = NamedTempFile::new().unwrap();
		let digest = hash_file(f.path()).unwrap();
		assert_eq!(digest, hash_bytes(b""));
		assert_eq!(digest.len(), 64);
		assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}

	#[test]
	fn test_missing_file() {
		assert!(hash_file(Path::new("/nonexistent/gipsync/file")).is_err());
	}
}

// vim: ts=4
