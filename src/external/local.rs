//! Remote store on a locally mounted path (no ssh server configured)

use async_trait::async_trait;
use std::io;
use std::path::Path;

use super::RemoteStore;
use crate::error::Result;
use crate::logging::*;

#[derive(Debug, Clone, Default)]
pub struct LocalStore;

#[async_trait]
impl RemoteStore for LocalStore {
	async fn list_present(&self, dir: &str, candidates: &[String]) -> Result<Vec<String>> {
		let mut present = Vec::new();
		for name in candidates {
			if tokio::fs::metadata(Path::new(dir).join(name)).await.is_ok() {
				present.push(name.clone());
			}
		}
		Ok(present)
	}

	async fn delete(&self, dir: &str, names: &[String]) -> Result<()> {
		for name in names {
			match tokio::fs::remove_file(Path::new(dir).join(name)).await {
				Ok(()) => {}
				Err(e) if e.kind() == io::ErrorKind::NotFound => {
					debug!("{}/{} already gone", dir, name);
				}
				Err(e) => return Err(e.into()),
			}
		}
		Ok(())
	}
}


// vim: ts=4
