//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Reading remote index...");
//! debug!("[HASH] {}", path);
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Map the number of `-v` flags to a default filter directive.
pub fn default_directive(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "info",
		1 => "debug",
		_ => "trace",
	}
}

/// Initialize the tracing subscriber with environment filter support.
///
/// `RUST_LOG` takes precedence; otherwise the level follows the verbosity:
///
/// ```bash
/// gipsync music -v                 # debug
/// RUST_LOG=gipsync::walker=trace gipsync music
/// ```
pub fn init_tracing(verbosity: u8) {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive(verbosity))),
		)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_verbosity_levels() {
		assert_eq!(default_directive(0), "info");
		assert_eq!(default_directive(1), "debug");
		assert_eq!(default_directive(5), "trace");
	}
}

// vim: ts=4
