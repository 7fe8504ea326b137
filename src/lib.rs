//! # gipsync - encrypted file sync through a content-addressed remote store
//!
//! gipsync keeps a local directory and a remote mirror consistent. The remote
//! side holds one GPG-encrypted blob per distinct file content (named by its
//! hash) plus an encrypted index mapping relative paths to
//! `hash:size:mtime`. A run compares the local tree against that index,
//! shows the plan, asks for confirmation and then uploads or downloads.
//!
//! ## Library use
//!
//! ```rust,ignore
//! use gipsync::config::{ConfigDir, RunOptions};
//! use gipsync::controller::Controller;
//! use gipsync::external::Collaborators;
//! use gipsync::last_action::LastAction;
//! use gipsync::prompt::StdinPrompt;
//! use gipsync::timing::Timing;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = ConfigDir::locate()?;
//!     let prefs = cfg.load_prefs()?;
//!     let settings = cfg.settings(&prefs, "music")?;
//!     let tools = Collaborators::from_prefs(&prefs, LastAction::new(&settings.marker_path));
//!     let mut controller =
//!         Controller::new(settings, RunOptions::default(), tools, Box::new(StdinPrompt));
//!     let summary = controller.run(&mut Timing::new()).await?;
//!     println!("{} files transferred", summary.transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod exclude;
pub mod external;
pub mod hasher;
pub mod last_action;
pub mod logging;
pub mod metadata;
pub mod paths;
pub mod prompt;
pub mod purge;
pub mod reconcile;
pub mod report;
pub mod state;
pub mod timing;
pub mod transfer;
pub mod types;
pub mod walker;
pub mod workspace;

// Re-export commonly used types and functions
pub use error::{Result, SyncError};
pub use reconcile::{compare, CompareOptions, DiffResult, DiffSet, Direction, EqualMtimePolicy};
pub use types::{FileRecord, Snapshot};

// vim: ts=4
