use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::process;

use gipsync::config::{ConfigDir, RunOptions};
use gipsync::controller::Controller;
use gipsync::error::{Result, SyncError};
use gipsync::external::Collaborators;
use gipsync::last_action::LastAction;
use gipsync::logging::{self, *};
use gipsync::prompt::StdinPrompt;
use gipsync::purge;
use gipsync::reconcile::Direction;
use gipsync::timing::Timing;

fn cli() -> Command {
	Command::new("gipsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Sync a directory through a GPG-encrypted remote store")
		.arg(
			Arg::new("repo")
				.value_name("REPO")
				.action(ArgAction::Append)
				.num_args(1..)
				.required_unless_present("delete")
				.help("Repositories to sync, or \"all\""),
		)
		.arg(
			Arg::new("up")
				.short('u')
				.long("up")
				.action(ArgAction::SetTrue)
				.help("Upload local changes (default is download)"),
		)
		.arg(
			Arg::new("safe")
				.short('s')
				.long("safe")
				.action(ArgAction::SetTrue)
				.help("Never delete anything"),
		)
		.arg(
			Arg::new("size-control")
				.short('c')
				.long("size-control")
				.action(ArgAction::SetTrue)
				.help("Show what an upload would send, without encrypting or transferring"),
		)
		.arg(
			Arg::new("force-hash")
				.short('f')
				.long("force-hash")
				.action(ArgAction::SetTrue)
				.help("Re-hash every file; on upload, local copies win every difference"),
		)
		.arg(
			Arg::new("limit-bw")
				.short('l')
				.long("limit-bw")
				.value_name("KBPS")
				.value_parser(value_parser!(u32))
				.help("Bandwidth limit for transfers, in KB/s"),
		)
		.arg(
			Arg::new("fresh")
				.long("fresh")
				.action(ArgAction::SetTrue)
				.help("Ignore any checkpoint of an interrupted run"),
		)
		.arg(
			Arg::new("update-equals")
				.long("update-equals")
				.action(ArgAction::SetTrue)
				.help("Resolve files with equal mtime but different content"),
		)
		.arg(
			Arg::new("keep")
				.short('k')
				.long("keep")
				.action(ArgAction::SetTrue)
				.help("Keep the staging directory"),
		)
		.arg(
			Arg::new("delete")
				.short('d')
				.long("delete")
				.value_name("MB")
				.value_parser(value_parser!(f64))
				.help("Free MB in the mounted remote cache, oldest blobs first"),
		)
		.arg(
			Arg::new("timing")
				.short('t')
				.long("timing")
				.action(ArgAction::SetTrue)
				.help("Print elapsed time per stage"),
		)
		.arg(
			Arg::new("new")
				.long("new")
				.action(ArgAction::SetTrue)
				.help("The remote repository does not exist yet"),
		)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.action(ArgAction::Count)
				.help("More output (repeatable)"),
		)
}

fn run_options(matches: &ArgMatches) -> RunOptions {
	RunOptions {
		direction: if matches.get_flag("up") { Direction::Upload } else { Direction::Download },
		safe: matches.get_flag("safe"),
		size_control: matches.get_flag("size-control"),
		force_hash: matches.get_flag("force-hash"),
		limit_bw: matches.get_one::<u32>("limit-bw").copied(),
		fresh: matches.get_flag("fresh"),
		update_equals: matches.get_flag("update-equals"),
		keep: matches.get_flag("keep"),
		timing: matches.get_flag("timing"),
		new_repo: matches.get_flag("new"),
		verbosity: matches.get_count("verbose"),
	}
}

/// Positional names, with `all` expanded from the preferences
fn repo_names(matches: &ArgMatches, all: &[String]) -> Vec<String> {
	let names: Vec<String> =
		matches.get_many::<String>("repo").map(|v| v.cloned().collect()).unwrap_or_default();
	if names.first().map(String::as_str) == Some("all") {
		all.to_vec()
	} else {
		names
	}
}

async fn run(matches: &ArgMatches) -> Result<()> {
	let cfg = ConfigDir::locate()?;
	let prefs = cfg.load_prefs()?;
	debug!("Configuration directory: {}", cfg.root().display());

	if let Some(mb) = matches.get_one::<f64>("delete") {
		let pivot =
			prefs.pivot_dir.as_ref().ok_or_else(|| SyncError::config("pivotDir is not set"))?;
		let freed = purge::run(pivot, *mb, &mut StdinPrompt)?;
		info!("Freed {}", gipsync::report::human_size(freed));
		return Ok(());
	}

	let options = run_options(matches);
	let mut timing = Timing::new();

	for name in repo_names(matches, &prefs.all) {
		let settings = cfg.settings(&prefs, &name)?;
		let tools = Collaborators::from_prefs(&prefs, LastAction::new(&settings.marker_path));
		let mut controller =
			Controller::new(settings, options.clone(), tools, Box::new(StdinPrompt));

		let summary = controller.run(&mut timing).await?;
		if !summary.problems.is_empty() {
			println!("{}: {} files had problems, run again to retry", name, summary.problems.len());
		}
	}

	if options.timing {
		println!("{}", timing.summary());
	}
	Ok(())
}

#[tokio::main]
async fn main() {
	let matches = cli().get_matches();
	logging::init_tracing(matches.get_count("verbose"));

	if let Err(e) = run(&matches).await {
		error!("{}", e);
		eprintln!("[ERROR] {}", e);
		process::exit(1);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(args: &[&str]) -> ArgMatches {
		cli().try_get_matches_from(args).unwrap()
	}

	#[test]
	fn test_flags() {
		let m = parse(&["gipsync", "music", "-u", "--safe", "--limit-bw", "200", "-vv", "--new"]);
		let opts = run_options(&m);
		assert_eq!(opts.direction, Direction::Upload);
		assert!(opts.safe);
		assert!(opts.new_repo);
		assert_eq!(opts.limit_bw, Some(200));
		assert_eq!(opts.verbosity, 2);
		assert!(!opts.fresh);
	}

	#[test]
	fn test_all_expands() {
		let all = vec!["music".to_string(), "docs".to_string()];
		assert_eq!(repo_names(&parse(&["gipsync", "all"]), &all), all);
		assert_eq!(repo_names(&parse(&["gipsync", "a", "b"]), &all), vec!["a", "b"]);
	}

	#[test]
	fn test_repo_required_unless_delete() {
		assert!(cli().try_get_matches_from(&["gipsync"]).is_err());
		let m = parse(&["gipsync", "--delete", "500"]);
		assert_eq!(m.get_one::<f64>("delete").copied(), Some(500.0));
	}
}

// vim: ts=4
