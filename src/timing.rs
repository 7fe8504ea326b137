//! Stage-by-stage elapsed time report (`--timing`)

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Timing {
	start: Instant,
	/// Milestone name and offset from `start`
	milestones: Vec<(String, Duration)>,
}

impl Default for Timing {
	fn default() -> Self {
		Self::new()
	}
}

impl Timing {
	pub fn new() -> Self {
		Timing { start: Instant::now(), milestones: Vec::new() }
	}

	/// Record that `name` was reached now
	pub fn milestone(&mut self, name: &str) {
		let at = self.start.elapsed();
		self.record(name, at);
	}

	/// Duplicate names get `x` appended until unique
	fn record(&mut self, name: &str, at: Duration) {
		let mut id = if name.is_empty() { "unk".to_string() } else { name.to_string() };
		while self.milestones.iter().any(|(n, _)| *n == id) {
			id.push('x');
		}
		self.milestones.push((id, at));
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.milestones.iter().map(|(n, _)| n.as_str())
	}

	/// `Time Milestone Elapsed` table: time since start, name, time since previous milestone
	pub fn summary(&self) -> String {
		let width = self.milestones.iter().map(|(n, _)| n.len() + 1).max().unwrap_or(0).max(9);

		let mut out = format!("\n{:>8} {:>w$} {:>8}\n", "Time", "Milestone", "Elapsed", w = width);
		let mut previous = Duration::from_secs(0);
		for (name, at) in &self.milestones {
			let delta = at.saturating_sub(previous);
			previous = *at;
			out.push_str(&format!(
				"{:>8} {:>w$} {:>8}\n",
				hms(at.as_secs()),
				name,
				hms(delta.as_secs()),
				w = width
			));
		}
		out
	}
}

/// Seconds as `HH:MM:SS`
pub fn hms(seconds: u64) -> String {
	let hh = seconds / 3600;
	let mm = (seconds % 3600) / 60;
	let ss = seconds % 60;
	format!("{:02}:{:02}:{:02}", hh, mm, ss)
}


// vim: ts=4
