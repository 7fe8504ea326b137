//! Interactive questions to the operator

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub trait Prompt: Send {
	/// Free-form answer; `None` when input is closed
	fn ask(&mut self, question: &str) -> Option<String>;

	/// Yes/no question, defaulting to no
	fn confirm(&mut self, question: &str) -> bool {
		match self.ask(&format!("{} (y/N)?: ", question)) {
			Some(answer) => answer.contains('y') || answer.contains('Y'),
			None => false,
		}
	}
}

/// Reads answers from the terminal
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
	fn ask(&mut self, question: &str) -> Option<String> {
		print!("{}", question);
		io::stdout().flush().ok()?;

		let mut line = String::new();
		match io::stdin().lock().read_line(&mut line) {
			Ok(0) | Err(_) => None,
			Ok(_) => Some(line.trim_end().to_string()),
		}
	}
}

/// Replays canned answers, then behaves like a closed input
#[derive(Debug, Default)]
pub struct Scripted {
	answers: VecDeque<String>,
	/// Every question asked so far
	pub asked: Vec<String>,
}

impl Scripted {
	pub fn new(answers: &[&str]) -> Self {
		Scripted { answers: answers.iter().map(|a| a.to_string()).collect(), asked: Vec::new() }
	}
}

impl Prompt for Scripted {
	fn ask(&mut self, question: &str) -> Option<String> {
		self.asked.push(question.to_string());
		self.answers.pop_front()
	}
}


// vim: ts=4
