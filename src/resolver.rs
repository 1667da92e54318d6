//! Quiz resolver - turns a question and its options into a selectable option index

use regex::Regex;
use v_utils::elog;

use crate::oracle::AnswerOracle;

pub struct QuizResolver<O> {
	oracle: O,
}

impl<O> QuizResolver<O> {
	pub fn new(oracle: O) -> Self {
		Self { oracle }
	}

	#[cfg(test)]
	pub(crate) fn oracle(&self) -> &O {
		&self.oracle
	}
}

impl<O: AnswerOracle> QuizResolver<O> {
	/// Resolve one quiz block to a zero-based option index
	///
	/// Degraded-mode policy: an oracle failure or a response without any option token falls back
	/// to the first option, so traversal always makes progress.
	pub async fn resolve(&self, question: &str, options: &[String]) -> usize {
		match self.oracle.ask(question, options).await {
			Ok(response) => match parse_option_index(&response, options.len()) {
				Some(index) => index,
				None => {
					elog!("No option token in oracle response {:?}, falling back to first option", response.trim());
					0
				}
			},
			Err(e) => {
				elog!("Oracle call failed: {e}; falling back to first option");
				0
			}
		}
	}
}

/// Scan for option numbers 1..=n in ascending order; the lowest number present as a standalone
/// token wins, regardless of where it appears in the response
fn parse_option_index(response: &str, option_count: usize) -> Option<usize> {
	for number in 1..=option_count {
		let token = Regex::new(&format!(r"\b{number}\b")).ok()?;
		if token.is_match(response) {
			return Some(number - 1);
		}
	}
	None
}
