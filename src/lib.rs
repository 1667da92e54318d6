use std::fmt;

pub mod catalog;
pub mod config;
pub mod driver;
pub mod oracle;
pub mod resolver;
pub mod sequencer;
pub mod traversal;

/// One linear unit of training content, entered at a fixed URL
#[derive(Clone, Debug)]
pub struct ModuleSpec {
	/// Entry URL of the module's first page
	pub url: String,
	/// Seconds to wait after navigation before the first scan
	pub initial_wait_secs: u64,
}

/// One graded multiple-choice question found on a page, together with its selectable option controls
///
/// Page-scoped and ephemeral: handles are only valid within the scan cycle that produced them.
/// Invariant: `options.len() == option_controls.len() > 0`; extraction skips blocks that violate it.
#[derive(Debug)]
pub struct QuizBlock<E> {
	/// The question text/prompt
	pub question: String,
	/// Option texts, in page order
	pub options: Vec<String>,
	/// Selectable control handles, parallel to `options`
	pub option_controls: Vec<E>,
}

impl<E> fmt::Display for QuizBlock<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "{}", self.question)?;
		writeln!(f)?;
		for (i, option) in self.options.iter().enumerate() {
			writeln!(f, "( ) {}. {}", i + 1, option)?;
		}
		Ok(())
	}
}

/// Classification of one page-scan cycle
///
/// Exactly one variant governs each cycle's action; detection runs in fixed priority order
/// (quizzes, then finish marker, then advance control).
#[derive(Debug)]
pub enum PageState<E> {
	/// One or more well-formed quiz blocks are on the page
	HasQuizzes(Vec<QuizBlock<E>>),
	/// The end-of-module marker is present
	FinishMarkerPresent,
	/// A continue/next control is present (found after scrolling to the bottom)
	AdvanceControlPresent(E),
	/// Neither quizzes nor finish nor advance; traversal cannot proceed
	DeadEnd,
}

impl<E> PageState<E> {
	pub fn label(&self) -> &'static str {
		match self {
			PageState::HasQuizzes(_) => "has-quizzes",
			PageState::FinishMarkerPresent => "finish-marker",
			PageState::AdvanceControlPresent(_) => "advance-control",
			PageState::DeadEnd => "dead-end",
		}
	}
}

/// Per-module traversal outcome; logged by the sequencer and discarded
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraversalResult {
	/// The finish marker was reached
	CompletedToFinish,
	/// A page offered neither quizzes to answer, a finish marker, nor an advance control
	StoppedAtDeadEnd,
	/// The per-module cycle cap was exhausted without reaching a terminal page
	StoppedAtCycleLimit,
}

impl fmt::Display for TraversalResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TraversalResult::CompletedToFinish => write!(f, "completed to finish"),
			TraversalResult::StoppedAtDeadEnd => write!(f, "stopped at dead end"),
			TraversalResult::StoppedAtCycleLimit => write!(f, "stopped at cycle limit"),
		}
	}
}
