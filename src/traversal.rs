//! Per-module traversal: scan the page, answer quizzes, advance until a finish marker or dead end

use std::time::Duration;

use color_eyre::Result;
use v_utils::{elog, log};

use crate::{
	PageState, QuizBlock, TraversalResult,
	config::AppConfig,
	driver::{DriverError, PageDriver},
	oracle::AnswerOracle,
	resolver::QuizResolver,
};

pub(crate) const QUIZ_BLOCK_SELECTOR: &str = "div.quiz-question";
pub(crate) const QUESTION_TEXT_SELECTOR: &str = "div.field-label p";
pub(crate) const OPTION_LABEL_SELECTOR: &str = "label.quiz-choice p";
pub(crate) const OPTION_CONTROL_SELECTOR: &str = "input.choice-input";
pub(crate) const SUBMIT_SELECTOR: &str = "button[data-bi-name='module-unit-module-assessment-submit']";
pub(crate) const ADVANCE_SELECTOR: &str = "a.button.button-primary.button-filled[data-bi-name='continue']";
pub(crate) const FINISH_ANCHOR_SELECTOR: &str = "a";
pub(crate) const FINISH_MARKER_TEXT: &str = "Go back to finish";

/// Drives one module from its current page to a terminal state
///
/// Working memory is scoped to a single module; the sequencer builds a fresh engine per module.
pub struct TraversalEngine<'a, D, O> {
	driver: &'a D,
	resolver: &'a QuizResolver<O>,
	config: &'a AppConfig,
}

impl<'a, D: PageDriver, O: AnswerOracle> TraversalEngine<'a, D, O> {
	pub fn new(driver: &'a D, resolver: &'a QuizResolver<O>, config: &'a AppConfig) -> Self {
		Self { driver, resolver, config }
	}

	/// Loop scan cycles until the module finishes, dead-ends, or exhausts the cycle cap
	pub async fn run(&self) -> Result<TraversalResult> {
		for cycle in 1..=self.config.max_cycles {
			tokio::time::sleep(Duration::from_secs(self.config.settle_secs)).await;
			log!("Scanning page (cycle {cycle})...");

			if let Err(e) = self.driver.snapshot().await {
				elog!("Failed to save page snapshot: {e}");
			}

			let state = self.scan().await?;
			tracing::debug!("Page state: {}", state.label());

			match state {
				PageState::HasQuizzes(blocks) => {
					self.answer_blocks(&blocks).await?;
					self.submit_answers().await?;
					// Submitting the final assessment is what reveals the finish link, so the
					// terminal checks run again within the same cycle.
					if let Some(result) = self.finish_or_advance().await? {
						return Ok(result);
					}
				}
				PageState::FinishMarkerPresent => return Ok(self.finish()),
				PageState::AdvanceControlPresent(control) =>
					if let Some(result) = self.advance(&control).await? {
						return Ok(result);
					},
				PageState::DeadEnd => return Ok(self.dead_end()),
			}
		}

		elog!("Cycle cap ({}) reached without a terminal page; stopping module", self.config.max_cycles);
		Ok(TraversalResult::StoppedAtCycleLimit)
	}

	/// Classify the current page in fixed priority order: quizzes, finish marker, advance control
	async fn scan(&self) -> Result<PageState<D::Element>> {
		let blocks = self.quiz_blocks().await?;
		if !blocks.is_empty() {
			return Ok(PageState::HasQuizzes(blocks));
		}
		if self.find_finish_marker().await?.is_some() {
			return Ok(PageState::FinishMarkerPresent);
		}
		Ok(match self.find_advance_control().await? {
			Some(control) => PageState::AdvanceControlPresent(control),
			None => PageState::DeadEnd,
		})
	}

	/// Extract well-formed quiz blocks from the page, in appearance order
	async fn quiz_blocks(&self) -> Result<Vec<QuizBlock<D::Element>>> {
		let roots = self.driver.find_all(QUIZ_BLOCK_SELECTOR).await?;
		let mut blocks = Vec::with_capacity(roots.len());
		for root in &roots {
			let Some(label) = self.driver.find_one_in(root, QUESTION_TEXT_SELECTOR).await? else {
				elog!("Quiz block without question text; skipping");
				continue;
			};
			let question = self.driver.text(&label).await?;

			let mut options = Vec::new();
			for option_label in self.driver.find_all_in(root, OPTION_LABEL_SELECTOR).await? {
				options.push(self.driver.text(&option_label).await?);
			}
			let option_controls = self.driver.find_all_in(root, OPTION_CONTROL_SELECTOR).await?;

			if options.is_empty() || options.len() != option_controls.len() {
				elog!("Malformed quiz block ({} option(s), {} control(s)); skipping", options.len(), option_controls.len());
				continue;
			}

			blocks.push(QuizBlock { question, options, option_controls });
		}
		Ok(blocks)
	}

	/// Answer every block exactly once, in appearance order
	async fn answer_blocks(&self, blocks: &[QuizBlock<D::Element>]) -> Result<()> {
		log!("Found {} quiz block(s)", blocks.len());
		for block in blocks {
			tracing::info!("{block}");
			let index = self.resolver.resolve(&block.question, &block.options).await;
			log!("Selected: {}. {}", index + 1, block.options[index]);
			self.driver.click(&block.option_controls[index]).await?;
			tokio::time::sleep(Duration::from_millis(self.config.option_click_delay_ms)).await;
		}
		Ok(())
	}

	/// Click the submit control if one exists; its absence is tolerated
	async fn submit_answers(&self) -> Result<()> {
		match self.driver.find_one(SUBMIT_SELECTOR).await? {
			Some(submit) => {
				self.driver.click(&submit).await?;
				log!("Submitted answers");
				tokio::time::sleep(Duration::from_secs(self.config.submit_wait_secs)).await;
			}
			None => log!("No submit control found."),
		}
		Ok(())
	}

	/// Post-quiz terminal step: finish takes priority over advance
	async fn finish_or_advance(&self) -> Result<Option<TraversalResult>> {
		if self.find_finish_marker().await?.is_some() {
			return Ok(Some(self.finish()));
		}
		match self.find_advance_control().await? {
			Some(control) => self.advance(&control).await,
			None => Ok(Some(self.dead_end())),
		}
	}

	async fn find_finish_marker(&self) -> Result<Option<D::Element>> {
		Ok(self.driver.find_by_text(FINISH_ANCHOR_SELECTOR, FINISH_MARKER_TEXT).await?)
	}

	/// Scroll to the bottom, then poll for the advance control within the configured bounds
	///
	/// Advance controls are frequently rendered off-screen; detection is only reliable after the
	/// scroll, and the control may take a moment to attach.
	async fn find_advance_control(&self) -> Result<Option<D::Element>> {
		self.driver.scroll_to_bottom().await?;
		for attempt in 1..=self.config.advance_poll_attempts {
			if let Some(control) = self.driver.find_one(ADVANCE_SELECTOR).await? {
				return Ok(Some(control));
			}
			tracing::debug!("Advance control not present (attempt {attempt}/{})", self.config.advance_poll_attempts);
			if attempt < self.config.advance_poll_attempts {
				tokio::time::sleep(Duration::from_millis(self.config.advance_poll_delay_ms)).await;
			}
		}
		Ok(None)
	}

	/// Click the advance control; an intercepted click counts as control-absent for this cycle
	async fn advance(&self, control: &D::Element) -> Result<Option<TraversalResult>> {
		match self.driver.click(control).await {
			Ok(()) => {
				log!("Clicked Next...");
				tokio::time::sleep(Duration::from_secs(self.config.advance_wait_secs)).await;
				Ok(None)
			}
			Err(DriverError::ClickIntercepted) => {
				log!("Advance control click intercepted. Possibly end of module.");
				Ok(Some(TraversalResult::StoppedAtDeadEnd))
			}
			Err(e) => Err(e.into()),
		}
	}

	fn finish(&self) -> TraversalResult {
		log!("Reached finish page. Module complete.");
		TraversalResult::CompletedToFinish
	}

	fn dead_end(&self) -> TraversalResult {
		log!("No advance control found. Possibly end of module.");
		TraversalResult::StoppedAtDeadEnd
	}
}
