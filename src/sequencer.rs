//! Module sequencer - walks the configured module list strictly in order

use std::time::Duration;

use color_eyre::Result;
use v_utils::log;

use crate::{ModuleSpec, config::AppConfig, driver::PageDriver, oracle::AnswerOracle, resolver::QuizResolver, traversal::TraversalEngine};

/// Owns the page driver for the lifetime of a run and releases it on every exit path
pub struct ModuleSequencer<D, O> {
	driver: D,
	resolver: QuizResolver<O>,
	config: AppConfig,
}

impl<D: PageDriver, O: AnswerOracle> ModuleSequencer<D, O> {
	pub fn new(driver: D, resolver: QuizResolver<O>, config: AppConfig) -> Self {
		Self { driver, resolver, config }
	}

	/// Traverse every configured module, then release the driver
	///
	/// The driver is released whether traversal succeeded or failed; a traversal error is
	/// surfaced after the release attempt.
	pub async fn run(self) -> Result<()> {
		let modules = self.config.module_specs();
		let outcome = self.traverse_all(&modules).await;

		let ModuleSequencer { driver, .. } = self;
		let released = driver.release().await;

		outcome?;
		released?;

		log!("All modules completed");
		Ok(())
	}

	async fn traverse_all(&self, modules: &[ModuleSpec]) -> Result<()> {
		let total = modules.len();
		for (i, module) in modules.iter().enumerate() {
			self.driver.navigate(&module.url).await?;
			log!("Opened module ({}/{}): {}", i + 1, total, module.url);
			tokio::time::sleep(Duration::from_secs(module.initial_wait_secs)).await;

			let result = TraversalEngine::new(&self.driver, &self.resolver, &self.config).run().await?;
			// Both outcomes proceed to the next module; partial completion is acceptable.
			log!("Module ({}/{}) {}", i + 1, total, result);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		driver::mock::{MockDriver, MockPage},
		oracle::mock::MockOracle,
	};

	fn test_config(modules: &[&str]) -> AppConfig {
		AppConfig {
			modules: modules.iter().map(|m| m.to_string()).collect(),
			max_cycles: 10,
			advance_poll_attempts: 1,
			..AppConfig::default()
		}
	}

	#[tokio::test]
	async fn empty_module_list_completes_with_acquire_release_only() {
		let driver = MockDriver::new(vec![]);
		let state = driver.state();
		let resolver = QuizResolver::new(MockOracle::answering("1"));

		ModuleSequencer::new(driver, resolver, test_config(&[])).run().await.unwrap();

		let state = state.lock().unwrap();
		assert!(state.released);
		assert!(state.navigations.is_empty());
		assert!(state.clicks.is_empty());
	}

	#[tokio::test]
	async fn modules_are_visited_strictly_in_order() {
		let driver = MockDriver::new(vec![MockPage { finish_present: true, ..MockPage::default() }]);
		let state = driver.state();
		let resolver = QuizResolver::new(MockOracle::answering("1"));

		ModuleSequencer::new(driver, resolver, test_config(&["https://one", "https://two"])).run().await.unwrap();

		let state = state.lock().unwrap();
		assert_eq!(state.navigations, vec!["https://one".to_string(), "https://two".to_string()]);
		assert!(state.released);
	}

	#[tokio::test]
	async fn dead_end_does_not_stop_the_sequence() {
		// First module dead-ends; the second must still be visited.
		let driver = MockDriver::new(vec![MockPage::default()]);
		let state = driver.state();
		let resolver = QuizResolver::new(MockOracle::answering("1"));

		ModuleSequencer::new(driver, resolver, test_config(&["https://one", "https://two"])).run().await.unwrap();

		assert_eq!(state.lock().unwrap().navigations.len(), 2);
	}
}
