//! Course catalog scraping - the pagination-and-dedup sibling of the module traversal
//!
//! Same scan / detect-control / click / rescan shape as the traversal core, with an append-only
//! store keyed by course link instead of quiz answering.

use std::{
	collections::HashSet,
	path::{Path, PathBuf},
	time::Duration,
};

use color_eyre::{Result, eyre::eyre};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use v_utils::log;

use crate::{
	config::AppConfig,
	driver::{DriverError, PageDriver},
};

pub(crate) const COURSE_CARD_SELECTOR: &str = r#"a[class*="progressCard"]"#;
pub(crate) const COURSE_TITLE_SELECTOR: &str = ".progress-title";
pub(crate) const COURSE_DURATION_SELECTOR: &str = "svg.lucide-clock3 ~ span";
pub(crate) const COURSE_LANGUAGE_SELECTOR: &str = "svg.lucide-globe ~ span";
pub(crate) const COURSE_PRICE_SELECTOR: &str = r#"span[class*="text-primary"]"#;
pub(crate) const COURSE_ORIGINAL_PRICE_SELECTOR: &str = "del";
pub(crate) const VIEW_MORE_SELECTOR: &str = "button";
pub(crate) const VIEW_MORE_TEXT: &str = "View More";

/// One course card as scraped from the catalog; fields the page does not expose are `"N/A"`
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CourseRecord {
	pub title: String,
	pub link: String,
	pub duration: String,
	pub language: String,
	pub price_current: String,
	pub price_original: String,
}

/// Append-only JSON-lines store, deduplicated by course link
pub struct CourseStore {
	path: PathBuf,
	seen: HashSet<String>,
}

impl CourseStore {
	/// Open the store, loading already-persisted links for dedup
	pub async fn open(path: &Path) -> Result<Self> {
		let seen = match tokio::fs::read_to_string(path).await {
			Ok(contents) => contents
				.lines()
				.filter(|line| !line.trim().is_empty())
				.filter_map(|line| serde_json::from_str::<CourseRecord>(line).ok())
				.map(|record| record.link)
				.collect(),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
			Err(e) => return Err(eyre!("Failed to read course store {}: {}", path.display(), e)),
		};
		Ok(Self { path: path.to_path_buf(), seen })
	}

	/// Append records whose link has not been seen yet; returns how many were written
	pub async fn append_new(&mut self, records: Vec<CourseRecord>) -> Result<usize> {
		let mut lines = String::new();
		let mut added = 0;
		for record in records {
			if !self.seen.insert(record.link.clone()) {
				continue;
			}
			lines.push_str(&serde_json::to_string(&record)?);
			lines.push('\n');
			added += 1;
		}

		if added > 0 {
			let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await.map_err(|e| eyre!("Failed to open course store {}: {}", self.path.display(), e))?;
			file.write_all(lines.as_bytes()).await?;
		}
		Ok(added)
	}
}

/// Scrapes the configured catalog page until its load-more control runs out
pub struct CatalogScraper<D> {
	driver: D,
	config: AppConfig,
}

impl<D: PageDriver> CatalogScraper<D> {
	pub fn new(driver: D, config: AppConfig) -> Self {
		Self { driver, config }
	}

	/// Scrape the catalog, then release the driver on every exit path
	pub async fn run(self) -> Result<()> {
		let outcome = self.scrape().await;

		let CatalogScraper { driver, .. } = self;
		let released = driver.release().await;

		let total = outcome?;
		released?;

		log!("Done! Total new courses added: {total}");
		Ok(())
	}

	async fn scrape(&self) -> Result<usize> {
		let url = self.config.catalog_url.as_deref().ok_or_else(|| eyre!("catalog_url is not configured"))?;
		self.driver.navigate(url).await?;
		log!("Opened catalog: {url}");
		tokio::time::sleep(Duration::from_secs(self.config.catalog_wait_secs)).await;

		let mut store = CourseStore::open(&self.config.catalog_output).await?;
		let mut total_new = 0;

		loop {
			// Staged scroll; the card grid keeps growing as it comes into view.
			for _ in 0..self.config.catalog_scroll_steps {
				self.driver.scroll_to_bottom().await?;
				tokio::time::sleep(Duration::from_millis(self.config.catalog_scroll_delay_ms)).await;
			}

			let records = self.extract_cards().await?;
			log!("Found {} course card(s) on screen", records.len());

			let added = store.append_new(records).await?;
			if added > 0 {
				log!("Saved {added} new course(s)");
			} else {
				log!("No new courses found in this round.");
			}
			total_new += added;

			match self.find_view_more().await? {
				Some(control) => {
					if !self.click_view_more(&control).await? {
						break;
					}
					tokio::time::sleep(Duration::from_secs(self.config.catalog_load_wait_secs)).await;
				}
				None => {
					log!("No more load-more control.");
					break;
				}
			}
		}

		Ok(total_new)
	}

	async fn extract_cards(&self) -> Result<Vec<CourseRecord>> {
		let cards = self.driver.find_all(COURSE_CARD_SELECTOR).await?;
		let mut records = Vec::with_capacity(cards.len());
		for card in &cards {
			// A card without a link cannot be keyed for dedup.
			let Some(link) = self.driver.attr(card, "href").await? else {
				tracing::debug!("Skipping course card without href");
				continue;
			};
			records.push(CourseRecord {
				title: self.text_or_na(card, COURSE_TITLE_SELECTOR).await?,
				link,
				duration: self.text_or_na(card, COURSE_DURATION_SELECTOR).await?,
				language: self.text_or_na(card, COURSE_LANGUAGE_SELECTOR).await?,
				price_current: self.text_or_na(card, COURSE_PRICE_SELECTOR).await?,
				price_original: self.text_or_na(card, COURSE_ORIGINAL_PRICE_SELECTOR).await?,
			});
		}
		Ok(records)
	}

	async fn text_or_na(&self, scope: &D::Element, selector: &str) -> Result<String> {
		Ok(match self.driver.find_one_in(scope, selector).await? {
			Some(element) => {
				let text = self.driver.text(&element).await?;
				if text.is_empty() { "N/A".to_string() } else { text }
			}
			None => "N/A".to_string(),
		})
	}

	/// Bounded poll for the load-more control, matched by its text
	async fn find_view_more(&self) -> Result<Option<D::Element>> {
		for attempt in 1..=self.config.advance_poll_attempts {
			if let Some(control) = self.driver.find_by_text(VIEW_MORE_SELECTOR, VIEW_MORE_TEXT).await? {
				return Ok(Some(control));
			}
			if attempt < self.config.advance_poll_attempts {
				tokio::time::sleep(Duration::from_millis(self.config.advance_poll_delay_ms)).await;
			}
		}
		Ok(None)
	}

	/// Click the load-more control, retrying once after a scroll nudge if intercepted
	///
	/// Returns false when the control stays obscured; the scrape stops there.
	async fn click_view_more(&self, control: &D::Element) -> Result<bool> {
		match self.driver.click(control).await {
			Ok(()) => {
				log!("Clicked View More...");
				Ok(true)
			}
			Err(DriverError::ClickIntercepted) => {
				log!("Click intercepted, retrying after scroll adjustment...");
				self.driver.scroll_to_bottom().await?;
				tokio::time::sleep(Duration::from_millis(self.config.catalog_scroll_delay_ms)).await;
				match self.driver.click(control).await {
					Ok(()) => {
						log!("Clicked View More...");
						Ok(true)
					}
					Err(DriverError::ClickIntercepted) => {
						log!("Load-more control still obscured; stopping.");
						Ok(false)
					}
					Err(e) => Err(e.into()),
				}
			}
			Err(e) => Err(e.into()),
		}
	}
}
