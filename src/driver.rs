//! Page capability driver - the seam between the traversal core and the browser

use async_trait::async_trait;
use chromiumoxide::{Element, Page};
use thiserror::Error;

/// Failures a driver operation can surface
///
/// Element absence is not an error: `find_one`/`find_one_in` return `Ok(None)` and the caller
/// decides what that page state means.
#[derive(Debug, Error)]
pub enum DriverError {
	/// The click landed on an overlapping element instead of the target
	#[error("click intercepted by an overlapping element")]
	ClickIntercepted,
	/// The browser session is no longer usable; fatal to the whole run
	#[error("browser session failure: {0}")]
	Fatal(String),
}

/// Capabilities the traversal core needs from a page-automation backend
#[async_trait]
pub trait PageDriver: Send + Sync {
	type Element: Send + Sync;

	async fn navigate(&self, url: &str) -> Result<(), DriverError>;
	async fn scroll_to_bottom(&self) -> Result<(), DriverError>;
	async fn find_all(&self, selector: &str) -> Result<Vec<Self::Element>, DriverError>;
	async fn find_one(&self, selector: &str) -> Result<Option<Self::Element>, DriverError>;
	async fn find_all_in(&self, scope: &Self::Element, selector: &str) -> Result<Vec<Self::Element>, DriverError>;
	async fn find_one_in(&self, scope: &Self::Element, selector: &str) -> Result<Option<Self::Element>, DriverError>;
	async fn text(&self, element: &Self::Element) -> Result<String, DriverError>;
	async fn attr(&self, element: &Self::Element, name: &str) -> Result<Option<String>, DriverError>;
	async fn click(&self, element: &Self::Element) -> Result<(), DriverError>;
	async fn release(self) -> Result<(), DriverError>;

	/// Find the first element matching `selector` whose text contains `needle`
	///
	/// CSS cannot express text matching, so this walks the candidates.
	async fn find_by_text(&self, selector: &str, needle: &str) -> Result<Option<Self::Element>, DriverError> {
		for element in self.find_all(selector).await? {
			if self.text(&element).await?.contains(needle) {
				return Ok(Some(element));
			}
		}
		Ok(None)
	}

	/// Persist a debugging snapshot of the current page, if the backend supports it
	async fn snapshot(&self) -> Result<(), DriverError> {
		Ok(())
	}
}

fn fatal(e: chromiumoxide::error::CdpError) -> DriverError {
	DriverError::Fatal(e.to_string())
}

/// Driver backed by a CDP browser page
pub struct CdpDriver {
	page: Page,
	#[cfg(feature = "xdg")]
	session_id: String,
}

impl CdpDriver {
	pub fn new(page: Page) -> Self {
		Self {
			page,
			#[cfg(feature = "xdg")]
			session_id: std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs().to_string(),
		}
	}

	/// Save the current page's HTML under the XDG state dir, labeled by URL
	#[cfg(feature = "xdg")]
	async fn save_page_html(&self) -> Result<(), DriverError> {
		use v_utils::xdg_state_dir;

		let html_dir = xdg_state_dir!("page_snapshots").join(&self.session_id);
		std::fs::create_dir_all(&html_dir).map_err(|e| DriverError::Fatal(e.to_string()))?;

		let url = self.page.url().await.ok().flatten().unwrap_or_default();
		let label = url.replace("https://", "").replace("http://", "");
		let safe_label: String = label.chars().map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect();

		let html = self.page.evaluate("document.documentElement.outerHTML").await.map_err(fatal)?;
		let html_str = html.value().and_then(|v| v.as_str()).unwrap_or("<html></html>");

		let timestamp = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs();
		let filepath = html_dir.join(format!("{}_{}.html", timestamp, safe_label));
		std::fs::write(&filepath, html_str).map_err(|e| DriverError::Fatal(e.to_string()))?;

		tracing::debug!("Saved page HTML to: {}", filepath.display());
		Ok(())
	}
}

#[async_trait]
impl PageDriver for CdpDriver {
	type Element = Element;

	async fn navigate(&self, url: &str) -> Result<(), DriverError> {
		self.page.goto(url).await.map_err(fatal)?;
		Ok(())
	}

	async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
		self.page.evaluate("window.scrollTo(0, document.body.scrollHeight);").await.map_err(fatal)?;
		Ok(())
	}

	async fn find_all(&self, selector: &str) -> Result<Vec<Element>, DriverError> {
		// An empty match set and a query failure are both "nothing there" for detection purposes;
		// session failures still surface through navigate/scroll/click.
		Ok(self.page.find_elements(selector).await.unwrap_or_default())
	}

	async fn find_one(&self, selector: &str) -> Result<Option<Element>, DriverError> {
		Ok(self.page.find_element(selector).await.ok())
	}

	async fn find_all_in(&self, scope: &Element, selector: &str) -> Result<Vec<Element>, DriverError> {
		Ok(scope.find_elements(selector).await.unwrap_or_default())
	}

	async fn find_one_in(&self, scope: &Element, selector: &str) -> Result<Option<Element>, DriverError> {
		Ok(scope.find_element(selector).await.ok())
	}

	async fn text(&self, element: &Element) -> Result<String, DriverError> {
		let text = element.inner_text().await.map_err(fatal)?;
		Ok(text.unwrap_or_default().trim().to_string())
	}

	async fn attr(&self, element: &Element, name: &str) -> Result<Option<String>, DriverError> {
		element.attribute(name).await.map_err(fatal)
	}

	async fn click(&self, element: &Element) -> Result<(), DriverError> {
		element.click().await.map(|_| ()).map_err(|e| {
			// CDP reports an obscured or off-screen node through visibility/quads errors;
			// everything else is a session failure.
			let msg = e.to_string();
			if msg.contains("not clickable") || msg.contains("not visible") || msg.contains("content quads") {
				DriverError::ClickIntercepted
			} else {
				DriverError::Fatal(msg)
			}
		})
	}

	async fn release(self) -> Result<(), DriverError> {
		tracing::debug!("Releasing page driver");
		drop(self.page);
		Ok(())
	}

	async fn snapshot(&self) -> Result<(), DriverError> {
		#[cfg(feature = "xdg")]
		self.save_page_html().await?;
		Ok(())
	}
}

#[cfg(test)]
pub(crate) mod mock {
	use std::sync::{Arc, Mutex};

	use async_trait::async_trait;

	use super::{DriverError, PageDriver};
	use crate::{catalog, traversal};

	#[derive(Clone, Copy, Debug, Eq, PartialEq)]
	pub enum ClickBehavior {
		Clickable,
		Intercepted,
	}

	#[derive(Clone, Debug)]
	pub struct MockQuiz {
		pub question: String,
		pub options: Vec<String>,
		pub control_count: usize,
	}

	impl MockQuiz {
		pub fn new(question: &str, options: &[&str]) -> Self {
			Self {
				question: question.to_string(),
				options: options.iter().map(|s| s.to_string()).collect(),
				control_count: options.len(),
			}
		}
	}

	#[derive(Clone, Debug, Default)]
	pub struct MockCard {
		pub link: Option<String>,
		pub title: Option<String>,
		pub duration: Option<String>,
		pub language: Option<String>,
		pub price_current: Option<String>,
		pub price_original: Option<String>,
	}

	/// One scripted page; clicking a clickable advance/view-more moves to the next page (if any)
	#[derive(Clone, Debug, Default)]
	pub struct MockPage {
		pub quizzes: Vec<MockQuiz>,
		pub submit_present: bool,
		pub finish_present: bool,
		pub finish_after_submit: bool,
		pub advance: Option<ClickBehavior>,
		pub cards: Vec<MockCard>,
		pub view_more: Option<ClickBehavior>,
	}

	#[derive(Debug, Default)]
	pub struct MockState {
		pub pages: Vec<MockPage>,
		pub current: usize,
		pub clicks: Vec<MockElement>,
		pub navigations: Vec<String>,
		pub scrolls: usize,
		pub quiz_scans: usize,
		pub released: bool,
	}

	#[derive(Clone, Debug, Eq, PartialEq)]
	pub enum MockElement {
		QuizRoot(usize),
		Text(String),
		OptionControl { quiz: usize, option: usize },
		Submit,
		FinishAnchor,
		Advance,
		ViewMore,
		Card(usize),
	}

	pub struct MockDriver {
		state: Arc<Mutex<MockState>>,
	}

	impl MockDriver {
		pub fn new(pages: Vec<MockPage>) -> Self {
			Self {
				state: Arc::new(Mutex::new(MockState { pages, ..MockState::default() })),
			}
		}

		pub fn state(&self) -> Arc<Mutex<MockState>> {
			Arc::clone(&self.state)
		}

		fn current_page(state: &MockState) -> MockPage {
			state.pages.get(state.current).cloned().unwrap_or_default()
		}
	}

	#[async_trait]
	impl PageDriver for MockDriver {
		type Element = MockElement;

		async fn navigate(&self, url: &str) -> Result<(), DriverError> {
			let mut state = self.state.lock().unwrap();
			state.navigations.push(url.to_string());
			state.current = 0;
			Ok(())
		}

		async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
			self.state.lock().unwrap().scrolls += 1;
			Ok(())
		}

		async fn find_all(&self, selector: &str) -> Result<Vec<MockElement>, DriverError> {
			let mut state = self.state.lock().unwrap();
			let page = Self::current_page(&state);
			if selector == traversal::QUIZ_BLOCK_SELECTOR {
				state.quiz_scans += 1;
				return Ok((0..page.quizzes.len()).map(MockElement::QuizRoot).collect());
			}
			Ok(match selector {
				traversal::FINISH_ANCHOR_SELECTOR =>
					if page.finish_present {
						vec![MockElement::FinishAnchor]
					} else {
						vec![]
					},
				traversal::ADVANCE_SELECTOR =>
					if page.advance.is_some() {
						vec![MockElement::Advance]
					} else {
						vec![]
					},
				catalog::COURSE_CARD_SELECTOR => (0..page.cards.len()).map(MockElement::Card).collect(),
				catalog::VIEW_MORE_SELECTOR =>
					if page.view_more.is_some() {
						vec![MockElement::ViewMore]
					} else {
						vec![]
					},
				_ => vec![],
			})
		}

		async fn find_one(&self, selector: &str) -> Result<Option<MockElement>, DriverError> {
			if selector == traversal::SUBMIT_SELECTOR {
				let state = self.state.lock().unwrap();
				return Ok(Self::current_page(&state).submit_present.then_some(MockElement::Submit));
			}
			Ok(self.find_all(selector).await?.into_iter().next())
		}

		async fn find_all_in(&self, scope: &MockElement, selector: &str) -> Result<Vec<MockElement>, DriverError> {
			let state = self.state.lock().unwrap();
			let page = Self::current_page(&state);
			Ok(match (scope, selector) {
				(MockElement::QuizRoot(q), traversal::OPTION_LABEL_SELECTOR) => page.quizzes[*q].options.iter().map(|o| MockElement::Text(o.clone())).collect(),
				(MockElement::QuizRoot(q), traversal::OPTION_CONTROL_SELECTOR) => (0..page.quizzes[*q].control_count).map(|o| MockElement::OptionControl { quiz: *q, option: o }).collect(),
				_ => vec![],
			})
		}

		async fn find_one_in(&self, scope: &MockElement, selector: &str) -> Result<Option<MockElement>, DriverError> {
			let state = self.state.lock().unwrap();
			let page = Self::current_page(&state);
			Ok(match (scope, selector) {
				(MockElement::QuizRoot(q), traversal::QUESTION_TEXT_SELECTOR) => Some(MockElement::Text(page.quizzes[*q].question.clone())),
				(MockElement::Card(c), _) => {
					let card = &page.cards[*c];
					let value = match selector {
						catalog::COURSE_TITLE_SELECTOR => &card.title,
						catalog::COURSE_DURATION_SELECTOR => &card.duration,
						catalog::COURSE_LANGUAGE_SELECTOR => &card.language,
						catalog::COURSE_PRICE_SELECTOR => &card.price_current,
						catalog::COURSE_ORIGINAL_PRICE_SELECTOR => &card.price_original,
						_ => &None,
					};
					value.clone().map(MockElement::Text)
				}
				_ => None,
			})
		}

		async fn text(&self, element: &MockElement) -> Result<String, DriverError> {
			Ok(match element {
				MockElement::Text(s) => s.clone(),
				MockElement::FinishAnchor => "Go back to finish".to_string(),
				MockElement::ViewMore => "View More".to_string(),
				_ => String::new(),
			})
		}

		async fn attr(&self, element: &MockElement, name: &str) -> Result<Option<String>, DriverError> {
			if let (MockElement::Card(c), "href") = (element, name) {
				let state = self.state.lock().unwrap();
				return Ok(Self::current_page(&state).cards[*c].link.clone());
			}
			Ok(None)
		}

		async fn click(&self, element: &MockElement) -> Result<(), DriverError> {
			let mut state = self.state.lock().unwrap();
			state.clicks.push(element.clone());
			let current = state.current;
			match element {
				MockElement::Advance => {
					if state.pages[current].advance == Some(ClickBehavior::Intercepted) {
						return Err(DriverError::ClickIntercepted);
					}
					if current + 1 < state.pages.len() {
						state.current += 1;
					}
				}
				MockElement::ViewMore => {
					if state.pages[current].view_more == Some(ClickBehavior::Intercepted) {
						return Err(DriverError::ClickIntercepted);
					}
					if current + 1 < state.pages.len() {
						state.current += 1;
					}
				}
				MockElement::Submit =>
					if state.pages[current].finish_after_submit {
						state.pages[current].finish_present = true;
					},
				_ => {}
			}
			Ok(())
		}

		async fn release(self) -> Result<(), DriverError> {
			self.state.lock().unwrap().released = true;
			Ok(())
		}
	}
}
