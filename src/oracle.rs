//! Answer oracle - external service suggesting an option for a multiple-choice question

use ask_llm::{Client as LlmClient, Conversation, Model, Role};
use async_trait::async_trait;
use color_eyre::Result;

/// External decision service consulted once per quiz block
///
/// Returns the raw response text; interpretation (token scan, fallback) belongs to the resolver.
#[async_trait]
pub trait AnswerOracle: Send + Sync {
	async fn ask(&self, question: &str, options: &[String]) -> Result<String>;
}

/// Oracle backed by the LLM service; authenticates through the `CLAUDE_TOKEN` environment variable
#[derive(Clone, Copy, Debug, Default)]
pub struct LlmOracle;

#[async_trait]
impl AnswerOracle for LlmOracle {
	async fn ask(&self, question: &str, options: &[String]) -> Result<String> {
		let mut options_text = String::new();
		for (i, option) in options.iter().enumerate() {
			options_text.push_str(&format!("{}. {}\n", i + 1, option));
		}

		let prompt = format!(
			r#"You are answering a multiple-choice question. Pick the ONE correct answer.

Question:
{question}

Options:
{options_text}
Respond with ONLY the number of the correct option (1, 2, 3, ...)."#
		);

		let client = LlmClient::new().model(Model::Medium).max_tokens(64);

		let mut conv = Conversation::new();
		conv.add(Role::User, prompt);

		let response = client.conversation(&conv).await?;
		tracing::debug!("Oracle raw response: {}", response.text);

		Ok(response.text)
	}
}
