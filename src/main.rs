use std::path::PathBuf;

use chromiumoxide::browser::{Browser, BrowserConfig};
use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::eyre};
use futures::StreamExt;
use learn_headless::{catalog::CatalogScraper, config::AppConfig, driver::CdpDriver, oracle::LlmOracle, resolver::QuizResolver, sequencer::ModuleSequencer};
use tracing_subscriber::EnvFilter;
use v_utils::elog;

#[derive(Debug, Parser)]
#[command(name = "learn_headless")]
#[command(about = "Automated traversal of linked e-learning modules", long_about = None)]
struct Args {
	/// Run with visible browser window (non-headless mode)
	#[arg(long)]
	visible: bool,

	/// Path to the JSON configuration file
	#[arg(short, long, default_value = "learn_headless.json")]
	config: PathBuf,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Traverse the configured modules, answering quizzes along the way (default)
	Modules,
	/// Scrape the course catalog into the configured output file
	Catalog,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

	let args = Args::parse();
	let config = AppConfig::read(&args.config)?;
	let command = args.command.unwrap_or(Command::Modules);

	if matches!(command, Command::Modules) && std::env::var("CLAUDE_TOKEN").is_err() {
		return Err(eyre!("CLAUDE_TOKEN is not set; the answer oracle cannot authenticate"));
	}

	// Configure browser based on visibility flag
	let browser_config = if args.visible {
		BrowserConfig::builder()
			.with_head() // Visible browser with UI
			.build()
			.map_err(|e| eyre!("Failed to build browser config: {}", e))?
	} else {
		BrowserConfig::builder()
			.build() // Headless mode
			.map_err(|e| eyre!("Failed to build browser config: {}", e))?
	};

	let (mut browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| eyre!("Failed to launch browser: {}", e))?;

	// Spawn a task to handle browser events (suppress errors as they're mostly noise)
	let handle = tokio::spawn(async move {
		while let Some(_event) = handler.next().await {
			// Silently consume events to prevent the browser from hanging
		}
	});

	let page = browser.new_page("about:blank").await.map_err(|e| eyre!("Failed to create new page: {}", e))?;
	let driver = CdpDriver::new(page);

	let run_result = match command {
		Command::Modules => {
			let resolver = QuizResolver::new(LlmOracle);
			ModuleSequencer::new(driver, resolver, config).run().await
		}
		Command::Catalog => CatalogScraper::new(driver, config).run().await,
	};

	// Tear the browser down on success and failure alike
	if let Err(e) = browser.close().await {
		elog!("Failed to close browser: {}", e);
	}
	handle.abort();

	run_result
}
