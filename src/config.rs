use std::path::{Path, PathBuf};

use color_eyre::{Result, eyre::eyre};
use serde::Deserialize;

use crate::ModuleSpec;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppConfig {
	/// Ordered list of module entry URLs, traversed strictly in order
	#[serde(default)]
	pub modules: Vec<String>,
	/// Wait after opening the first module, covering external session setup (default: 100)
	#[serde(default = "default_first_module_wait_secs")]
	pub first_module_wait_secs: u64,
	/// Wait after opening every later module (default: 10)
	#[serde(default = "default_module_wait_secs")]
	pub module_wait_secs: u64,
	/// Fixed pause before each page scan, letting dynamic content settle (default: 2)
	#[serde(default = "default_settle_secs")]
	pub settle_secs: u64,
	/// Pause after clicking a quiz option control (default: 1000)
	#[serde(default = "default_option_click_delay_ms")]
	pub option_click_delay_ms: u64,
	/// Pause after clicking the submit control (default: 2)
	#[serde(default = "default_submit_wait_secs")]
	pub submit_wait_secs: u64,
	/// Pause after clicking the advance control, before the next scan (default: 3)
	#[serde(default = "default_advance_wait_secs")]
	pub advance_wait_secs: u64,
	/// How many times to look for the advance control after scrolling (default: 3)
	#[serde(default = "default_advance_poll_attempts")]
	pub advance_poll_attempts: u32,
	/// Delay between advance-control polls (default: 1000)
	#[serde(default = "default_advance_poll_delay_ms")]
	pub advance_poll_delay_ms: u64,
	/// Cap on scan cycles per module; a page that never changes state stops here (default: 200)
	#[serde(default = "default_max_cycles")]
	pub max_cycles: u32,
	/// Entry URL of the course catalog for the `catalog` subcommand
	#[serde(default)]
	pub catalog_url: Option<String>,
	/// Append-only JSON-lines output of the catalog scrape (default: courses.jsonl)
	#[serde(default = "default_catalog_output")]
	pub catalog_output: PathBuf,
	/// Wait after opening the catalog page (default: 6)
	#[serde(default = "default_catalog_wait_secs")]
	pub catalog_wait_secs: u64,
	/// Scroll passes per catalog cycle (default: 10)
	#[serde(default = "default_catalog_scroll_steps")]
	pub catalog_scroll_steps: u32,
	/// Delay between catalog scroll passes (default: 1500)
	#[serde(default = "default_catalog_scroll_delay_ms")]
	pub catalog_scroll_delay_ms: u64,
	/// Wait after clicking the load-more control (default: 5)
	#[serde(default = "default_catalog_load_wait_secs")]
	pub catalog_load_wait_secs: u64,
}

fn default_first_module_wait_secs() -> u64 {
	100
}

fn default_module_wait_secs() -> u64 {
	10
}

fn default_settle_secs() -> u64 {
	2
}

fn default_option_click_delay_ms() -> u64 {
	1000
}

fn default_submit_wait_secs() -> u64 {
	2
}

fn default_advance_wait_secs() -> u64 {
	3
}

fn default_advance_poll_attempts() -> u32 {
	3
}

fn default_advance_poll_delay_ms() -> u64 {
	1000
}

fn default_max_cycles() -> u32 {
	200
}

fn default_catalog_output() -> PathBuf {
	PathBuf::from("courses.jsonl")
}

fn default_catalog_wait_secs() -> u64 {
	6
}

fn default_catalog_scroll_steps() -> u32 {
	10
}

fn default_catalog_scroll_delay_ms() -> u64 {
	1500
}

fn default_catalog_load_wait_secs() -> u64 {
	5
}

impl AppConfig {
	/// Load the configuration from a JSON file
	pub fn read(path: &Path) -> Result<Self> {
		let contents = std::fs::read_to_string(path).map_err(|e| eyre!("Failed to read config {}: {}", path.display(), e))?;
		let config = serde_json::from_str(&contents).map_err(|e| eyre!("Failed to parse config {}: {}", path.display(), e))?;
		Ok(config)
	}

	/// Expand the configured URL list into per-module specs; the first module gets the longer wait
	pub fn module_specs(&self) -> Vec<ModuleSpec> {
		self.modules
			.iter()
			.enumerate()
			.map(|(i, url)| ModuleSpec {
				url: url.clone(),
				initial_wait_secs: if i == 0 { self.first_module_wait_secs } else { self.module_wait_secs },
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn minimal_config_gets_documented_defaults() {
		let config: AppConfig = serde_json::from_str(r#"{"modules": ["https://example.org/modules/intro/1-introduction"]}"#).unwrap();
		assert_eq!(config.modules.len(), 1);
		assert_eq!(config.first_module_wait_secs, 100);
		assert_eq!(config.module_wait_secs, 10);
		assert_eq!(config.settle_secs, 2);
		assert_eq!(config.advance_poll_attempts, 3);
		assert_eq!(config.max_cycles, 200);
		assert_eq!(config.catalog_output, PathBuf::from("courses.jsonl"));
		assert!(config.catalog_url.is_none());
	}

	#[test]
	fn module_specs_distinguish_first_position() {
		let config: AppConfig = serde_json::from_str(r#"{"modules": ["a", "b", "c"], "first_module_wait_secs": 40, "module_wait_secs": 5}"#).unwrap();
		let specs = config.module_specs();
		assert_eq!(specs[0].initial_wait_secs, 40);
		assert_eq!(specs[1].initial_wait_secs, 5);
		assert_eq!(specs[2].initial_wait_secs, 5);
	}
}
