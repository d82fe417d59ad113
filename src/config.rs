// src/config.rs

use serde::Deserialize;
use std::{fs, path::Path};
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistrySection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub sampling: SamplingSection,
    #[serde(default)]
    pub ocr: OcrSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Deserialize)]
pub struct RegistrySection {
    /// API key; the CH_API_KEY environment variable takes precedence.
    #[serde(default)]
    pub api_key: String,
    /// File whose first non-empty, non-comment line is the API key.
    #[serde(default = "default_api_key_file")]
    pub api_key_file: String,
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct PipelineSection {
    /// Registry search query used when no target companies are given.
    #[serde(default = "default_company_query")]
    pub company_query: String,
    #[serde(default = "default_max_companies")]
    pub max_companies: usize,
    #[serde(default = "default_max_filings")]
    pub max_filings_per_company: usize,
    #[serde(default)]
    pub include_all_accounts: bool,
    /// When non-empty, these names are resolved one-by-one instead of
    /// running the broad search query.
    #[serde(default)]
    pub target_companies: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SamplingSection {
    #[serde(default = "default_front_pages")]
    pub front_pages: usize,
    #[serde(default = "default_tail_pages")]
    pub tail_pages: usize,
    #[serde(default = "default_tail_stride")]
    pub tail_stride: usize,
}

#[derive(Debug, Deserialize)]
pub struct OcrSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Hard cap on pages recognized per document.
    #[serde(default = "default_ocr_max_pages")]
    pub max_pages: usize,
}

#[derive(Debug, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_history_csv")]
    pub history_csv: String,
    #[serde(default = "default_shortlist_csv")]
    pub shortlist_csv: String,
    #[serde(default = "default_shortlist_json")]
    pub shortlist_json: String,
}

fn default_api_key_file() -> String {
    "ch_api_key.txt".to_string()
}
fn default_throttle_ms() -> u64 {
    250
}
fn default_company_query() -> String {
    "plc".to_string()
}
fn default_max_companies() -> usize {
    100
}
fn default_max_filings() -> usize {
    5
}
fn default_front_pages() -> usize {
    25
}
fn default_tail_pages() -> usize {
    80
}
fn default_tail_stride() -> usize {
    3
}
fn default_true() -> bool {
    true
}
fn default_ocr_max_pages() -> usize {
    80
}
fn default_download_dir() -> String {
    "uk_accounts_pdfs".to_string()
}
fn default_db_path() -> String {
    "radar/filings.db".to_string()
}
fn default_history_csv() -> String {
    "tender_history.csv".to_string()
}
fn default_shortlist_csv() -> String {
    "tender_shortlist.csv".to_string()
}
fn default_shortlist_json() -> String {
    "tender_shortlist.json".to_string()
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_key_file: default_api_key_file(),
            throttle_ms: default_throttle_ms(),
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            company_query: default_company_query(),
            max_companies: default_max_companies(),
            max_filings_per_company: default_max_filings(),
            include_all_accounts: false,
            target_companies: Vec::new(),
        }
    }
}

impl Default for SamplingSection {
    fn default() -> Self {
        Self {
            front_pages: default_front_pages(),
            tail_pages: default_tail_pages(),
            tail_stride: default_tail_stride(),
        }
    }
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_pages: default_ocr_max_pages(),
        }
    }
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            db_path: default_db_path(),
            history_csv: default_history_csv(),
            shortlist_csv: default_shortlist_csv(),
            shortlist_json: default_shortlist_json(),
        }
    }
}

impl Config {
    /// Load from TOML; a missing file means "all defaults", which is a
    /// usable configuration as long as a credential is available.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No config file — using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Credential precedence: environment, then config value, then the
    /// first usable line of the key file.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var("CH_API_KEY") {
            if !key.trim().is_empty() {
                return Some(key.trim().to_string());
            }
        }
        if !self.registry.api_key.trim().is_empty() {
            return Some(self.registry.api_key.trim().to_string());
        }
        let content = fs::read_to_string(&self.registry.api_key_file).ok()?;
        content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
    }
}
