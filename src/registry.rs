// src/registry.rs

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const REGISTRY_API: &str = "https://api.company-information.service.gov.uk";
const DOCUMENT_API_HOST: &str = "https://document-api.company-information.service.gov.uk";

const PAGE_SIZE: usize = 100;
const RETRIES: u32 = 3;

/// Filing descriptions / type codes that indicate full audited accounts.
const AUDITED_DESCRIPTION_HINTS: &[&str] = &["audited", "full accounts", "group of companies accounts"];
const AUDITED_TYPE_CODES: &[&str] = &["aa", "aa01", "aa02", "aa03", "aa04", "aa06", "aa07"];

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyHit {
    #[serde(default)]
    pub company_number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company_status: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<CompanyHit>,
    #[serde(default)]
    total_results: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Filing {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub filing_type: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub links: FilingLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilingLinks {
    #[serde(default)]
    pub document_metadata: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FilingHistoryPage {
    #[serde(default)]
    items: Vec<Filing>,
    #[serde(default)]
    total_count: i64,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentMetadata {
    #[serde(default)]
    links: DocumentLinks,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentLinks {
    #[serde(default)]
    document: Option<String>,
}

/// Thin client for the company registry: search, filing history,
/// document resolution and download. Every request retries transient
/// failures with linear backoff and throttles between pages; terminal
/// failures degrade to "nothing found" rather than erroring, so one
/// flaky company never sinks the run.
pub struct RegistryClient {
    http: Client,
    api_key: String,
    throttle: Duration,
}

impl RegistryClient {
    pub fn new(api_key: String, throttle_ms: u64) -> Self {
        Self {
            http: Client::new(),
            api_key,
            throttle: Duration::from_millis(throttle_ms),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Option<T> {
        for attempt in 1..=RETRIES {
            let response = self
                .http
                .get(url)
                .basic_auth(&self.api_key, Some(""))
                .query(params)
                .timeout(Duration::from_secs(60))
                .send()
                .await;
            match response {
                Ok(resp) if resp.status() == StatusCode::OK => {
                    return resp.json::<T>().await.ok();
                }
                Ok(resp) if is_retryable(resp.status()) => {
                    backoff(attempt).await;
                }
                Ok(resp) => {
                    warn!(url, status = %resp.status(), "Registry request rejected");
                    return None;
                }
                Err(e) => {
                    if attempt == RETRIES {
                        warn!(url, error = %e, "Registry request failed");
                        return None;
                    }
                    backoff(attempt).await;
                }
            }
        }
        None
    }

    /// Search for active companies matching the query, up to `limit`.
    pub async fn search_companies(&self, query: &str, limit: usize) -> Vec<CompanyHit> {
        let mut items = Vec::new();
        let mut start_index = 0usize;
        while items.len() < limit {
            let page: SearchPage = match self
                .get_json(
                    &format!("{REGISTRY_API}/search/companies"),
                    &[
                        ("q", query.to_string()),
                        ("start_index", start_index.to_string()),
                        ("items_per_page", PAGE_SIZE.to_string()),
                    ],
                )
                .await
            {
                Some(page) => page,
                None => break,
            };
            if page.items.is_empty() {
                break;
            }
            for hit in page.items {
                if hit.company_status == "active" {
                    items.push(hit);
                    if items.len() >= limit {
                        break;
                    }
                }
            }
            start_index += PAGE_SIZE;
            if start_index as i64 >= page.total_results {
                break;
            }
            tokio::time::sleep(self.throttle).await;
        }
        items.truncate(limit);
        items
    }

    /// One best active match per target name: exact/substring title
    /// matches preferred, de-duplicated by company number.
    pub async fn pick_target_companies(&self, targets: &[String]) -> Vec<CompanyHit> {
        let mut selected = Vec::new();
        let mut seen_numbers = HashSet::new();

        for query in targets {
            let candidates = self.search_companies(query, 20).await;
            if candidates.is_empty() {
                warn!(query = %query, "No active registry match");
                continue;
            }

            let query_low = query.to_lowercase();
            let chosen = candidates
                .iter()
                .find(|c| c.title.to_lowercase().contains(&query_low))
                .or_else(|| candidates.first());

            if let Some(company) = chosen {
                if !company.company_number.is_empty()
                    && seen_numbers.insert(company.company_number.clone())
                {
                    info!(
                        query = %query,
                        company = %company.title,
                        number = %company.company_number,
                        "Target company resolved"
                    );
                    selected.push(company.clone());
                }
            }
        }
        selected
    }

    /// The company's most recent accounts filings, newest first as the
    /// registry returns them, capped at `limit`. Unless
    /// `include_all_accounts` is set, only filings that look like full
    /// audited accounts are kept.
    pub async fn accounts_filings(
        &self,
        company_number: &str,
        limit: usize,
        include_all_accounts: bool,
    ) -> Vec<Filing> {
        let mut out: Vec<Filing> = Vec::new();
        let mut seen_keys = HashSet::new();
        let mut start_index = 0usize;

        while out.len() < limit {
            let page: FilingHistoryPage = match self
                .get_json(
                    &format!("{REGISTRY_API}/company/{company_number}/filing-history"),
                    &[
                        ("start_index", start_index.to_string()),
                        ("items_per_page", PAGE_SIZE.to_string()),
                    ],
                )
                .await
            {
                Some(page) => page,
                None => break,
            };
            if page.items.is_empty() {
                break;
            }

            for filing in page.items {
                if filing.category != "accounts" {
                    continue;
                }
                if !include_all_accounts && !is_probably_full_audited(&filing) {
                    continue;
                }
                let key = (
                    filing.date.clone(),
                    filing.filing_type.clone(),
                    filing.links.document_metadata.clone().unwrap_or_default(),
                );
                if !seen_keys.insert(key) {
                    continue;
                }
                out.push(filing);
                if out.len() >= limit {
                    break;
                }
            }

            start_index += PAGE_SIZE;
            if start_index as i64 >= page.total_count {
                break;
            }
            tokio::time::sleep(self.throttle).await;
        }
        out
    }

    /// Resolve a filing's document-metadata URL to a direct PDF URL.
    pub async fn document_pdf_url(&self, document_metadata_url: &str) -> Option<String> {
        let meta: DocumentMetadata = self.get_json(document_metadata_url, &[]).await?;
        let link = meta.links.document?;
        if link.starts_with("http") {
            Some(link)
        } else {
            Some(format!("{DOCUMENT_API_HOST}{link}"))
        }
    }

    /// Download a filing PDF to disk. False on any terminal failure.
    pub async fn download_pdf(&self, pdf_url: &str, output_path: &Path) -> bool {
        if let Some(parent) = output_path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return false;
            }
        }
        for attempt in 1..=RETRIES {
            let response = self
                .http
                .get(pdf_url)
                .basic_auth(&self.api_key, Some(""))
                .header("Accept", "application/pdf")
                .timeout(Duration::from_secs(120))
                .send()
                .await;
            match response {
                Ok(resp) if resp.status() == StatusCode::OK => {
                    let Ok(bytes) = resp.bytes().await else {
                        return false;
                    };
                    if bytes.is_empty() {
                        return false;
                    }
                    return std::fs::write(output_path, &bytes).is_ok();
                }
                Ok(resp) if is_retryable(resp.status()) => {
                    backoff(attempt).await;
                }
                Ok(resp) => {
                    warn!(url = pdf_url, status = %resp.status(), "Document download rejected");
                    return false;
                }
                Err(e) => {
                    if attempt == RETRIES {
                        warn!(url = pdf_url, error = %e, "Document download failed");
                        return false;
                    }
                    backoff(attempt).await;
                }
            }
        }
        false
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

async fn backoff(attempt: u32) {
    tokio::time::sleep(Duration::from_secs_f64(1.2 * attempt as f64)).await;
}

fn is_probably_full_audited(filing: &Filing) -> bool {
    let desc = filing.description.to_lowercase();
    AUDITED_DESCRIPTION_HINTS.iter().any(|hint| desc.contains(hint))
        || AUDITED_TYPE_CODES.contains(&filing.filing_type.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filing(description: &str, filing_type: &str) -> Filing {
        Filing {
            category: "accounts".to_string(),
            description: description.to_string(),
            filing_type: filing_type.to_string(),
            date: "2023-06-30".to_string(),
            links: FilingLinks::default(),
        }
    }

    #[test]
    fn audited_accounts_recognized_by_description_or_type() {
        assert!(is_probably_full_audited(&filing("Group of companies accounts", "zz")));
        assert!(is_probably_full_audited(&filing("Audited abridged accounts", "zz")));
        assert!(is_probably_full_audited(&filing("something else", "AA")));
        assert!(!is_probably_full_audited(&filing("confirmation statement", "cs01")));
    }
}
