// src/heuristics/fee.rs

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which rule family produced the fee figure. "Table" means a fee row
/// under (or near) a remuneration header; "text" means a sentence-level
/// statutory phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeMethod {
    Table,
    Text,
    None,
}

impl FeeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeMethod::Table => "table",
            FeeMethod::Text => "text",
            FeeMethod::None => "none",
        }
    }
}

/// Lines after a remuneration header scanned for a fee row.
const HEADER_WINDOW_LINES: usize = 40;

/// Phrases marking the statutory-audit line of a remuneration table.
const PRIMARY_PHRASES: &[&str] = &[
    "audit of the",
    "audit of group accounts",
    "audit of the company",
    "audit of financial statements",
    "audit of the annual accounts",
    "fees payable to the company",
    "fees payable to the group's auditor",
    "statutory audit",
];

/// Rows that look statutory but bill something else.
const EXCLUDE_PHRASES: &[&str] = &[
    "other services",
    "other assurance",
    "tax",
    "non-audit",
    "subsidiaries",
    "pension",
    "total",
];

/// Recovers the statutory audit fee from filing text.
///
/// Three stages, first hit wins: fee rows inside a window below an
/// "auditors' remuneration" header (with adjacent lines merged to heal
/// figures split across a page-layout boundary), fee rows anywhere, and
/// finally sentence-level statutory phrasing.
pub struct FeeExtractor {
    number_token: Regex,
    sentence_patterns: Vec<Regex>,
    currency_prefix: Regex,
    plain_number: Regex,
}

impl Default for FeeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeExtractor {
    pub fn new() -> Self {
        let sentence_patterns = [
            r"(?i)fees?\s+payable\s+to\s+the\s+(?:group'?s\s+)?(?:external\s+)?auditor[^\n\r]{0,120}?audit[^\n\r]{0,120}?accounts?[^\n\r]{0,60}?([£$€]?\s*\(?\d[\d,]*(?:\.\d+)?\)?)",
            r"(?i)audit(?:or)?(?:s)?\s+(?:fee|fees|remuneration)[^\n\r]{0,120}?([£$€]?\s*\(?\d[\d,]*(?:\.\d+)?\)?)",
            r"(?i)statutory\s+audit[^\n\r]{0,100}?([£$€]?\s*\(?\d[\d,]*(?:\.\d+)?\)?)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect();
        Self {
            number_token: Regex::new(r"\(?\d[\d,]*(?:\.\d+)?\)?").unwrap(),
            sentence_patterns,
            currency_prefix: Regex::new(r"^[£$€]\s*").unwrap(),
            plain_number: Regex::new(r"-?\d+(?:\.\d+)?").unwrap(),
        }
    }

    pub fn extract(&self, text: &str) -> (String, FeeMethod) {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        // Stage 1: header-anchored table rows.
        for idx in header_indices(&lines) {
            let window = &lines[idx..lines.len().min(idx + HEADER_WINDOW_LINES)];
            for line in window {
                if is_fee_row(line) {
                    if let Some(value) = self.first_number_token(line) {
                        return (value, FeeMethod::Table);
                    }
                }
            }
            // Figures sometimes land on the line after their label.
            for pair in window.windows(2) {
                let merged = format!("{} {}", pair[0], pair[1]);
                if is_fee_row(&merged) {
                    if let Some(value) = self.first_number_token(&merged) {
                        return (value, FeeMethod::Table);
                    }
                }
            }
        }

        // Stage 2: fee rows anywhere, header or not.
        for line in &lines {
            if is_fee_row(line) {
                if let Some(value) = self.first_number_token(line) {
                    return (value, FeeMethod::Table);
                }
            }
        }

        // Stage 3: sentence-level statutory phrasing.
        for pattern in &self.sentence_patterns {
            if let Some(caps) = pattern.captures(text) {
                let token = caps[1].replace(',', "").replace('(', "-").replace(')', "");
                let token = self.currency_prefix.replace(&token, "");
                if let Some(num) = self.plain_number.find(token.trim()) {
                    return (num.as_str().to_string(), FeeMethod::Text);
                }
            }
        }

        (String::new(), FeeMethod::None)
    }

    /// First numeric token on the line: thousands separators stripped,
    /// a parenthesized figure becomes negative.
    fn first_number_token(&self, line: &str) -> Option<String> {
        for m in self.number_token.find_iter(line) {
            let token = m
                .as_str()
                .replace(',', "")
                .replace('(', "-")
                .replace(')', "")
                .trim()
                .to_string();
            if !token.is_empty() {
                return Some(token);
            }
        }
        None
    }
}

/// Header lines naming the auditor together with remuneration wording.
fn header_indices(lines: &[&str]) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| {
            let low = line.to_lowercase();
            low.contains("auditor")
                && (low.contains("remuneration") || low.contains("fees payable"))
        })
        .map(|(idx, _)| idx)
        .collect()
}

fn is_fee_row(line: &str) -> bool {
    let low = line.to_lowercase();
    PRIMARY_PHRASES.iter().any(|p| low.contains(p))
        && !EXCLUDE_PHRASES.iter().any(|e| low.contains(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_window_row_is_table() {
        let text = "Auditors' remuneration\nAudit of the financial statements 125,000\nOther services 30,000";
        let (value, method) = FeeExtractor::new().extract(text);
        assert_eq!(value, "125000");
        assert_eq!(method, FeeMethod::Table);
    }

    #[test]
    fn parenthesized_figure_is_negative() {
        let text = "Fees payable remuneration of the auditor\nStatutory audit (45,000)";
        let (value, method) = FeeExtractor::new().extract(text);
        assert_eq!(value, "-45000");
        assert_eq!(method, FeeMethod::Table);
    }

    #[test]
    fn excluded_rows_are_skipped() {
        let text = "Auditors' remuneration\nAudit of the company and tax services 90,000\nAudit of the financial statements 60,000";
        let (value, _) = FeeExtractor::new().extract(text);
        // The first row mentions tax — excluded; the second wins.
        assert_eq!(value, "60000");
    }

    #[test]
    fn split_row_is_merged_from_adjacent_lines() {
        let text = "Auditors' remuneration\nAudit of the financial statements\n125,000\nOther services 30,000";
        let (value, method) = FeeExtractor::new().extract(text);
        assert_eq!(value, "125000");
        assert_eq!(method, FeeMethod::Table);
    }

    #[test]
    fn fee_row_without_header_still_matches() {
        let text = "Note 8\nStatutory audit of the accounts 72,500\n";
        let (value, method) = FeeExtractor::new().extract(text);
        assert_eq!(value, "72500");
        assert_eq!(method, FeeMethod::Table);
    }

    #[test]
    fn sentence_pattern_is_text_method() {
        let text = "During the year the audit fee charged by the company's auditor was £95,000 in total.";
        let (value, method) = FeeExtractor::new().extract(text);
        assert_eq!(value, "95000");
        assert_eq!(method, FeeMethod::Text);
    }

    #[test]
    fn no_match_is_none() {
        let (value, method) = FeeExtractor::new().extract("Nothing relevant here.");
        assert_eq!(value, "");
        assert_eq!(method, FeeMethod::None);
    }
}
