// src/heuristics/year.rs

use regex::Regex;

/// Resolves the reporting year: the "for the year ended … YYYY" phrase
/// first, a looser "year ended … YYYY" next, then any four-digit year
/// inside the filing date.
pub struct YearResolver {
    phrase_patterns: Vec<Regex>,
    any_year: Regex,
}

impl Default for YearResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl YearResolver {
    pub fn new() -> Self {
        let phrase_patterns = [
            r"(?i)for the year ended[^\n\r]{0,40}\b(20\d{2})\b",
            r"(?i)year ended[^\n\r]{0,40}\b(20\d{2})\b",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect();
        Self {
            phrase_patterns,
            any_year: Regex::new(r"\b(20\d{2})\b").unwrap(),
        }
    }

    pub fn resolve(&self, filing_date: &str, text: &str) -> String {
        for pattern in &self.phrase_patterns {
            if let Some(caps) = pattern.captures(text) {
                return caps[1].to_string();
            }
        }
        self.any_year
            .captures(filing_date)
            .map(|caps| caps[1].to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_phrase_beats_filing_date() {
        let year = YearResolver::new().resolve(
            "2024-03-01",
            "Annual report for the year ended 31 December 2023",
        );
        assert_eq!(year, "2023");
    }

    #[test]
    fn loose_phrase_matches() {
        let year = YearResolver::new().resolve("", "Results for the period. Year ended 30 June 2022.");
        assert_eq!(year, "2022");
    }

    #[test]
    fn filing_date_is_the_fallback() {
        let year = YearResolver::new().resolve("2021-09-30", "No period wording at all");
        assert_eq!(year, "2021");
    }

    #[test]
    fn nothing_resolves_to_empty() {
        let year = YearResolver::new().resolve("30 September", "no years");
        assert_eq!(year, "");
    }
}
