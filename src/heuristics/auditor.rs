// src/heuristics/auditor.rs

use super::collapse_ws;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Coarse trust tier for the auditor field. "Low" always means the
/// auditor came back empty — the two travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Known audit-firm spellings mapped to a canonical display name.
/// Matching is case-insensitive and substring-wise, so "Deloitte LLP"
/// and "DELOITTE & TOUCHE" both resolve to "Deloitte". Iteration order
/// is significant — the first alias found in text wins.
#[derive(Debug, Clone)]
pub struct AuditorAliases {
    entries: Vec<(String, String)>,
}

impl Default for AuditorAliases {
    fn default() -> Self {
        let builtin = [
            ("pricewaterhousecoopers", "PwC"),
            ("pwc", "PwC"),
            ("ernst & young", "EY"),
            ("ernst and young", "EY"),
            ("ey", "EY"),
            ("kpmg", "KPMG"),
            ("deloitte", "Deloitte"),
            ("bdo", "BDO"),
            ("grant thornton", "Grant Thornton"),
            ("mazars", "Mazars"),
            ("rsm", "RSM"),
        ];
        Self::new(
            builtin
                .iter()
                .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
                .collect(),
        )
    }
}

impl AuditorAliases {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(raw, canonical)| (raw.as_str(), canonical.as_str()))
    }

    /// Does the (lowercased) candidate contain any known alias?
    pub fn matches(&self, lower: &str) -> bool {
        self.entries.iter().any(|(raw, _)| lower.contains(raw))
    }

    /// Map a candidate to its canonical name if any alias occurs in it.
    pub fn canonical_for(&self, lower: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(raw, _)| lower.contains(raw))
            .map(|(_, canonical)| canonical.as_str())
    }
}

/// Characters in the keyword window checked around a bare alias hit.
const ALIAS_CONTEXT_WINDOW: usize = 140;

/// Boilerplate that disqualifies a candidate from being an audit firm.
const IMPLAUSIBLE_HINTS: &[&str] = &[
    "consolidated financial statements",
    "climate-related",
    "note ",
    "contents",
    "directors",
    "statement",
];

const LEGAL_SUFFIXES: &[&str] = &[" llp", " ltd", " limited", " plc"];

/// Recovers the external auditor's name from filing text.
///
/// Structural patterns run first, in priority order: the name printed
/// under an independent auditor's report heading, a signature block, or
/// an explicit "Auditor:" label. Candidates that survive the
/// plausibility filter are high confidence. Failing that, a bare alias
/// occurrence with audit-related wording nearby is medium confidence.
pub struct AuditorExtractor {
    patterns: Vec<Regex>,
    aliases: AuditorAliases,
}

impl AuditorExtractor {
    pub fn new(aliases: AuditorAliases) -> Self {
        let patterns = [
            r"(?is)independent auditor(?:s)?(?:'|’) report[^\n]{0,120}\n([^\n]{2,120})",
            r"(?is)(?:signed for and on behalf of|for and on behalf of)\s*\n?\s*([A-Z][A-Za-z&,\.\- '\(\)]{2,120})",
            r"(?im)^\s*auditor(?:s)?\s*[:\-]\s*([A-Z][A-Za-z&,\.\- '\(\)]{2,120})\s*$",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect();
        Self { patterns, aliases }
    }

    pub fn extract(&self, text: &str) -> (String, Confidence) {
        let lower = text.to_lowercase();

        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(text) {
                let candidate = self.canonicalize(&caps[1]);
                if self.is_plausible(&candidate) {
                    return (candidate, Confidence::High);
                }
            }
        }

        // No structural match — look for a bare alias with audit-related
        // wording within the surrounding window.
        for (raw, canonical) in self.aliases.iter() {
            if let Some(idx) = lower.find(raw) {
                let near = char_window(&lower, idx, ALIAS_CONTEXT_WINDOW);
                if near.contains("auditor")
                    || near.contains("audit report")
                    || near.contains("independent")
                {
                    return (canonical.to_string(), Confidence::Medium);
                }
            }
        }

        (String::new(), Confidence::Low)
    }

    /// Trim stray punctuation and apply the alias table.
    fn canonicalize(&self, raw: &str) -> String {
        let cleaned = collapse_ws(raw);
        let cleaned = cleaned.trim_matches([' ', ',', '.', ';', ':', '-']);
        let lower = cleaned.to_lowercase();
        match self.aliases.canonical_for(&lower) {
            Some(canonical) => canonical.to_string(),
            None => cleaned.to_string(),
        }
    }

    /// Structural rejection of candidates that are clearly prose, not a
    /// firm name. Boilerplate hints reject even alias-bearing lines.
    fn is_plausible(&self, name: &str) -> bool {
        let low = name.to_lowercase();
        let low = low.trim();
        if low.is_empty() || low.chars().count() > 80 {
            return false;
        }
        if IMPLAUSIBLE_HINTS.iter().any(|hint| low.contains(hint)) {
            return false;
        }
        if self.aliases.matches(low) {
            return true;
        }
        LEGAL_SUFFIXES.iter().any(|suffix| low.ends_with(suffix))
    }
}

/// A byte-window around `idx`, widened to char boundaries so slicing
/// never splits a multi-byte character.
fn char_window(text: &str, idx: usize, radius: usize) -> &str {
    let mut start = idx.saturating_sub(radius);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (idx + radius).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}
