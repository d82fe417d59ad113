// src/heuristics/money.rs

use regex::Regex;

/// Detects the reporting currency and the scale unit of tabulated
/// figures. Both are resolved by priority order over marker groups, not
/// by position in the text — a pound sign on page 40 still beats a
/// dollar sign on page 2.
pub struct MoneyDetector {
    currencies: Vec<(Regex, &'static str)>,
    units: Vec<(Regex, &'static str)>,
}

impl Default for MoneyDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MoneyDetector {
    pub fn new() -> Self {
        let currencies = [
            (r"\bgbp\b|£|pounds sterling", "GBP"),
            (r"\busd\b|\$", "USD"),
            (r"\beur\b|€", "EUR"),
        ]
        .iter()
        .map(|(p, code)| (Regex::new(p).unwrap(), *code))
        .collect();

        let units = [
            (r"(?i)(£\s*['’]?\s*000|000s|in thousands|thousand)", "thousand"),
            (r"(?i)(£m|us\$m|€m|in millions|million)", "million"),
            (r"(?i)(billion|bn)", "billion"),
        ]
        .iter()
        .map(|(p, unit)| (Regex::new(p).unwrap(), *unit))
        .collect();

        Self { currencies, units }
    }

    /// Returns (currency, unit); empty string where no marker matched.
    pub fn detect(&self, text: &str) -> (String, String) {
        let low = text.to_lowercase();

        let currency = self
            .currencies
            .iter()
            .find(|(pattern, _)| pattern.is_match(&low))
            .map(|(_, code)| code.to_string())
            .unwrap_or_default();

        let unit = self
            .units
            .iter()
            .find(|(pattern, _)| pattern.is_match(text))
            .map(|(_, unit)| unit.to_string())
            .unwrap_or_default();

        (currency, unit)
    }
}
