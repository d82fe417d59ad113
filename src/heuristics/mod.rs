// src/heuristics/mod.rs

mod auditor;
mod fee;
mod money;
mod year;

pub use auditor::{AuditorAliases, AuditorExtractor, Confidence};
pub use fee::{FeeExtractor, FeeMethod};
pub use money::MoneyDetector;
pub use year::YearResolver;

/// Scalar fields recovered from one filing's text, before any
/// company-level aggregation. Empty string means "not found".
#[derive(Debug, Clone)]
pub struct FilingFields {
    pub auditor: String,
    pub confidence: Confidence,
    pub fee: String,
    pub fee_method: FeeMethod,
    pub currency: String,
    pub unit: String,
    pub year: String,
}

impl FilingFields {
    /// True when any field the optical fallback can supply is still missing.
    /// Year is recovered opportunistically but does not trigger a scan on
    /// its own — the filing date usually covers it.
    pub fn missing_any(&self) -> bool {
        self.auditor.is_empty()
            || self.fee.is_empty()
            || self.currency.is_empty()
            || self.unit.is_empty()
    }

    /// How many scalar fields were filled (out of all of them).
    pub fn coverage(&self) -> (usize, usize) {
        let filled = [
            !self.auditor.is_empty(),
            !self.fee.is_empty(),
            !self.currency.is_empty(),
            !self.unit.is_empty(),
            !self.year.is_empty(),
        ]
        .iter()
        .filter(|&&v| v)
        .count();
        (filled, 5)
    }
}

/// Replace non-breaking spaces so every downstream pattern can rely on
/// plain ASCII whitespace. PDF text layers sprinkle U+00A0 liberally.
pub fn normalize(text: &str) -> String {
    text.replace('\u{00a0}', " ")
}

/// Collapse runs of whitespace into single spaces.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The four field extractors bundled with their shared configuration.
/// Construct once, reuse across filings — all extraction is pure.
pub struct FieldExtractors {
    auditor: AuditorExtractor,
    fee: FeeExtractor,
    money: MoneyDetector,
    year: YearResolver,
}

impl Default for FieldExtractors {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractors {
    pub fn new() -> Self {
        Self::with_aliases(AuditorAliases::default())
    }

    /// Inject a custom alias table (tests substitute small ones).
    pub fn with_aliases(aliases: AuditorAliases) -> Self {
        Self {
            auditor: AuditorExtractor::new(aliases),
            fee: FeeExtractor::new(),
            money: MoneyDetector::new(),
            year: YearResolver::new(),
        }
    }

    /// Run all four rule chains over one filing's text.
    pub fn extract(&self, text: &str, filing_date: &str) -> FilingFields {
        let compact = normalize(text);
        let (auditor, confidence) = self.auditor.extract(&compact);
        let (fee, fee_method) = self.fee.extract(&compact);
        let (currency, unit) = self.money.detect(&compact);
        let year = self.year.resolve(filing_date, &compact);
        FilingFields {
            auditor,
            confidence,
            fee,
            fee_method,
            currency,
            unit,
            year,
        }
    }
}
