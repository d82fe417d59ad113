// src/shortlist.rs

use crate::record::FilingRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference currency for fee comparison. Fees reported in anything
/// else are left out of the numeric aggregation rather than converted.
const REFERENCE_CURRENCY: &str = "GBP";

/// Tenure and fee levels that make a tender look imminent.
const HOT_TENURE_YEARS: u32 = 8;
const HOT_FEE_FLOOR: f64 = 1_000_000.0;
const WATCH_TENURE_YEARS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenderStatus {
    Hot,
    Watch,
    Monitor,
}

impl TenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenderStatus::Hot => "hot",
            TenderStatus::Watch => "watch",
            TenderStatus::Monitor => "monitor",
        }
    }
}

/// One row per company in the ranked shortlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub company_number: String,
    pub company: String,
    pub current_external_auditor: String,
    pub continuous_tenure_years: u32,
    pub latest_audit_fee_gbp: Option<f64>,
    pub priority_score: f64,
    pub tender_status: TenderStatus,
}

/// Normalize a (value, unit, currency) triple to a GBP magnitude.
/// Indeterminate when the value is missing or non-numeric, or when the
/// filing reports in a different currency — cross-currency conversion
/// is out of scope.
pub fn fee_to_gbp(value: &str, unit: &str, currency: &str) -> Option<f64> {
    if value.is_empty() {
        return None;
    }
    let v: f64 = value.parse().ok()?;
    if !currency.is_empty() && currency != REFERENCE_CURRENCY {
        return None;
    }
    let scale = match unit {
        "thousand" => 1_000.0,
        "million" => 1_000_000.0,
        "billion" => 1_000_000_000.0,
        _ => 1.0,
    };
    Some(v * scale)
}

/// Current auditor and continuous tenure for one company's records:
/// order by year descending (stable), take the most recent auditor,
/// then count consecutive records with that auditor until the first
/// change. An empty most-recent auditor means no tenure at all.
fn continuous_tenure(records: &[&FilingRecord]) -> (String, u32) {
    if records.is_empty() {
        return (String::new(), 0);
    }
    let mut ordered: Vec<&FilingRecord> = records.to_vec();
    ordered.sort_by(|a, b| b.year.cmp(&a.year));
    let auditor = ordered[0].external_auditor.clone();
    if auditor.is_empty() {
        return (String::new(), 0);
    }
    let mut years = 0;
    for record in &ordered {
        if record.external_auditor == auditor {
            years += 1;
        } else {
            break;
        }
    }
    (auditor, years)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Collapse the full filing history into one scored row per company,
/// ranked by descending priority.
pub fn build_shortlist(history: &[FilingRecord]) -> Vec<ShortlistEntry> {
    let mut grouped: BTreeMap<&str, Vec<&FilingRecord>> = BTreeMap::new();
    for record in history {
        grouped
            .entry(record.company_number.as_str())
            .or_default()
            .push(record);
    }

    let mut entries = Vec::with_capacity(grouped.len());
    for (company_number, records) in grouped {
        let company = records[0].company.clone();
        let (auditor, tenure_years) = continuous_tenure(&records);

        let latest_fee = records
            .iter()
            .filter_map(|r| fee_to_gbp(&r.audit_fee, &r.fee_unit, &r.currency))
            .filter(|&fee| fee > 0.0)
            .fold(None, |best: Option<f64>, fee| {
                Some(best.map_or(fee, |b| b.max(fee)))
            });

        let tenure_score = (tenure_years as f64 * 10.0).min(100.0);
        let fee_score = latest_fee.map_or(0.0, |fee| (fee.ln_1p() * 5.0).min(100.0));
        let priority_score = round2(0.65 * tenure_score + 0.35 * fee_score);

        let tender_status = if tenure_years >= HOT_TENURE_YEARS
            && latest_fee.unwrap_or(0.0) >= HOT_FEE_FLOOR
        {
            TenderStatus::Hot
        } else if tenure_years >= WATCH_TENURE_YEARS {
            TenderStatus::Watch
        } else {
            TenderStatus::Monitor
        };

        entries.push(ShortlistEntry {
            company_number: company_number.to_string(),
            company,
            current_external_auditor: auditor,
            continuous_tenure_years: tenure_years,
            latest_audit_fee_gbp: latest_fee,
            priority_score,
            tender_status,
        });
    }

    entries.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::Confidence;

    fn record(number: &str, year: &str, auditor: &str, fee: &str, unit: &str, currency: &str) -> FilingRecord {
        FilingRecord {
            company_number: number.to_string(),
            company: format!("Company {number}"),
            year: year.to_string(),
            external_auditor: auditor.to_string(),
            audit_fee: fee.to_string(),
            fee_unit: unit.to_string(),
            currency: currency.to_string(),
            filing_date: format!("{year}-12-31"),
            confidence: if auditor.is_empty() {
                Confidence::Low
            } else {
                Confidence::High
            },
            pdf_path: String::new(),
        }
    }

    #[test]
    fn fee_normalization_applies_unit_scale() {
        assert_eq!(fee_to_gbp("125", "thousand", "GBP"), Some(125_000.0));
        assert_eq!(fee_to_gbp("2", "million", ""), Some(2_000_000.0));
        assert_eq!(fee_to_gbp("1.5", "billion", "GBP"), Some(1_500_000_000.0));
        assert_eq!(fee_to_gbp("95000", "", "GBP"), Some(95_000.0));
    }

    #[test]
    fn cross_currency_fee_is_indeterminate() {
        assert_eq!(fee_to_gbp("125000", "", "USD"), None);
        assert_eq!(fee_to_gbp("125000", "million", "EUR"), None);
    }

    #[test]
    fn garbage_fee_is_indeterminate() {
        assert_eq!(fee_to_gbp("", "thousand", "GBP"), None);
        assert_eq!(fee_to_gbp("n/a", "", ""), None);
    }

    #[test]
    fn tenure_counts_consecutive_years_from_latest() {
        let history = vec![
            record("X", "2023", "PwC", "", "", ""),
            record("X", "2022", "PwC", "", "", ""),
            record("X", "2021", "PwC", "", "", ""),
            record("X", "2020", "EY", "", "", ""),
        ];
        let shortlist = build_shortlist(&history);
        assert_eq!(shortlist[0].current_external_auditor, "PwC");
        assert_eq!(shortlist[0].continuous_tenure_years, 3);
    }

    #[test]
    fn older_record_with_same_auditor_extends_tenure() {
        let mut history = vec![
            record("X", "2023", "KPMG", "", "", ""),
            record("X", "2022", "KPMG", "", "", ""),
        ];
        let base = build_shortlist(&history)[0].continuous_tenure_years;
        history.push(record("X", "2021", "KPMG", "", "", ""));
        let extended = build_shortlist(&history)[0].continuous_tenure_years;
        assert!(extended > base);
    }

    #[test]
    fn newer_record_with_new_auditor_resets_tenure() {
        let history = vec![
            record("X", "2024", "Mazars", "", "", ""),
            record("X", "2023", "KPMG", "", "", ""),
            record("X", "2022", "KPMG", "", "", ""),
        ];
        let shortlist = build_shortlist(&history);
        assert_eq!(shortlist[0].current_external_auditor, "Mazars");
        assert_eq!(shortlist[0].continuous_tenure_years, 1);
    }

    #[test]
    fn empty_latest_auditor_scores_zero() {
        let history = vec![
            record("X", "2023", "", "", "", ""),
            record("X", "2022", "PwC", "500000", "", "GBP"),
        ];
        let shortlist = build_shortlist(&history);
        assert_eq!(shortlist[0].current_external_auditor, "");
        assert_eq!(shortlist[0].continuous_tenure_years, 0);
        assert_eq!(shortlist[0].tender_status, TenderStatus::Monitor);
    }

    #[test]
    fn latest_fee_is_max_normalized_positive() {
        let history = vec![
            record("X", "2023", "PwC", "1800000", "", "GBP"),
            record("X", "2022", "PwC", "2000000", "", "GBP"),
            record("X", "2021", "PwC", "9000000", "", "USD"),
        ];
        let shortlist = build_shortlist(&history);
        // The USD figure never contributes, despite being the largest.
        assert_eq!(shortlist[0].latest_audit_fee_gbp, Some(2_000_000.0));
    }

    #[test]
    fn worked_example_scores_and_status() {
        let history = vec![
            record("X", "2023", "PwC", "2000000", "", "GBP"),
            record("X", "2022", "PwC", "1900000", "", "GBP"),
            record("X", "2021", "PwC", "1800000", "", "GBP"),
            record("X", "2020", "EY", "1500000", "", "GBP"),
        ];
        let entry = &build_shortlist(&history)[0];
        assert_eq!(entry.continuous_tenure_years, 3);
        assert_eq!(entry.latest_audit_fee_gbp, Some(2_000_000.0));
        // tenure score 30, fee score ln(2_000_001) * 5 ≈ 72.54
        let fee_score = 2_000_000.0f64.ln_1p() * 5.0;
        let expected = ((0.65 * 30.0 + 0.35 * fee_score) * 100.0).round() / 100.0;
        assert_eq!(entry.priority_score, expected);
        assert_eq!(entry.tender_status, TenderStatus::Monitor);
    }

    #[test]
    fn status_tiers() {
        let hot: Vec<FilingRecord> = (0..9)
            .map(|i| record("H", &format!("{}", 2023 - i), "PwC", "1200000", "", "GBP"))
            .collect();
        assert_eq!(build_shortlist(&hot)[0].tender_status, TenderStatus::Hot);

        let watch: Vec<FilingRecord> = (0..7)
            .map(|i| record("W", &format!("{}", 2023 - i), "PwC", "", "", ""))
            .collect();
        assert_eq!(build_shortlist(&watch)[0].tender_status, TenderStatus::Watch);

        let monitor = vec![record("M", "2023", "PwC", "", "", "")];
        assert_eq!(build_shortlist(&monitor)[0].tender_status, TenderStatus::Monitor);
    }

    #[test]
    fn shortlist_sorted_by_descending_score() {
        let mut history = Vec::new();
        for i in 0..7 {
            history.push(record("LONG", &format!("{}", 2023 - i), "KPMG", "", "", ""));
        }
        history.push(record("SHORT", "2023", "BDO", "", "", ""));
        let shortlist = build_shortlist(&history);
        assert_eq!(shortlist[0].company_number, "LONG");
        assert!(shortlist[0].priority_score >= shortlist[1].priority_score);
    }
}
