// src/record.rs

use crate::heuristics::{Confidence, FilingFields};
use serde::{Deserialize, Serialize};

/// One extracted row per (company, filing). Immutable once built;
/// consumed by the shortlist builder and the history export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingRecord {
    pub company_number: String,
    pub company: String,
    pub year: String,
    pub external_auditor: String,
    pub audit_fee: String,
    pub fee_unit: String,
    pub currency: String,
    pub filing_date: String,
    pub confidence: Confidence,
    pub pdf_path: String,
}

impl FilingRecord {
    pub fn from_fields(
        company_number: &str,
        company: &str,
        filing_date: &str,
        pdf_path: &str,
        fields: FilingFields,
    ) -> Self {
        Self {
            company_number: company_number.to_string(),
            company: company.to_string(),
            year: fields.year,
            external_auditor: fields.auditor,
            audit_fee: fields.fee,
            fee_unit: fields.unit,
            currency: fields.currency,
            filing_date: filing_date.to_string(),
            confidence: fields.confidence,
            pdf_path: pdf_path.to_string(),
        }
    }
}
