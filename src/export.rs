// src/export.rs

use crate::record::FilingRecord;
use crate::shortlist::{ShortlistEntry, TenderStatus};
use csv::Writer;
use std::fs::File;
use std::path::Path;
use tracing::info;

pub fn write_history_csv(
    path: &Path,
    records: &[FilingRecord],
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_parent(path)?;
    let mut wtr = Writer::from_writer(File::create(path)?);

    wtr.write_record([
        "company_number",
        "company",
        "year",
        "external_auditor",
        "audit_fee",
        "fee_unit",
        "currency",
        "filing_date",
        "confidence",
        "pdf_path",
    ])?;
    for record in records {
        wtr.write_record([
            record.company_number.as_str(),
            record.company.as_str(),
            record.year.as_str(),
            record.external_auditor.as_str(),
            record.audit_fee.as_str(),
            record.fee_unit.as_str(),
            record.currency.as_str(),
            record.filing_date.as_str(),
            record.confidence.as_str(),
            record.pdf_path.as_str(),
        ])?;
    }
    wtr.flush()?;
    info!(rows = records.len(), path = %path.display(), "History CSV written");
    Ok(())
}

pub fn write_shortlist_csv(
    path: &Path,
    entries: &[ShortlistEntry],
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_parent(path)?;
    let mut wtr = Writer::from_writer(File::create(path)?);

    wtr.write_record([
        "company_number",
        "company",
        "current_external_auditor",
        "continuous_tenure_years",
        "latest_audit_fee_gbp",
        "priority_score",
        "tender_status",
    ])?;
    for entry in entries {
        let fee = entry
            .latest_audit_fee_gbp
            .map(|fee| format!("{fee:.0}"))
            .unwrap_or_default();
        let tenure = entry.continuous_tenure_years.to_string();
        let score = entry.priority_score.to_string();
        wtr.write_record([
            entry.company_number.as_str(),
            entry.company.as_str(),
            entry.current_external_auditor.as_str(),
            tenure.as_str(),
            fee.as_str(),
            score.as_str(),
            entry.tender_status.as_str(),
        ])?;
    }
    wtr.flush()?;
    info!(rows = entries.len(), path = %path.display(), "Shortlist CSV written");
    Ok(())
}

/// JSON mirror of the shortlist with a small summary header, for
/// downstream tools that don't want to re-parse CSV.
pub fn write_shortlist_json(
    path: &Path,
    entries: &[ShortlistEntry],
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_parent(path)?;

    let export = JsonExport {
        summary: ExportSummary {
            total_companies: entries.len(),
            hot: entries
                .iter()
                .filter(|e| e.tender_status == TenderStatus::Hot)
                .count(),
            watch: entries
                .iter()
                .filter(|e| e.tender_status == TenderStatus::Watch)
                .count(),
        },
        shortlist: entries.to_vec(),
    };
    std::fs::write(path, serde_json::to_string_pretty(&export)?)?;
    info!(rows = entries.len(), path = %path.display(), "Shortlist JSON written");
    Ok(())
}

#[derive(serde::Serialize)]
struct JsonExport {
    summary: ExportSummary,
    shortlist: Vec<ShortlistEntry>,
}

#[derive(serde::Serialize)]
struct ExportSummary {
    total_companies: usize,
    hot: usize,
    watch: usize,
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
