// src/fallback.rs

use crate::heuristics::{FieldExtractors, FilingFields};
use crate::ocr;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Render scale for the sparse discovery pass, enough for keyword
/// spotting.
pub const SPARSE_DPI: u32 = 120;
/// Render scale for the dense extraction pass.
pub const DENSE_DPI: u32 = 170;

/// Early pages always included in the dense pass; auditor signatures
/// conventionally sit near the front of the document.
const FRONT_WINDOW: usize = 14;
/// Pages either side of a sparse-phase hit included in the dense pass.
const HIT_NEIGHBORHOOD: usize = 2;

/// Page indices sampled during the sparse discovery phase: a tight
/// stride over the early pages plus a coarser stride across the whole
/// document, longer documents sampled more coarsely.
pub fn sparse_pages(page_count: usize) -> Vec<usize> {
    let mut pages = BTreeSet::new();
    for p in (0..page_count.min(20)).step_by(3) {
        pages.insert(p);
    }
    let step = if page_count > 120 { 8 } else { 5 };
    for p in (0..page_count).step_by(step) {
        pages.insert(p);
    }
    pages.into_iter().collect()
}

/// Does recognized page text suggest auditor or remuneration content?
pub fn is_recovery_hit(text: &str) -> bool {
    let low = text.to_lowercase();
    low.contains("independent auditor")
        || (low.contains("auditor") && low.contains("report"))
        || (low.contains("auditor")
            && (low.contains("remuneration") || low.contains("fees payable")))
        || low.contains("audit fee")
}

/// The dense-phase page list: the front window first, then a small
/// neighborhood around every sparse hit in ascending order, de-duplicated
/// and truncated to the page budget.
pub fn dense_pages(page_count: usize, hits: &[usize], budget: usize) -> Vec<usize> {
    fn push(p: usize, page_count: usize, ordered: &mut Vec<usize>, seen: &mut BTreeSet<usize>) {
        if p < page_count && seen.insert(p) {
            ordered.push(p);
        }
    }

    let mut ordered = Vec::new();
    let mut seen = BTreeSet::new();

    for p in 0..page_count.min(FRONT_WINDOW) {
        push(p, page_count, &mut ordered, &mut seen);
    }

    let mut sorted_hits: Vec<usize> = hits.to_vec();
    sorted_hits.sort_unstable();
    for &hit in &sorted_hits {
        let start = hit.saturating_sub(HIT_NEIGHBORHOOD);
        let end = (hit + HIT_NEIGHBORHOOD).min(page_count.saturating_sub(1));
        for p in start..=end {
            push(p, page_count, &mut ordered, &mut seen);
        }
    }

    ordered.truncate(budget);
    ordered
}

/// Run the two-phase targeted scan against a document on disk and
/// return the concatenated recognized text. Empty when recognition is
/// unavailable or nothing could be read.
pub fn recover_text(pdf_path: &Path, page_count: usize, budget: usize) -> String {
    if page_count == 0 {
        return String::new();
    }

    let mut hits = Vec::new();
    let sparse = sparse_pages(page_count);
    for &page in &sparse {
        let text = ocr::recognize_page(pdf_path, page, SPARSE_DPI);
        if !text.is_empty() && is_recovery_hit(&text) {
            debug!(page, "sparse-phase hit");
            hits.push(page);
        }
    }

    let pages = dense_pages(page_count, &hits, budget);
    info!(
        sampled = sparse.len(),
        hits = hits.len(),
        dense = pages.len(),
        "Targeted optical scan"
    );

    let mut chunks = Vec::new();
    for &page in &pages {
        let text = ocr::recognize_page(pdf_path, page, DENSE_DPI);
        if !text.is_empty() {
            chunks.push(text);
        }
    }
    chunks.join("\n\n")
}

/// Re-run the extractors over recovered text and fill in anything the
/// primary pass left empty. Non-empty primary fields are never
/// overwritten, so applying this twice with the same text is a no-op.
pub fn apply_recovery(
    primary: &mut FilingFields,
    extractors: &FieldExtractors,
    filing_date: &str,
    recovered_text: &str,
) {
    let recovered = extractors.extract(recovered_text, filing_date);
    merge_missing(primary, recovered);
}

/// Field-by-field reducer over two partial extractions: non-empty
/// primary wins. The auditor's confidence tag and the fee's method tag
/// travel with their values.
pub fn merge_missing(primary: &mut FilingFields, recovered: FilingFields) {
    if primary.auditor.is_empty() && !recovered.auditor.is_empty() {
        primary.auditor = recovered.auditor;
        primary.confidence = recovered.confidence;
    }
    if primary.fee.is_empty() && !recovered.fee.is_empty() {
        primary.fee = recovered.fee;
        primary.fee_method = recovered.fee_method;
    }
    if primary.currency.is_empty() && !recovered.currency.is_empty() {
        primary.currency = recovered.currency;
    }
    if primary.unit.is_empty() && !recovered.unit.is_empty() {
        primary.unit = recovered.unit;
    }
    if primary.year.is_empty() && !recovered.year.is_empty() {
        primary.year = recovered.year;
    }
}
