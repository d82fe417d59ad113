// src/pdf_text.rs

use lopdf::Document;
use tracing::{info, warn};

/// Minimum number of non-whitespace characters we expect from a
/// "real" text PDF. Below this threshold the text layer is useless and
/// the optical fallback should take over.
const MIN_TEXT_CHARS: usize = 30;

/// Deterministic page-sampling policy: every page in a front window
/// plus a strided sample of the tail. Auditor content clusters at the
/// front of an annual report and in the notes near the back.
#[derive(Debug, Clone)]
pub struct SamplingPolicy {
    pub front_pages: usize,
    pub tail_pages: usize,
    pub tail_stride: usize,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            front_pages: 25,
            tail_pages: 80,
            tail_stride: 3,
        }
    }
}

impl SamplingPolicy {
    /// Page indices this policy selects, in ascending order without
    /// duplicates. Pure over the page count, so it is restartable.
    pub fn pages(&self, page_count: usize) -> Vec<usize> {
        let mut pages: Vec<usize> = (0..self.front_pages.min(page_count)).collect();
        let tail_start = page_count.saturating_sub(self.tail_pages);
        for p in (tail_start..page_count).step_by(self.tail_stride.max(1)) {
            if !pages.contains(&p) {
                pages.push(p);
            }
        }
        pages
    }
}

/// Number of pages in the document, or 0 when it cannot be parsed.
pub fn page_count(pdf_bytes: &[u8]) -> usize {
    match Document::load_mem(pdf_bytes) {
        Ok(doc) => doc.get_pages().len(),
        Err(_) => 0,
    }
}

/// Extract the sampled text layer of a document. Returns an empty
/// string for unparseable, scanned, or effectively textless PDFs — the
/// caller treats that as "fields missing" and falls back to optical
/// recovery, so no error surfaces here.
pub fn sampled_text(pdf_bytes: &[u8], policy: &SamplingPolicy) -> String {
    let doc = match Document::load_mem(pdf_bytes) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "Failed to parse PDF");
            return String::new();
        }
    };

    if looks_like_scanned(&doc) {
        info!("PDF structural check: likely scanned / image-only");
        return String::new();
    }

    let pages = match pdf_extract::extract_text_from_mem_by_pages(pdf_bytes) {
        Ok(pages) => pages,
        Err(e) => {
            warn!(error = %e, "Text-layer extraction failed — may be scanned or corrupted");
            return String::new();
        }
    };

    let mut chunks = Vec::new();
    for index in policy.pages(pages.len()) {
        if let Some(text) = pages.get(index) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        }
    }
    let sampled = chunks.join("\n\n");

    let meaningful = sampled.chars().filter(|c| !c.is_whitespace()).count();
    if meaningful < MIN_TEXT_CHARS {
        info!(chars = meaningful, "Sampled text too short — treating as scanned");
        return String::new();
    }
    info!(
        pages = pages.len(),
        chars = meaningful,
        "Sampled text layer"
    );
    sampled
}

/// Inspect the PDF object tree for signs that pages are bare images
/// with no text operators: XObject images in the page resources but no
/// Font entries. When ≥80% of pages look like that, the whole document
/// is treated as scanned.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false; // Can't tell — let text extraction try
    }

    let image_only = pages
        .values()
        .filter(|object_id| {
            let Ok(page_obj) = doc.get_object(**object_id) else {
                return false;
            };
            let Ok(page_dict) = page_obj.as_dict() else {
                return false;
            };
            has_resource(doc, page_dict, b"XObject") && !has_resource(doc, page_dict, b"Font")
        })
        .count();

    let ratio = image_only as f64 / pages.len() as f64;
    info!(
        total_pages = pages.len(),
        image_only,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );
    ratio >= 0.8
}

/// Does this page's Resources dictionary carry a non-empty entry under
/// the given key (following indirect references)?
fn has_resource(doc: &Document, page_dict: &lopdf::Dictionary, key: &[u8]) -> bool {
    page_dict
        .get(b"Resources")
        .ok()
        .and_then(|r| doc.dereference(r).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .and_then(|res| res.get(key).ok())
        .and_then(|entry| doc.dereference(entry).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .is_some_and(|dict| !dict.is_empty())
}
