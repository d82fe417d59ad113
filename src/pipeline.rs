// src/pipeline.rs

use crate::config::Config;
use crate::export;
use crate::fallback;
use crate::filing_store::{FilingStore, StoredFiling};
use crate::heuristics::FieldExtractors;
use crate::pdf_text::{self, SamplingPolicy};
use crate::record::FilingRecord;
use crate::registry::RegistryClient;
use crate::shortlist::build_shortlist;
use std::path::Path;
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Run the whole radar: ingest filings from the registry, extract
/// fields from each unprocessed document, then build and export the
/// ranked shortlist.
pub async fn run(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();

    let api_key = cfg.resolve_api_key().ok_or(
        "Missing registry API key: set CH_API_KEY, [registry] api_key, or create the API key file",
    )?;
    let client = RegistryClient::new(api_key, cfg.registry.throttle_ms);
    let store = FilingStore::new(&cfg.output.db_path)?;

    ingest(&client, &store, cfg).await?;
    process(&store, cfg)?;
    report(&store, cfg)?;

    info!(
        runtime_seconds = format!("{:.2}", started.elapsed().as_secs_f64()),
        "Radar run complete"
    );
    Ok(())
}

/// Stage 1: resolve companies, list their accounts filings, download
/// the PDFs and register everything in the store. Already-downloaded
/// documents and already-processed filings are left alone.
async fn ingest(
    client: &RegistryClient,
    store: &FilingStore,
    cfg: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let companies = if cfg.pipeline.target_companies.is_empty() {
        client
            .search_companies(&cfg.pipeline.company_query, cfg.pipeline.max_companies)
            .await
    } else {
        client
            .pick_target_companies(&cfg.pipeline.target_companies)
            .await
    };
    if companies.is_empty() {
        warn!("No active companies found");
        return Ok(());
    }
    info!(companies = companies.len(), "Ingesting filings");

    let download_dir = Path::new(&cfg.output.download_dir);
    for company in &companies {
        if company.company_number.is_empty() {
            continue;
        }
        let company_name = if company.title.is_empty() {
            company.company_number.clone()
        } else {
            company.title.clone()
        };

        let filings = client
            .accounts_filings(
                &company.company_number,
                cfg.pipeline.max_filings_per_company,
                cfg.pipeline.include_all_accounts,
            )
            .await;
        for filing in filings {
            let Some(meta_url) = filing.links.document_metadata else {
                continue;
            };
            let Some(pdf_url) = client.document_pdf_url(&meta_url).await else {
                continue;
            };

            let pdf_path =
                download_dir.join(format!("{}_{}.pdf", company.company_number, filing.date));
            if !pdf_path.exists() && !client.download_pdf(&pdf_url, &pdf_path).await {
                warn!(
                    company = %company.company_number,
                    date = %filing.date,
                    "Download failed — skipping filing"
                );
                continue;
            }

            let uid = FilingStore::generate_uid(&company.company_number, &filing.date, &meta_url);
            store.upsert_filing(&StoredFiling {
                uid,
                company_number: company.company_number.clone(),
                company: company_name.clone(),
                filing_date: filing.date.clone(),
                doc_ref: meta_url,
                pdf_path: pdf_path.display().to_string(),
                is_processed: false,
            })?;
        }
    }
    Ok(())
}

/// Stage 2: extract fields from every unprocessed filing, running the
/// targeted optical fallback when the primary pass leaves gaps.
fn process(store: &FilingStore, cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let extractors = FieldExtractors::new();
    let policy = SamplingPolicy {
        front_pages: cfg.sampling.front_pages,
        tail_pages: cfg.sampling.tail_pages,
        tail_stride: cfg.sampling.tail_stride,
    };

    let unprocessed = store.unprocessed_filings()?;
    info!(count = unprocessed.len(), "Unprocessed filings to extract");

    for filing in &unprocessed {
        let span = info_span!(
            "filing",
            company = %filing.company_number,
            date = %filing.filing_date
        );
        let _guard = span.enter();

        let bytes = match std::fs::read(&filing.pdf_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %filing.pdf_path, error = %e, "Cannot read PDF — skipping");
                continue;
            }
        };

        let text = pdf_text::sampled_text(&bytes, &policy);
        let mut fields = extractors.extract(&text, &filing.filing_date);

        if cfg.ocr.enabled && fields.missing_any() {
            let page_count = pdf_text::page_count(&bytes);
            let recovered = fallback::recover_text(
                Path::new(&filing.pdf_path),
                page_count,
                cfg.ocr.max_pages,
            );
            if !recovered.is_empty() {
                fallback::apply_recovery(&mut fields, &extractors, &filing.filing_date, &recovered);
            }
        }

        let (filled, total) = fields.coverage();
        info!(
            filled,
            total,
            auditor = %fields.auditor,
            confidence = fields.confidence.as_str(),
            fee = %fields.fee,
            method = fields.fee_method.as_str(),
            currency = %fields.currency,
            unit = %fields.unit,
            year = %fields.year,
            "Extraction result"
        );

        let record = FilingRecord::from_fields(
            &filing.company_number,
            &filing.company,
            &filing.filing_date,
            &filing.pdf_path,
            fields,
        );
        store.insert_record(&filing.uid, &record)?;
        store.mark_processed(&filing.uid)?;
    }

    let (filings_total, filings_processed, records) = store.counts()?;
    info!(filings_total, filings_processed, records, "Store statistics");
    Ok(())
}

/// Stage 3: order the history, build the shortlist, write both CSVs.
fn report(store: &FilingStore, cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut records = store.all_records()?;
    records.sort_by(|a, b| {
        (b.company_number.as_str(), b.year.as_str()).cmp(&(a.company_number.as_str(), a.year.as_str()))
    });

    let shortlist = build_shortlist(&records);

    export::write_history_csv(Path::new(&cfg.output.history_csv), &records)?;
    export::write_shortlist_csv(Path::new(&cfg.output.shortlist_csv), &shortlist)?;
    export::write_shortlist_json(Path::new(&cfg.output.shortlist_json), &shortlist)?;
    info!(
        history_rows = records.len(),
        shortlist_rows = shortlist.len(),
        "Report complete"
    );
    Ok(())
}
