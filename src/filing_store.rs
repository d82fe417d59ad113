// src/filing_store.rs

use crate::heuristics::Confidence;
use crate::record::FilingRecord;
use rusqlite::{Connection, Result as SqliteResult, params};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub struct FilingStore {
    conn: Connection,
}

/// One ingested filing: registry metadata plus the local PDF location.
/// `is_processed` flips once extraction has produced a record.
#[derive(Debug, Clone)]
pub struct StoredFiling {
    pub uid: String,
    pub company_number: String,
    pub company: String,
    pub filing_date: String,
    pub doc_ref: String,
    pub pdf_path: String,
    pub is_processed: bool,
}

impl FilingStore {
    /// Open (or create) the store.
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS filings (
                uid TEXT PRIMARY KEY,
                company_number TEXT NOT NULL,
                company TEXT NOT NULL,
                filing_date TEXT NOT NULL,
                doc_ref TEXT NOT NULL,
                pdf_path TEXT NOT NULL,
                is_processed INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                filing_uid TEXT PRIMARY KEY,
                company_number TEXT NOT NULL,
                company TEXT NOT NULL,
                year TEXT NOT NULL,
                external_auditor TEXT NOT NULL,
                audit_fee TEXT NOT NULL,
                fee_unit TEXT NOT NULL,
                currency TEXT NOT NULL,
                filing_date TEXT NOT NULL,
                confidence TEXT NOT NULL,
                pdf_path TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (filing_uid) REFERENCES filings(uid)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_filings_company ON filings(company_number)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_filings_is_processed ON filings(is_processed)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_company ON records(company_number)",
            [],
        )?;

        info!("Filing store initialized");
        Ok(Self { conn })
    }

    /// Stable filing identity from company number, filing date, and the
    /// registry document reference.
    pub fn generate_uid(company_number: &str, filing_date: &str, doc_ref: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(company_number.as_bytes());
        hasher.update(filing_date.as_bytes());
        hasher.update(doc_ref.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Insert a filing, refreshing metadata but preserving the
    /// processed flag on re-ingest.
    pub fn upsert_filing(&self, filing: &StoredFiling) -> SqliteResult<()> {
        self.conn.execute(
            "INSERT INTO filings
                (uid, company_number, company, filing_date, doc_ref, pdf_path, is_processed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(uid) DO UPDATE SET
                company = excluded.company,
                pdf_path = excluded.pdf_path",
            params![
                filing.uid,
                filing.company_number,
                filing.company,
                filing.filing_date,
                filing.doc_ref,
                filing.pdf_path,
                filing.is_processed,
            ],
        )?;
        Ok(())
    }

    pub fn unprocessed_filings(&self) -> SqliteResult<Vec<StoredFiling>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, company_number, company, filing_date, doc_ref, pdf_path, is_processed
             FROM filings WHERE is_processed = 0
             ORDER BY company_number, filing_date DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredFiling {
                uid: row.get(0)?,
                company_number: row.get(1)?,
                company: row.get(2)?,
                filing_date: row.get(3)?,
                doc_ref: row.get(4)?,
                pdf_path: row.get(5)?,
                is_processed: row.get(6)?,
            })
        })?;
        rows.collect()
    }

    pub fn mark_processed(&self, uid: &str) -> SqliteResult<()> {
        self.conn.execute(
            "UPDATE filings SET is_processed = 1 WHERE uid = ?1",
            params![uid],
        )?;
        Ok(())
    }

    /// Persist the extracted record for a filing. Reprocessing the same
    /// filing replaces its previous record.
    pub fn insert_record(&self, filing_uid: &str, record: &FilingRecord) -> SqliteResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO records
                (filing_uid, company_number, company, year, external_auditor,
                 audit_fee, fee_unit, currency, filing_date, confidence, pdf_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                filing_uid,
                record.company_number,
                record.company,
                record.year,
                record.external_auditor,
                record.audit_fee,
                record.fee_unit,
                record.currency,
                record.filing_date,
                record.confidence.as_str(),
                record.pdf_path,
            ],
        )?;
        Ok(())
    }

    pub fn all_records(&self) -> SqliteResult<Vec<FilingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT company_number, company, year, external_auditor, audit_fee,
                    fee_unit, currency, filing_date, confidence, pdf_path
             FROM records",
        )?;
        let rows = stmt.query_map([], |row| {
            let confidence: String = row.get(8)?;
            Ok(FilingRecord {
                company_number: row.get(0)?,
                company: row.get(1)?,
                year: row.get(2)?,
                external_auditor: row.get(3)?,
                audit_fee: row.get(4)?,
                fee_unit: row.get(5)?,
                currency: row.get(6)?,
                filing_date: row.get(7)?,
                confidence: match confidence.as_str() {
                    "high" => Confidence::High,
                    "medium" => Confidence::Medium,
                    _ => Confidence::Low,
                },
                pdf_path: row.get(9)?,
            })
        })?;
        rows.collect()
    }

    /// (total filings, processed filings, records) for summary logging.
    pub fn counts(&self) -> SqliteResult<(i64, i64, i64)> {
        let filings: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM filings", [], |row| row.get(0))?;
        let processed: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM filings WHERE is_processed = 1",
            [],
            |row| row.get(0),
        )?;
        let records: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok((filings, processed, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FilingStore {
        FilingStore::new(":memory:").expect("in-memory store")
    }

    fn filing(uid: &str, number: &str) -> StoredFiling {
        StoredFiling {
            uid: uid.to_string(),
            company_number: number.to_string(),
            company: "Test Plc".to_string(),
            filing_date: "2023-06-30".to_string(),
            doc_ref: "meta/doc1".to_string(),
            pdf_path: "/tmp/t.pdf".to_string(),
            is_processed: false,
        }
    }

    #[test]
    fn uid_is_stable_and_distinct() {
        let a = FilingStore::generate_uid("123", "2023-06-30", "doc1");
        let b = FilingStore::generate_uid("123", "2023-06-30", "doc1");
        let c = FilingStore::generate_uid("123", "2023-06-30", "doc2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn upsert_preserves_processed_flag() {
        let store = store();
        store.upsert_filing(&filing("u1", "123")).unwrap();
        store.mark_processed("u1").unwrap();
        store.upsert_filing(&filing("u1", "123")).unwrap();
        assert!(store.unprocessed_filings().unwrap().is_empty());
        let (total, processed, _) = store.counts().unwrap();
        assert_eq!((total, processed), (1, 1));
    }

    #[test]
    fn records_round_trip() {
        let store = store();
        store.upsert_filing(&filing("u1", "123")).unwrap();
        let record = FilingRecord {
            company_number: "123".to_string(),
            company: "Test Plc".to_string(),
            year: "2023".to_string(),
            external_auditor: "KPMG".to_string(),
            audit_fee: "125000".to_string(),
            fee_unit: "".to_string(),
            currency: "GBP".to_string(),
            filing_date: "2023-06-30".to_string(),
            confidence: Confidence::High,
            pdf_path: "/tmp/t.pdf".to_string(),
        };
        store.insert_record("u1", &record).unwrap();
        store.insert_record("u1", &record).unwrap();
        let loaded = store.all_records().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].external_auditor, "KPMG");
        assert_eq!(loaded[0].confidence, Confidence::High);
    }
}
