use tender_radar::fallback;
use tender_radar::heuristics::{Confidence, FeeMethod, FieldExtractors};
use tender_radar::record::FilingRecord;
use tender_radar::shortlist::{TenderStatus, build_shortlist};

const ANNUAL_REPORT_TEXT: &str = "\
STRICTLY SAMPLE PLC\n\
Annual report and financial statements\n\
for the year ended 31 December 2023\n\
\n\
Independent auditors' report to the members of Strictly Sample plc\n\
KPMG LLP\n\
Chartered Accountants\n\
\n\
Notes to the financial statements (amounts in £'000)\n\
Auditors' remuneration\n\
Audit of the financial statements 125\n\
Other services 30\n";

#[test]
fn full_extraction_from_report_text() {
    let extractors = FieldExtractors::new();
    let fields = extractors.extract(ANNUAL_REPORT_TEXT, "2024-04-02");

    assert_eq!(fields.auditor, "KPMG");
    assert_eq!(fields.confidence, Confidence::High);
    assert_eq!(fields.fee, "125");
    assert_eq!(fields.fee_method, FeeMethod::Table);
    assert_eq!(fields.currency, "GBP");
    assert_eq!(fields.unit, "thousand");
    assert_eq!(fields.year, "2023");
    assert!(!fields.missing_any());
}

#[test]
fn recovery_never_overwrites_primary_fields() {
    let extractors = FieldExtractors::new();
    let mut primary = extractors.extract(ANNUAL_REPORT_TEXT, "2024-04-02");

    // An adversarial optical pass that disagrees on every field.
    let optical_text = "\
Independent auditors' report\n\
Deloitte LLP\n\
Auditors' remuneration\n\
Statutory audit 999,999\n\
All figures in millions, USD\n\
for the year ended 31 December 2001\n";

    fallback::apply_recovery(&mut primary, &extractors, "2024-04-02", optical_text);
    assert_eq!(primary.auditor, "KPMG");
    assert_eq!(primary.fee, "125");
    assert_eq!(primary.currency, "GBP");
    assert_eq!(primary.unit, "thousand");
    assert_eq!(primary.year, "2023");

    // And applying it again changes nothing either.
    let snapshot = primary.clone();
    fallback::apply_recovery(&mut primary, &extractors, "2024-04-02", optical_text);
    assert_eq!(primary.auditor, snapshot.auditor);
    assert_eq!(primary.fee, snapshot.fee);
    assert_eq!(primary.currency, snapshot.currency);
    assert_eq!(primary.unit, snapshot.unit);
    assert_eq!(primary.year, snapshot.year);
}

#[test]
fn recovery_fills_gaps_from_optical_text() {
    let extractors = FieldExtractors::new();
    // Primary pass over useless text: everything empty but the year.
    let mut primary = extractors.extract("nothing useful here", "2024-04-02");
    assert!(primary.missing_any());

    fallback::apply_recovery(&mut primary, &extractors, "2024-04-02", ANNUAL_REPORT_TEXT);
    assert_eq!(primary.auditor, "KPMG");
    assert_eq!(primary.confidence, Confidence::High);
    assert_eq!(primary.fee, "125");
    assert_eq!(primary.currency, "GBP");
    assert_eq!(primary.unit, "thousand");
    // The filing date already resolved the year in the primary pass.
    assert_eq!(primary.year, "2024");
}

fn record(year: &str, auditor: &str, fee: &str, unit: &str) -> FilingRecord {
    FilingRecord {
        company_number: "01234567".to_string(),
        company: "Strictly Sample Plc".to_string(),
        year: year.to_string(),
        external_auditor: auditor.to_string(),
        audit_fee: fee.to_string(),
        fee_unit: unit.to_string(),
        currency: "GBP".to_string(),
        filing_date: format!("{year}-12-31"),
        confidence: Confidence::High,
        pdf_path: String::new(),
    }
}

#[test]
fn history_to_shortlist_worked_example() {
    let history = vec![
        record("2023", "PwC", "2", "million"),
        record("2022", "PwC", "1.9", "million"),
        record("2021", "PwC", "1.8", "million"),
        record("2020", "EY", "1.5", "million"),
    ];
    let shortlist = build_shortlist(&history);
    assert_eq!(shortlist.len(), 1);

    let entry = &shortlist[0];
    assert_eq!(entry.current_external_auditor, "PwC");
    assert_eq!(entry.continuous_tenure_years, 3);
    assert_eq!(entry.latest_audit_fee_gbp, Some(2_000_000.0));
    assert_eq!(entry.tender_status, TenderStatus::Monitor);

    let fee_score = 2_000_000.0f64.ln_1p() * 5.0;
    let expected = ((0.65 * 30.0 + 0.35 * fee_score) * 100.0).round() / 100.0;
    assert_eq!(entry.priority_score, expected);
}

#[test]
fn long_tenure_and_large_fee_is_hot() {
    let history: Vec<FilingRecord> = (0..9)
        .map(|i| record(&format!("{}", 2023 - i), "Deloitte", "1.2", "million"))
        .collect();
    let entry = &build_shortlist(&history)[0];
    assert_eq!(entry.continuous_tenure_years, 9);
    assert_eq!(entry.tender_status, TenderStatus::Hot);
}

#[test]
fn long_tenure_without_fee_is_watch() {
    let history: Vec<FilingRecord> = (0..7)
        .map(|i| record(&format!("{}", 2023 - i), "Deloitte", "", ""))
        .collect();
    let entry = &build_shortlist(&history)[0];
    assert_eq!(entry.continuous_tenure_years, 7);
    assert_eq!(entry.tender_status, TenderStatus::Watch);
}
