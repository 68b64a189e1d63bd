use std::fs;

use tempfile::TempDir;

use ticketrag_core::data_processor::{missing_by_column, DataProcessor, RewriteOptions};
use ticketrag_core::error::Error;
use ticketrag_core::table::TicketTable;

const EXPORT: &str = "\
Ticket Key,Summary,Description,Last Comment,Store Number,Status,Priority,Business Priority,Resolution
CAM-1,Camera offline,\"Issue: PTZ camera down. See https://wiki/x\",Hello team. Replaced PoE injector.,12.0,Open,High,P1,Swapped
CAM-2,,,,,Closed,Low,,
NET-3,Router down,* no internet,,7,Open,Medium,P2,
";

fn write_export(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("export.csv");
    fs::write(&path, EXPORT).unwrap();
    path
}

#[test]
fn inspect_reports_shape_and_missing_values() {
    let tmp = TempDir::new().unwrap();
    let report = DataProcessor::new().inspect(&write_export(&tmp)).unwrap();

    assert_eq!(report.rows, 3);
    assert_eq!(report.columns.len(), 9);
    assert_eq!(report.preview.len(), 3);
    let missing = missing_by_column(&report);
    assert_eq!(missing["Summary"], 1);
    assert_eq!(missing["Ticket Key"], 0);
    assert_eq!(missing["Resolution"], 2);
    assert!(report.average_lengths.iter().any(|(c, _)| c == "Description"));
}

#[test]
fn prepare_cleans_and_drops_empty_rows() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("data").join("cleaned.csv");
    let report = DataProcessor::new().prepare(&write_export(&tmp), &out).unwrap();

    assert_eq!(report.input_rows, 3);
    assert_eq!(report.kept_rows, 2);
    assert_eq!(report.dropped_rows(), 1);

    let table = TicketTable::load_csv(&out, "").unwrap();
    assert_eq!(
        table.headers(),
        ["Ticket Key", "Summary", "Store Number", "Status", "Priority", "Business Priority", "Cleaned_Text", "text"]
    );
    assert_eq!(table.key(0), "CAM-1");
    assert_eq!(
        table.value(0, &["Cleaned_Text"]),
        Some("Camera offline. The issue is PTZ camera down. See Replaced PoE injector.")
    );
    assert_eq!(
        table.value(1, &["text"]),
        Some("Router down. * no internet. . Priority: Medium, Business Priority: P2, Blocked Status: , Request Status: .")
    );
}

#[test]
fn prepare_requires_summary() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("export.csv");
    fs::write(&input, "Ticket Key,Description\nCAM-1,Camera down\n").unwrap();
    let err = DataProcessor::new().prepare(&input, &tmp.path().join("out.csv")).unwrap_err();
    assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "Summary"));
}

#[test]
fn rewrite_adds_column_from_first_available_source() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("ref.csv");
    let output = tmp.path().join("rewritten.csv");
    fs::write(&input, "Ticket Key,text\nCAM-1,\"Status: waiting\nThanks, Bo\"\nCAM-2,<b>Door</b> stuck\n").unwrap();

    let outcome = DataProcessor::new().rewrite(&input, &output, &RewriteOptions::default()).unwrap();
    assert_eq!(outcome.source_column, "text");
    assert_eq!(outcome.target_column, "Rewritten_Text");
    assert_eq!(outcome.rows, 2);

    let table = TicketTable::load_csv(&output, "").unwrap();
    assert_eq!(table.headers(), ["Ticket Key", "text", "Rewritten_Text"]);
    assert_eq!(table.value(0, &["Rewritten_Text"]), Some("Current status: waiting"));
    assert_eq!(table.value(1, &["Rewritten_Text"]), Some("Door stuck"));
}

#[test]
fn rewrite_dry_run_previews_without_writing() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("ref.csv");
    let output = tmp.path().join("rewritten.csv");
    fs::write(&input, "Ticket Key,Cleaned_Text\nA,Issue: one\nB,Issue: two\nC,Issue: three\n").unwrap();

    let options = RewriteOptions { dry_run: true, limit: 2, overwrite_source: true, ..Default::default() };
    let outcome = DataProcessor::new().rewrite(&input, &output, &options).unwrap();

    assert!(outcome.written.is_none());
    assert!(!output.exists());
    assert_eq!(outcome.target_column, "Cleaned_Text");
    assert_eq!(outcome.preview, vec![
        ("Issue: one".to_string(), "The issue is one".to_string()),
        ("Issue: two".to_string(), "The issue is two".to_string()),
    ]);
}

#[test]
fn rewrite_with_unknown_source_column_fails() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("ref.csv");
    fs::write(&input, "Ticket Key,Cleaned_Text\nA,x\n").unwrap();
    let options = RewriteOptions { source_column: Some("Body".into()), ..Default::default() };
    let err = DataProcessor::new().rewrite(&input, &tmp.path().join("o.csv"), &options).unwrap_err();
    assert!(matches!(err, Error::MissingColumn { .. }));
}
