mod common;

use serial_test::serial;
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;

use ticketrag_cli::commands::{self, InsightRequest};
use ticketrag_cli::pipeline::{confirm, select_steps, PipelineRunner, Step};
use ticketrag_cli::Workspace;
use ticketrag_core::config::Settings;
use ticketrag_core::error::Error;
use ticketrag_core::insight_log::InsightLog;
use ticketrag_core::table::TicketTable;

const EXPORT: &str = "\
Ticket Key,Summary,Description,Last Comment,Store Number,Status,Priority,Business Priority
CAM-1,Camera offline,Issue: PTZ camera down at the dock,Replaced PoE injector.,12.0,Open,High,P1
NET-2,Router down,No internet at the store since Monday,Rebooted the router.,7,Closed,Medium,P2
DOOR-3,Rear door,Door strike jammed,Dispatched a locksmith.,9,Open,Low,P3
";

#[test]
fn steps_run_in_canonical_order() {
    assert_eq!(select_steps(&[]), Step::ALL.to_vec());
    assert_eq!(select_steps(&[Step::Index, Step::Inspect]), vec![Step::Inspect, Step::Index]);
    assert_eq!("clean".parse::<Step>().unwrap(), Step::Prepare);
    assert_eq!("Chatbot".parse::<Step>().unwrap(), Step::Chat);
    assert!("deploy".parse::<Step>().is_err());
    assert_eq!(Step::Insights.number(), 4);
}

#[test]
fn confirm_uses_default_on_empty_reply() {
    assert!(confirm(&mut Cursor::new("\n"), "Launch?", true).unwrap());
    assert!(!confirm(&mut Cursor::new(""), "Run?", false).unwrap());
    assert!(confirm(&mut Cursor::new("YES\n"), "Run?", false).unwrap());
    assert!(!confirm(&mut Cursor::new("nope\n"), "Launch?", true).unwrap());
}

#[tokio::test]
#[serial]
async fn ingestion_steps_build_reference_and_index() {
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");
    let tmp = TempDir::new().unwrap();
    let workspace = Workspace::new(Settings::default(), tmp.path());
    fs::write(workspace.input_csv(), EXPORT).unwrap();

    let runner = PipelineRunner::new(workspace.clone(), true);
    let ok = runner.run(&[Step::Index, Step::Prepare, Step::Inspect], &mut Cursor::new("")).await.unwrap();
    std::env::remove_var("APP_USE_FAKE_EMBEDDINGS");

    assert!(ok);
    assert!(workspace.index_dir().is_dir());
    let reference = TicketTable::load_csv(&workspace.reference_csv(), "").unwrap();
    assert_eq!(reference.len(), 3);
    assert!(reference.has_column("Cleaned_Text"));
}

#[tokio::test]
#[serial]
async fn missing_export_stops_the_pipeline() {
    let tmp = TempDir::new().unwrap();
    let runner = PipelineRunner::new(Workspace::new(Settings::default(), tmp.path()), true);
    let ok = runner.run(&[Step::Inspect, Step::Prepare], &mut Cursor::new("")).await.unwrap();
    assert!(!ok);
}

#[test]
fn insight_request_rejects_bad_flags() {
    let tmp = TempDir::new().unwrap();
    let workspace = Workspace::new(Settings::default(), tmp.path());
    let mut request = InsightRequest::from_workspace(&workspace, "camera issues");
    assert!(request.validate().is_ok());

    request.top_k = 0;
    assert!(matches!(request.validate(), Err(Error::InvalidArgument(_))));
    request.top_k = 5;
    request.min_alpha_chars = 0;
    assert!(matches!(request.validate(), Err(Error::InvalidArgument(_))));
}

#[tokio::test]
async fn insights_are_logged_and_exported() {
    let tmp = TempDir::new().unwrap();
    let state = common::state(tmp.path());
    let workspace = Workspace::new(Settings::default(), tmp.path());
    let mut request = InsightRequest::from_workspace(&workspace, "what breaks most often?");
    request.min_context_length = 10;
    request.export_tickets = Some(tmp.path().join("slice.csv"));

    let insight = commands::insights(&state, &request).await.unwrap();
    assert!(!insight.context.used_fallback);
    assert_eq!(insight.context.indices, vec![0, 1, 2]);

    let log = InsightLog::new(workspace.insights_csv()).read_all().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].query, "what breaks most often?");
    assert_eq!(log[0].insight, insight.answer);

    let slice = TicketTable::load_csv(&tmp.path().join("slice.csv"), "").unwrap();
    assert_eq!(slice.len(), 3);
    assert_eq!(slice.headers()[0], "retrieval_rank");
}
