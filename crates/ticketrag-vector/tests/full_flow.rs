use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use ticketrag_core::error::Error;
use ticketrag_core::retrieval::TicketRetriever;
use ticketrag_core::table::TicketTable;
use ticketrag_core::traits::{Embedder, SimilarityIndex};
use ticketrag_core::ReferenceTable;
use ticketrag_embed::FakeEmbedder;
use ticketrag_vector::{build_index, LanceTicketIndex, TicketIndexWriter};

const CLEANED: &str = "\
Ticket Key,Summary,Status,Cleaned_Text
CAM-1,Dock camera,Open,PTZ camera offline at the loading dock
NET-2,Store router,Closed,router lost internet connectivity overnight
DOOR-3,Rear door,Open,rear door strike jammed and access badge reader dead
HW-4,NVR disk,Open,
";

fn sources() -> Vec<String> { vec!["Rewritten_Text".to_string(), "Cleaned_Text".to_string()] }

#[tokio::test]
async fn build_then_search_returns_aligned_rows() {
    let tmp = TempDir::new().expect("tmp");
    let cleaned = tmp.path().join("cleaned.csv");
    let reference_csv = tmp.path().join("data").join("reference.csv");
    let index_dir = tmp.path().join("index.lance");
    fs::write(&cleaned, CLEANED).unwrap();

    let embedder = FakeEmbedder::new(32);
    let writer = TicketIndexWriter::new(&index_dir, "tickets").with_batch_size(2).quiet();
    let report = build_index(&cleaned, &reference_csv, &writer, &embedder, &sources()).await.expect("build");
    assert_eq!(report.rows, 4);
    assert_eq!(report.dim, 32);
    assert_eq!(report.source_columns, vec!["Cleaned_Text".to_string()]);
    assert_eq!(TicketTable::load_csv(&reference_csv, "").unwrap().len(), 4);

    let index = LanceTicketIndex::open(&index_dir, "tickets").await.expect("open");
    assert_eq!(index.count().await.unwrap(), 4);

    // The exact text of a row is its own nearest neighbour.
    let query = embedder.embed_batch(&["router lost internet connectivity overnight".to_string()]).unwrap().remove(0);
    let hits = index.search(&query, 3).await.expect("search");
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].row, 1);
    assert!(hits[0].distance.abs() < 1e-4);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[tokio::test]
async fn rebuild_replaces_previous_rows() {
    let tmp = TempDir::new().expect("tmp");
    let cleaned = tmp.path().join("cleaned.csv");
    let index_dir = tmp.path().join("index.lance");
    fs::write(&cleaned, CLEANED).unwrap();
    let embedder = FakeEmbedder::new(16);
    let writer = TicketIndexWriter::new(&index_dir, "tickets").quiet();

    build_index(&cleaned, &tmp.path().join("ref.csv"), &writer, &embedder, &sources()).await.unwrap();
    build_index(&cleaned, &tmp.path().join("ref.csv"), &writer, &embedder, &sources()).await.unwrap();

    let index = LanceTicketIndex::open(&index_dir, "tickets").await.unwrap();
    assert_eq!(index.count().await.unwrap(), 4);
}

#[tokio::test]
async fn missing_index_names_the_indexer() {
    let tmp = TempDir::new().expect("tmp");
    let err = LanceTicketIndex::open(&tmp.path().join("nope.lance"), "tickets").await.err().expect("missing");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MissingFile { .. })));
    assert!(err.to_string().contains("ticketrag index"));
}

#[tokio::test]
async fn retriever_over_lance_index_clamps_k() {
    let tmp = TempDir::new().expect("tmp");
    let cleaned = tmp.path().join("cleaned.csv");
    let reference_csv = tmp.path().join("reference.csv");
    let index_dir = tmp.path().join("index.lance");
    fs::write(&cleaned, CLEANED).unwrap();
    let writer = TicketIndexWriter::new(&index_dir, "tickets").quiet();
    build_index(&cleaned, &reference_csv, &writer, &FakeEmbedder::new(24), &sources()).await.unwrap();

    let reference = ReferenceTable::load(&reference_csv, &sources()).unwrap();
    let index = LanceTicketIndex::open(&index_dir, "tickets").await.unwrap();
    let retriever = TicketRetriever::new(Arc::new(FakeEmbedder::new(24)), Arc::new(index), Arc::new(reference));

    let hits = retriever.retrieve("camera offline", 50).await.unwrap();
    assert_eq!(hits.len(), 4);
    let views = retriever.ticket_views(&hits);
    assert_eq!(views.len(), 4);
    assert!(views.iter().any(|v| v.ticket_id == "DOOR-3"));
}
