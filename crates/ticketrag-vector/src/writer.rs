//! Index construction: embed every reference row and store it in LanceDB.
//!
//! Row `i` of the index always describes row `i` of the reference table, so
//! rows without text are embedded as empty strings rather than skipped.

use anyhow::{anyhow, Result};
use arrow_array::{FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use ticketrag_core::table::{ReferenceTable, TicketTable};
use ticketrag_core::traits::Embedder;

use crate::schema::ticket_schema;
use crate::table::open_db;

const DEFAULT_BATCH_SIZE: usize = 64;
const CLEANED_HINT: &str = "Run `ticketrag prepare` to create the cleaned ticket table first.";

#[derive(Debug, Clone)]
pub struct IndexBuildReport {
    pub rows: usize,
    pub dim: usize,
    pub source_columns: Vec<String>,
    pub reference_path: PathBuf,
    pub index_dir: PathBuf,
}

pub struct TicketIndexWriter {
    index_dir: PathBuf,
    table_name: String,
    batch_size: usize,
    show_progress: bool,
}

impl TicketIndexWriter {
    pub fn new(index_dir: &Path, table_name: &str) -> Self {
        Self {
            index_dir: index_dir.to_path_buf(),
            table_name: table_name.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            show_progress: true,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Hide the progress bar (tests, non-interactive runs).
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn index_dir(&self) -> &Path { &self.index_dir }
    pub fn table_name(&self) -> &str { &self.table_name }

    /// Replace the index with one vector per reference row. Returns the number
    /// of rows written.
    pub async fn build(&self, reference: &ReferenceTable, embedder: &dyn Embedder) -> Result<usize> {
        if reference.is_empty() {
            return Err(anyhow!("no tickets to index"));
        }
        let dim = i32::try_from(embedder.dim())?;
        if self.index_dir.exists() {
            info!(dir = %self.index_dir.display(), "replacing existing index");
            std::fs::remove_dir_all(&self.index_dir)?;
        }
        std::fs::create_dir_all(&self.index_dir)?;
        let db = open_db(&self.index_dir).await?;

        let pb = self.progress_bar(reference.len());
        let mut table: Option<lancedb::Table> = None;
        let rows: Vec<usize> = (0..reference.len()).collect();
        for chunk in rows.chunks(self.batch_size) {
            let texts: Vec<String> =
                chunk.iter().map(|&row| reference.source_text(row).unwrap_or_default().to_string()).collect();
            let vectors = embedder.embed_batch(&texts)?;
            if vectors.len() != texts.len() {
                return Err(anyhow!("embedder returned {} vectors for {} texts", vectors.len(), texts.len()));
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dim()) {
                return Err(anyhow!("dim mismatch: got {} expected {}", bad.len(), embedder.dim()));
            }

            let batch = to_record_batch(reference, chunk, texts, vectors, dim)?;
            let schema = batch.schema();
            let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
            if let Some(t) = &table {
                t.add(reader).execute().await?;
            } else {
                table = Some(db.create_table(&self.table_name, reader).execute().await?);
            }
            pb.inc(chunk.len() as u64);
        }
        pb.finish_with_message("✅ Index built");
        info!(rows = reference.len(), dim, table = %self.table_name, "📊 Indexed tickets into LanceDB");
        Ok(reference.len())
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tickets ({percent}%) {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}

fn to_record_batch(
    reference: &ReferenceTable,
    rows: &[usize],
    texts: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dim: i32,
) -> Result<RecordBatch> {
    let row_ids: Vec<i64> = rows.iter().map(|&r| r as i64).collect();
    let keys: Vec<String> = rows.iter().map(|&r| reference.table().key(r)).collect();
    let vectors: Vec<Option<Vec<Option<f32>>>> =
        vectors.into_iter().map(|v| Some(v.into_iter().map(Some).collect())).collect();
    Ok(RecordBatch::try_new(
        ticket_schema(dim),
        vec![
            Arc::new(Int64Array::from(row_ids)),
            Arc::new(StringArray::from(keys)),
            Arc::new(StringArray::from(texts)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
        ],
    )?)
}

/// Load the cleaned table, write it out as the reference table and index it.
pub async fn build_index(
    cleaned_csv: &Path,
    reference_csv: &Path,
    writer: &TicketIndexWriter,
    embedder: &dyn Embedder,
    source_columns: &[String],
) -> Result<IndexBuildReport> {
    let table = TicketTable::load_csv(cleaned_csv, CLEANED_HINT)?;
    let reference = ReferenceTable::new(table, source_columns)?;
    reference.table().write_csv(reference_csv, reference.table().headers())?;
    info!(path = %reference_csv.display(), rows = reference.len(), "wrote reference table");

    let rows = writer.build(&reference, embedder).await?;
    Ok(IndexBuildReport {
        rows,
        dim: embedder.dim(),
        source_columns: reference.source_columns().to_vec(),
        reference_path: reference_csv.to_path_buf(),
        index_dir: writer.index_dir().to_path_buf(),
    })
}
