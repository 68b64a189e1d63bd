#![allow(dead_code)]

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use ticketrag_cli::AppState;
use ticketrag_core::config::Settings;
use ticketrag_core::traits::SimilarityIndex;
use ticketrag_core::types::RetrievalHit;
use ticketrag_core::ReferenceTable;
use ticketrag_embed::FakeEmbedder;
use ticketrag_generate::EchoGenerator;

pub const REFERENCE: &str = "\
Ticket Key,Summary,Status,Cleaned_Text
CAM-1,Dock camera,Open,PTZ camera offline at the loading dock after a power surge
NET-2,Store router,Closed,router lost internet connectivity overnight and was rebooted
DOOR-3,Rear door,Open,rear door strike jammed and the access badge reader is dead
";

/// Every row in table order, half a unit apart.
pub struct TableOrderIndex {
    pub rows: usize,
}

#[async_trait]
impl SimilarityIndex for TableOrderIndex {
    async fn count(&self) -> anyhow::Result<usize> { Ok(self.rows) }
    async fn search(&self, _query_vec: &[f32], k: usize) -> anyhow::Result<Vec<RetrievalHit>> {
        if self.rows == 0 {
            return Err(ticketrag_core::error::Error::EmptyIndex.into());
        }
        Ok((0..self.rows.min(k)).map(|row| RetrievalHit::new(row as i64, row as f32 * 0.5)).collect())
    }
}

pub fn state_with_index(dir: &Path, indexed_rows: usize) -> AppState {
    let path = dir.join("reference.csv");
    fs::write(&path, REFERENCE).expect("write reference");
    let settings = Settings::default();
    let reference = ReferenceTable::load(&path, &settings.retrieval.source_columns).expect("reference");
    AppState::from_parts(
        settings,
        Arc::new(FakeEmbedder::new(16)),
        Arc::new(TableOrderIndex { rows: indexed_rows }),
        reference,
        None,
        Arc::new(EchoGenerator),
    )
}

pub fn state(dir: &Path) -> AppState { state_with_index(dir, 3) }
