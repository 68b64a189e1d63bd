use anyhow::{anyhow, Result};
use arrow_array::{Float32Array, Int64Array};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;
use std::path::Path;

use ticketrag_core::error::Error;
use ticketrag_core::traits::SimilarityIndex;
use ticketrag_core::types::RetrievalHit;

use crate::schema::{DISTANCE_COLUMN, ROW_COLUMN};
use crate::table::open_existing;

/// Exact L2 search over the ticket vectors of one LanceDB table.
pub struct LanceTicketIndex {
    table: lancedb::Table,
}

impl LanceTicketIndex {
    pub async fn open(index_dir: &Path, table_name: &str) -> Result<Self> {
        Ok(Self { table: open_existing(index_dir, table_name).await? })
    }
}

#[async_trait]
impl SimilarityIndex for LanceTicketIndex {
    async fn count(&self) -> Result<usize> { Ok(self.table.count_rows(None).await?) }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievalHit>> {
        if self.count().await? == 0 {
            return Err(Error::EmptyIndex.into());
        }
        let mut stream = self
            .table
            .vector_search(query_vec.to_vec())?
            .distance_type(DistanceType::L2)
            .limit(k)
            .execute()
            .await?;

        let mut hits = Vec::with_capacity(k);
        while let Some(batch) = stream.try_next().await? {
            let rows = batch
                .column_by_name(ROW_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
                .ok_or_else(|| anyhow!("search results lack the '{ROW_COLUMN}' column"))?;
            let distances = batch
                .column_by_name(DISTANCE_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| anyhow!("search results lack the '{DISTANCE_COLUMN}' column"))?;
            for i in 0..batch.num_rows() {
                hits.push(RetrievalHit::new(rows.value(i), distances.value(i)));
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }
}
