//! Query-time services shared by the CLI, the chat loop and the HTTP server.
//!
//! `TicketRetriever` owns the read-only state loaded once per process
//! (embedder, index, reference table, optional full export). `InsightEngine`
//! layers prompt construction and generation on top of it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{AssemblyConfig, ContextAssembler};
use crate::error::Error;
use crate::prompt::{build_prompt, build_question_prompt, truncate_chars, QUESTION_TICKETS};
use crate::table::{ReferenceTable, TicketTable, STATUS_COLUMNS, SUMMARY_COLUMNS};
use crate::traits::{Embedder, Generator, SimilarityIndex};
use crate::types::{ContextBlock, RetrievalHit, TicketDetails, TicketRecord, TicketView};

pub const DEFAULT_PREVIEW_CHARS: usize = 800;

pub struct TicketRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
    reference: Arc<ReferenceTable>,
    original: Option<Arc<TicketTable>>,
    preview_chars: usize,
}

impl TicketRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn SimilarityIndex>, reference: Arc<ReferenceTable>) -> Self {
        Self { embedder, index, reference, original: None, preview_chars: DEFAULT_PREVIEW_CHARS }
    }

    /// Enrich ticket views with columns from the full export.
    pub fn with_original(mut self, original: TicketTable) -> Self {
        self.original = Some(Arc::new(original));
        self
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    pub fn reference(&self) -> &ReferenceTable { &self.reference }
    pub fn original(&self) -> Option<&TicketTable> { self.original.as_deref() }

    pub async fn indexed_count(&self) -> anyhow::Result<usize> { self.index.count().await }

    /// Nearest tickets to `query`, ascending distance. `k` is clamped to the
    /// index size; an empty index is an error.
    pub async fn retrieve(&self, query: &str, k: usize) -> anyhow::Result<Vec<RetrievalHit>> {
        if k == 0 {
            return Err(Error::InvalidArgument("top_k must be a positive integer".into()).into());
        }
        let total = self.index.count().await?;
        if total == 0 {
            return Err(Error::EmptyIndex.into());
        }
        let k = k.min(total);

        let query_vec = self
            .embedder
            .embed_batch(&[query.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))?;
        let mut hits = self.index.search(&query_vec, k).await?;
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        debug!(k, hits = hits.len(), "retrieved");
        Ok(hits)
    }

    pub fn assemble(&self, hits: &[RetrievalHit], config: AssemblyConfig) -> ContextBlock {
        ContextAssembler::new(config).assemble_hits(&self.reference, hits)
    }

    /// Views for `hits`, in hit order. Sentinel and out-of-range rows are skipped.
    pub fn ticket_views(&self, hits: &[RetrievalHit]) -> Vec<TicketView> {
        hits.iter()
            .filter_map(|hit| hit.row_index(self.reference.len()).map(|row| self.ticket_view(row, hit.similarity())))
            .collect()
    }

    fn ticket_view(&self, row: usize, similarity: f32) -> TicketView {
        let table = self.reference.table();
        let ticket_id = table.key(row);
        let text = self.reference.source_text(row).unwrap_or_default();
        let details = self
            .original
            .as_ref()
            .and_then(|original| original.find_by_key(&ticket_id))
            .map(|record| ticket_details(record, self.preview_chars));

        TicketView {
            summary: table.value(row, &SUMMARY_COLUMNS).unwrap_or("N/A").to_string(),
            status: table.value(row, &STATUS_COLUMNS).unwrap_or("N/A").to_string(),
            text: truncate_chars(text, self.preview_chars).to_string(),
            similarity,
            details,
            ticket_id,
        }
    }
}

fn ticket_details(record: &TicketRecord, preview_chars: usize) -> TicketDetails {
    let field = |column: &str| record.get(column).map(str::to_string);
    TicketDetails {
        store_number: record.get("Store Number").and_then(store_number),
        priority: field("Priority"),
        business_priority: field("Business Priority"),
        description: record.get("Description").map(|d| truncate_chars(d, preview_chars).to_string()),
        last_comment: field("Last Comment"),
        assignee: field("Assignee"),
        reporter: field("Reporter"),
        created: field("Created"),
        updated: field("Updated"),
        blocked_status: field("Blocked Status"),
        request_status: field("Request Status"),
        epic_link: field("Epic Link"),
    }
}

/// Store numbers come out of spreadsheets as `1234.0`; render them as integers.
pub fn store_number(raw: &str) -> Option<String> {
    let value: f64 = raw.trim().parse().ok()?;
    value.is_finite().then(|| format!("{}", value.trunc() as i64))
}

#[derive(Debug, Clone)]
pub struct InsightOptions {
    pub top_k: usize,
    pub max_output_length: usize,
    pub assembly: AssemblyConfig,
}

impl Default for InsightOptions {
    fn default() -> Self { Self { top_k: 10, max_output_length: 700, assembly: AssemblyConfig::default() } }
}

#[derive(Debug, Clone)]
pub struct Insight {
    pub query: String,
    pub hits: Vec<RetrievalHit>,
    pub context: ContextBlock,
    pub prompt: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub query: String,
    pub tickets: Vec<TicketView>,
    pub prompt: String,
    pub answer: String,
}

pub struct InsightEngine {
    retriever: Arc<TicketRetriever>,
    generator: Arc<dyn Generator>,
}

impl InsightEngine {
    pub fn new(retriever: Arc<TicketRetriever>, generator: Arc<dyn Generator>) -> Self { Self { retriever, generator } }

    pub fn retriever(&self) -> &Arc<TicketRetriever> { &self.retriever }
    pub fn generator(&self) -> &Arc<dyn Generator> { &self.generator }

    /// Retrieve, assemble, prompt and generate an executive summary.
    pub async fn generate_insight(&self, query: &str, options: &InsightOptions) -> anyhow::Result<Insight> {
        let query = require_query(query)?;
        let hits = self.retriever.retrieve(query, options.top_k).await?;
        let context = self.retriever.assemble(&hits, options.assembly.clone());
        if context.used_fallback {
            info!(valid = context.indices.len(), "context too sparse, using fallback summary context");
        }
        let prompt = build_prompt(&context.text);
        let answer = self.generator.generate(&prompt, options.max_output_length)?;
        Ok(Insight { query: query.to_string(), hits, context, prompt, answer })
    }

    /// Retrieval half of question answering: the top `k` ticket views and
    /// the prompt quoting the first few of them.
    pub async fn question_prompt(&self, query: &str, k: usize) -> anyhow::Result<(Vec<TicketView>, String)> {
        let query = require_query(query)?;
        let hits = self.retriever.retrieve(query, k).await?;
        let tickets = self.retriever.ticket_views(&hits);
        let prompt = build_question_prompt(query, &tickets[..tickets.len().min(QUESTION_TICKETS)]);
        Ok((tickets, prompt))
    }

    pub async fn answer_question(&self, query: &str, k: usize, max_output_length: usize) -> anyhow::Result<Answer> {
        let (tickets, prompt) = self.question_prompt(query, k).await?;
        let answer = self.generator.generate(&prompt, max_output_length)?;
        Ok(Answer { query: query.trim().to_string(), tickets, prompt, answer })
    }
}

fn require_query(query: &str) -> Result<&str, Error> {
    let query = query.trim();
    if query.is_empty() {
        return Err(Error::InvalidArgument("query must not be empty".into()));
    }
    Ok(query)
}
