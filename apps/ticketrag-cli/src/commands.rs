//! The pipeline stages as callable steps, shared by the `ticketrag`
//! subcommands and the step runner.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use ticketrag_core::data_processor::{DataProcessor, InspectReport, PrepareReport, RewriteOptions, RewriteOutcome};
use ticketrag_core::error::Error;
use ticketrag_core::insight_log::InsightLog;
use ticketrag_core::prompt::truncate_chars;
use ticketrag_core::retrieval::{Insight, InsightOptions};
use ticketrag_core::types::TicketRecord;
use ticketrag_core::AssemblyConfig;
use ticketrag_vector::{build_index, IndexBuildReport, TicketIndexWriter};

use crate::runtime::{AppState, Workspace};

const PREVIEW_CELL_CHARS: usize = 60;
const REWRITE_PREVIEW_CHARS: usize = 160;

pub fn inspect(input: &Path) -> Result<InspectReport> {
    let report = DataProcessor::new().inspect(input)?;
    println!("✅ Loaded {} rows from {}", report.rows, report.path.display());
    println!("\n📋 Columns:");
    for column in &report.columns {
        println!("  - {column}");
    }
    println!("\n🔎 First {} rows:", report.preview.len());
    print_records(&report.columns, &report.preview);
    println!("\n🕳️  Missing values per column:");
    for (column, missing) in &report.missing {
        println!("  {column:<28} {missing}");
    }
    for (column, avg) in &report.average_lengths {
        println!("\n📏 Average {column} length: {avg:.1} characters");
    }
    Ok(report)
}

pub fn prepare(input: &Path, output: &Path) -> Result<PrepareReport> {
    let report = DataProcessor::new().prepare(input, output)?;
    println!("✅ Cleaned ticket table saved to {}", report.output.display());
    println!("📊 Kept {} of {} rows ({} without usable text dropped)", report.kept_rows, report.input_rows, report.dropped_rows());
    print_records(&report.columns, &report.preview);
    Ok(report)
}

pub fn rewrite(input: &Path, output: &Path, options: &RewriteOptions) -> Result<RewriteOutcome> {
    let outcome = DataProcessor::new().rewrite(input, output, options)?;
    println!("✏️  Rewrote {} rows: {} → {}", outcome.rows, outcome.source_column, outcome.target_column);
    for (i, (before, after)) in outcome.preview.iter().enumerate() {
        println!("\n[{}] before: {}", i + 1, truncate_chars(before, REWRITE_PREVIEW_CHARS));
        println!("    after:  {}", truncate_chars(after, REWRITE_PREVIEW_CHARS));
    }
    match &outcome.written {
        Some(path) => println!("\n💾 Saved rewritten table to {}", path.display()),
        None => println!("\n🧪 Dry run: nothing written"),
    }
    Ok(outcome)
}

/// Embed the cleaned table into a fresh index and write the reference table.
pub async fn index(workspace: &Workspace, cleaned: &Path) -> Result<IndexBuildReport> {
    let settings = &workspace.settings;
    let embedder = ticketrag_embed::get_default_embedder(&workspace.embedding_dir())?;
    let writer = TicketIndexWriter::new(&workspace.index_dir(), &settings.data.index_table);
    println!("📂 Indexing {}", cleaned.display());
    let report = build_index(cleaned, &workspace.reference_csv(), &writer, embedder.as_ref(), &settings.retrieval.source_columns).await?;
    println!("✅ Indexed {} tickets ({} dims) from {}", report.rows, report.dim, report.source_columns.join(", "));
    println!("🗂️  Index: {}", report.index_dir.display());
    println!("🗂️  Reference table: {}", report.reference_path.display());
    Ok(report)
}

/// One analytical question and what to do with the answer.
#[derive(Debug, Clone)]
pub struct InsightRequest {
    pub query: String,
    pub top_k: usize,
    pub min_alpha_chars: usize,
    pub min_context_length: usize,
    pub preview_chars: usize,
    pub save_to: Option<PathBuf>,
    pub export_tickets: Option<PathBuf>,
}

impl InsightRequest {
    /// Defaults from settings; save to the configured insight log.
    pub fn from_workspace(workspace: &Workspace, query: impl Into<String>) -> Self {
        let retrieval = &workspace.settings.retrieval;
        Self {
            query: query.into(),
            top_k: retrieval.top_k,
            min_alpha_chars: retrieval.min_alpha_chars,
            min_context_length: retrieval.min_context_length,
            preview_chars: retrieval.preview_chars,
            save_to: Some(workspace.insights_csv()),
            export_tickets: None,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.top_k == 0 {
            return Err(Error::InvalidArgument("--top-k must be a positive integer".into()));
        }
        if self.min_alpha_chars == 0 {
            return Err(Error::InvalidArgument("--min-context-chars must be a positive integer".into()));
        }
        if self.query.trim().is_empty() {
            return Err(Error::InvalidArgument("a question is required".into()));
        }
        Ok(())
    }
}

/// Generate, print and optionally persist one insight.
pub async fn insights(state: &AppState, request: &InsightRequest) -> Result<Insight> {
    request.validate()?;
    let retrieval = &state.settings.retrieval;
    let options = InsightOptions {
        top_k: request.top_k,
        max_output_length: state.settings.models.insight_max_length,
        assembly: AssemblyConfig {
            min_alpha_chars: request.min_alpha_chars,
            min_total_length: request.min_context_length,
            fallback: retrieval.fallback_context.clone(),
        },
    };
    let insight = state.engine.generate_insight(&request.query, &options).await?;
    if insight.context.used_fallback {
        println!("⚠️ Retrieved tickets are too sparse, using the fallback context.");
    }

    println!("\n🧩 Retrieved context preview:\n");
    println!("{}", truncate_chars(&insight.context.text, request.preview_chars));
    println!("\n──────────────────────────────────────────────\n");
    println!("📊 Query: {}", insight.query);
    println!("\n🧠 Insight:\n{}", insight.answer);

    match &request.save_to {
        Some(path) => {
            InsightLog::new(path).append(&insight.query, &insight.answer)?;
            println!("\n🗂️ Insight saved to: {}", path.display());
        }
        None => println!("\n💾 Insight persistence disabled (--no-save)."),
    }
    if let Some(path) = &request.export_tickets {
        if state.retriever().reference().export_rows(&insight.context.indices, path)? {
            println!("🗂️ Retrieved ticket snapshot saved to: {}", path.display());
        } else {
            println!("⚠️ No valid tickets retrieved, so nothing was exported.");
        }
    }
    info!(query = %insight.query, contributing = insight.context.indices.len(), "insight generated");
    Ok(insight)
}

fn print_records(columns: &[String], records: &[TicketRecord]) {
    for (i, record) in records.iter().enumerate() {
        println!("  #{i}");
        for column in columns {
            let value = record.get(column).unwrap_or("");
            println!("    {column}: {}", truncate_chars(value, PREVIEW_CELL_CHARS));
        }
    }
}
