//! Ingestion stages that turn a raw Jira export into indexable tables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::normalize::{normalize, strip_urls};
use crate::table::{write_rows, TicketTable};
use crate::types::TicketRecord;

pub const CLEANED_COLUMN: &str = "Cleaned_Text";
pub const TEXT_COLUMN: &str = "text";
pub const REWRITTEN_COLUMN: &str = "Rewritten_Text";

/// Columns carried over from the export by `prepare`, when present.
pub const KEPT_COLUMNS: [&str; 6] = ["Ticket Key", "Summary", "Store Number", "Status", "Priority", "Business Priority"];
/// Columns `prepare` cannot work without.
pub const REQUIRED_COLUMNS: [&str; 2] = ["Ticket Key", "Summary"];
/// Source columns tried by `rewrite` when none is given.
pub const REWRITE_SOURCE_COLUMNS: [&str; 2] = [CLEANED_COLUMN, TEXT_COLUMN];

const PREVIEW_ROWS: usize = 5;
const EXPORT_HINT: &str = "Export the tickets from Jira as CSV and point `data.input_csv` at it.";
const PREPARE_HINT: &str = "Run `ticketrag prepare` first.";

#[derive(Debug, Clone)]
pub struct InspectReport {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
    pub preview: Vec<TicketRecord>,
    /// Empty cells per column, in header order.
    pub missing: Vec<(String, usize)>,
    /// Mean character length of long-text columns that exist.
    pub average_lengths: Vec<(String, f64)>,
}

#[derive(Debug, Clone)]
pub struct PrepareReport {
    pub output: PathBuf,
    pub columns: Vec<String>,
    pub input_rows: usize,
    pub kept_rows: usize,
    pub preview: Vec<TicketRecord>,
}

impl PrepareReport {
    pub fn dropped_rows(&self) -> usize { self.input_rows - self.kept_rows }
}

#[derive(Debug, Clone)]
pub struct RewriteOptions {
    /// Column to rewrite; the first of `REWRITE_SOURCE_COLUMNS` when `None`.
    pub source_column: Option<String>,
    pub output_column: String,
    pub overwrite_source: bool,
    pub dry_run: bool,
    /// Preview rows returned with the outcome.
    pub limit: usize,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            source_column: None,
            output_column: REWRITTEN_COLUMN.to_string(),
            overwrite_source: false,
            dry_run: false,
            limit: PREVIEW_ROWS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub source_column: String,
    pub target_column: String,
    pub rows: usize,
    /// (before, after) pairs for the first `limit` rows.
    pub preview: Vec<(String, String)>,
    /// Where the table was written; `None` on a dry run.
    pub written: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DataProcessor;

impl DataProcessor {
    pub fn new() -> Self { Self }

    pub fn inspect(&self, input: &Path) -> Result<InspectReport> {
        let table = TicketTable::load_csv(input, EXPORT_HINT)?;
        let missing = table
            .headers()
            .iter()
            .map(|h| (h.clone(), table.records().iter().filter(|r| r.get(h).is_none()).count()))
            .collect();
        let average_lengths = ["Description", "Resolution"]
            .iter()
            .filter(|c| table.has_column(c))
            .map(|c| {
                let total: usize =
                    table.records().iter().map(|r| r.get(c).map_or(0, |v| v.chars().count())).sum();
                (c.to_string(), total as f64 / table.len() as f64)
            })
            .collect();

        Ok(InspectReport {
            path: input.to_path_buf(),
            rows: table.len(),
            columns: table.headers().to_vec(),
            preview: table.records().iter().take(PREVIEW_ROWS).cloned().collect(),
            missing,
            average_lengths,
        })
    }

    /// Build the cleaned table the indexer consumes. Rows whose cleaned text
    /// has no letters or digits left are dropped.
    pub fn prepare(&self, input: &Path, output: &Path) -> Result<PrepareReport> {
        let table = TicketTable::load_csv(input, EXPORT_HINT)?;
        table.require_columns(&REQUIRED_COLUMNS, EXPORT_HINT)?;

        let mut columns: Vec<String> =
            KEPT_COLUMNS.iter().filter(|c| table.has_column(c)).map(|c| c.to_string()).collect();
        columns.push(CLEANED_COLUMN.to_string());
        columns.push(TEXT_COLUMN.to_string());

        let prepared: Vec<TicketRecord> = table
            .records()
            .iter()
            .filter_map(|record| {
                let cleaned = normalize(strip_urls(&combined_description(record)).as_str());
                // A row with no summary, description or comment cleans down to ".".
                if !cleaned.chars().any(char::is_alphanumeric) {
                    return None;
                }
                let kept = KEPT_COLUMNS.iter().filter_map(|c| record.get(c).map(|v| (c.to_string(), v.to_string())));
                let derived = [(CLEANED_COLUMN.to_string(), cleaned), (TEXT_COLUMN.to_string(), labelled_text(record))];
                Some(TicketRecord::from_pairs(kept.chain(derived)))
            })
            .collect();

        if prepared.is_empty() {
            warn!(input = %input.display(), "no ticket produced any cleaned text");
        }
        write_rows(output, &columns, prepared.iter())?;
        info!(output = %output.display(), kept = prepared.len(), total = table.len(), "prepared tickets");

        Ok(PrepareReport {
            output: output.to_path_buf(),
            columns,
            input_rows: table.len(),
            kept_rows: prepared.len(),
            preview: prepared.into_iter().take(PREVIEW_ROWS).collect(),
        })
    }

    /// Normalize one text column of `input` into `options.output_column` (or
    /// in place), writing the result to `output` unless this is a dry run.
    pub fn rewrite(&self, input: &Path, output: &Path, options: &RewriteOptions) -> Result<RewriteOutcome> {
        let table = TicketTable::load_csv(input, PREPARE_HINT)?;
        let source_column = match &options.source_column {
            Some(column) => {
                table.require_columns(&[column.as_str()], PREPARE_HINT)?;
                column.clone()
            }
            None => table
                .first_column(&REWRITE_SOURCE_COLUMNS)
                .map(str::to_string)
                .ok_or_else(|| Error::MissingColumn {
                    column: REWRITE_SOURCE_COLUMNS.join(" | "),
                    path: input.to_path_buf(),
                    hint: PREPARE_HINT.to_string(),
                })?,
        };
        let target_column =
            if options.overwrite_source { source_column.clone() } else { options.output_column.clone() };
        if target_column.trim().is_empty() {
            return Err(Error::InvalidArgument("output column name must not be empty".into()));
        }

        let mut preview = Vec::new();
        let mut records = Vec::with_capacity(table.len());
        for record in table.records() {
            let before = record.get(&source_column).unwrap_or_default();
            let after = normalize(before);
            if preview.len() < options.limit {
                preview.push((before.to_string(), after.clone()));
            }
            let mut record = record.clone();
            if after.is_empty() {
                record.fields.remove(&target_column);
            } else {
                record.fields.insert(target_column.clone(), after);
            }
            records.push(record);
        }

        let written = if options.dry_run {
            info!(source = %source_column, "dry run, nothing written");
            None
        } else {
            let mut headers = table.headers().to_vec();
            if !headers.contains(&target_column) {
                headers.push(target_column.clone());
            }
            write_rows(output, &headers, records.iter())?;
            info!(output = %output.display(), source = %source_column, target = %target_column, "rewrote tickets");
            Some(output.to_path_buf())
        };

        Ok(RewriteOutcome { source_column, target_column, rows: records.len(), preview, written })
    }
}

/// `Summary. Description Last Comment` with missing cells left empty.
pub fn combined_description(record: &TicketRecord) -> String {
    let field = |c: &str| record.get(c).unwrap_or_default();
    format!("{}. {} {}", field("Summary"), field("Description"), field("Last Comment"))
}

/// Raw text with the triage fields spelled out, kept next to the cleaned text.
pub fn labelled_text(record: &TicketRecord) -> String {
    let field = |c: &str| record.get(c).unwrap_or_default();
    format!(
        "{}. {}. {}. Priority: {}, Business Priority: {}, Blocked Status: {}, Request Status: {}.",
        field("Summary"),
        field("Description"),
        field("Last Comment"),
        field("Priority"),
        field("Business Priority"),
        field("Blocked Status"),
        field("Request Status"),
    )
}

/// Missing-value counts as a map, for callers that want lookups.
pub fn missing_by_column(report: &InspectReport) -> BTreeMap<&str, usize> {
    report.missing.iter().map(|(c, n)| (c.as_str(), *n)).collect()
}
