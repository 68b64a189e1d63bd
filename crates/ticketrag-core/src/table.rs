//! CSV-backed ticket tables.
//!
//! `TicketTable` is a plain header + rows view of a CSV file. `ReferenceTable`
//! is the table aligned row-for-row with the vector index; it also carries the
//! source-column priority list, resolved once at load time.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::context::Candidate;
use crate::error::{Error, Result};
use crate::types::{RetrievalHit, TicketRecord};

pub const KEY_COLUMNS: [&str; 3] = ["Ticket Key", "Key", "key"];
pub const STATUS_COLUMNS: [&str; 2] = ["Status", "status"];
pub const SUMMARY_COLUMNS: [&str; 2] = ["Summary", "summary"];

const REFERENCE_HINT: &str = "Run `ticketrag index` to build the index and reference table first.";

#[derive(Debug, Clone, Default)]
pub struct TicketTable {
    path: PathBuf,
    headers: Vec<String>,
    records: Vec<TicketRecord>,
    key_index: HashMap<String, usize>,
}

impl TicketTable {
    /// Read a CSV file with a header row. `hint` names the step that produces
    /// the file and is included in the error when it is missing.
    pub fn load_csv(path: &Path, hint: &str) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingFile { path: path.to_path_buf(), hint: hint.to_string() });
        }
        let csv_err = |source| Error::Csv { path: path.to_path_buf(), source };
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path).map_err(csv_err)?;
        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_string())
            .collect();

        let mut records = Vec::new();
        for row in reader.byte_records() {
            let row = row.map_err(csv_err)?;
            // Exports are not always valid UTF-8; keep what can be read.
            let pairs = headers.iter().zip(row.iter()).map(|(h, v)| (h.clone(), String::from_utf8_lossy(v).into_owned()));
            records.push(TicketRecord::from_pairs(pairs));
        }
        if records.is_empty() {
            return Err(Error::EmptyTable { path: path.to_path_buf() });
        }
        info!(path = %path.display(), rows = records.len(), columns = headers.len(), "loaded table");
        let mut table = Self::from_records(headers, records);
        table.path = path.to_path_buf();
        Ok(table)
    }

    pub fn from_records(headers: Vec<String>, records: Vec<TicketRecord>) -> Self {
        let key_column = KEY_COLUMNS.iter().find(|k| headers.iter().any(|h| h == *k)).copied();
        let mut key_index = HashMap::new();
        if let Some(column) = key_column {
            for (i, record) in records.iter().enumerate() {
                if let Some(key) = record.get(column) {
                    key_index.entry(key.to_string()).or_insert(i);
                }
            }
        }
        Self { path: PathBuf::new(), headers, records, key_index }
    }

    pub fn path(&self) -> &Path { &self.path }
    pub fn headers(&self) -> &[String] { &self.headers }
    pub fn records(&self) -> &[TicketRecord] { &self.records }
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
    pub fn get(&self, row: usize) -> Option<&TicketRecord> { self.records.get(row) }

    pub fn has_column(&self, column: &str) -> bool { self.headers.iter().any(|h| h == column) }

    /// First of `candidates` present as a header.
    pub fn first_column<'c>(&self, candidates: &[&'c str]) -> Option<&'c str> {
        candidates.iter().copied().find(|c| self.has_column(c))
    }

    pub fn require_columns(&self, columns: &[&str], hint: &str) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(Error::MissingColumn {
                column: (*missing).to_string(),
                path: self.path.clone(),
                hint: hint.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Value of the first present column among `candidates` for `row`.
    pub fn value(&self, row: usize, candidates: &[&str]) -> Option<&str> {
        let record = self.records.get(row)?;
        candidates.iter().find_map(|c| record.get(c))
    }

    /// Ticket key of `row`, or a positional placeholder when the table has none.
    pub fn key(&self, row: usize) -> String {
        self.value(row, &KEY_COLUMNS).map_or_else(|| format!("Ticket-{row}"), str::to_string)
    }

    pub fn find_by_key(&self, key: &str) -> Option<&TicketRecord> {
        self.key_index.get(key).and_then(|&i| self.records.get(i))
    }

    /// Ticket counts per status, when the table has a status column.
    pub fn status_counts(&self) -> Option<BTreeMap<String, usize>> {
        let column = self.first_column(&STATUS_COLUMNS)?;
        let mut counts = BTreeMap::new();
        for record in &self.records {
            if let Some(status) = record.get(column) {
                *counts.entry(status.to_string()).or_insert(0) += 1;
            }
        }
        Some(counts)
    }

    /// Write `headers` (in order) for every row to `path`.
    pub fn write_csv(&self, path: &Path, headers: &[String]) -> Result<()> {
        write_rows(path, headers, self.records.iter())
    }
}

/// Write records as CSV, projecting each onto `headers`.
pub fn write_rows<'r, I>(path: &Path, headers: &[String], records: I) -> Result<()>
where
    I: IntoIterator<Item = &'r TicketRecord>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let csv_err = |source| Error::Csv { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(headers).map_err(csv_err)?;
    for record in records {
        writer.write_record(headers.iter().map(|h| record.get(h).unwrap_or(""))).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ReferenceTable {
    table: TicketTable,
    source_columns: Vec<String>,
}

impl ReferenceTable {
    pub fn load(path: &Path, source_candidates: &[String]) -> Result<Self> {
        Self::new(TicketTable::load_csv(path, REFERENCE_HINT)?, source_candidates)
    }

    /// Resolve `source_candidates` against the table's headers, keeping the
    /// candidates' order. Fails when none of them exist.
    pub fn new(table: TicketTable, source_candidates: &[String]) -> Result<Self> {
        let source_columns: Vec<String> =
            source_candidates.iter().filter(|c| table.has_column(c)).cloned().collect();
        if source_columns.is_empty() {
            return Err(Error::MissingColumn {
                column: source_candidates.join(" | "),
                path: table.path.clone(),
                hint: "Run `ticketrag prepare` (and optionally `ticketrag rewrite`) before indexing.".to_string(),
            });
        }
        info!(columns = ?source_columns, "resolved source columns");
        Ok(Self { table, source_columns })
    }

    pub fn table(&self) -> &TicketTable { &self.table }
    pub fn len(&self) -> usize { self.table.len() }
    pub fn is_empty(&self) -> bool { self.table.is_empty() }
    pub fn source_columns(&self) -> &[String] { &self.source_columns }

    /// Source texts of `row`, most preferred first.
    pub fn candidate_texts(&self, row: usize) -> Vec<Option<&str>> {
        match self.table.get(row) {
            Some(record) => self.source_columns.iter().map(|c| record.get(c)).collect(),
            None => Vec::new(),
        }
    }

    /// Preferred non-blank source text of `row`.
    pub fn source_text(&self, row: usize) -> Option<&str> {
        Candidate::new(row, self.candidate_texts(row)).first_text()
    }

    /// Candidates for `hits`, in hit order. Sentinel and out-of-range rows are dropped.
    pub fn candidates(&self, hits: &[RetrievalHit]) -> Vec<Candidate<'_>> {
        hits.iter()
            .filter_map(|hit| hit.row_index(self.len()))
            .map(|row| Candidate::new(row, self.candidate_texts(row)))
            .collect()
    }

    /// Snapshot the rows that informed an answer, ranked from 1.
    /// Returns `false` without writing when `indices` is empty.
    pub fn export_rows(&self, indices: &[usize], path: &Path) -> Result<bool> {
        if indices.is_empty() {
            warn!("no valid tickets retrieved, nothing exported");
            return Ok(false);
        }
        let mut headers = vec!["retrieval_rank".to_string()];
        headers.extend(self.table.headers.iter().cloned());
        let ranked: Vec<TicketRecord> = indices
            .iter()
            .filter_map(|&i| self.table.get(i))
            .enumerate()
            .map(|(rank, record)| {
                let mut record = record.clone();
                record.fields.insert("retrieval_rank".to_string(), (rank + 1).to_string());
                record
            })
            .collect();
        write_rows(path, &headers, ranked.iter())?;
        Ok(true)
    }
}
