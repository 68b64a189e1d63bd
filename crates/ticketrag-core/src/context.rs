//! Context assembly: retrieved rows in, one bounded prompt-ready paragraph out.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::RetrievalSettings;
use crate::normalize::{alpha_count, normalize};
use crate::table::ReferenceTable;
use crate::types::{ContextBlock, RetrievalHit};

pub const DEFAULT_FALLBACK_CONTEXT: &str = "Incident descriptions are brief or contain limited text. \
Assume these involve hardware faults, network issues, or vendor delays \
causing camera outages in retail stores.";

static DIGITS_AND_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\W_]+$").unwrap_or_else(|e| panic!("invalid built-in pattern: {e}")));

/// Filtering thresholds. Tuned empirically, so they are configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyConfig {
    /// Minimum alphabetic characters a row needs to contribute.
    pub min_alpha_chars: usize,
    /// Minimum length (chars, trimmed) of the joined context before the
    /// fallback sentence replaces it.
    pub min_total_length: usize,
    pub fallback: String,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self { min_alpha_chars: 10, min_total_length: 100, fallback: DEFAULT_FALLBACK_CONTEXT.to_string() }
    }
}

impl From<&RetrievalSettings> for AssemblyConfig {
    fn from(s: &RetrievalSettings) -> Self {
        Self {
            min_alpha_chars: s.min_alpha_chars,
            min_total_length: s.min_context_length,
            fallback: s.fallback_context.clone(),
        }
    }
}

/// A retrieved row: its table index and its source texts, most preferred
/// first. `None` marks a missing cell.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub index: usize,
    pub texts: Vec<Option<&'a str>>,
}

impl<'a> Candidate<'a> {
    pub fn new(index: usize, texts: Vec<Option<&'a str>>) -> Self { Self { index, texts } }

    /// First non-blank text in priority order.
    pub fn first_text(&self) -> Option<&'a str> {
        self.texts.iter().flatten().copied().find(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    config: AssemblyConfig,
}

impl ContextAssembler {
    pub fn new(config: AssemblyConfig) -> Self { Self { config } }

    pub fn config(&self) -> &AssemblyConfig { &self.config }

    /// Normalize `raw` and return it if it is worth showing the generator.
    pub fn accept(&self, raw: &str) -> Option<String> {
        let cleaned = normalize(raw);
        if cleaned.is_empty() || DIGITS_AND_PUNCTUATION.is_match(&cleaned) {
            return None;
        }
        if alpha_count(&cleaned) < self.config.min_alpha_chars {
            return None;
        }
        Some(cleaned)
    }

    pub fn assemble<'a, I>(&self, candidates: I) -> ContextBlock
    where
        I: IntoIterator<Item = Candidate<'a>>,
    {
        let mut parts = Vec::new();
        let mut indices = Vec::new();
        for candidate in candidates {
            let Some(raw) = candidate.first_text() else {
                debug!(index = candidate.index, "candidate has no source text");
                continue;
            };
            match self.accept(raw) {
                Some(cleaned) => {
                    parts.push(cleaned);
                    indices.push(candidate.index);
                }
                None => debug!(index = candidate.index, "candidate rejected by filters"),
            }
        }

        let text = parts.join(" ");
        if parts.is_empty() || text.trim().chars().count() < self.config.min_total_length {
            debug!(accepted = indices.len(), len = text.len(), "context too sparse, using fallback");
            return ContextBlock { text: self.config.fallback.clone(), indices, used_fallback: true };
        }
        ContextBlock { text, indices, used_fallback: false }
    }

    /// Assemble straight from index hits. Sentinel rows and rows beyond the
    /// table are skipped.
    pub fn assemble_hits(&self, table: &ReferenceTable, hits: &[RetrievalHit]) -> ContextBlock {
        self.assemble(table.candidates(hits))
    }
}
