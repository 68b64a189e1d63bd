//! Process-wide state shared by the chat loop and the HTTP server.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ticketrag_core::config::{resolve_with_base, Config, Settings};
use ticketrag_core::error::Error;
use ticketrag_core::retrieval::{InsightEngine, TicketRetriever};
use ticketrag_core::table::TicketTable;
use ticketrag_core::traits::{Embedder, Generator, SimilarityIndex};
use ticketrag_core::ReferenceTable;
use ticketrag_vector::LanceTicketIndex;

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Settings plus the directory relative paths in them are resolved against.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub settings: Settings,
    pub base: PathBuf,
}

impl Workspace {
    pub fn load() -> Result<Self> {
        let config = Config::load().map_err(|e| {
            eprintln!("Error loading config: {}", e);
            e
        })?;
        Ok(Self { settings: config.settings()?, base: PathBuf::from(".") })
    }

    pub fn new(settings: Settings, base: &Path) -> Self { Self { settings, base: base.to_path_buf() } }

    pub fn path(&self, configured: &str) -> PathBuf { resolve_with_base(&self.base, configured) }

    pub fn input_csv(&self) -> PathBuf { self.path(&self.settings.data.input_csv) }
    pub fn cleaned_csv(&self) -> PathBuf { self.path(&self.settings.data.cleaned_csv) }
    pub fn reference_csv(&self) -> PathBuf { self.path(&self.settings.data.reference_csv) }
    pub fn rewritten_csv(&self) -> PathBuf { self.path(&self.settings.data.rewritten_csv) }
    pub fn index_dir(&self) -> PathBuf { self.path(&self.settings.data.index_dir) }
    pub fn insights_csv(&self) -> PathBuf { self.path(&self.settings.data.insights_csv) }
    pub fn embedding_dir(&self) -> PathBuf { self.path(&self.settings.models.embedding_dir) }
    pub fn generator_dir(&self) -> PathBuf { self.path(&self.settings.models.generator_dir) }
    pub fn original_csv(&self) -> Option<PathBuf> { self.settings.server.original_csv.as_deref().map(|p| self.path(p)) }
}

/// Everything a query needs, loaded once. Read-only after construction.
pub struct AppState {
    pub engine: InsightEngine,
    pub settings: Settings,
}

impl AppState {
    /// Load the reference table and the index, then the models. Data
    /// problems surface before any model is loaded.
    pub async fn load(workspace: &Workspace) -> Result<Self> {
        let settings = &workspace.settings;
        println!("📂 Loading Jira index and data...");
        let reference = ReferenceTable::load(&workspace.reference_csv(), &settings.retrieval.source_columns)?;
        let index = LanceTicketIndex::open(&workspace.index_dir(), &settings.data.index_table).await?;
        if index.count().await? == 0 {
            return Err(Error::EmptyIndex.into());
        }
        println!("✅ Loaded {} Jira records.", reference.len());

        let original = workspace.original_csv().filter(|p| p.exists()).and_then(|p| match TicketTable::load_csv(&p, "") {
            Ok(table) => {
                info!(path = %p.display(), rows = table.len(), "loaded original export for enrichment");
                Some(table)
            }
            Err(e) => {
                warn!(error = %e, "original export unavailable, results will not be enriched");
                None
            }
        });

        println!("🔄 Loading models (this may take ~15 seconds)...");
        let embedder: Arc<dyn Embedder> = Arc::from(ticketrag_embed::get_default_embedder(&workspace.embedding_dir())?);
        let generator: Arc<dyn Generator> = Arc::from(ticketrag_generate::get_default_generator(
            &workspace.generator_dir(),
            settings.models.max_input_tokens,
        )?);
        println!("✅ Models ready!");

        Ok(Self::from_parts(settings.clone(), embedder, Arc::new(index), reference, original, generator))
    }

    /// Assemble state from already-loaded parts.
    pub fn from_parts(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn SimilarityIndex>,
        reference: ReferenceTable,
        original: Option<TicketTable>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let mut retriever = TicketRetriever::new(embedder, index, Arc::new(reference))
            .with_preview_chars(settings.retrieval.preview_chars);
        if let Some(original) = original {
            retriever = retriever.with_original(original);
        }
        Self { engine: InsightEngine::new(Arc::new(retriever), generator), settings }
    }

    pub fn retriever(&self) -> &TicketRetriever { self.engine.retriever() }
}
