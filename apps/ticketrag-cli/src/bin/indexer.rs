use std::path::PathBuf;

use ticketrag_cli::{commands, init_tracing, Workspace};

/// Build the similarity index from the cleaned ticket table.
/// Usage: ticketrag-indexer [cleaned.csv]
fn main() -> anyhow::Result<()> {
    init_tracing();
    let workspace = Workspace::load()?;
    let cleaned = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| workspace.cleaned_csv());

    println!("🏗️  Ticket indexer");
    tokio::runtime::Runtime::new()?.block_on(commands::index(&workspace, &cleaned))?;
    println!("🎉 Ready. Try `ticketrag chat` or `ticketrag-server`.");
    Ok(())
}
