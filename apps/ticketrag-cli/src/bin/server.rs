use std::net::SocketAddr;
use std::sync::Arc;

use ticketrag_cli::{init_tracing, server, AppState, Workspace};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let workspace = Workspace::load()?;
    let addr: SocketAddr = format!("{}:{}", workspace.settings.server.host, workspace.settings.server.port).parse()?;
    let state = Arc::new(AppState::load(&workspace).await?);
    server::start_server(addr, state).await
}
