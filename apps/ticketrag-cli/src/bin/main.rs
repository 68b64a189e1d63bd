use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use ticketrag_cli::chat::{install_interrupt_handler, run_chat};
use ticketrag_cli::commands::{self, InsightRequest};
use ticketrag_cli::pipeline::{PipelineRunner, Step};
use ticketrag_cli::{init_tracing, server, AppState, Workspace};
use ticketrag_core::data_processor::{RewriteOptions, REWRITTEN_COLUMN};

#[derive(Parser)]
#[command(name = "ticketrag", version, about = "Ask questions about a Jira ticket export")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show columns, sample rows and missing values of the raw export
    Inspect {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Clean the raw export into the table the indexer reads
    Prepare {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Normalize a text column into a rewritten column
    Rewrite(RewriteArgs),
    /// Embed the cleaned table and build the similarity index
    Index {
        #[arg(long)]
        cleaned: Option<PathBuf>,
    },
    /// Generate an analytical summary for one question
    Insights(InsightArgs),
    /// Interactive question answering
    Chat {
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Run the stages in order
    Pipeline {
        /// Subset of steps: inspect, prepare, index, insights, chat
        #[arg(long, value_delimiter = ',')]
        steps: Vec<Step>,
        #[arg(long)]
        no_chat: bool,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct RewriteArgs {
    /// Defaults to the reference table
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    source_column: Option<String>,
    #[arg(long, default_value = REWRITTEN_COLUMN)]
    output_column: String,
    #[arg(long)]
    overwrite_source: bool,
    #[arg(long)]
    dry_run: bool,
    /// Rows shown in the preview
    #[arg(long, default_value_t = 5)]
    limit: usize,
}

#[derive(Args)]
struct InsightArgs {
    /// Question to analyse; prompted for when omitted
    #[arg(long)]
    query: Option<String>,
    #[arg(long)]
    top_k: Option<usize>,
    /// Minimum alphabetic characters a ticket needs to contribute
    #[arg(long)]
    min_context_chars: Option<usize>,
    /// Minimum combined context length before the fallback is used
    #[arg(long)]
    min_context_length: Option<usize>,
    #[arg(long)]
    report_path: Option<PathBuf>,
    #[arg(long)]
    no_save: bool,
    /// CSV to store the tickets that informed the answer
    #[arg(long)]
    export_tickets: Option<PathBuf>,
    #[arg(long)]
    preview_chars: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut workspace = Workspace::load()?;

    match cli.command {
        Command::Inspect { input } => {
            commands::inspect(&input.unwrap_or_else(|| workspace.input_csv()))?;
        }
        Command::Prepare { input, output } => {
            let input = input.unwrap_or_else(|| workspace.input_csv());
            commands::prepare(&input, &output.unwrap_or_else(|| workspace.cleaned_csv()))?;
        }
        Command::Rewrite(args) => {
            let input = args.input.unwrap_or_else(|| workspace.reference_csv());
            let output = args.output.unwrap_or_else(|| workspace.rewritten_csv());
            let options = RewriteOptions {
                source_column: args.source_column,
                output_column: args.output_column,
                overwrite_source: args.overwrite_source,
                dry_run: args.dry_run,
                limit: args.limit,
            };
            commands::rewrite(&input, &output, &options)?;
        }
        Command::Index { cleaned } => {
            commands::index(&workspace, &cleaned.unwrap_or_else(|| workspace.cleaned_csv())).await?;
        }
        Command::Insights(args) => {
            let query = match args.query {
                Some(q) => q,
                None => prompt_line("Ask your Jira analytical question: ")?,
            };
            let mut request = InsightRequest::from_workspace(&workspace, query);
            request.top_k = args.top_k.unwrap_or(request.top_k);
            request.min_alpha_chars = args.min_context_chars.unwrap_or(request.min_alpha_chars);
            request.min_context_length = args.min_context_length.unwrap_or(request.min_context_length);
            request.preview_chars = args.preview_chars.unwrap_or(request.preview_chars);
            request.export_tickets = args.export_tickets;
            request.save_to = if args.no_save { None } else { args.report_path.or(request.save_to) };
            // Reject bad flags before loading any model.
            request.validate()?;
            let state = AppState::load(&workspace).await?;
            commands::insights(&state, &request).await?;
        }
        Command::Chat { top_k } => {
            if let Some(k) = top_k {
                workspace.settings.retrieval.chat_top_k = k;
            }
            install_interrupt_handler();
            let state = AppState::load(&workspace).await?;
            run_chat(&state, io::stdin().lock(), &mut io::stdout()).await?;
        }
        Command::Pipeline { steps, no_chat } => {
            install_interrupt_handler();
            let runner = PipelineRunner::new(workspace, no_chat);
            if !runner.run(&steps, &mut io::stdin().lock()).await? {
                std::process::exit(1);
            }
        }
        Command::Serve { host, port } => {
            let server_settings = &mut workspace.settings.server;
            if let Some(host) = host {
                server_settings.host = host;
            }
            if let Some(port) = port {
                server_settings.port = port;
            }
            let addr: SocketAddr = format!("{}:{}", server_settings.host, server_settings.port).parse()?;
            let state = Arc::new(AppState::load(&workspace).await?);
            server::start_server(addr, state).await?;
        }
    }
    Ok(())
}

fn prompt_line(question: &str) -> anyhow::Result<String> {
    print!("{question}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
