//! Interactive question loop over the retrieval service.

use anyhow::Result;
use std::io::{BufRead, Write};
use tracing::warn;

use ticketrag_core::prompt::truncate_chars;
use ticketrag_core::types::TicketView;

use crate::runtime::AppState;

const QUIT_WORDS: [&str; 4] = ["quit", "exit", "q", "bye"];
const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";
const CHAT_PREVIEW_CHARS: usize = 200;

pub fn is_quit(input: &str) -> bool { QUIT_WORDS.contains(&input.trim().to_lowercase().as_str()) }

/// Print a goodbye and exit when the user hits Ctrl-C.
pub fn install_interrupt_handler() {
    if let Err(e) = ctrlc::set_handler(|| {
        println!("\n\nInterrupted. Goodbye!");
        std::process::exit(0);
    }) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
}

/// Answer questions read from `input` until a quit word or end of input.
/// A failed question is reported and the loop carries on.
pub async fn run_chat<R: BufRead, W: Write>(state: &AppState, mut input: R, out: &mut W) -> Result<usize> {
    print_banner(out)?;
    let top_k = state.settings.retrieval.chat_top_k;
    let max_length = state.settings.models.answer_max_length;
    let mut answered = 0;
    let mut line = String::new();

    loop {
        write!(out, "\nYou: ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out, "\nGoodbye!")?;
            break;
        }
        let question = line.trim();
        if is_quit(question) {
            writeln!(out, "\nGoodbye! Thank you for using the Jira Ticket Chatbot.")?;
            break;
        }
        if question.is_empty() {
            continue;
        }

        match state.engine.answer_question(question, top_k, max_length).await {
            Ok(answer) => {
                display_tickets(out, &answer.tickets)?;
                writeln!(out, "\n{RULE}\nAI RESPONSE:\n{RULE}")?;
                writeln!(out, "\n{}\n", answer.answer)?;
                answered += 1;
            }
            Err(e) => {
                writeln!(out, "\nError: {e}")?;
                writeln!(out, "Please try again with a different question.")?;
            }
        }
    }
    Ok(answered)
}

fn print_banner<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "{RULE}\nJIRA TICKET CHATBOT\n{RULE}")?;
    writeln!(out, "Ask questions about your Jira tickets!")?;
    writeln!(out, "Examples:")?;
    writeln!(out, "  - Which stores keep reporting camera outages?")?;
    writeln!(out, "  - What usually fixes door access problems?")?;
    writeln!(out, "  - Are there recurring network connectivity issues?")?;
    writeln!(out, "Type 'quit' or 'exit' to stop.\n{RULE}")?;
    Ok(())
}

pub fn display_tickets<W: Write>(out: &mut W, tickets: &[TicketView]) -> Result<()> {
    writeln!(out, "\n{RULE}\nRELEVANT TICKETS:\n{RULE}")?;
    for ticket in tickets {
        writeln!(out, "\n[{}] {}", ticket.ticket_id, ticket.summary)?;
        writeln!(out, "Status: {}", ticket.status)?;
        writeln!(out, "Preview: {}...", truncate_chars(&ticket.text, CHAT_PREVIEW_CHARS))?;
        writeln!(out, "{THIN_RULE}")?;
    }
    Ok(())
}
