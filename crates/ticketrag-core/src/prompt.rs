//! Prompt templates. Both builders are pure string interpolation.

use crate::types::TicketView;

/// Tickets quoted in a question prompt.
pub const QUESTION_TICKETS: usize = 3;
/// Characters of ticket text quoted per ticket in a question prompt.
pub const QUESTION_SNIPPET_CHARS: usize = 300;

/// Executive-summary prompt around an assembled context.
pub fn build_prompt(context: &str) -> String {
    format!(
        "You are a senior data analyst summarizing camera-related incidents from Jira maintenance logs. \
Below are extracted ticket details:\n{context}\n\n\
Write a structured executive summary with the following sections:\n\n\
**Findings:** Summarize key recurring problems observed across the tickets.\n\
**Root Causes:** Identify likely underlying causes (e.g., hardware, network, vendor coordination).\n\
**Recommendations:** Provide 2–3 concise, actionable recommendations to prevent future incidents.\n\n\
Write in professional, clear English suitable for presentation in a Tableau dashboard or weekly IT summary."
    )
}

/// Question-answering prompt quoting the top tickets.
pub fn build_question_prompt(query: &str, tickets: &[TicketView]) -> String {
    let context = tickets
        .iter()
        .take(QUESTION_TICKETS)
        .map(|t| format!("Ticket {}: {}\n{}", t.ticket_id, t.summary, truncate_chars(&t.text, QUESTION_SNIPPET_CHARS)))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Answer the question based on the following Jira tickets:\n\n{context}\n\nQuestion: {query}\nAnswer:")
}

/// At most `max` characters of `text`, never splitting a UTF-8 sequence.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
