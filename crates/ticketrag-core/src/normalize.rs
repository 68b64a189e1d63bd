//! Ticket text normalization.
//!
//! `normalize` turns raw Jira text (markdown, HTML fragments, greetings,
//! `Issue:`-style headings) into a single plain paragraph. It is a pure
//! function and idempotent: the cleaning pass is repeated until the text stops
//! changing, so a second call never finds anything left to do.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| compile(r"\[([^\[\]]+)\]\([^()]*\)"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| compile(r"<[^<>]+>"));
static MARKDOWN_MARKS: Lazy<Regex> = Lazy::new(|| compile(r"[*•#_\-]+"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| compile(r"\s+"));
static MAILTO_LINK: Lazy<Regex> = Lazy::new(|| compile(r"\[[^\[\]|]*\|\s*mailto:[^\]]*\]"));
static BARE_URL: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bhttps?://\S+|\bwww\.\S+"));

static BOILERPLATE: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        compile(r"(?i)\b(?:hello|hi|dear\s+team|good\s+(?:morning|afternoon)|thanks|thank\s+you)\b[^.!?]*[.!?]?"),
        compile(r"(?i)\b(?:please\s+provide|let\s+me\s+know\s+if|do\s+not\s+hesitate|kind\s+regards)\b[^.!?]*[.!?]?"),
    ]
});

/// A heading rewritten into a sentence lead-in.
struct LabelRule {
    pattern: Regex,
    replacement: &'static str,
}

// Most specific first: "Proposed Resolution:" must win over "Resolution:".
static LABEL_RULES: Lazy<Vec<LabelRule>> = Lazy::new(|| {
    [
        (r"(?i)\bproposed\s+resolution\s*:", "The proposed resolution is"),
        (r"(?i)\bresolution\s*:", "The resolution is"),
        (r"(?i)\bproblem\s*:", "The problem is"),
        (r"(?i)\bissue\s*:", "The issue is"),
        // The optional prefix keeps an already rewritten "Current status:" stable.
        (r"(?i)\b(?:current\s+)?status\s*:", "Current status:"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| LabelRule { pattern: compile(pattern), replacement })
    .collect()
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}

/// Clean ticket text into a single plain paragraph.
///
/// Accepts `&str` or `Option<&str>`; `None` yields an empty string.
///
/// ```
/// use ticketrag_core::normalize;
/// assert_eq!(normalize("Issue: camera down"), "The issue is camera down");
/// assert_eq!(normalize(None), "");
/// ```
pub fn normalize<'a>(raw: impl Into<Option<&'a str>>) -> String {
    let raw: Option<&str> = raw.into();
    let Some(raw) = raw else { return String::new() };
    // A pass that changes anything deletes characters or consumes a label
    // colon ("Current status:" is a fixed point), so this settles.
    let mut current = clean_pass(raw);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Apply `pattern` until nothing matches; each round unwraps one nesting level.
fn replace_nested(pattern: &Regex, mut value: String, replacement: &str) -> String {
    while pattern.is_match(&value) {
        value = pattern.replace_all(&value, replacement).into_owned();
    }
    value
}

fn clean_pass(raw: &str) -> String {
    let mut value = raw.replace(['\n', '\r'], " ");

    value = replace_nested(&MARKDOWN_LINK, value, "$1");
    value = replace_nested(&HTML_TAG, value, " ");
    value = MARKDOWN_MARKS.replace_all(&value, " ").into_owned();

    for rule in LABEL_RULES.iter() {
        value = rule.pattern.replace_all(&value, NoExpand(rule.replacement)).into_owned();
    }

    for pattern in BOILERPLATE.iter() {
        value = pattern.replace_all(&value, "").into_owned();
    }

    WHITESPACE.replace_all(&value, " ").trim().to_string()
}

/// Drop links that carry no readable text: bare URLs and Jira
/// `[name|mailto:...]` references. Markdown links keep their label.
pub fn strip_urls(raw: &str) -> String {
    let value = MARKDOWN_LINK.replace_all(raw, "$1");
    let value = MAILTO_LINK.replace_all(&value, "");
    BARE_URL.replace_all(&value, "").into_owned()
}

/// Number of alphabetic characters in `text`.
pub fn alpha_count(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphabetic()).count()
}
