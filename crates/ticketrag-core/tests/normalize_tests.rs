use proptest::prelude::*;

use ticketrag_core::normalize;
use ticketrag_core::normalize::{alpha_count, strip_urls};

#[test]
fn missing_and_empty_inputs_become_empty() {
    assert_eq!(normalize(None), "");
    assert_eq!(normalize(""), "");
    assert_eq!(normalize("   \n\r\n  "), "");
}

#[test]
fn issue_label_becomes_a_sentence() {
    assert!(normalize("Issue: camera down").starts_with("The issue is camera down"));
}

#[test]
fn proposed_resolution_wins_over_resolution() {
    assert_eq!(normalize("Proposed Resolution: replace unit"), "The proposed resolution is replace unit");
    assert_eq!(normalize("Resolution: replaced unit"), "The resolution is replaced unit");
}

#[test]
fn markdown_html_and_bullets_are_flattened() {
    let raw = "## Summary\n* see [the runbook](http://wiki/x)\n<br/>- reboot <b>NVR</b>";
    assert_eq!(normalize(raw), "Summary see the runbook reboot NVR");
}

#[test]
fn greetings_and_sign_offs_are_removed() {
    let raw = "Hello team, hope all is well. PTZ camera offline at store 12. Kind regards, Sam.";
    assert_eq!(normalize(raw), "PTZ camera offline at store 12.");
}

#[test]
fn boilerplate_without_terminator_runs_to_end() {
    assert_eq!(normalize("Door sensor replaced. Thanks for the help"), "Door sensor replaced.");
}

#[test]
fn words_containing_greetings_survive() {
    assert_eq!(normalize("This hinge is loose."), "This hinge is loose.");
}

#[test]
fn whitespace_is_collapsed() {
    assert_eq!(normalize("  camera\t\toffline \n\n again  "), "camera offline again");
}

#[test]
fn strip_urls_removes_bare_and_mail_links() {
    let out = normalize(strip_urls("Call [Ann Lee|mailto:ann@x.com] or see www.vendor.com/ticket today").as_str());
    assert_eq!(out, "Call or see today");
}

#[test]
fn alpha_count_is_unicode_aware() {
    assert_eq!(alpha_count("café 42!"), 4);
    assert_eq!(alpha_count("123 --- ..."), 0);
}

fn ticket_fragment() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Issue:", "issue :", "Problem:", "Status:", "Current status:", "Proposed Resolution:", "Resolution:",
        "hello", "Hi", "thanks.", "Thank you!", "kind regards", "please provide", "let me know if", "dear team",
        "camera", "offline", "store 42", "NVR", "door", "-", "**", "#", "_", "•", ".", "!", "?", "\n", "  ",
        "[label](url)", "[[x](y)](z)", "<br>", "<b>", "</b>", "<", ">", "(", ")", "[", "]", "1234",
    ])
    .prop_map(str::to_string)
}

proptest! {
    #[test]
    fn normalize_is_idempotent_on_ticket_like_text(parts in prop::collection::vec(ticket_fragment(), 0..16)) {
        let raw = parts.join(" ");
        let once = normalize(raw.as_str());
        prop_assert_eq!(normalize(once.as_str()), once);
    }

    #[test]
    fn normalize_is_idempotent_on_ascii(raw in "[ -~\n]{0,64}") {
        let once = normalize(raw.as_str());
        prop_assert_eq!(normalize(once.as_str()), once.clone());
        prop_assert_eq!(once.trim(), once.as_str());
        prop_assert!(!once.contains("  "));
    }
}

#[test]
fn deeply_nested_links_and_tags_settle_in_one_call() {
    let mut link = "x".to_string();
    for depth in 0..40 {
        link = format!("[{link}](u{depth})");
    }
    let once = normalize(link.as_str());
    assert_eq!(once, "x");
    assert_eq!(normalize(once.as_str()), once);

    let tags = format!("{}a{}", "<".repeat(40), ">".repeat(40));
    let once = normalize(tags.as_str());
    assert_eq!(once, "");
    assert_eq!(normalize(once.as_str()), once);
}
