//! Guided run of every stage in order: inspect, prepare, index, an optional
//! sample insight and the chat loop.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crate::chat::run_chat;
use crate::commands::{self, InsightRequest};
use crate::runtime::{AppState, Workspace};

const TOTAL_STEPS: usize = 5;
const SAMPLE_QUESTION: &str = "What are the most common camera and access control issues?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Inspect,
    Prepare,
    Index,
    Insights,
    Chat,
}

impl Step {
    pub const ALL: [Step; TOTAL_STEPS] = [Step::Inspect, Step::Prepare, Step::Index, Step::Insights, Step::Chat];

    pub fn number(self) -> usize { Self::ALL.iter().position(|s| *s == self).map_or(0, |i| i + 1) }

    pub fn title(self) -> &'static str {
        match self {
            Step::Inspect => "Inspect CSV File",
            Step::Prepare => "Clean Ticket Descriptions",
            Step::Index => "Build Similarity Index",
            Step::Insights => "Generate Insights (Preview)",
            Step::Chat => "Launch Interactive Chatbot",
        }
    }
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inspect" => Ok(Step::Inspect),
            "prepare" | "clean" => Ok(Step::Prepare),
            "index" => Ok(Step::Index),
            "insights" => Ok(Step::Insights),
            "chat" | "chatbot" => Ok(Step::Chat),
            other => Err(anyhow::anyhow!("unknown step '{other}' (expected inspect, prepare, index, insights or chat)")),
        }
    }
}

/// Which steps to run, in canonical order, whatever order they were named in.
pub fn select_steps(requested: &[Step]) -> Vec<Step> {
    if requested.is_empty() {
        return Step::ALL.to_vec();
    }
    Step::ALL.iter().copied().filter(|s| requested.contains(s)).collect()
}

/// `default` answers an empty reply.
pub fn confirm<R: BufRead>(input: &mut R, question: &str, default: bool) -> Result<bool> {
    print!("{question} ");
    io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(match line.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    })
}

pub struct PipelineRunner {
    workspace: Workspace,
    skip_chat: bool,
}

impl PipelineRunner {
    pub fn new(workspace: Workspace, skip_chat: bool) -> Self { Self { workspace, skip_chat } }

    /// Run `steps`, stopping at the first failure. Returns whether every step succeeded.
    pub async fn run<R: BufRead>(&self, steps: &[Step], input: &mut R) -> Result<bool> {
        println!("{}\nRAG JIRA PIPELINE\n{}", "=".repeat(80), "=".repeat(80));
        let mut state: Option<AppState> = None;
        for step in select_steps(steps) {
            print_step(step);
            if let Err(e) = self.run_step(step, &mut state, input).await {
                println!("\n❌ {} failed: {e:#}", step.title());
                println!("\n❌ Pipeline stopped due to failure in step: {}", step.title());
                return Ok(false);
            }
        }
        println!("\n{}\nPIPELINE COMPLETE!\n{}", "=".repeat(80), "=".repeat(80));
        println!("\nNext steps:");
        println!("  - Run `ticketrag chat` to start the interactive chatbot");
        println!("  - Run `ticketrag rewrite` to improve ticket text");
        println!("  - Run `ticketrag serve` to expose the JSON API");
        Ok(true)
    }

    async fn run_step<R: BufRead>(&self, step: Step, state: &mut Option<AppState>, input: &mut R) -> Result<()> {
        let ws = &self.workspace;
        match step {
            Step::Inspect => {
                commands::inspect(&ws.input_csv())?;
            }
            Step::Prepare => {
                commands::prepare(&ws.input_csv(), &ws.cleaned_csv())?;
            }
            Step::Index => {
                commands::index(ws, &ws.cleaned_csv()).await?;
            }
            Step::Insights => {
                println!("NOTE: This step generates a sample insight.");
                println!("You can skip this if you just want to use the chatbot.\n");
                if !confirm(input, "Run insight generation? [y/N]:", false)? {
                    println!("⏭️  Skipping insight generation");
                    return Ok(());
                }
                let state = loaded(state, ws).await?;
                commands::insights(state, &InsightRequest::from_workspace(ws, SAMPLE_QUESTION)).await?;
            }
            Step::Chat => {
                if self.skip_chat {
                    println!("⏭️  Chatbot launch skipped (--no-chat)");
                    return Ok(());
                }
                if !confirm(input, "Launch chatbot now? [Y/n]:", true)? {
                    println!("\n✅ Run `ticketrag chat` anytime to start the chatbot.");
                    return Ok(());
                }
                let state = loaded(state, ws).await?;
                run_chat(state, &mut *input, &mut io::stdout()).await?;
            }
        }
        println!("\n✅ {} completed successfully!", step.title());
        Ok(())
    }
}

async fn loaded<'s>(state: &'s mut Option<AppState>, workspace: &Workspace) -> Result<&'s AppState> {
    if state.is_none() {
        *state = Some(AppState::load(workspace).await?);
    }
    state.as_ref().ok_or_else(|| anyhow::anyhow!("state failed to load"))
}

fn print_step(step: Step) {
    println!("\n{}", "=".repeat(80));
    println!("STEP {}/{}: {}", step.number(), TOTAL_STEPS, step.title());
    println!("{}\n", "=".repeat(80));
}
