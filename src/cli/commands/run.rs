//! Interactive planning conversation.
//!
//! Runs the REPL: banner, conflict phase on the first input, then dispatch
//! turns until the calendar writer reports completion or the user leaves.
//! Ctrl-C cancels in-flight work through the pipeline's cancel handle.

use std::future::Future;
use std::io::{self, Write as _};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use tokio::task::spawn_blocking;

use crate::assistant::{PipelineOptions, PlanningPipeline, TurnOutcome};
use crate::cli::output::create_spinner;
use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{Config, RunItem};
use crate::infrastructure::model::ModelClientFactory;
use crate::services::approval::{classify_reply, ConfirmationSource, Verdict};

/// Arguments for `baton run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Resume a saved session by id
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,

    /// Dry run: scripted model replies, calendar connector stubbed
    #[arg(long)]
    pub mock: bool,

    /// Keep the session in memory instead of the database
    #[arg(long)]
    pub ephemeral: bool,
}

/// Execute the run command.
pub async fn execute(config: &Config, args: RunArgs, json_mode: bool) -> Result<()> {
    let model = ModelClientFactory::create(config, args.mock)?;
    let confirmation: Arc<dyn ConfirmationSource> = Arc::new(StdinConfirmation);
    let options = PipelineOptions {
        session_id: args.session,
        mock: args.mock,
        ephemeral: args.ephemeral,
    };
    let mut pipeline = PlanningPipeline::build(config, options, model, confirmation).await?;

    let cancel = pipeline.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = repl(&mut pipeline, json_mode).await;
    ctrl_c.abort();
    pipeline.shutdown().await;

    match result {
        Err(err) if was_canceled(&err) => {
            println!("\nCanceled.");
            Ok(())
        }
        other => other,
    }
}

async fn repl(pipeline: &mut PlanningPipeline, json_mode: bool) -> Result<()> {
    if !json_mode {
        println!(
            "baton planning assistant (session {})",
            pipeline.session_id()
        );
        println!("Describe the event you want to plan. Type exit, quit, or bye to leave.");
    }

    let Some(first) = read_user_line().await? else {
        return Ok(());
    };
    let mut outcome = with_spinner(
        pipeline.start(&first),
        "Checking calendar and routine",
        json_mode,
    )
    .await?;

    loop {
        print_items(outcome.items(), json_mode);
        match &outcome {
            TurnOutcome::Finished { .. } => {
                if !json_mode {
                    println!("Planning complete.");
                }
                return Ok(());
            }
            // The confirmation source owns the terminal during the verdict
            // exchange, so no spinner here.
            TurnOutcome::AwaitingVerdict { .. } => {
                outcome = pipeline.confirm().await?;
            }
            TurnOutcome::AwaitingInput { .. } => {
                let Some(line) = read_user_line().await? else {
                    return Ok(());
                };
                outcome = with_spinner(pipeline.advance(&line), "Working", json_mode).await?;
            }
        }
    }
}

/// Run a turn future behind a spinner unless JSON mode owns stdout.
async fn with_spinner<F, T>(future: F, message: &str, json_mode: bool) -> T
where
    F: Future<Output = T>,
{
    if json_mode {
        return future.await;
    }
    let spinner = create_spinner(message.to_string());
    let result = future.await;
    spinner.finish_and_clear();
    result
}

fn print_items(items: &[RunItem], json_mode: bool) {
    for item in items {
        if json_mode {
            println!("{}", serde_json::to_string(item).unwrap_or_default());
        } else {
            match item {
                RunItem::MessageOutput { .. } | RunItem::HandoffOutput { .. } => {
                    println!("{item}");
                }
                RunItem::ToolCall { .. } | RunItem::ToolCallOutput { .. } => {
                    println!("  [{item}]");
                }
            }
        }
    }
}

fn was_canceled(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<EngineError>(), Some(EngineError::Canceled))
}

/// Read one trimmed line from the terminal.
///
/// Returns `None` on end of input or an exit token, in both cases before
/// any agent runs.
async fn read_user_line() -> Result<Option<String>> {
    let line = spawn_blocking(|| -> io::Result<Option<String>> {
        let mut out = io::stdout();
        write!(out, "You: ")?;
        out.flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    })
    .await??;
    Ok(line.filter(|text| !is_exit_token(text)))
}

/// Words that end the conversation at the input prompt.
fn is_exit_token(line: &str) -> bool {
    line.is_empty() || matches!(line.to_lowercase().as_str(), "exit" | "quit" | "bye")
}

/// Confirmation source backed by the interactive terminal.
///
/// Prints the gate prompt, reads a line, and classifies it. Empty lines
/// re-prompt; end of input cancels the run.
struct StdinConfirmation;

#[async_trait]
impl ConfirmationSource for StdinConfirmation {
    async fn await_confirmation(&self, prompt: &str) -> EngineResult<Verdict> {
        println!("{prompt}");
        loop {
            let line = spawn_blocking(|| -> io::Result<Option<String>> {
                let mut out = io::stdout();
                write!(out, "You: ")?;
                out.flush()?;
                let mut line = String::new();
                if io::stdin().read_line(&mut line)? == 0 {
                    return Ok(None);
                }
                Ok(Some(line.trim().to_string()))
            })
            .await
            .map_err(|err| EngineError::Session(err.to_string()))?
            .map_err(|err| EngineError::Session(err.to_string()))?;

            match line {
                None => return Err(EngineError::Canceled),
                Some(text) if text.is_empty() => continue,
                Some(text) => return Ok(classify_reply(&text)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_tokens_end_the_conversation() {
        assert!(is_exit_token("exit"));
        assert!(is_exit_token("QUIT"));
        assert!(is_exit_token("Bye"));
        assert!(is_exit_token(""));
    }

    #[test]
    fn test_ordinary_input_is_not_an_exit_token() {
        assert!(!is_exit_token("plan my exit interview"));
        assert!(!is_exit_token("goodbye party on Friday"));
    }
}
