use crate::application::agent::{Agent, TurnOutcome};
use crate::model::ModelProvider;
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing::{error, info};

const BANNER: &str =
    "🤖 cobble — ask for help with files or shell commands; type \"exit\" to quit.";
const PROMPT: &str = "you ▸ ";

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Interactive line loop. Each stdin line is one user message, resolved
/// end-to-end (model call, optional tool execution, bookkeeping) before the
/// prompt is shown again. `exit` and end-of-input terminate cleanly.
pub async fn run<P>(agent: &mut Agent<P>) -> Result<(), ReplError>
where
    P: ModelProvider,
{
    let stdin = BufReader::new(io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = io::stdout();

    write_line(&mut stdout, BANNER).await?;
    loop {
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        if is_exit(&line) {
            info!("Exit requested");
            break;
        }

        match agent.step(&line).await {
            Ok(TurnOutcome::Reply(text)) => {
                write_line(&mut stdout, &format!("💬 {text}")).await?;
            }
            Ok(TurnOutcome::ToolResult {
                tool,
                output,
                failed,
            }) => {
                let glyph = if failed { "✗" } else { "✓" };
                write_line(&mut stdout, &format!("🔧 {tool} {glyph}")).await?;
                write_line(&mut stdout, &output).await?;
            }
            Ok(TurnOutcome::UnknownTool(tool)) => {
                write_line(
                    &mut stdout,
                    &format!("⚠ model asked for an unknown tool \"{tool}\""),
                )
                .await?;
            }
            Err(err) => {
                error!(%err, "Model call failed");
                write_line(&mut stdout, &format!("✗ {err}")).await?;
            }
        }
    }

    write_line(&mut stdout, "👋 bye").await?;
    stdout.flush().await?;
    Ok(())
}

async fn write_line(stdout: &mut Stdout, text: &str) -> Result<(), ReplError> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
