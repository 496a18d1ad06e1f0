use crate::application::tooling::ToolRegistry;
use crate::model::{ModelError, ModelProvider};
use crate::types::Conversation;
use serde_json::Value;
use tracing::{debug, info, warn};

/// What a single dispatched input produced, for the REPL to display. Turn
/// bookkeeping has already happened by the time one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply was plain conversation; recorded as a model turn.
    Reply(String),
    /// A registered tool ran; its result (or error text) is recorded as a
    /// tool turn.
    ToolResult {
        tool: String,
        output: String,
        failed: bool,
    },
    /// The reply named a tool that is not registered; nothing was recorded.
    UnknownTool(String),
}

/// The per-input control cycle: append the user turn, call the model with
/// the whole conversation, and either execute a parsed tool invocation or
/// record the reply as conversation. Strictly sequential; one input is
/// resolved end-to-end before the next is accepted.
pub struct Agent<P: ModelProvider> {
    provider: P,
    registry: ToolRegistry,
    conversation: Conversation,
}

impl<P: ModelProvider> Agent<P> {
    pub fn new(provider: P, registry: ToolRegistry, system_prompt: String) -> Self {
        let mut conversation = Conversation::new();
        conversation.push_system(system_prompt);
        Self {
            provider,
            registry,
            conversation,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Processes one line of user input. A model failure aborts only this
    /// turn: the user turn stays recorded, no model turn is added, and the
    /// error is handed back for logging. Tool failures are not errors here;
    /// they become tool-turn text the model sees on its next call.
    pub async fn step(&mut self, input: &str) -> Result<TurnOutcome, ModelError> {
        self.conversation.push_user(input);
        let reply = self.provider.generate(&self.conversation).await?;
        let stripped = strip_code_fence(&reply);

        match parse_invocation(stripped) {
            Some(invocation) => Ok(self.dispatch(invocation)),
            None => {
                debug!("Reply carried no tool invocation; recording as conversation");
                self.conversation.push_model(stripped);
                Ok(TurnOutcome::Reply(stripped.to_string()))
            }
        }
    }

    fn dispatch(&mut self, invocation: ToolInvocation) -> TurnOutcome {
        let ToolInvocation { tool, args } = invocation;
        if self.registry.lookup(&tool).is_none() {
            warn!(tool = %tool, "Model requested an unregistered tool");
            return TurnOutcome::UnknownTool(tool);
        }

        info!(tool = %tool, "Executing tool requested by model");
        match self.registry.invoke(&tool, &args) {
            Ok(output) => {
                self.conversation.push_tool(&tool, &output);
                TurnOutcome::ToolResult {
                    tool,
                    output,
                    failed: false,
                }
            }
            Err(err) => {
                warn!(tool = %tool, %err, "Tool execution failed");
                let output = format!("Error: {err}");
                self.conversation.push_tool(&tool, &output);
                TurnOutcome::ToolResult {
                    tool,
                    output,
                    failed: true,
                }
            }
        }
    }
}

/// The transient `{tool, args}` request parsed out of one model reply.
struct ToolInvocation {
    tool: String,
    args: Value,
}

/// A reply is an invocation only if it parses as a JSON object carrying a
/// string `tool` field and an `args` field. Anything else is conversation.
fn parse_invocation(reply: &str) -> Option<ToolInvocation> {
    let value: Value = serde_json::from_str(reply).ok()?;
    let tool = value.get("tool")?.as_str()?.to_string();
    let args = value.get("args")?.clone();
    Some(ToolInvocation { tool, args })
}

/// Best-effort markup removal: one leading ```json and one trailing ``` are
/// dropped if present. Nothing more.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let trimmed = trimmed.strip_prefix("```json").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}
