//! Two-party chats, transcripts and message observers

use crate::agent::{Agent, LlmSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tripcraft_error::{Error, Result};
use tripcraft_llm::{ChatMessage, LlmProvider, UsageTracker};

/// Round trips before a two-party chat gives up
pub const DEFAULT_MAX_TURNS: usize = 10;

const REFLECTION_PROMPT: &str =
    "Summarize the takeaway from the conversation. Do not add any introductory phrases.";

/// One message in a transcript and who said it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: String,
    pub message: ChatMessage,
}

impl Turn {
    pub fn new(speaker: impl Into<String>, message: ChatMessage) -> Self {
        Self {
            speaker: speaker.into(),
            message,
        }
    }
}

/// How a finished chat is reduced to the text carried into later steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMethod {
    /// Content of the final message, without the termination keyword
    LastMessage,
    /// Ask the model for the takeaway of the whole chat
    ReflectionWithLlm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub recipient: String,
    pub transcript: Vec<Turn>,
    pub summary: String,
    pub usage: UsageTracker,
}

// =============================================================================
// Observers
// =============================================================================

/// Messages delivered to one agent, in delivery order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageLog {
    agent: String,
    entries: Vec<Turn>,
}

impl MessageLog {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            entries: Vec::new(),
        }
    }

    /// Name of the agent whose inbox this records
    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn push(&mut self, turn: Turn) {
        self.entries.push(turn);
    }

    pub fn entries(&self) -> &[Turn] {
        &self.entries
    }

    pub fn contents(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|t| t.message.text())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Logs attached to a running session, each fed what its agent receives
#[derive(Debug, Default)]
pub struct Observers<'a> {
    logs: Vec<&'a mut MessageLog>,
}

impl<'a> Observers<'a> {
    pub fn new() -> Self {
        Self { logs: Vec::new() }
    }

    pub fn watch(&mut self, log: &'a mut MessageLog) -> &mut Self {
        self.logs.push(log);
        self
    }

    /// Record that `recipient` received `turn`
    pub fn deliver(&mut self, recipient: &str, turn: &Turn) {
        for log in self.logs.iter_mut().filter(|l| l.agent == recipient) {
            log.push(turn.clone());
        }
    }
}

// =============================================================================
// Replies and summaries
// =============================================================================

/// What `agent` says next, or `None` when it has nothing to add.
///
/// Pending tool calls it can run are executed; otherwise an agent with a
/// model asks it. A termination message always ends the exchange.
pub(crate) async fn auto_reply<P: LlmProvider>(
    agent: &Agent,
    provider: &P,
    transcript: &[Turn],
    usage: &mut UsageTracker,
) -> Result<Option<Vec<ChatMessage>>> {
    let Some(last) = transcript.last() else {
        return Ok(None);
    };

    if agent.is_termination_msg(&last.message) {
        debug!(agent = %agent.name(), "termination message received");
        return Ok(None);
    }

    if agent.can_execute(&last.message) {
        return agent.execute_tools(&last.message).await.map(Some);
    }

    if agent.llm().is_some() {
        return agent.generate(provider, transcript, usage).await.map(|m| Some(vec![m]));
    }

    Ok(None)
}

/// Reduce a finished chat to its summary, seen from `viewer`
pub(crate) async fn summarize<P: LlmProvider>(
    method: SummaryMethod,
    provider: &P,
    viewer: &Agent,
    llm: Option<&LlmSettings>,
    transcript: &[Turn],
    usage: &mut UsageTracker,
) -> Result<String> {
    match method {
        SummaryMethod::LastMessage => Ok(transcript
            .last()
            .map(|t| t.message.text().replace(crate::TERMINATION_KEYWORD, "").trim().to_string())
            .unwrap_or_default()),
        SummaryMethod::ReflectionWithLlm => {
            let settings = llm.ok_or_else(|| {
                Error::unexpected("reflection summary needs a model").with_operation("chat::summarize")
            })?;

            let mut messages = viewer.view(transcript);
            messages.push(ChatMessage::user(REFLECTION_PROMPT));

            let response = provider
                .complete(settings.request(messages))
                .await
                .map_err(|e| e.into_error("chat::summarize"))?;
            usage.track(&response.model, &response.usage);

            response.content.ok_or_else(|| {
                Error::inference_failed("model returned no reflection summary")
                    .with_operation("chat::summarize")
            })
        }
    }
}

// =============================================================================
// Two-party chat
// =============================================================================

/// A chat between a driver and a single agent
pub struct TwoPartyChat<'a> {
    driver: &'a Agent,
    recipient: &'a Agent,
    max_turns: usize,
}

impl<'a> TwoPartyChat<'a> {
    pub fn new(driver: &'a Agent, recipient: &'a Agent) -> Self {
        Self {
            driver,
            recipient,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Send `message` to the recipient and alternate until one side stops
    pub async fn run<P: LlmProvider>(
        &self,
        provider: &P,
        message: String,
        summary_method: SummaryMethod,
        observers: &mut Observers<'_>,
    ) -> Result<ChatResult> {
        let mut usage = UsageTracker::new();
        let mut transcript = Vec::new();
        self.send(self.driver, ChatMessage::user(message), &mut transcript, observers);

        for round in 0..self.max_turns {
            let Some(replies) = auto_reply(self.recipient, provider, &transcript, &mut usage).await? else {
                break;
            };
            for reply in replies {
                self.send(self.recipient, reply, &mut transcript, observers);
            }

            let Some(replies) = auto_reply(self.driver, provider, &transcript, &mut usage).await? else {
                break;
            };
            for reply in replies {
                self.send(self.driver, reply, &mut transcript, observers);
            }

            if round + 1 == self.max_turns {
                debug!(recipient = %self.recipient.name(), "turn limit reached");
            }
        }

        let summary = summarize(
            summary_method,
            provider,
            self.driver,
            self.recipient.llm(),
            &transcript,
            &mut usage,
        )
        .await?;

        Ok(ChatResult {
            recipient: self.recipient.name().to_string(),
            transcript,
            summary,
            usage,
        })
    }

    fn send(&self, from: &Agent, message: ChatMessage, transcript: &mut Vec<Turn>, observers: &mut Observers<'_>) {
        let to = if from.name() == self.driver.name() {
            self.recipient
        } else {
            self.driver
        };
        let turn = Turn::new(from.name(), message);
        observers.deliver(to.name(), &turn);
        transcript.push(turn);
    }
}
