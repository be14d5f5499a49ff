//! Group chats run by a manager

use crate::agent::{is_termination, Agent, LlmSettings};
use crate::chat::{auto_reply, summarize, ChatResult, Observers, SummaryMethod, Turn};
use std::sync::Arc;
use tracing::{debug, info};
use tripcraft_error::{Error, Result};
use tripcraft_llm::{ChatMessage, LlmProvider, UsageTracker};

/// Messages in a group chat, the opening one included
pub const DEFAULT_MAX_ROUND: usize = 5;

/// Members of a group chat and its limits
#[derive(Debug, Clone)]
pub struct GroupChat {
    agents: Vec<Arc<Agent>>,
    max_round: usize,
    allow_repeat_speaker: bool,
}

impl GroupChat {
    pub fn new(agents: Vec<Arc<Agent>>) -> Self {
        Self {
            agents,
            max_round: DEFAULT_MAX_ROUND,
            allow_repeat_speaker: false,
        }
    }

    pub fn with_max_round(mut self, max_round: usize) -> Self {
        self.max_round = max_round;
        self
    }

    pub fn with_allow_repeat_speaker(mut self, allow: bool) -> Self {
        self.allow_repeat_speaker = allow;
        self
    }

    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    fn roles(&self) -> String {
        self.agents
            .iter()
            .map(|a| format!("{}: {}", a.name(), a.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs a group chat: picks speakers and relays every message to the group
#[derive(Debug, Clone)]
pub struct GroupChatManager {
    name: String,
    group: GroupChat,
    llm: LlmSettings,
}

impl GroupChatManager {
    pub fn new(name: impl Into<String>, group: GroupChat, llm: LlmSettings) -> Self {
        Self {
            name: name.into(),
            group,
            llm,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &GroupChat {
        &self.group
    }

    /// Open the group chat with `message` from `driver`
    pub async fn run<P: LlmProvider>(
        &self,
        provider: &P,
        driver: &Agent,
        message: String,
        summary_method: SummaryMethod,
        observers: &mut Observers<'_>,
    ) -> Result<ChatResult> {
        if self.group.agents.is_empty() {
            return Err(Error::invalid_argument("group chat has no agents")
                .with_operation("group::run")
                .with_context("manager", self.name.clone()));
        }

        let mut usage = UsageTracker::new();
        let mut transcript = Vec::new();
        self.broadcast(Turn::new(driver.name(), ChatMessage::user(message)), &mut transcript, observers);

        let mut last_speaker: Option<usize> = None;
        let mut rounds = 1;

        while rounds < self.group.max_round {
            let last = &transcript[transcript.len() - 1];
            if is_termination(&last.message) {
                debug!(manager = %self.name, speaker = %last.speaker, "group chat terminated");
                break;
            }

            let next = self.select_speaker(provider, &transcript, last_speaker, &mut usage).await?;
            let speaker = &self.group.agents[next];
            debug!(manager = %self.name, speaker = %speaker.name(), round = rounds, "next speaker");

            let Some(replies) = auto_reply(speaker, provider, &transcript, &mut usage).await? else {
                debug!(manager = %self.name, speaker = %speaker.name(), "speaker had nothing to say");
                break;
            };
            for reply in replies {
                self.broadcast(Turn::new(speaker.name(), reply), &mut transcript, observers);
            }

            last_speaker = Some(next);
            rounds += 1;
        }

        info!(manager = %self.name, messages = transcript.len(), "group chat finished");

        let summary = summarize(
            summary_method,
            provider,
            driver,
            Some(&self.llm),
            &transcript,
            &mut usage,
        )
        .await?;

        Ok(ChatResult {
            recipient: self.name.clone(),
            transcript,
            summary,
            usage,
        })
    }

    /// Deliver `turn` to every member except its speaker
    fn broadcast(&self, turn: Turn, transcript: &mut Vec<Turn>, observers: &mut Observers<'_>) {
        for agent in self.group.agents.iter().filter(|a| a.name() != turn.speaker) {
            observers.deliver(agent.name(), &turn);
        }
        transcript.push(turn);
    }

    /// Index of the next speaker.
    ///
    /// Pending tool calls go to the member that can run them. Otherwise the
    /// model picks among the eligible members, and an answer that names none
    /// of them falls back to round-robin.
    async fn select_speaker<P: LlmProvider>(
        &self,
        provider: &P,
        transcript: &[Turn],
        last_speaker: Option<usize>,
        usage: &mut UsageTracker,
    ) -> Result<usize> {
        let agents = &self.group.agents;

        if let Some(last) = transcript.last() {
            if let Some(executor) = agents.iter().position(|a| a.can_execute(&last.message)) {
                return Ok(executor);
            }
        }

        let mut eligible: Vec<usize> = (0..agents.len())
            .filter(|i| self.group.allow_repeat_speaker || Some(*i) != last_speaker)
            .collect();
        if eligible.is_empty() {
            eligible = (0..agents.len()).collect();
        }
        if eligible.len() == 1 {
            return Ok(eligible[0]);
        }

        let names = eligible
            .iter()
            .map(|i| agents[*i].name())
            .collect::<Vec<_>>()
            .join(", ");
        let mut messages = vec![ChatMessage::system(format!(
            "You are in a role play game. The following roles are available:\n{}.\n\n\
             Read the following conversation.\n\
             Then select the next role from [{}] to play. Only return the role.",
            self.group.roles(),
            names
        ))];
        messages.extend(transcript.iter().map(|t| ChatMessage::user(transcript_line(t))));
        messages.push(ChatMessage::user(format!(
            "Read the above conversation. Then select the next role from [{}] to play. Only return the role.",
            names
        )));

        let response = provider
            .complete(self.llm.request(messages))
            .await
            .map_err(|e| e.into_error("group::select_speaker").with_context("manager", self.name.clone()))?;
        usage.track(&response.model, &response.usage);

        let answer = response.content.unwrap_or_default();
        match self.match_name(&answer, &eligible) {
            Some(i) => Ok(i),
            None => {
                debug!(manager = %self.name, %answer, "speaker answer not understood, using round-robin");
                Ok(round_robin(last_speaker, &eligible))
            }
        }
    }

    /// The eligible member named by `answer`, if exactly one is
    fn match_name(&self, answer: &str, eligible: &[usize]) -> Option<usize> {
        let agents = &self.group.agents;
        let trimmed = answer.trim().trim_matches(|c: char| !(c.is_alphanumeric() || c == '_'));

        if let Some(i) = eligible.iter().find(|i| agents[**i].name().eq_ignore_ascii_case(trimmed)) {
            return Some(*i);
        }

        let words: Vec<&str> = answer
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .collect();
        let mentioned: Vec<usize> = eligible
            .iter()
            .copied()
            .filter(|i| words.iter().any(|w| w.eq_ignore_ascii_case(agents[*i].name())))
            .collect();

        match mentioned.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

fn round_robin(last_speaker: Option<usize>, eligible: &[usize]) -> usize {
    let after = last_speaker.and_then(|last| eligible.iter().copied().find(|i| *i > last));
    after.unwrap_or(eligible[0])
}

fn transcript_line(turn: &Turn) -> String {
    let message = &turn.message;
    if message.has_tool_calls() {
        let calls: Vec<&str> = message.requested_tools().iter().map(|c| c.name.as_str()).collect();
        format!("{}: (asks to run {})", turn.speaker, calls.join(", "))
    } else {
        format!("{}: {}", turn.speaker, message.text())
    }
}
