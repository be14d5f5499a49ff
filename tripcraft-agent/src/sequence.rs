//! Task-sequence runner
//!
//! A stage of the plan is an ordered list of chat steps. Each step sees the
//! summaries of the steps before it, and once all steps are done the
//! critic's inbox is condensed into the stage result.

use crate::agent::Agent;
use crate::chat::{ChatResult, MessageLog, Observers, SummaryMethod, Turn, TwoPartyChat};
use crate::group::GroupChatManager;
use std::sync::Arc;
use tracing::info;
use tripcraft_error::{Error, Result};
use tripcraft_llm::{ChatMessage, CompletionRequest, LlmProvider, UsageTracker};

pub const SUMMARY_MAX_TOKENS: usize = 2000;

/// Who a step's message is sent to
#[derive(Debug, Clone)]
pub enum Recipient {
    Agent(Arc<Agent>),
    Group(Arc<GroupChatManager>),
}

impl Recipient {
    pub fn name(&self) -> &str {
        match self {
            Recipient::Agent(agent) => agent.name(),
            Recipient::Group(manager) => manager.name(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatStep {
    pub recipient: Recipient,
    pub message: String,
    pub summary_method: SummaryMethod,
}

impl ChatStep {
    pub fn new(recipient: Recipient, message: impl Into<String>, summary_method: SummaryMethod) -> Self {
        Self {
            recipient,
            message: message.into(),
            summary_method,
        }
    }
}

/// One stage: its steps, the manager whose chats are kept, and what the
/// final summary has to achieve
#[derive(Debug, Clone)]
pub struct TaskSequence {
    pub label: String,
    pub steps: Vec<ChatStep>,
    pub manager: String,
    pub objective: String,
}

#[derive(Debug, Clone)]
pub struct SequenceOutcome {
    pub summary: String,
    pub results: Vec<ChatResult>,
    /// Transcripts of every chat the manager ran
    pub manager_history: Vec<Turn>,
    pub critic_log: MessageLog,
    pub usage: UsageTracker,
}

/// Run the steps in order, then summarize `critic_log` against the objective
pub async fn run_sequence<P: LlmProvider>(
    provider: &P,
    driver: &Agent,
    sequence: TaskSequence,
    mut critic_log: MessageLog,
    summary_model: &str,
) -> Result<SequenceOutcome> {
    let TaskSequence {
        label,
        steps,
        manager,
        objective,
    } = sequence;
    info!(%label, steps = steps.len(), "starting sequence");

    let mut results: Vec<ChatResult> = Vec::with_capacity(steps.len());
    let mut manager_history = Vec::new();
    let mut usage = UsageTracker::new();

    {
        let mut observers = Observers::new();
        observers.watch(&mut critic_log);

        for (index, step) in steps.into_iter().enumerate() {
            let message = with_carryover(step.message, &results);
            info!(%label, step = index + 1, recipient = %step.recipient.name(), "running step");

            let result = match &step.recipient {
                Recipient::Agent(agent) => {
                    TwoPartyChat::new(driver, agent)
                        .run(provider, message, step.summary_method, &mut observers)
                        .await
                }
                Recipient::Group(group) => {
                    group
                        .run(provider, driver, message, step.summary_method, &mut observers)
                        .await
                }
            }
            .map_err(|e| {
                e.with_context("sequence", label.clone())
                    .with_context("step", (index + 1).to_string())
            })?;

            usage.merge(&result.usage);
            if result.recipient == manager {
                manager_history.extend(result.transcript.iter().cloned());
            }
            results.push(result);
        }
    }

    let summary = summarize_with_llm(provider, &critic_log, &objective, summary_model, &mut usage)
        .await
        .map_err(|e| e.with_context("sequence", label.clone()))?;
    info!(%label, tokens = usage.total_tokens(), "sequence finished");

    Ok(SequenceOutcome {
        summary,
        results,
        manager_history,
        critic_log,
        usage,
    })
}

/// Append the earlier summaries to a step's message
fn with_carryover(message: String, earlier: &[ChatResult]) -> String {
    if earlier.is_empty() {
        return message;
    }
    let context: Vec<&str> = earlier.iter().map(|r| r.summary.as_str()).collect();
    format!("{}\nContext: \n{}", message, context.join("\n"))
}

/// The reflection prompt over a critic's inbox
pub fn summary_prompt(log: &MessageLog, objective: &str) -> String {
    let mut prompt = String::from(
        "Given the following conversation history, please reflect on the task objective and \
         produce an output that achieves it. The output must be as detailed as possible, not \
         leaving behind important information, nor adding new information:\n\n",
    );
    for content in log.contents() {
        prompt.push_str(&format!("User: {}\n", content));
    }
    prompt.push_str(&format!(
        "\nTask Objective: {}\n\nPlease provide the final output below:\n",
        objective
    ));
    prompt
}

/// One deterministic completion that turns the log into the stage output
pub async fn summarize_with_llm<P: LlmProvider>(
    provider: &P,
    log: &MessageLog,
    objective: &str,
    model: &str,
    usage: &mut UsageTracker,
) -> Result<String> {
    let request = CompletionRequest::new(vec![ChatMessage::user(summary_prompt(log, objective))])
        .with_model(model)
        .with_max_tokens(SUMMARY_MAX_TOKENS)
        .with_temperature(0.0);

    let response = provider
        .complete(request)
        .await
        .map_err(|e| e.into_error("sequence::summarize_with_llm"))?;
    usage.track(&response.model, &response.usage);

    response.content.ok_or_else(|| {
        Error::inference_failed("model returned no summary")
            .with_operation("sequence::summarize_with_llm")
            .with_context("model", model)
    })
}
