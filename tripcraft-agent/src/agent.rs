//! Agents and the factory that builds them

use crate::chat::Turn;
use std::collections::HashSet;
use tracing::debug;
use tripcraft_error::{Error, Result};
use tripcraft_llm::{
    ChatMessage, CompletionRequest, LlmProvider, Role, ToolCall, ToolDefinition, UsageTracker,
};
use tripcraft_tools::ToolRegistry;

/// A message containing this word ends the conversation
pub const TERMINATION_KEYWORD: &str = "TERMINATE";

const DEFAULT_SEED: u64 = 41;

/// The termination predicate every agent shares
pub fn is_termination(message: &ChatMessage) -> bool {
    message
        .content
        .as_deref()
        .is_some_and(|c| c.contains(TERMINATION_KEYWORD))
}

/// Model parameters an LLM-backed agent sends with every request
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: f32,
    pub seed: Option<u64>,
}

impl LlmSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            seed: Some(DEFAULT_SEED),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest::new(messages)
            .with_model(&self.model)
            .with_temperature(self.temperature)
            .with_seed(self.seed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    /// Answers with the LLM and may ask for tools
    Assistant,
    /// Runs the tools other agents ask for; never consults a human
    UserProxy,
}

/// A conversation participant
#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    system_message: Option<String>,
    role: AgentRole,
    llm: Option<LlmSettings>,
    llm_tools: Vec<ToolDefinition>,
    executable_tools: ToolRegistry,
    termination: fn(&ChatMessage) -> bool,
}

impl Agent {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn system_message(&self) -> Option<&str> {
        self.system_message.as_deref()
    }

    pub fn llm(&self) -> Option<&LlmSettings> {
        self.llm.as_ref()
    }

    /// Tool schemas advertised to the model
    pub fn llm_tools(&self) -> &[ToolDefinition] {
        &self.llm_tools
    }

    pub fn executable_tools(&self) -> &ToolRegistry {
        &self.executable_tools
    }

    pub fn is_termination_msg(&self, message: &ChatMessage) -> bool {
        (self.termination)(message)
    }

    /// One line used when a manager picks the next speaker
    pub fn description(&self) -> String {
        match self.role {
            AgentRole::UserProxy => format!(
                "Runs these tools when another agent asks for them: {}",
                self.executable_tools.names().join(", ")
            ),
            AgentRole::Assistant => self
                .system_message
                .as_deref()
                .and_then(|m| m.lines().map(str::trim).find(|l| !l.is_empty()))
                .unwrap_or("A helpful AI assistant.")
                .to_string(),
        }
    }

    /// Whether every tool call in `message` is registered for execution here
    pub fn can_execute(&self, message: &ChatMessage) -> bool {
        message.has_tool_calls()
            && message
                .requested_tools()
                .iter()
                .all(|call| self.executable_tools.contains(&call.name))
    }

    /// Ask the model for this agent's next message given a shared transcript
    pub async fn generate<P: LlmProvider>(
        &self,
        provider: &P,
        transcript: &[Turn],
        usage: &mut UsageTracker,
    ) -> Result<ChatMessage> {
        let settings = self.llm.as_ref().ok_or_else(|| {
            Error::unexpected(format!("agent '{}' has no model configured", self.name))
                .with_operation("agent::generate")
        })?;

        let mut messages = Vec::with_capacity(transcript.len() + 1);
        if let Some(system) = &self.system_message {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(self.view(transcript));

        let request = settings.request(messages).with_tools(self.llm_tools.clone());
        debug!(agent = %self.name, messages = request.messages.len(), "asking model");

        let response = provider.complete(request).await.map_err(|e| {
            e.into_error("agent::generate").with_context("agent", self.name.clone())
        })?;
        usage.track(&response.model, &response.usage);

        Ok(response.into_message())
    }

    /// Run the tool calls in `message`; one tool result per call, in order
    pub async fn execute_tools(&self, message: &ChatMessage) -> Result<Vec<ChatMessage>> {
        let mut results = Vec::with_capacity(message.requested_tools().len());
        for call in message.requested_tools() {
            let output = self
                .executable_tools
                .call(call)
                .await
                .map_err(|e| e.with_context("agent", self.name.clone()))?;
            results.push(ChatMessage::tool_result(&call.id, output));
        }
        Ok(results)
    }

    /// The transcript as this agent sees it.
    ///
    /// Own messages are assistant turns and keep their tool calls, and the
    /// results of those calls stay tool messages. Everything else becomes
    /// user text, so the request never carries another agent's tool calls.
    pub fn view(&self, transcript: &[Turn]) -> Vec<ChatMessage> {
        let mut own_calls: HashSet<&str> = HashSet::new();
        let mut messages = Vec::with_capacity(transcript.len());

        for turn in transcript {
            let own = turn.speaker == self.name;
            let message = &turn.message;

            if message.role == Role::Tool {
                let call_id = message.tool_call_id.as_deref().unwrap_or("");
                if own_calls.contains(call_id) {
                    messages.push(message.clone());
                } else {
                    let text = format!("Response from calling tool ({}):\n{}", call_id, message.text());
                    messages.push(as_role(own, text));
                }
                continue;
            }

            if message.has_tool_calls() {
                if own {
                    own_calls.extend(message.requested_tools().iter().map(|c| c.id.as_str()));
                    messages.push(ChatMessage::assistant_tool_calls(
                        message.content.clone(),
                        message.requested_tools().to_vec(),
                    ));
                } else {
                    messages.push(ChatMessage::user(describe_tool_calls(message)));
                }
                continue;
            }

            messages.push(as_role(own, message.text().to_string()));
        }

        messages
    }
}

fn as_role(own: bool, text: String) -> ChatMessage {
    if own {
        ChatMessage::assistant(text)
    } else {
        ChatMessage::user(text)
    }
}

fn describe_tool_calls(message: &ChatMessage) -> String {
    let mut lines: Vec<String> = Vec::new();
    if !message.text().is_empty() {
        lines.push(message.text().to_string());
    }
    lines.extend(message.requested_tools().iter().map(|ToolCall { id, name, arguments }| {
        format!("Suggested tool call ({}): {}\nArguments: {}", id, name, arguments)
    }));
    lines.join("\n")
}

// =============================================================================
// Factory
// =============================================================================

/// Builds agents that share one set of model settings
#[derive(Debug, Clone)]
pub struct AgentFactory {
    llm: LlmSettings,
}

impl AgentFactory {
    pub fn new(llm: LlmSettings) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &LlmSettings {
        &self.llm
    }

    /// An LLM-backed agent; `tools` are advertised to the model, not executed
    pub fn assistant(&self, name: &str, system_message: &str, tools: &ToolRegistry) -> Agent {
        Agent {
            name: name.to_string(),
            system_message: Some(system_message.to_string()),
            role: AgentRole::Assistant,
            llm: Some(self.llm.clone()),
            llm_tools: tools.definitions(),
            executable_tools: ToolRegistry::new(),
            termination: is_termination,
        }
    }

    /// An executor; `tools` run when another agent asks for them
    pub fn user_proxy(&self, name: &str, tools: &ToolRegistry) -> Agent {
        Agent {
            name: name.to_string(),
            system_message: None,
            role: AgentRole::UserProxy,
            llm: None,
            llm_tools: Vec::new(),
            executable_tools: tools.clone(),
            termination: is_termination,
        }
    }

    /// An executor that also answers with the model when it has nothing to
    /// run; group chat members need this, chat drivers must not have it
    pub fn group_proxy(&self, name: &str, tools: &ToolRegistry) -> Agent {
        Agent {
            llm: Some(self.llm.clone()),
            ..self.user_proxy(name, tools)
        }
    }

    /// An assistant without tools whose received messages are recorded by
    /// observing the session it takes part in
    pub fn tracked_assistant(&self, name: &str, system_message: &str) -> Agent {
        self.assistant(name, system_message, &ToolRegistry::new())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tripcraft_llm::ScriptedProvider;
    use tripcraft_tools::registry::parse_arguments;
    use tripcraft_tools::Tool;

    /// Stand-in for the web search tool
    pub(crate) struct FakeSearch;

    #[async_trait]
    impl Tool for FakeSearch {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("search_tavily", "Search the web")
        }

        async fn invoke(&self, arguments: &str) -> Result<String> {
            let args: serde_json::Value = parse_arguments("search_tavily", arguments)?;
            Ok(format!("| 0 | results for {} |", args["query"].as_str().unwrap_or("")))
        }
    }

    pub(crate) fn search_tools() -> ToolRegistry {
        ToolRegistry::new().with(Arc::new(FakeSearch))
    }

    pub(crate) fn turn(speaker: &str, message: ChatMessage) -> Turn {
        Turn::new(speaker, message)
    }

    #[test]
    fn test_termination_predicate() {
        assert!(is_termination(&ChatMessage::assistant("All done. TERMINATE")));
        assert!(!is_termination(&ChatMessage::assistant("terminate later")));
        assert!(!is_termination(&ChatMessage::assistant_tool_calls(None, vec![])));
    }

    #[test]
    fn test_factory_roles() {
        let factory = AgentFactory::new(LlmSettings::new("gpt-4"));
        let tools = search_tools();

        let assistant = factory.assistant("websearch_assistant", "You search.", &tools);
        assert_eq!(assistant.role(), AgentRole::Assistant);
        assert_eq!(assistant.llm_tools().len(), 1);
        assert!(assistant.executable_tools().is_empty());
        assert_eq!(assistant.llm().unwrap().seed, Some(41));

        let proxy = factory.user_proxy("websearch_user", &tools);
        assert!(proxy.llm().is_none());
        assert!(proxy.llm_tools().is_empty());
        let call = ChatMessage::assistant_tool_calls(
            None,
            vec![ToolCall::new("c1", "search_tavily", "{}")],
        );
        assert!(proxy.can_execute(&call));
        assert!(!assistant.can_execute(&call));
        assert!(!proxy.can_execute(&ChatMessage::assistant("no calls")));

        let member = factory.group_proxy("websearch_user_proxy", &tools);
        assert_eq!(member.role(), AgentRole::UserProxy);
        assert_eq!(member.llm().unwrap().model, "gpt-4");
        assert!(member.llm_tools().is_empty());
        assert!(member.can_execute(&call));

        let critic = factory.tracked_assistant("Critic", "You review.");
        assert!(critic.llm_tools().is_empty());
        assert!(critic.is_termination_msg(&ChatMessage::assistant("TERMINATE")));
    }

    #[test]
    fn test_view_keeps_own_tool_calls_structured() {
        let factory = AgentFactory::new(LlmSettings::new("gpt-4"));
        let assistant = factory.assistant("assistant", "sys", &search_tools());
        let critic = factory.tracked_assistant("Critic", "sys");

        let call = ToolCall::new("c1", "search_tavily", r#"{"query":"Paris"}"#);
        let transcript = vec![
            turn("User", ChatMessage::user("Find places")),
            turn("assistant", ChatMessage::assistant_tool_calls(None, vec![call])),
            turn("user_proxy", ChatMessage::tool_result("c1", "| results |")),
            turn("assistant", ChatMessage::assistant("Louvre")),
        ];

        let own = assistant.view(&transcript);
        assert_eq!(own[0].role, Role::User);
        assert_eq!(own[1].role, Role::Assistant);
        assert!(own[1].has_tool_calls());
        assert_eq!(own[2].role, Role::Tool);
        assert_eq!(own[2].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(own[3].role, Role::Assistant);

        let other = critic.view(&transcript);
        assert!(other.iter().all(|m| m.role == Role::User && !m.has_tool_calls()));
        assert!(other[1].text().contains("Suggested tool call (c1): search_tavily"));
        assert!(other[2].text().starts_with("Response from calling tool (c1):"));
    }

    #[tokio::test]
    async fn test_generate_sends_system_and_tools() {
        let provider = ScriptedProvider::new();
        provider.push_text("Hello");

        let factory = AgentFactory::new(LlmSettings::new("gpt-4"));
        let assistant = factory.assistant("assistant", "You help.", &search_tools());
        let mut usage = UsageTracker::new();

        let reply = assistant
            .generate(&provider, &[turn("User", ChatMessage::user("Hi"))], &mut usage)
            .await
            .unwrap();

        assert_eq!(reply.text(), "Hello");
        assert_eq!(usage.total_calls, 1);

        let request = &provider.requests()[0];
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.model.as_deref(), Some("gpt-4"));
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.seed, Some(41));
        assert_eq!(request.tools.as_ref().unwrap()[0].name, "search_tavily");
    }

    #[tokio::test]
    async fn test_execute_tools() {
        let factory = AgentFactory::new(LlmSettings::new("gpt-4"));
        let proxy = factory.user_proxy("user", &search_tools());
        let message = ChatMessage::assistant_tool_calls(
            None,
            vec![ToolCall::new("c9", "search_tavily", r#"{"query":"Lyon"}"#)],
        );

        let results = proxy.execute_tools(&message).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tool_call_id.as_deref(), Some("c9"));
        assert_eq!(results[0].text(), "| 0 | results for Lyon |");
    }
}
