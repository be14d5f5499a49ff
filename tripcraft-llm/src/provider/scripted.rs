//! Scripted provider - replays a queue of canned responses
//!
//! Used for offline dry runs and for exercising agent flows without a network.
//! Every request is recorded so callers can inspect what the model was shown.

use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Provider that answers from a pre-loaded script
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
    model: String,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            model: "scripted".to_string(),
        }
    }

    /// Queue a plain text reply
    pub fn push_text(&self, content: impl Into<String>) -> &Self {
        self.push(CompletionResponse {
            id: self.next_id(),
            model: self.model.clone(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: Usage { prompt_tokens: 10, completion_tokens: 5, total_tokens: 15 },
        })
    }

    /// Queue a reply that asks for a single tool call
    pub fn push_tool_call(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> &Self {
        self.push(CompletionResponse {
            id: self.next_id(),
            model: self.model.clone(),
            content: None,
            tool_calls: vec![ToolCall::new(id, name, arguments.to_string())],
            finish_reason: FinishReason::ToolCalls,
            usage: Usage { prompt_tokens: 10, completion_tokens: 5, total_tokens: 15 },
        })
    }

    pub fn push(&self, response: CompletionResponse) -> &Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
        self
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Responses still waiting to be served
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn next_id(&self) -> String {
        format!("scripted-{}", self.remaining() + self.requests().len())
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        self.requests
            .lock()
            .map_err(|_| ProviderError::Other("scripted provider poisoned".into()))?
            .push(request);

        self.responses
            .lock()
            .map_err(|_| ProviderError::Other("scripted provider poisoned".into()))?
            .pop_front()
            .ok_or_else(|| ProviderError::Other("script exhausted".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let provider = ScriptedProvider::new();
        provider.push_text("first").push_text("second");

        assert_eq!(provider.prompt("a").await.unwrap(), "first");
        assert_eq!(provider.prompt("b").await.unwrap(), "second");
        assert_eq!(provider.requests().len(), 2);
        assert_eq!(provider.requests()[1].messages[0].text(), "b");
    }

    #[test]
    fn test_exhausted_script_errors() {
        let provider = ScriptedProvider::new();
        let err = tokio_test::block_on(provider.prompt("anything")).unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }

    #[tokio::test]
    async fn test_tool_call_response() {
        let provider = ScriptedProvider::new();
        provider.push_tool_call("c1", "search_tavily", serde_json::json!({"query": "x"}));

        let response = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("go")]))
            .await
            .unwrap();
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls[0].arguments, r#"{"query":"x"}"#);
    }
}
