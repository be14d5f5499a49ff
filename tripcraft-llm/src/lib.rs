//! # tripcraft LLM
//!
//! The model-facing half of tripcraft.
//!
//! ## Core Concepts
//! - **ChatMessage**: role-tagged messages, including tool calls and tool results
//! - **ToolDefinition**: JSON-schema description of a callable tool
//! - **Provider**: Trait-based LLM communication (OpenAI-compatible, scripted)
//! - **UsageTracker**: token accounting across a pipeline stage

pub mod error;
pub mod provider;

pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    LlmProvider, ProviderConfig, ProviderError,
    ChatMessage, Role, CompletionRequest, CompletionResponse,
    ToolDefinition, ToolCall,
    FinishReason, Usage, UsageTracker,
    OpenAIProvider, ScriptedProvider,
};
