//! # tripcraft agent
//!
//! Orchestrates the travel planning conversations:
//! 1. Task and agent catalogs are loaded from YAML
//! 2. The planner validates the trip request and renders every task
//! 3. Agents are built with their tools and a shared termination rule
//! 4. Each stage runs a sequence of chats, two-party or group
//! 5. A critic's view of the stage is summarized against the stage objective
//!
//! Completed stages are persisted so an interrupted plan can be resumed.

mod agent;
mod catalog;
mod chat;
mod group;
mod planner;
mod sequence;
mod session;
mod settings;

pub use agent::{is_termination, Agent, AgentFactory, AgentRole, LlmSettings, TERMINATION_KEYWORD};
pub use catalog::{AgentCatalog, AgentDefinition, TaskCatalog, TaskDefinition, TaskInputs};
pub use chat::{ChatResult, MessageLog, Observers, SummaryMethod, Turn, TwoPartyChat, DEFAULT_MAX_TURNS};
pub use group::{GroupChat, GroupChatManager, DEFAULT_MAX_ROUND};
pub use planner::{PlannerTools, StageReport, TravelPlanner, TripRequest, DINING_OPTIONS};
pub use sequence::{run_sequence, summarize_with_llm, ChatStep, Recipient, SequenceOutcome, TaskSequence};
pub use session::PlanSession;
pub use settings::{Settings, DEFAULT_MODEL, DEFAULT_SUMMARY_MODEL};
