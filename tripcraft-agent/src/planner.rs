//! The travel planner: three stages of agent conversations

use crate::agent::{AgentFactory, LlmSettings};
use crate::catalog::{AgentCatalog, TaskCatalog, TaskInputs};
use crate::chat::{ChatResult, MessageLog, SummaryMethod, Turn};
use crate::group::{GroupChat, GroupChatManager};
use crate::sequence::{run_sequence, ChatStep, Recipient, TaskSequence};
use crate::session::PlanSession;
use crate::settings::{Settings, DEFAULT_MODEL, DEFAULT_SUMMARY_MODEL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tripcraft_error::{Error, Result};
use tripcraft_llm::{LlmProvider, UsageTracker};
use tripcraft_tools::{
    http_client, BookingClient, Geocoder, HotelSearch, MapPlotter, OutputLog, TavilyClient, ToolRegistry,
    WebSearch,
};

/// Food preferences offered to the traveller
pub const DINING_OPTIONS: [&str; 6] = [
    "Vegan",
    "Seafood",
    "Traditional cuisine from the city",
    "Meat",
    "Pasta",
    "Japanese",
];

const HOTELS_LABEL: &str = "Step 1/3: Curating your travel adventure, finding the best airports and hotels";
const PLACES_LABEL: &str = "Step 2/3: Unveiling the gems of your destination, finding the must-see spots";
const DINING_LABEL: &str = "Step 3/3: Savoring the flavors, discovering the must-try dining spots";

// =============================================================================
// Trip request
// =============================================================================

/// What the traveller asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    /// `leisure` or `business`
    pub travel_purpose: String,
    pub country: String,
    pub city: String,
    /// `YYYY-MM-DD`
    pub arrival_date: String,
    pub departure_date: String,
    pub children_qty: u32,
    /// Comma separated, e.g. `5,7`
    pub children_age: String,
    pub guest_qty: u32,
    pub room_qty: u32,
    pub additional_considerations: String,
    pub dining_options: Vec<String>,
}

impl TripRequest {
    pub fn validate(&self) -> Result<()> {
        let no_details = self.additional_considerations.trim().is_empty();
        let no_dining = self.dining_options.is_empty();

        let message = match (no_details, no_dining) {
            (false, false) => return Ok(()),
            (true, false) => "Please, provide additional considerations (details)",
            (false, true) => "Please, select at least one dining option",
            (true, true) => {
                "Please, provide additional consideration and select at least one dining option"
            }
        };
        Err(Error::invalid_argument(message).with_operation("planner::validate"))
    }

    /// Bullet list of the trip details handed to the hotel assistant
    pub fn user_input(&self) -> String {
        format!(
            "- City: {},\n\
             - Country: {},\n\
             - Arrival Date: {},\n\
             - Departure date: {},\n\
             - Quantity of children travelling: {},\n\
             - Children age: {},\n\
             - Number of guests: {},\n\
             - Number of rooms: {},\n\
             - Travel purpose: {}",
            self.city,
            self.country,
            self.arrival_date,
            self.departure_date,
            self.children_qty,
            self.children_age,
            self.guest_qty,
            self.room_qty,
            self.travel_purpose
        )
    }

    /// Every value a task template may ask for
    pub fn task_inputs(&self) -> TaskInputs {
        [
            ("user_input", self.user_input()),
            ("city_name", self.city.clone()),
            ("country_option", self.country.clone()),
            ("additional_considerations", self.additional_considerations.clone()),
            ("dining_options", self.dining_options.join(", ")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

// =============================================================================
// Stage reports and tools
// =============================================================================

/// A finished stage as shown to the user and stored in the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: u8,
    pub label: String,
    pub summary: String,
    pub results: Vec<ChatResult>,
    /// Every chat the stage's group-chat manager ran
    #[serde(default)]
    pub manager_history: Vec<Turn>,
    /// Files the tools wrote while the stage ran
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
    pub usage: UsageTracker,
}

/// The two tool sets, hotels and maps and web search, plus the log of the
/// files they write
#[derive(Debug, Clone)]
pub struct PlannerTools {
    pub hotels: ToolRegistry,
    pub web: ToolRegistry,
    pub outputs: OutputLog,
}

impl PlannerTools {
    pub fn new(hotels: ToolRegistry, web: ToolRegistry) -> Self {
        Self {
            hotels,
            web,
            outputs: OutputLog::new(),
        }
    }

    pub fn with_outputs(mut self, outputs: OutputLog) -> Self {
        self.outputs = outputs;
        self
    }

    /// The real services; fails if an API key is missing
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = http_client()?;
        let outputs = OutputLog::new();

        let hotel_search = HotelSearch::new(
            BookingClient::new(client.clone(), settings.rapid_api_key()?),
            Geocoder::new(client.clone()),
            &settings.output_dir,
        )
        .with_outputs(outputs.clone());
        let plotter = MapPlotter::new(&settings.airports_path, &settings.output_dir)
            .with_outputs(outputs.clone());
        let search = WebSearch::new(TavilyClient::new(client, settings.tavily_api_key()?));

        Ok(Self {
            hotels: ToolRegistry::new().with(Arc::new(hotel_search)).with(Arc::new(plotter)),
            web: ToolRegistry::new().with(Arc::new(search)),
            outputs,
        })
    }
}

// =============================================================================
// Planner
// =============================================================================

pub struct TravelPlanner<P> {
    provider: P,
    tasks: TaskCatalog,
    agents: AgentCatalog,
    tools: PlannerTools,
    llm: LlmSettings,
    summary_model: String,
}

impl<P: LlmProvider> TravelPlanner<P> {
    pub fn new(provider: P, tasks: TaskCatalog, agents: AgentCatalog, tools: PlannerTools) -> Self {
        Self {
            provider,
            tasks,
            agents,
            tools,
            llm: LlmSettings::new(DEFAULT_MODEL),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
        }
    }

    pub fn with_llm(mut self, llm: LlmSettings) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_summary_model(mut self, model: impl Into<String>) -> Self {
        self.summary_model = model.into();
        self
    }

    /// Run the three stages, skipping those the session already holds
    pub async fn run(&self, request: &TripRequest, session: &PlanSession) -> Result<Vec<StageReport>> {
        request.validate()?;
        session.record_request(request)?;

        let inputs = request.task_inputs();
        let render = |task: &str| self.tasks.render(task, &inputs);
        let objective = |task: &str| self.tasks.objective(task).map(str::to_string);

        // Agents
        let factory = AgentFactory::new(self.llm.clone());
        let hotels = &self.tools.hotels;
        let web = &self.tools.web;

        let assistant = Arc::new(factory.assistant(
            "assistant",
            self.agents.system_message("travel_assistant")?,
            hotels,
        ));
        let websearch_assistant = Arc::new(factory.assistant(
            "websearch_assistant",
            self.agents.system_message("websearch_assistant")?,
            web,
        ));
        let critic = Arc::new(factory.tracked_assistant("Critic", self.agents.system_message("critic")?));
        let websearch_critic = Arc::new(factory.tracked_assistant(
            "WebSearchCritic",
            self.agents.system_message("websearch_critic")?,
        ));

        let user = factory.user_proxy("User", hotels);
        let websearch_user = factory.user_proxy("websearch_user", web);

        let manager = Arc::new(GroupChatManager::new(
            "chat_manager",
            GroupChat::new(vec![
                Arc::new(factory.group_proxy("user_proxy", hotels)),
                assistant.clone(),
                critic.clone(),
            ]),
            self.llm.clone(),
        ));
        let web_search_manager = Arc::new(GroupChatManager::new(
            "web_search_manager",
            GroupChat::new(vec![
                Arc::new(factory.group_proxy("websearch_user_proxy", web)),
                websearch_assistant.clone(),
                websearch_critic.clone(),
            ]),
            self.llm.clone(),
        ));

        // Stages
        let hotels_stage = TaskSequence {
            label: HOTELS_LABEL.to_string(),
            steps: vec![
                ChatStep::new(
                    Recipient::Agent(assistant.clone()),
                    render("generate_hotels_table")?,
                    SummaryMethod::LastMessage,
                ),
                ChatStep::new(
                    Recipient::Group(manager.clone()),
                    render("generate_hotels_text")?,
                    SummaryMethod::LastMessage,
                ),
                ChatStep::new(
                    Recipient::Agent(assistant.clone()),
                    render("get_locations_tuple")?,
                    SummaryMethod::LastMessage,
                ),
                ChatStep::new(
                    Recipient::Agent(assistant.clone()),
                    render("generate_hotels_chart")?,
                    SummaryMethod::ReflectionWithLlm,
                ),
            ],
            manager: manager.name().to_string(),
            objective: objective("generate_hotels_text")?,
        };

        let places_stage = TaskSequence {
            label: PLACES_LABEL.to_string(),
            steps: vec![
                ChatStep::new(
                    Recipient::Agent(websearch_assistant.clone()),
                    render("search_places")?,
                    SummaryMethod::LastMessage,
                ),
                ChatStep::new(
                    Recipient::Group(web_search_manager.clone()),
                    render("generate_table_places")?,
                    SummaryMethod::ReflectionWithLlm,
                ),
            ],
            manager: web_search_manager.name().to_string(),
            objective: objective("search_places")?,
        };

        let dining_stage = TaskSequence {
            label: DINING_LABEL.to_string(),
            steps: vec![
                ChatStep::new(
                    Recipient::Agent(websearch_assistant.clone()),
                    render("search_dining_places")?,
                    SummaryMethod::LastMessage,
                ),
                ChatStep::new(
                    Recipient::Group(web_search_manager.clone()),
                    render("generate_dining_places_text")?,
                    SummaryMethod::ReflectionWithLlm,
                ),
            ],
            manager: web_search_manager.name().to_string(),
            objective: objective("generate_dining_places_text")?,
        };

        let plan = [
            (1u8, hotels_stage, &user, critic.name()),
            (2, places_stage, &websearch_user, websearch_critic.name()),
            (3, dining_stage, &websearch_user, websearch_critic.name()),
        ];

        let mut reports = Vec::with_capacity(plan.len());
        for (stage, sequence, driver, critic_name) in plan {
            if session.is_completed(stage) {
                info!(session = %session.id(), stage, "stage already completed, skipping");
                reports.push(session.load_stage(stage)?);
                continue;
            }

            let label = sequence.label.clone();
            self.tools.outputs.take();
            let outcome = run_sequence(
                &self.provider,
                driver,
                sequence,
                MessageLog::new(critic_name),
                &self.summary_model,
            )
            .await?;

            let report = StageReport {
                stage,
                label,
                summary: outcome.summary,
                results: outcome.results,
                manager_history: outcome.manager_history,
                outputs: self.tools.outputs.take(),
                usage: outcome.usage,
            };
            session.save_stage(&report)?;
            reports.push(report);
        }

        Ok(reports)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agent::tests::search_tools;
    use async_trait::async_trait;
    use tripcraft_error::ErrorKind;
    use tripcraft_llm::{Role, ScriptedProvider, ToolDefinition};
    use tripcraft_tools::Tool;

    const TASKS: &str = include_str!("../../conf/tasks_config.yml");
    const AGENTS: &str = include_str!("../../conf/agents_config.yml");

    pub(crate) fn paris_request() -> TripRequest {
        TripRequest {
            travel_purpose: "leisure".into(),
            country: "France".into(),
            city: "Paris".into(),
            arrival_date: "2026-11-01".into(),
            departure_date: "2026-11-05".into(),
            children_qty: 0,
            children_age: String::new(),
            guest_qty: 2,
            room_qty: 1,
            additional_considerations: "Honeymoon trip".into(),
            dining_options: vec!["Vegan".into(), "Seafood".into()],
        }
    }

    fn planner(provider: &ScriptedProvider) -> TravelPlanner<&ScriptedProvider> {
        TravelPlanner::new(
            provider,
            TaskCatalog::from_yaml(TASKS).unwrap(),
            AgentCatalog::from_yaml(AGENTS).unwrap(),
            PlannerTools::new(ToolRegistry::new(), search_tools()),
        )
    }

    fn saved(stage: u8) -> StageReport {
        StageReport {
            stage,
            label: format!("stage {}", stage),
            summary: format!("saved summary {}", stage),
            results: vec![],
            manager_history: vec![],
            outputs: vec![],
            usage: UsageTracker::new(),
        }
    }

    const HOTELS_TABLE: &str = "| Hotel Lutetia | 48.851 | 2.327 | Excellent |";
    const MAP_WRITTEN: &str =
        "SUCCESS: Hotel options have been successfully plotted on a map. Corresponding city: Paris";

    /// Stand-in for the booking search
    struct FakeHotels;

    #[async_trait]
    impl Tool for FakeHotels {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("get_list_of_locations", "Find hotels")
        }

        async fn invoke(&self, _arguments: &str) -> Result<String> {
            Ok(HOTELS_TABLE.to_string())
        }
    }

    /// Stand-in for the map tool; records a map file like the real one
    struct FakeMap(OutputLog);

    #[async_trait]
    impl Tool for FakeMap {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("plot_hotels_on_map", "Plot hotels")
        }

        async fn invoke(&self, _arguments: &str) -> Result<String> {
            self.0.record(std::path::Path::new("out/hotels_map_run.html"));
            Ok(MAP_WRITTEN.to_string())
        }
    }

    fn hotel_planner(provider: &ScriptedProvider) -> TravelPlanner<&ScriptedProvider> {
        let outputs = OutputLog::new();
        let hotels = ToolRegistry::new()
            .with(Arc::new(FakeHotels))
            .with(Arc::new(FakeMap(outputs.clone())));
        TravelPlanner::new(
            provider,
            TaskCatalog::from_yaml(TASKS).unwrap(),
            AgentCatalog::from_yaml(AGENTS).unwrap(),
            PlannerTools::new(hotels, search_tools()).with_outputs(outputs),
        )
    }

    #[test]
    fn test_validation_messages() {
        let mut request = paris_request();
        assert!(request.validate().is_ok());

        request.additional_considerations = "  ".into();
        let err = request.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "Please, provide additional considerations (details)");

        request.dining_options.clear();
        assert_eq!(
            request.validate().unwrap_err().message(),
            "Please, provide additional consideration and select at least one dining option"
        );

        request.additional_considerations = "First visit".into();
        assert_eq!(
            request.validate().unwrap_err().message(),
            "Please, select at least one dining option"
        );
    }

    #[test]
    fn test_user_input_and_inputs() {
        let request = paris_request();
        let text = request.user_input();
        assert!(text.starts_with("- City: Paris,\n- Country: France,\n"));
        assert!(text.ends_with("- Travel purpose: leisure"));

        let inputs = request.task_inputs();
        assert_eq!(inputs["dining_options"], "Vegan, Seafood");
        assert_eq!(inputs["country_option"], "France");

        let rendered = TaskCatalog::from_yaml(TASKS)
            .unwrap()
            .render("generate_hotels_table", &inputs)
            .unwrap();
        assert!(rendered.contains("Paris") && rendered.contains("France"));
        assert!(!rendered.contains('{'));
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_calls() {
        let provider = ScriptedProvider::new();
        let dir = tempfile::tempdir().unwrap();
        let session = PlanSession::open(dir.path(), Some("t")).unwrap();
        let mut request = paris_request();
        request.dining_options.clear();

        let err = planner(&provider).run(&request, &session).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(provider.requests().is_empty());
        assert!(!session.dir().join("request.json").exists());
    }

    #[tokio::test]
    async fn test_completed_session_is_not_rerun() {
        let provider = ScriptedProvider::new();
        let dir = tempfile::tempdir().unwrap();
        let session = PlanSession::open(dir.path(), Some("done")).unwrap();
        for stage in 1..=3 {
            session.save_stage(&saved(stage)).unwrap();
        }

        let reports = planner(&provider).run(&paris_request(), &session).await.unwrap();
        let summaries: Vec<&str> = reports.iter().map(|r| r.summary.as_str()).collect();
        assert_eq!(summaries, vec!["saved summary 1", "saved summary 2", "saved summary 3"]);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_dining_stage_resumes_with_fresh_critic_log() {
        let provider = ScriptedProvider::new();
        provider
            .push_tool_call("c1", "search_tavily", serde_json::json!({ "query": "vegan Paris" }))
            .push_text("Le Potager du Marais. TERMINATE")
            .push_text("websearch_assistant")
            .push_text("Vegan: Le Potager du Marais")
            .push_text("WebSearchCritic")
            .push_text("Looks right. TERMINATE")
            .push_text("Dining guide reflection")
            .push_text("Eat at Le Potager du Marais.");

        let dir = tempfile::tempdir().unwrap();
        let session = PlanSession::open(dir.path(), Some("resume")).unwrap();
        session.save_stage(&saved(1)).unwrap();
        session.save_stage(&saved(2)).unwrap();

        let reports = planner(&provider).run(&paris_request(), &session).await.unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[2].summary, "Eat at Le Potager du Marais.");
        assert_eq!(reports[2].label, DINING_LABEL);
        assert!(session.is_completed(3));
        assert_eq!(provider.remaining(), 0);

        let requests = provider.requests();
        // The search step was asked about the chosen cuisines
        assert!(requests[0].messages[1].text().contains("Vegan, Seafood"));

        // Only this stage's group chat reached the critic
        let prompt = requests.last().unwrap().messages[0].text().to_string();
        assert_eq!(prompt.matches("User: ").count(), 2);
        assert!(prompt.contains("User: Vegan: Le Potager du Marais\n"));
        let objective = TaskCatalog::from_yaml(TASKS)
            .unwrap()
            .objective("generate_dining_places_text")
            .unwrap()
            .to_string();
        assert!(prompt.contains(&format!("Task Objective: {}", objective)));
    }

    #[tokio::test]
    async fn test_hotel_stage_runs_four_steps() {
        let provider = ScriptedProvider::new();
        let locate = serde_json::json!({ "city_name": "Paris", "country_name": "France" });
        let plot = serde_json::json!({ "city_name": "Paris", "country_name": "France", "locations": [] });
        provider
            // generate_hotels_table: search, then the table
            .push_tool_call("h1", "get_list_of_locations", locate.clone())
            .push_text("Hotel table ready. TERMINATE")
            // generate_hotels_text: group chat with a search routed to user_proxy
            .push_text("assistant")
            .push_tool_call("h2", "get_list_of_locations", locate)
            .push_text("assistant")
            .push_text("Hotel Lutetia is a lovely choice.")
            .push_text("Critic")
            .push_text("Accurate. TERMINATE")
            // get_locations_tuple
            .push_text(r#"[[48.851, 2.327, "Hotel Lutetia", "https://b/l", "Excellent"]]"#)
            // generate_hotels_chart: plot, answer, reflection
            .push_tool_call("m1", "plot_hotels_on_map", plot)
            .push_text("Map plotted. TERMINATE")
            .push_text("Map of Paris hotels and airports")
            // stage summary
            .push_text("Stay at Hotel Lutetia.");

        let dir = tempfile::tempdir().unwrap();
        let session = PlanSession::open(dir.path(), Some("hotels")).unwrap();
        session.save_stage(&saved(2)).unwrap();
        session.save_stage(&saved(3)).unwrap();

        let reports = hotel_planner(&provider).run(&paris_request(), &session).await.unwrap();
        assert_eq!(provider.remaining(), 0);

        let stage = &reports[0];
        assert_eq!(stage.label, HOTELS_LABEL);
        assert_eq!(stage.summary, "Stay at Hotel Lutetia.");
        let recipients: Vec<&str> = stage.results.iter().map(|r| r.recipient.as_str()).collect();
        assert_eq!(recipients, vec!["assistant", "chat_manager", "assistant", "assistant"]);
        assert_eq!(stage.results[1].summary, "Accurate.");
        assert_eq!(stage.results[3].summary, "Map of Paris hotels and airports");
        assert_eq!(stage.manager_history, stage.results[1].transcript);
        assert_eq!(stage.outputs, vec![PathBuf::from("out/hotels_map_run.html")]);
        assert_eq!(session.load_stage(1).unwrap().outputs, stage.outputs);

        // Two-party searches run on the driver, group searches on user_proxy
        let table = &stage.results[0].transcript[2];
        assert_eq!((table.speaker.as_str(), table.message.text()), ("User", HOTELS_TABLE));
        let in_group = &stage.results[1].transcript[2];
        assert_eq!(in_group.speaker, "user_proxy");
        assert_eq!(in_group.message.role, Role::Tool);
        let map = &stage.results[3].transcript[2];
        assert_eq!((map.speaker.as_str(), map.message.text()), ("User", MAP_WRITTEN));

        // Later steps carry the earlier summaries
        let opening = stage.results[2].transcript[0].message.text();
        assert!(opening.ends_with("Context: \nHotel table ready.\nAccurate."));

        let requests = provider.requests();
        assert!(requests[0].messages[1].text().contains("- City: Paris,"));

        // Only the group chat reached the critic: the opening, the tool call,
        // its result and the assistant's answer
        let prompt = requests.last().unwrap().messages[0].text().to_string();
        assert_eq!(prompt.matches("User: ").count(), 4);
        assert!(prompt.contains(&format!("User: {}\n", HOTELS_TABLE)));
        assert!(prompt.contains("User: Hotel Lutetia is a lovely choice.\n"));
        assert!(!prompt.contains("Map plotted"));
        let objective = TaskCatalog::from_yaml(TASKS)
            .unwrap()
            .objective("generate_hotels_text")
            .unwrap()
            .to_string();
        assert!(prompt.contains(&format!("Task Objective: {}", objective)));
    }
}
