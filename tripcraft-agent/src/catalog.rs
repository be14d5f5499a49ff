//! Task and agent catalogs
//!
//! Two YAML files drive every conversation. `tasks_config.yml` maps a task
//! name to a prompt template, the inputs it needs and an optional objective;
//! `agents_config.yml` maps an agent name to its system message.
//!
//! Templates use `{name}` placeholders. `{{` and `}}` produce literal braces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use tripcraft_error::{Error, Result};

/// Values offered to a template; keys the task does not declare are ignored
pub type TaskInputs = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task_template: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub objective: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub system_message: String,
}

// =============================================================================
// Task catalog
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    tasks: BTreeMap<String, TaskDefinition>,
}

impl TaskCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = read_config(path.as_ref(), "catalog::load_tasks")?;
        let catalog = Self::from_yaml(&text).map_err(|e| {
            e.with_context("path", path.as_ref().display().to_string())
        })?;
        debug!(tasks = catalog.tasks.len(), "task catalog loaded");
        Ok(catalog)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let tasks = parse_yaml(text, "catalog::parse_tasks")?;
        Ok(Self { tasks })
    }

    pub fn get(&self, task: &str) -> Result<&TaskDefinition> {
        self.tasks.get(task).ok_or_else(|| {
            Error::config_not_found("task", task).with_operation("catalog::get_task")
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Fill the task template with `inputs`
    pub fn render(&self, task: &str, inputs: &TaskInputs) -> Result<String> {
        let definition = self.get(task)?;

        if let Some(missing) = definition.inputs.iter().find(|name| !inputs.contains_key(*name)) {
            return Err(Error::missing_input(task, missing.as_str()).with_operation("catalog::render"));
        }

        render_template(&definition.task_template, |name| {
            definition
                .inputs
                .iter()
                .any(|declared| declared == name)
                .then(|| inputs.get(name).map(String::as_str))
                .flatten()
        })
        .map_err(|e| e.with_context("task", task))
    }

    pub fn objective(&self, task: &str) -> Result<&str> {
        self.get(task)?.objective.as_deref().ok_or_else(|| {
            Error::config_invalid(format!("task '{}' does not have an objective", task))
                .with_operation("catalog::objective")
                .with_context("task", task)
        })
    }
}

// =============================================================================
// Agent catalog
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    agents: BTreeMap<String, AgentDefinition>,
}

impl AgentCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = read_config(path.as_ref(), "catalog::load_agents")?;
        let catalog = Self::from_yaml(&text).map_err(|e| {
            e.with_context("path", path.as_ref().display().to_string())
        })?;
        debug!(agents = catalog.agents.len(), "agent catalog loaded");
        Ok(catalog)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let agents = parse_yaml(text, "catalog::parse_agents")?;
        Ok(Self { agents })
    }

    pub fn system_message(&self, agent: &str) -> Result<&str> {
        self.agents
            .get(agent)
            .map(|a| a.system_message.as_str())
            .ok_or_else(|| {
                Error::config_not_found("agent", agent).with_operation("catalog::system_message")
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn read_config(path: &Path, operation: &'static str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::from(e)
            .with_operation(operation)
            .with_context("path", path.display().to_string())
    })
}

fn parse_yaml<T: serde::de::DeserializeOwned>(text: &str, operation: &'static str) -> Result<T> {
    serde_yaml::from_str(text).map_err(|e| {
        Error::config_invalid(format!("malformed configuration: {}", e))
            .with_operation(operation)
            .set_source(e)
    })
}

/// Substitute `{name}` placeholders; `lookup` returns `None` for names that
/// are not allowed in this template
fn render_template<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> Result<String> {
    let bad = |message: String| Error::config_invalid(message).with_operation("catalog::render");

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(bad("unterminated placeholder in template".into())),
                    }
                }
                let name = name.trim();
                let value = lookup(name)
                    .ok_or_else(|| bad(format!("template uses undeclared input '{}'", name)))?;
                out.push_str(value);
            }
            '}' => return Err(bad("single '}' in template".into())),
            c => out.push(c),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripcraft_error::ErrorKind;

    const TASKS: &str = include_str!("../../conf/tasks_config.yml");
    const AGENTS: &str = include_str!("../../conf/agents_config.yml");

    fn inputs(pairs: &[(&str, &str)]) -> TaskInputs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn full_inputs() -> TaskInputs {
        inputs(&[
            ("user_input", "- City: Paris,\n- Country: France"),
            ("city_name", "Paris"),
            ("country_option", "France"),
            ("additional_considerations", "First time in the city"),
            ("dining_options", "Vegan, Seafood"),
        ])
    }

    #[test]
    fn test_every_shipped_task_renders() {
        let catalog = TaskCatalog::from_yaml(TASKS).unwrap();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names.len(), 8);

        for name in names {
            let rendered = catalog.render(name, &full_inputs()).unwrap();
            assert!(!rendered.trim().is_empty(), "{} rendered empty", name);
            for declared in &catalog.get(name).unwrap().inputs {
                assert!(!rendered.contains(&format!("{{{}}}", declared)), "{} left {{{}}}", name, declared);
            }
        }
    }

    #[test]
    fn test_missing_input_is_named() {
        let catalog = TaskCatalog::from_yaml(TASKS).unwrap();
        for name in catalog.names() {
            for declared in &catalog.get(name).unwrap().inputs {
                let mut partial = full_inputs();
                partial.remove(declared);
                let err = catalog.render(name, &partial).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::MissingInput);
                assert_eq!(err.context_value("input"), Some(declared.as_str()));
            }
        }
    }

    #[test]
    fn test_hotels_table_with_paris() {
        let catalog = TaskCatalog::from_yaml(TASKS).unwrap();
        let rendered = catalog
            .render("generate_hotels_table", &inputs(&[("user_input", "- City: Paris,\n- Country: France")]))
            .unwrap();
        assert!(rendered.contains("Paris"));
        assert!(rendered.contains("France"));
        assert!(!rendered.contains("{user_input}"));
    }

    #[test]
    fn test_unknown_task() {
        let catalog = TaskCatalog::from_yaml(TASKS).unwrap();
        let err = catalog.render("book_flights", &TaskInputs::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigNotFound);
        assert_eq!(err.context_value("task"), Some("book_flights"));
    }

    #[test]
    fn test_objectives() {
        let catalog = TaskCatalog::from_yaml(TASKS).unwrap();
        assert!(!catalog.objective("generate_hotels_text").unwrap().is_empty());
        assert!(!catalog.objective("search_places").unwrap().is_empty());
        assert!(!catalog.objective("generate_dining_places_text").unwrap().is_empty());

        let err = catalog.objective("get_locations_tuple").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_template_escapes_and_extras() {
        let catalog = TaskCatalog::from_yaml(
            "greet:\n  task_template: \"Hello {name}, here is {{literal}}\"\n  inputs: [name]\n",
        )
        .unwrap();
        let rendered = catalog
            .render("greet", &inputs(&[("name", "Ana"), ("unused", "x")]))
            .unwrap();
        assert_eq!(rendered, "Hello Ana, here is {literal}");
    }

    #[test]
    fn test_undeclared_placeholder() {
        let catalog = TaskCatalog::from_yaml(
            "greet:\n  task_template: \"Hello {name} from {city}\"\n  inputs: [name]\n",
        )
        .unwrap();
        let err = catalog
            .render("greet", &inputs(&[("name", "Ana"), ("city", "Lima")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_malformed_yaml() {
        let err = TaskCatalog::from_yaml("greet: [unclosed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_missing_file() {
        let err = TaskCatalog::load("/nonexistent/tasks_config.yml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_agent_catalog() {
        let catalog = AgentCatalog::from_yaml(AGENTS).unwrap();
        for name in ["travel_assistant", "websearch_assistant", "critic", "websearch_critic"] {
            assert!(!catalog.system_message(name).unwrap().is_empty());
        }
        let err = catalog.system_message("pilot").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigNotFound);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks_config.yml");
        std::fs::write(&path, TASKS).unwrap();
        let catalog = TaskCatalog::load(&path).unwrap();
        assert!(catalog.get("search_places").is_ok());
    }
}
