//! Plan sessions - completed stages persisted as JSON
//!
//! ```text
//! {session_dir}/
//!   {session_id}/
//!     request.json   # the trip request the session was started with
//!     stage_1.json   # one StageReport per completed stage
//!     stage_2.json
//! ```
//!
//! Re-running a plan with the same session id skips every stage that already
//! has a report.

use crate::planner::{StageReport, TripRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tripcraft_error::{Error, ErrorKind, Result};

const REQUEST_FILE: &str = "request.json";

#[derive(Debug, Clone)]
pub struct PlanSession {
    id: String,
    dir: PathBuf,
}

impl PlanSession {
    /// Open `id` under `base_dir`, or start a fresh session when `id` is `None`
    pub fn open(base_dir: impl AsRef<Path>, id: Option<&str>) -> Result<Self> {
        let id = match id {
            Some(id) => validate_id(id)?.to_string(),
            None => Self::generate_id(),
        };

        let dir = base_dir.as_ref().join(&id);
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::from(e)
                .with_operation("session::open")
                .with_context("path", dir.display().to_string())
        })?;

        debug!(session = %id, path = %dir.display(), "session opened");
        Ok(Self { id, dir })
    }

    pub fn generate_id() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        format!("plan_{:x}", ts)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stage_path(&self, stage: u8) -> PathBuf {
        self.dir.join(format!("stage_{}.json", stage))
    }

    pub fn is_completed(&self, stage: u8) -> bool {
        self.stage_path(stage).is_file()
    }

    pub fn completed_stages(&self) -> Vec<u8> {
        (1..=u8::MAX).take_while(|s| self.is_completed(*s)).collect()
    }

    pub fn load_stage(&self, stage: u8) -> Result<StageReport> {
        read_json(&self.stage_path(stage), "session::load_stage")
    }

    pub fn save_stage(&self, report: &StageReport) -> Result<()> {
        write_json(&self.stage_path(report.stage), report, "session::save_stage")
    }

    /// Remember the request; a resumed session with a different one is kept but reported
    pub fn record_request(&self, request: &TripRequest) -> Result<()> {
        let path = self.dir.join(REQUEST_FILE);
        if path.is_file() {
            let previous: TripRequest = read_json(&path, "session::record_request")?;
            if previous != *request {
                warn!(session = %self.id, "trip request differs from the one this session started with");
            }
            return Ok(());
        }
        write_json(&path, request, "session::record_request")
    }

    /// Session ids under `base_dir`, sorted; an absent directory has none
    pub fn list(base_dir: impl AsRef<Path>) -> Result<Vec<String>> {
        let base_dir = base_dir.as_ref();
        let entries = match std::fs::read_dir(base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::from(e)
                    .with_operation("session::list")
                    .with_context("path", base_dir.display().to_string()))
            }
        };

        let mut sessions: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        sessions.sort();
        Ok(sessions)
    }
}

fn validate_id(id: &str) -> Result<&str> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(id)
    } else {
        Err(Error::invalid_argument(format!("invalid session id '{}'", id))
            .with_operation("session::open"))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, operation: &'static str) -> Result<T> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        Error::from(e)
            .with_operation(operation)
            .with_context("path", path.display().to_string())
    })?;
    serde_json::from_str(&json).map_err(|e| {
        Error::new(ErrorKind::ParseFailed, format!("failed to parse {}: {}", path.display(), e))
            .with_operation(operation)
            .set_source(e)
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T, operation: &'static str) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        Error::serialization_failed(e.to_string())
            .with_operation(operation)
            .set_source(e)
    })?;
    std::fs::write(path, json).map_err(|e| {
        Error::from(e)
            .with_operation(operation)
            .with_context("path", path.display().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::tests::paris_request;
    use tripcraft_llm::UsageTracker;

    fn report(stage: u8) -> StageReport {
        StageReport {
            stage,
            label: format!("Step {}/3", stage),
            summary: format!("summary {}", stage),
            results: vec![],
            manager_history: vec![],
            outputs: vec![],
            usage: UsageTracker::new(),
        }
    }

    #[test]
    fn test_stage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let session = PlanSession::open(dir.path(), Some("paris")).unwrap();
        assert!(!session.is_completed(1));

        session.save_stage(&report(1)).unwrap();
        session.save_stage(&report(2)).unwrap();

        let reopened = PlanSession::open(dir.path(), Some("paris")).unwrap();
        assert_eq!(reopened.completed_stages(), vec![1, 2]);
        assert_eq!(reopened.load_stage(2).unwrap().summary, "summary 2");
    }

    #[test]
    fn test_generated_ids_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let session = PlanSession::open(dir.path(), None).unwrap();
        assert!(session.id().starts_with("plan_"));
        PlanSession::open(dir.path(), Some("alpha")).unwrap();

        let listed = PlanSession::list(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], "alpha");

        assert!(PlanSession::list(dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["", "..", "../etc", "a/b"] {
            let err = PlanSession::open(dir.path(), Some(bad)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_record_request_once() {
        let dir = tempfile::tempdir().unwrap();
        let session = PlanSession::open(dir.path(), Some("trip")).unwrap();
        let request = paris_request();

        session.record_request(&request).unwrap();
        let mut changed = request.clone();
        changed.city = "Lyon".into();
        session.record_request(&changed).unwrap();

        let stored: TripRequest = read_json(&dir.path().join("trip").join(REQUEST_FILE), "test").unwrap();
        assert_eq!(stored.city, "Paris");
    }

    #[test]
    fn test_reports_saved_before_history_was_kept_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let session = PlanSession::open(dir.path(), Some("older")).unwrap();
        let json = serde_json::json!({
            "stage": 1,
            "label": "Step 1/3",
            "summary": "summary 1",
            "results": [],
            "usage": UsageTracker::new(),
        });
        std::fs::write(session.dir().join("stage_1.json"), json.to_string()).unwrap();

        let report = session.load_stage(1).unwrap();
        assert!(report.manager_history.is_empty());
        assert!(report.outputs.is_empty());
    }

    #[test]
    fn test_corrupt_stage_file() {
        let dir = tempfile::tempdir().unwrap();
        let session = PlanSession::open(dir.path(), Some("broken")).unwrap();
        std::fs::write(session.dir().join("stage_1.json"), "{not json").unwrap();
        let err = session.load_stage(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
    }
}
