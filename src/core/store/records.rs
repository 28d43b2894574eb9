//! Record shapes persisted by the stores.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::llm::ChatTurn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    New,
    Planned,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "New",
            TaskStatus::Planned => "Planned",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

/// A unit of planned work. `dependencies` reference other task ids; they are
/// not validated at write time since plans arrive incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: Uuid,
    pub feature: String,
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<Uuid>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A task as emitted by the planner, before it gets a creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTask {
    #[serde(default = "Uuid::new_v4")]
    pub task_id: Uuid,
    pub feature: String,
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<Uuid>,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

fn default_status() -> TaskStatus {
    TaskStatus::New
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTaskList {
    pub tasks: Vec<PlannedTask>,
}

impl TaskRecord {
    pub fn from_planned(planned: PlannedTask) -> Self {
        Self {
            task_id: planned.task_id,
            feature: planned.feature,
            description: planned.description,
            dependencies: planned.dependencies,
            status: planned.status,
            priority: planned.priority,
            assigned_to: planned.assigned_to,
            review_comments: None,
            created_at: Utc::now(),
        }
    }
}

/// A completed (or failed) agent run: final content plus the full transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    /// Speaker identity, e.g. "Parker".
    pub name: String,
    /// Role tag, e.g. "planner".
    pub agent: String,
    pub content: String,
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
    pub completed: bool,
    pub llm_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pull a [`PlannedTaskList`] out of model output. Tries the whole string as
/// JSON first, then a ```json fenced block, then the outermost brace pair.
pub fn extract_task_list(content: &str) -> Option<PlannedTaskList> {
    if let Ok(list) = serde_json::from_str::<PlannedTaskList>(content) {
        return Some(list);
    }

    if let Ok(re) = Regex::new(r"```(?:json)?\s*([\s\S]*?)```")
        && let Some(captures) = re.captures(content)
        && let Ok(list) = serde_json::from_str::<PlannedTaskList>(captures[1].trim())
    {
        return Some(list);
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_serializes_with_spaces() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            json!("In Progress")
        );
        let back: TaskStatus = serde_json::from_value(json!("In Progress")).unwrap();
        assert_eq!(back, TaskStatus::InProgress);
        assert_eq!(TaskStatus::InProgress.as_str(), "In Progress");
    }

    #[test]
    fn planned_task_fills_id_and_status() {
        let planned: PlannedTask = serde_json::from_value(json!({
            "feature": "auth",
            "description": "Add login endpoint"
        }))
        .unwrap();
        assert_eq!(planned.status, TaskStatus::New);
        assert!(planned.dependencies.is_empty());
    }

    #[test]
    fn from_planned_stamps_creation_time() {
        let planned: PlannedTask = serde_json::from_value(json!({
            "feature": "auth",
            "description": "Add login endpoint",
            "priority": "High"
        }))
        .unwrap();
        let record = TaskRecord::from_planned(planned.clone());
        assert_eq!(record.task_id, planned.task_id);
        assert_eq!(record.priority, Some(TaskPriority::High));
        assert!(record.review_comments.is_none());
    }

    #[test]
    fn extract_handles_bare_json() {
        let content = r#"{"tasks": [{"feature": "a", "description": "b"}]}"#;
        let list = extract_task_list(content).unwrap();
        assert_eq!(list.tasks.len(), 1);
        assert_eq!(list.tasks[0].feature, "a");
    }

    #[test]
    fn extract_handles_fenced_block() {
        let content = "Here is the plan:\n```json\n{\"tasks\": [{\"feature\": \"a\", \"description\": \"b\"}]}\n```\nDone.";
        let list = extract_task_list(content).unwrap();
        assert_eq!(list.tasks.len(), 1);
    }

    #[test]
    fn extract_handles_surrounding_prose() {
        let content = "Plan follows. {\"tasks\": [{\"feature\": \"a\", \"description\": \"b\"}]} That is all.";
        let list = extract_task_list(content).unwrap();
        assert_eq!(list.tasks.len(), 1);
    }

    #[test]
    fn extract_returns_none_for_prose() {
        assert!(extract_task_list("no tasks here, just words").is_none());
        assert!(extract_task_list("{\"tasks\": \"not a list\"}").is_none());
    }

    #[test]
    fn message_record_roundtrips() {
        let record = MessageRecord {
            id: Uuid::new_v4(),
            name: "Parker".to_string(),
            agent: "planner".to_string(),
            content: "done".to_string(),
            messages: vec![ChatTurn::user("plan it")],
            completed: true,
            llm_model: "deepseek-chat".to_string(),
            ref_id: Some("run-1".to_string()),
            created_at: Utc::now(),
        };
        let back: MessageRecord =
            serde_json::from_value(serde_json::to_value(&record).unwrap()).unwrap();
        assert_eq!(back, record);
    }
}
