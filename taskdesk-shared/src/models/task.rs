//! Task model, comments, attachments and payloads
//!
//! # Status Vocabulary
//!
//! The server's task model uses `todo`, `in_progress`, `review` and `done`.
//! Older API deployments used `pending`/`in_progress`/`completed`, and some
//! clients sent upper-case enum names (`TODO`, `IN_PROGRESS`, `DONE`). All of
//! them deserialize into the canonical [`TaskStatus`]; outbound payloads can be
//! rewritten for a legacy server with [`StatusVocabulary`].
//!
//! ```text
//! inbound:  pending | TODO        -> todo
//!           IN_PROGRESS           -> in_progress
//!           REVIEW                -> review
//!           completed | DONE      -> done
//! outbound (legacy): todo -> pending, done -> completed
//! ```
//!
//! # Example
//!
//! ```
//! use taskdesk_shared::models::task::{StatusVocabulary, TaskStatus};
//!
//! assert_eq!(StatusVocabulary::Legacy.encode(TaskStatus::Done), "completed");
//! assert_eq!("DONE".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::user::UserId;
use super::wire;

/// Task identifier
pub type TaskId = i64;

/// Comment identifier
pub type CommentId = i64;

/// Attachment identifier
pub type AttachmentId = i64;

/// Task workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    #[default]
    #[serde(alias = "pending", alias = "TODO")]
    Todo,

    /// Being worked on
    #[serde(alias = "IN_PROGRESS")]
    InProgress,

    /// Waiting for review
    #[serde(alias = "REVIEW")]
    Review,

    /// Finished
    #[serde(alias = "completed", alias = "DONE")]
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }

    /// Checks if the task still needs work
    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Done)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" | "pending" => Ok(TaskStatus::Todo),
            "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "review" => Ok(TaskStatus::Review),
            "done" | "completed" => Ok(TaskStatus::Done),
            other => Err(format!("unknown task status: {}", other)),
        }
    }
}

/// Status vocabulary the server expects on writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusVocabulary {
    /// `todo`, `in_progress`, `review`, `done`
    #[default]
    Canonical,

    /// `pending`, `in_progress`, `completed`
    Legacy,
}

impl StatusVocabulary {
    /// Encodes a status in this vocabulary
    ///
    /// `review` has no legacy spelling and is sent unchanged.
    pub fn encode(&self, status: TaskStatus) -> &'static str {
        match (self, status) {
            (StatusVocabulary::Legacy, TaskStatus::Todo) => "pending",
            (StatusVocabulary::Legacy, TaskStatus::Done) => "completed",
            (_, status) => status.as_str(),
        }
    }

    /// Rewrites the `status` field of an outbound JSON body in place
    pub fn translate_outbound(&self, body: &mut JsonValue) {
        if *self == StatusVocabulary::Canonical {
            return;
        }

        if let Some(status) = body.get_mut("status") {
            let parsed = status.as_str().and_then(|s| s.parse::<TaskStatus>().ok());
            if let Some(parsed) = parsed {
                *status = JsonValue::String(self.encode(parsed).to_string());
            }
        }
    }
}

impl FromStr for StatusVocabulary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canonical" => Ok(StatusVocabulary::Canonical),
            "legacy" => Ok(StatusVocabulary::Legacy),
            other => Err(format!("unknown status vocabulary: {}", other)),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    #[serde(alias = "LOW")]
    Low,

    #[default]
    #[serde(alias = "MEDIUM")]
    Medium,

    #[serde(alias = "HIGH")]
    High,

    #[serde(alias = "URGENT")]
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "urgent" => Ok(TaskPriority::Urgent),
            other => Err(format!("unknown task priority: {}", other)),
        }
    }
}

/// Comment on a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,

    pub content: String,

    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// Author (the API nests the user object; only the id is kept)
    #[serde(
        default,
        rename = "user",
        alias = "created_by",
        alias = "author",
        deserialize_with = "wire::user_ref"
    )]
    pub author_id: Option<UserId>,

    #[serde(default, rename = "task")]
    pub task_id: Option<TaskId>,

    /// Parent comment for threaded replies
    #[serde(default, rename = "parent", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

/// File attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,

    /// URL or storage path of the uploaded file
    #[serde(rename = "file")]
    pub file_ref: String,

    #[serde(default)]
    pub description: String,

    #[serde(alias = "created_at")]
    pub uploaded_at: DateTime<Utc>,

    #[serde(default, alias = "created_by", deserialize_with = "wire::user_ref")]
    pub uploaded_by: Option<UserId>,

    #[serde(default, rename = "task")]
    pub task_id: Option<TaskId>,
}

impl Attachment {
    /// Last path segment of the file reference
    pub fn file_name(&self) -> &str {
        self.file_ref
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.file_ref)
    }
}

/// Task as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID
    pub id: TaskId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default, alias = "dueDate", deserialize_with = "wire::flexible_datetime")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(alias = "updatedAt")]
    pub updated_at: DateTime<Utc>,

    /// Set by the server when the task moves to `done`
    #[serde(default, alias = "completedAt", deserialize_with = "wire::flexible_datetime")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, alias = "assignedTo", deserialize_with = "wire::user_ref")]
    pub assigned_to: Option<UserId>,

    #[serde(default, alias = "createdBy", deserialize_with = "wire::user_ref")]
    pub created_by: Option<UserId>,

    #[serde(default, alias = "parentTask")]
    pub parent_task: Option<TaskId>,

    /// Comments in creation order
    #[serde(default)]
    pub comments: Vec<Comment>,

    /// Attachments in upload order
    #[serde(default)]
    pub attachments: Vec<Attachment>,

    #[serde(default)]
    pub subtasks: Vec<Task>,
}

impl Task {
    /// Checks if the task is past its due date and still open
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && self.due_date.map(|due| due < now).unwrap_or(false)
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateTask {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task: Option<TaskId>,
}

/// Input for a partial task update
///
/// All fields are optional. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,
}

impl UpdateTask {
    /// Checks if the update would change nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.assigned_to.is_none()
    }
}

/// Input for adding a comment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewComment {
    #[validate(length(min = 1, message = "Comment cannot be empty"))]
    pub content: String,

    /// Comment being replied to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<CommentId>,
}

impl NewComment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            parent: None,
        }
    }
}

/// Query filters for listing tasks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    pub assigned_to: Option<UserId>,

    /// Matches title or description
    pub search: Option<String>,

    pub due_before: Option<DateTime<Utc>>,

    pub due_after: Option<DateTime<Utc>>,
}

impl TaskFilter {
    /// Converts the filter into query parameters
    ///
    /// Status values are encoded in the given vocabulary.
    pub fn to_query(&self, vocabulary: StatusVocabulary) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(status) = self.status {
            query.push(("status", vocabulary.encode(status).to_string()));
        }
        if let Some(priority) = self.priority {
            query.push(("priority", priority.as_str().to_string()));
        }
        if let Some(assignee) = self.assigned_to {
            query.push(("assigned_to", assignee.to_string()));
        }
        if let Some(search) = &self.search {
            query.push(("search", search.clone()));
        }
        if let Some(before) = self.due_before {
            query.push(("due_date__lt", before.to_rfc3339()));
        }
        if let Some(after) = self.due_after {
            query.push(("due_date__gt", after.to_rfc3339()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn snake_case_task() -> JsonValue {
        json!({
            "id": 1,
            "title": "Complete project documentation",
            "description": "Write comprehensive documentation for the API",
            "status": "completed",
            "priority": "high",
            "due_date": "2024-03-01",
            "created_at": "2024-02-01T09:00:00Z",
            "updated_at": "2024-02-02T09:00:00.123456Z",
            "assigned_to": {"id": 3, "username": "bob", "role": "user"},
            "created_by": 1,
            "comments": [{
                "id": 10,
                "task": 1,
                "user": {"id": 3, "username": "bob"},
                "content": "On it",
                "created_at": "2024-02-01T10:00:00Z"
            }],
            "attachments": [{
                "id": 20,
                "file": "/media/attachments/spec.pdf",
                "description": "Requirements",
                "uploaded_at": "2024-02-01T11:00:00Z",
                "uploaded_by": 3
            }]
        })
    }

    #[test]
    fn test_status_aliases() {
        let cases = [
            ("todo", TaskStatus::Todo),
            ("pending", TaskStatus::Todo),
            ("TODO", TaskStatus::Todo),
            ("IN_PROGRESS", TaskStatus::InProgress),
            ("in_progress", TaskStatus::InProgress),
            ("review", TaskStatus::Review),
            ("completed", TaskStatus::Done),
            ("DONE", TaskStatus::Done),
        ];

        for (raw, expected) in cases {
            let parsed: TaskStatus = serde_json::from_value(json!(raw)).unwrap();
            assert_eq!(parsed, expected, "deserializing {}", raw);
            assert_eq!(raw.parse::<TaskStatus>().unwrap(), expected, "parsing {}", raw);
        }
    }

    #[test]
    fn test_status_serializes_canonically() {
        assert_eq!(serde_json::to_value(TaskStatus::InProgress).unwrap(), json!("in_progress"));
        assert_eq!(serde_json::to_value(TaskStatus::Done).unwrap(), json!("done"));
    }

    #[test]
    fn test_legacy_outbound_translation() {
        let mut body = json!({"title": "x", "status": "done"});
        StatusVocabulary::Legacy.translate_outbound(&mut body);
        assert_eq!(body["status"], "completed");

        let mut body = json!({"status": "review"});
        StatusVocabulary::Legacy.translate_outbound(&mut body);
        assert_eq!(body["status"], "review");

        let mut body = json!({"status": "done"});
        StatusVocabulary::Canonical.translate_outbound(&mut body);
        assert_eq!(body["status"], "done");

        let mut body = json!({"title": "no status"});
        StatusVocabulary::Legacy.translate_outbound(&mut body);
        assert!(body.get("status").is_none());
    }

    #[test]
    fn test_task_snake_case_shape() {
        let task: Task = serde_json::from_value(snake_case_task()).unwrap();

        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.assigned_to, Some(3));
        assert_eq!(task.created_by, Some(1));
        assert_eq!(
            task.due_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(task.comments.len(), 1);
        assert_eq!(task.comments[0].author_id, Some(3));
        assert_eq!(task.comments[0].task_id, Some(1));
        assert_eq!(task.attachments[0].file_name(), "spec.pdf");
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn test_task_camel_case_shape() {
        let task: Task = serde_json::from_value(json!({
            "id": 2,
            "title": "Review PR",
            "description": "",
            "dueDate": "2024-04-01T17:00:00Z",
            "priority": "MEDIUM",
            "status": "IN_PROGRESS",
            "assignedTo": 5,
            "createdAt": "2024-03-01T09:00:00Z",
            "updatedAt": "2024-03-01T09:00:00Z"
        }))
        .unwrap();

        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.assigned_to, Some(5));
        assert!(task.due_date.is_some());
        assert!(task.comments.is_empty());
    }

    #[test]
    fn test_is_overdue() {
        let mut task: Task = serde_json::from_value(snake_case_task()).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        assert!(!task.is_overdue(later), "done tasks are never overdue");

        task.status = TaskStatus::InProgress;
        assert!(task.is_overdue(later));

        task.due_date = None;
        assert!(!task.is_overdue(later));
    }

    #[test]
    fn test_update_task_is_partial() {
        let update = UpdateTask {
            status: Some(TaskStatus::Review),
            ..Default::default()
        };

        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"status": "review"}));
        assert!(UpdateTask::default().is_empty());
    }

    #[test]
    fn test_create_task_requires_title() {
        let task = CreateTask::default();
        assert!(task.validate().is_err());

        let task = CreateTask {
            title: "Ship it".to_string(),
            ..Default::default()
        };
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_task_filter_query_uses_vocabulary() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Todo),
            assigned_to: Some(3),
            ..Default::default()
        };

        assert_eq!(
            filter.to_query(StatusVocabulary::Legacy),
            vec![("status", "pending".to_string()), ("assigned_to", "3".to_string())]
        );
        assert_eq!(
            filter.to_query(StatusVocabulary::Canonical)[0],
            ("status", "todo".to_string())
        );
    }
}
