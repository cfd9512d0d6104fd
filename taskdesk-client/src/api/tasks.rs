//! Tasks API
//!
//! Tasks plus their comments and attachments. Attachments are uploaded as
//! `multipart/form-data` with a `file` part and a `description` field.

use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use taskdesk_shared::models::task::{
    Attachment, Comment, CreateTask, NewComment, Task, TaskFilter, TaskId, UpdateTask,
};
use validator::Validate;

use super::ListBody;
use crate::error::ClientResult;
use crate::http::ApiClient;
use crate::transport::{ApiRequest, FilePart, MultipartPayload};

/// Task collection path
pub const TASKS_PATH: &str = "/api/tasks/";

fn task_path(id: TaskId) -> String {
    format!("{}{}/", TASKS_PATH, id)
}

fn comments_path(id: TaskId) -> String {
    format!("{}{}/comments/", TASKS_PATH, id)
}

fn attachments_path(id: TaskId) -> String {
    format!("{}{}/attachments/", TASKS_PATH, id)
}

/// File to upload as a task attachment
#[derive(Clone, Validate)]
pub struct NewAttachment {
    #[validate(length(min = 1, message = "File name is required"))]
    pub file_name: String,

    pub data: Bytes,

    /// MIME type; `application/octet-stream` when unset
    pub content_type: Option<String>,

    pub description: String,
}

impl NewAttachment {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
            content_type: None,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Reads a file from disk; the file name is the path's last component
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(file_name, data))
    }

    fn into_payload(self) -> MultipartPayload {
        MultipartPayload::new()
            .file(FilePart {
                field: "file".to_string(),
                file_name: self.file_name,
                content_type: self.content_type,
                data: self.data,
            })
            .text("description", self.description)
    }
}

impl std::fmt::Debug for NewAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAttachment")
            .field("file_name", &self.file_name)
            .field("len", &self.data.len())
            .field("content_type", &self.content_type)
            .field("description", &self.description)
            .finish()
    }
}

/// Task operations
#[derive(Clone)]
pub struct TasksApi {
    api: Arc<ApiClient>,
}

impl TasksApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Lists tasks matching `filter`
    pub async fn list(&self, filter: &TaskFilter) -> ClientResult<Vec<Task>> {
        let query = filter.to_query(self.api.vocabulary());
        let body: ListBody<Task> = self
            .api
            .get_json(ApiRequest::get(TASKS_PATH).query(query))
            .await?;
        Ok(body.into_vec())
    }

    pub async fn get(&self, id: TaskId) -> ClientResult<Task> {
        self.api.get_json(ApiRequest::get(task_path(id))).await
    }

    pub async fn create(&self, data: &CreateTask) -> ClientResult<Task> {
        data.validate()?;
        let task: Task = self.api.send_json(ApiRequest::post(TASKS_PATH), data).await?;
        tracing::info!(task_id = task.id, status = %task.status, "Created task");
        Ok(task)
    }

    /// Applies a partial update
    pub async fn update(&self, id: TaskId, changes: &UpdateTask) -> ClientResult<Task> {
        changes.validate()?;
        self.api.send_json(ApiRequest::patch(task_path(id)), changes).await
    }

    pub async fn delete(&self, id: TaskId) -> ClientResult<()> {
        self.api.send_empty(ApiRequest::delete(task_path(id))).await?;
        tracing::info!(task_id = id, "Deleted task");
        Ok(())
    }

    /// Lists a task's comments
    pub async fn comments(&self, id: TaskId) -> ClientResult<Vec<Comment>> {
        let body: ListBody<Comment> = self.api.get_json(ApiRequest::get(comments_path(id))).await?;
        Ok(body.into_vec())
    }

    /// Adds a comment, optionally as a reply to another comment
    pub async fn add_comment(&self, id: TaskId, comment: &NewComment) -> ClientResult<Comment> {
        comment.validate()?;
        self.api
            .send_json(ApiRequest::post(comments_path(id)), comment)
            .await
    }

    /// Lists a task's attachments
    pub async fn attachments(&self, id: TaskId) -> ClientResult<Vec<Attachment>> {
        let body: ListBody<Attachment> = self
            .api
            .get_json(ApiRequest::get(attachments_path(id)))
            .await?;
        Ok(body.into_vec())
    }

    /// Uploads a file to a task
    pub async fn add_attachment(&self, id: TaskId, file: NewAttachment) -> ClientResult<Attachment> {
        file.validate()?;

        tracing::debug!(task_id = id, file_name = %file.file_name, size = file.data.len(), "Uploading attachment");

        let request = ApiRequest::post(attachments_path(id)).multipart(file.into_payload());
        self.api.execute(&request).await?.json()
    }
}
