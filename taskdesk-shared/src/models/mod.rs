//! Domain models for TaskDesk
//!
//! These are the shapes the TaskDesk REST API returns and accepts. Inbound
//! deserialization is deliberately lenient: the API has shipped more than one
//! representation of the same entities, so the models normalize them at the
//! boundary (see [`wire`]).
//!
//! # Models
//!
//! - `auth`: Login credentials and token pairs
//! - `user`: User accounts, roles and user payloads
//! - `task`: Tasks, comments, attachments, status vocabulary
//! - `tenant`: Organizations that own users and tasks
//!
//! # Example
//!
//! ```
//! use taskdesk_shared::models::task::{Task, TaskStatus};
//!
//! let task: Task = serde_json::from_value(serde_json::json!({
//!     "id": 7,
//!     "title": "Write docs",
//!     "status": "pending",
//!     "created_at": "2024-03-01T09:00:00Z",
//!     "updated_at": "2024-03-01T09:00:00Z"
//! }))
//! .unwrap();
//!
//! assert_eq!(task.status, TaskStatus::Todo);
//! ```

pub mod auth;
pub mod task;
pub mod tenant;
pub mod user;
pub mod wire;

use validator::ValidationErrors;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Flattens `validator` errors into field/message pairs
///
/// Fields are sorted by name so the output is stable.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut details: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Credentials;
    use validator::Validate;

    #[test]
    fn test_field_errors_are_sorted() {
        let credentials = Credentials {
            username: String::new(),
            password: String::new(),
        };

        let errors = credentials.validate().unwrap_err();
        let details = field_errors(&errors);

        assert_eq!(details.len(), 2);
        assert_eq!(details[0].field, "password");
        assert_eq!(details[1].field, "username");
        assert_eq!(details[1].message, "Username is required");
    }
}
