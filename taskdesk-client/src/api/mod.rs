//! Domain API facade
//!
//! Typed operations over the HTTP core, one handle per resource:
//!
//! - [`UsersApi`]: `/api/users/`
//! - [`TasksApi`]: `/api/tasks/` and its comments and attachments
//! - [`TenantsApi`]: `/api/tenants/`
//!
//! Payloads are validated before anything is sent. Writes return the
//! server's representation of the resource; deletes return `()`.

pub mod tasks;
pub mod tenants;
pub mod users;

pub use tasks::{NewAttachment, TasksApi};
pub use tenants::TenantsApi;
pub use users::UsersApi;

use serde::Deserialize;

/// List response body
///
/// Accepts a bare array as well as a paginated `{"count": .., "results": [..]}`
/// envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListBody<T> {
    Plain(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> ListBody<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Plain(items) | ListBody::Page { results: items } => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_body_shapes() {
        let plain: ListBody<i64> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(plain.into_vec(), vec![1, 2]);

        let page: ListBody<i64> =
            serde_json::from_str(r#"{"count": 2, "next": null, "results": [3, 4]}"#).unwrap();
        assert_eq!(page.into_vec(), vec![3, 4]);

        assert!(serde_json::from_str::<ListBody<i64>>(r#"{"detail": "x"}"#).is_err());
    }
}
