//! Users API

use std::sync::Arc;
use taskdesk_shared::models::user::{ChangePassword, CreateUser, UpdateUser, User, UserFilter, UserId};
use validator::Validate;

use super::ListBody;
use crate::error::ClientResult;
use crate::http::ApiClient;
use crate::transport::ApiRequest;

/// User collection path
pub const USERS_PATH: &str = "/api/users/";

/// Current user path
pub const ME_PATH: &str = "/api/users/me/";

/// Password change path
pub const CHANGE_PASSWORD_PATH: &str = "/api/users/change-password/";

fn user_path(id: UserId) -> String {
    format!("{}{}/", USERS_PATH, id)
}

/// User operations
#[derive(Clone)]
pub struct UsersApi {
    api: Arc<ApiClient>,
}

impl UsersApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Fetches the authenticated user
    pub async fn me(&self) -> ClientResult<User> {
        self.api.get_json(ApiRequest::get(ME_PATH)).await
    }

    pub async fn get(&self, id: UserId) -> ClientResult<User> {
        self.api.get_json(ApiRequest::get(user_path(id))).await
    }

    /// Lists users visible to the caller
    pub async fn list(&self, filter: &UserFilter) -> ClientResult<Vec<User>> {
        let body: ListBody<User> = self
            .api
            .get_json(ApiRequest::get(USERS_PATH).query(filter.to_query()))
            .await?;
        Ok(body.into_vec())
    }

    pub async fn create(&self, data: &CreateUser) -> ClientResult<User> {
        data.validate()?;
        let user: User = self.api.send_json(ApiRequest::post(USERS_PATH), data).await?;
        tracing::info!(user_id = user.id, username = %user.username, "Created user");
        Ok(user)
    }

    /// Applies a partial update
    pub async fn update(&self, id: UserId, changes: &UpdateUser) -> ClientResult<User> {
        changes.validate()?;
        self.api.send_json(ApiRequest::patch(user_path(id)), changes).await
    }

    pub async fn delete(&self, id: UserId) -> ClientResult<()> {
        self.api.send_empty(ApiRequest::delete(user_path(id))).await?;
        tracing::info!(user_id = id, "Deleted user");
        Ok(())
    }

    /// Changes the caller's password
    pub async fn change_password(&self, change: &ChangePassword) -> ClientResult<()> {
        change.validate()?;
        self.api
            .send_json_empty(ApiRequest::post(CHANGE_PASSWORD_PATH), change)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenEndpoint;
    use crate::error::ClientError;
    use crate::session::SessionStore;
    use crate::transport::{MockReply, MockTransport, RequestBody};
    use reqwest::Method;
    use serde_json::json;
    use taskdesk_shared::models::task::StatusVocabulary;
    use taskdesk_shared::models::user::Role;

    fn users(mock: &Arc<MockTransport>) -> UsersApi {
        let api = ApiClient::new(
            mock.clone(),
            Arc::new(SessionStore::in_memory()),
            Arc::new(TokenEndpoint::new(mock.clone())),
            StatusVocabulary::Canonical,
        );
        UsersApi::new(Arc::new(api))
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(
            Method::GET,
            USERS_PATH,
            MockReply::ok(json!({"count": 1, "results": [{"id": 2, "username": "bob", "role": "manager"}]})),
        );

        let filter = UserFilter {
            search: Some("bo".to_string()),
            role: Some(Role::Manager),
        };
        let list = users(&mock).list(&filter).await.unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].role, Role::Manager);
        assert_eq!(
            mock.requests()[0].request.query,
            vec![
                ("search".to_string(), "bo".to_string()),
                ("role".to_string(), "manager".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(
            Method::PATCH,
            "/api/users/2/",
            MockReply::ok(json!({"id": 2, "username": "bob", "first_name": "Bob", "role": "user"})),
        );

        let changes = UpdateUser {
            first_name: Some("Bob".to_string()),
            ..Default::default()
        };
        let user = users(&mock).update(2, &changes).await.unwrap();

        assert_eq!(user.display_name(), "Bob");
        assert_eq!(
            mock.requests()[0].request.body,
            RequestBody::Json(json!({"first_name": "Bob"}))
        );
    }

    #[tokio::test]
    async fn test_create_validates_before_sending() {
        let mock = Arc::new(MockTransport::new());

        let data = CreateUser {
            username: "carol".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role: None,
        };
        let err = users(&mock).create(&data).await.unwrap_err();

        match err {
            ClientError::InvalidInput(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "password"]);
            }
            other => panic!("expected invalid input, got {:?}", other),
        }
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_change_password_and_delete() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(
            Method::POST,
            CHANGE_PASSWORD_PATH,
            MockReply::ok(json!({"detail": "Password updated"})),
        );
        mock.enqueue(Method::DELETE, "/api/users/5/", MockReply::no_content());

        let api = users(&mock);
        api.change_password(&ChangePassword {
            current_password: "old-secret".to_string(),
            new_password: "new-secret-123".to_string(),
        })
        .await
        .unwrap();
        api.delete(5).await.unwrap();

        assert_eq!(
            mock.requests()[0].request.body,
            RequestBody::Json(json!({"current_password": "old-secret", "new_password": "new-secret-123"}))
        );
        assert_eq!(mock.requests()[1].method(), &Method::DELETE);
    }
}
