//! Tenants API (read-only)

use std::sync::Arc;
use taskdesk_shared::models::tenant::{Tenant, TenantId};

use super::ListBody;
use crate::error::ClientResult;
use crate::http::ApiClient;
use crate::transport::ApiRequest;

/// Tenant collection path
pub const TENANTS_PATH: &str = "/api/tenants/";

/// Tenant operations
#[derive(Clone)]
pub struct TenantsApi {
    api: Arc<ApiClient>,
}

impl TenantsApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Lists tenants visible to the caller (only their own unless superuser)
    pub async fn list(&self) -> ClientResult<Vec<Tenant>> {
        let body: ListBody<Tenant> = self.api.get_json(ApiRequest::get(TENANTS_PATH)).await?;
        Ok(body.into_vec())
    }

    pub async fn get(&self, id: TenantId) -> ClientResult<Tenant> {
        self.api
            .get_json(ApiRequest::get(format!("{}{}/", TENANTS_PATH, id)))
            .await
    }
}
