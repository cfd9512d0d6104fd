//! `reqwest`-backed transport

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use std::time::Duration;

use super::{
    ApiRequest, ApiResponse, HttpTransport, MultipartPayload, RequestBody, TransportError,
    TransportErrorKind,
};
use crate::error::{ClientError, ClientResult};

const USER_AGENT: &str = concat!("taskdesk-client/", env!("CARGO_PKG_VERSION"));

/// Real HTTP transport
///
/// Request paths are resolved against the base URL, so `https://host/` and
/// `https://host` behave the same and a base with a path prefix
/// (`https://host/backend/`) keeps it.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a transport for `base_url` with a total request timeout
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base_url = normalize_base_url(base_url)?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        tracing::debug!(base_url = %base_url, timeout_secs = timeout.as_secs(), "Created HTTP transport");

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::new(TransportErrorKind::Other, format!("Invalid path {}: {}", path, e)))
    }
}

/// Parses a base URL and makes sure it ends with `/`
pub fn normalize_base_url(raw: &str) -> ClientResult<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    let url = Url::parse(&with_slash)
        .map_err(|e| ClientError::Config(format!("Invalid API URL {:?}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::Config(format!(
            "API URL must use http or https, got {}",
            other
        ))),
    }
}

fn build_form(payload: &MultipartPayload) -> Result<Form, TransportError> {
    let mut form = Form::new();

    for (name, value) in &payload.fields {
        form = form.text(name.clone(), value.clone());
    }

    for file in &payload.files {
        let mut part = Part::bytes(file.data.to_vec()).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type).map_err(|e| {
                TransportError::new(
                    TransportErrorKind::Other,
                    format!("Invalid content type {}: {}", content_type, e),
                )
            })?;
        }
        form = form.part(file.field.clone(), part);
    }

    Ok(form)
}

fn classify(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.to_string())
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        let mut builder = self.client.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(payload) => builder.multipart(build_form(payload)?),
        };

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.bytes().await.map_err(classify)?;

        Ok(ApiResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:8000").unwrap().as_str(),
            "http://localhost:8000/"
        );
        assert_eq!(
            normalize_base_url("https://example.com/backend/").unwrap().as_str(),
            "https://example.com/backend/"
        );
        assert!(matches!(
            normalize_base_url("ftp://example.com"),
            Err(ClientError::Config(_))
        ));
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_url_for_keeps_prefix() {
        let transport =
            ReqwestTransport::new("https://example.com/backend", Duration::from_secs(5)).unwrap();

        assert_eq!(
            transport.url_for("/api/tasks/1/").unwrap().as_str(),
            "https://example.com/backend/api/tasks/1/"
        );
    }
}
