use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::assistant::Assistant;
use super::error::ApiError;
use super::phone_number::PhoneNumber;
use super::ResourceApi;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Vapi REST API client. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Client {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
                auth_header: format!("Bearer {}", token),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Assistant operations
    pub fn assistants(&self) -> ResourceApi<'_, Assistant> {
        ResourceApi::new(self)
    }

    /// Phone number operations
    pub fn phone_numbers(&self) -> ResourceApi<'_, PhoneNumber> {
        ResourceApi::new(self)
    }

    /// GET, expects 200
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let (status, body) = self.execute(Method::GET, path, None).await?;
        let body = expect_status(status, body, &[StatusCode::OK])?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POST, expects 201
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = serde_json::to_vec(body)?;
        let (status, body) = self.execute(Method::POST, path, Some(payload)).await?;
        let body = expect_status(status, body, &[StatusCode::CREATED])?;
        Ok(serde_json::from_str(&body)?)
    }

    /// PATCH, expects 200
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = serde_json::to_vec(body)?;
        let (status, body) = self.execute(Method::PATCH, path, Some(payload)).await?;
        let body = expect_status(status, body, &[StatusCode::OK])?;
        Ok(serde_json::from_str(&body)?)
    }

    /// DELETE, expects 200 or 204; any response body is ignored
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let (status, body) = self.execute(Method::DELETE, path, None).await?;
        expect_status(status, body, &[StatusCode::OK, StatusCode::NO_CONTENT])?;
        Ok(())
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, String), ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("{} request to: {}", method, url);

        let mut request = self
            .inner
            .http_client
            .request(method, &url)
            .header(AUTHORIZATION, &self.inner.auth_header);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("Response status: {} ({} bytes)", status, text.len());

        Ok((status, text))
    }
}

fn expect_status(status: StatusCode, body: String, expected: &[StatusCode]) -> Result<String, ApiError> {
    if expected.contains(&status) {
        Ok(body)
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
