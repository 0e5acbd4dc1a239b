//! HTTP client for the Innbox backend API

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::{RemoteDataService, RemoteError};
use crate::models::{Booking, BookingStatus};

/// reqwest-backed [`RemoteDataService`] implementation.
///
/// Transport failures (connect, timeout, DNS) map to
/// [`RemoteError::Connectivity`]; any reached-but-rejected response maps to
/// [`RemoteError::Api`].
#[derive(Clone)]
pub struct HttpRemoteService {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpRemoteService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            auth_token: None,
            client: reqwest::Client::builder()
                .build()
                .map_err(|e| RemoteError::Connectivity(e.to_string()))?,
        })
    }

    /// Attach a bearer token for authenticated tenants
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header("Accept", "application/json");
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = builder.send().await.map_err(classify_transport_error)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::Api(parse_api_error(status, &body)))
        }
    }

    async fn decode_json(response: reqwest::Response) -> Result<Value, RemoteError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| RemoteError::Api(format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl RemoteDataService for HttpRemoteService {
    async fn insert(&self, collection: &str, record: &Value) -> Result<Value, RemoteError> {
        let response = self
            .send(self.request(reqwest::Method::POST, &format!("/v1/{collection}")).json(record))
            .await?;
        Self::decode_json(response).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &Value,
    ) -> Result<Value, RemoteError> {
        let response = self
            .send(
                self.request(reqwest::Method::PATCH, &format!("/v1/{collection}/{id}"))
                    .json(patch),
            )
            .await?;
        Self::decode_json(response).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.send(self.request(reqwest::Method::DELETE, &format!("/v1/{collection}/{id}")))
            .await?;
        Ok(())
    }

    async fn find_overlapping(
        &self,
        room_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude_id: Option<&str>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, RemoteError> {
        let statuses = statuses
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let mut query = vec![
            ("room_id", room_id.to_string()),
            ("check_in", check_in.to_string()),
            ("check_out", check_out.to_string()),
            ("statuses", statuses),
        ];
        if let Some(exclude) = exclude_id {
            query.push(("exclude", exclude.to_string()));
        }

        let response = self
            .send(
                self.request(reqwest::Method::GET, "/v1/bookings/overlapping")
                    .query(&query),
            )
            .await?;

        response
            .json::<Vec<Booking>>()
            .await
            .map_err(|e| RemoteError::Api(format!("invalid response body: {e}")))
    }
}

fn classify_transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        RemoteError::Connectivity(err.to_string())
    } else {
        RemoteError::Api(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String, RemoteError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(RemoteError::Api("base URL must not be empty".to_string()));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::Api(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}
