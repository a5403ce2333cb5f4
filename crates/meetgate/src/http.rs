//! HTTP client for the upstream REST API.

use crate::api::RoomsApi;
use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::models::{
    CreateRoom, Deleted, ListParams, MeetingToken, MeetingTokenRequest, Recording, RecordingList,
    Room, RoomList, TokenBody, TokenValidation, UpdateRoom,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Default timeout applied by the HTTP client itself.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// `RoomsApi` over HTTP with bearer authentication.
#[derive(Clone)]
pub struct HttpRoomsClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl HttpRoomsClient {
    /// Creates a client for the API at `base_url`.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(api_key, base_url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Creates a client whose requests give up after `timeout`.
    ///
    /// `base_url` must be an absolute `http(s)` URL; it may carry a path
    /// prefix such as `/v1`.
    pub fn with_timeout(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| ApiError::Request(format!("invalid API URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Request(format!(
                "invalid API URL {:?}: not a base URL",
                base_url.as_str()
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Creates a client from the gateway configuration.
    ///
    /// The client's own timeout is the larger breaker timeout, so the breaker
    /// normally fires first.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ApiError> {
        let timeout = config
            .circuit_breaker
            .initial_request_timeout()
            .max(config.circuit_breaker.request_timeout());
        Self::with_timeout(&config.api_key, &config.api_url, timeout)
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends `segments` to the base path, percent-encoding each one so a
    /// room name can never reach a different endpoint.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Only fails for cannot-be-a-base URLs, rejected at construction.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.bearer_auth(&self.api_key).send().await?;

        #[cfg(feature = "tracing")]
        debug!(status = response.status().as_u16(), url = %response.url(), "Upstream responded");

        Ok(response)
    }

    async fn handle_response<T>(
        &self,
        response: Response,
        resource: (&str, &str),
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response, resource).await);
        }
        response.json::<T>().await.map_err(|e| ApiError::Response {
            status_code: status.as_u16(),
            message: format!("invalid response body: {e}"),
            data: None,
        })
    }
}

/// Maps a non-2xx response onto an [`ApiError`].
async fn error_from_response(response: Response, (resource_type, resource_id): (&str, &str)) -> ApiError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let data = serde_json::from_str::<Value>(&text).ok();
    let message = data
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                text.clone()
            }
        });

    #[cfg(feature = "tracing")]
    warn!(status = status.as_u16(), %message, "Upstream returned an error");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Authentication { message },
        StatusCode::NOT_FOUND => ApiError::not_found(resource_type, resource_id),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY if data.is_some() => {
            ApiError::Validation {
                validation_errors: vec![message],
            }
        }
        _ => ApiError::Response {
            status_code: status.as_u16(),
            message,
            data,
        },
    }
}

/// Upstream errors look like `{"error": "...", "info": "..."}`.
fn error_message(body: &Value) -> Option<String> {
    let info = body.get("info").and_then(Value::as_str);
    let error = body.get("error").and_then(Value::as_str);
    match (error, info) {
        (Some(error), Some(info)) => Some(format!("{error}: {info}")),
        (Some(msg), None) | (None, Some(msg)) => Some(msg.to_string()),
        (None, None) => None,
    }
}

#[async_trait]
impl RoomsApi for HttpRoomsClient {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn list_rooms(&self, params: &ListParams) -> Result<RoomList, ApiError> {
        let request = self.client.get(self.url(&["rooms"])).query(&params.query());
        let response = self.send(request).await?;
        self.handle_response(response, ("rooms", "")).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn get_room(&self, name: &str) -> Result<Room, ApiError> {
        let request = self.client.get(self.url(&["rooms", name]));
        let response = self.send(request).await?;
        self.handle_response(response, ("room", name)).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, request), fields(name = ?request.name)))]
    async fn create_room(&self, request: &CreateRoom) -> Result<Room, ApiError> {
        let builder = self.client.post(self.url(&["rooms"])).json(request);
        let response = self.send(builder).await?;
        let name = request.name.as_deref().unwrap_or_default();
        self.handle_response(response, ("room", name)).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, request)))]
    async fn update_room(&self, name: &str, request: &UpdateRoom) -> Result<Room, ApiError> {
        let builder = self
            .client
            .post(self.url(&["rooms", name]))
            .json(request);
        let response = self.send(builder).await?;
        self.handle_response(response, ("room", name)).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn delete_room(&self, name: &str) -> Result<Deleted, ApiError> {
        let request = self.client.delete(self.url(&["rooms", name]));
        let response = self.send(request).await?;
        self.handle_response(response, ("room", name)).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, request), fields(room = %request.room_name)))]
    async fn generate_room_token(
        &self,
        request: &MeetingTokenRequest,
    ) -> Result<MeetingToken, ApiError> {
        let builder = self
            .client
            .post(self.url(&["meeting-tokens"]))
            .json(&TokenBody {
                properties: request,
            });
        let response = self.send(builder).await?;
        self.handle_response(response, ("room", request.room_name.as_str()))
            .await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    async fn validate_room_token(&self, token: &str) -> Result<TokenValidation, ApiError> {
        let request = self
            .client
            .get(self.url(&["meeting-tokens", token]));
        let response = self.send(request).await?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => Ok(TokenValidation {
                is_valid: false,
                properties: None,
            }),
            _ => {
                let properties: Map<String, Value> =
                    self.handle_response(response, ("meeting token", "")).await?;
                Ok(TokenValidation {
                    is_valid: true,
                    properties: Some(properties),
                })
            }
        }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn list_recordings(&self, params: &ListParams) -> Result<RecordingList, ApiError> {
        let request = self
            .client
            .get(self.url(&["recordings"]))
            .query(&params.query());
        let response = self.send(request).await?;
        self.handle_response(response, ("recordings", "")).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn get_recording(&self, id: &str) -> Result<Recording, ApiError> {
        let request = self.client.get(self.url(&["recordings", id]));
        let response = self.send(request).await?;
        self.handle_response(response, ("recording", id)).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn delete_recording(&self, id: &str) -> Result<Deleted, ApiError> {
        let request = self.client.delete(self.url(&["recordings", id]));
        let response = self.send(request).await?;
        self.handle_response(response, ("recording", id)).await
    }
}

impl std::fmt::Debug for HttpRoomsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRoomsClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
