//! Single request/response contract over the voting API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::{
    domain::{Identity, PresentationId, WeekId},
    error::{ApiErrorBody, FailureDetail, RawBody, RemoteFailure, HTTP_ERROR},
    protocol::{
        health_route, me_route, vote_route, weeks_route, CreateWeekRequest, CreateWeekResponse,
        CreatedWeek, HealthResponse, MutationAck, VoteRequest, WeeksResponse, API_PREFIX,
    },
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum RemotePayload {
    Json(Value),
    Text(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },
    #[error("response from {path} declared JSON but could not be parsed: {message}")]
    MalformedBody { path: String, message: String },
    #[error("unexpected response shape from {path}: {message}")]
    UnexpectedShape { path: String, message: String },
    #[error(transparent)]
    Application(#[from] RemoteFailure),
}

impl GatewayError {
    /// Text suitable for the status message region.
    pub fn user_message(&self) -> String {
        match self {
            Self::Application(failure) => failure.message.clone(),
            other => other.to_string(),
        }
    }

    pub fn as_failure(&self) -> Option<&RemoteFailure> {
        match self {
            Self::Application(failure) => Some(failure),
            _ => None,
        }
    }
}

pub type RemoteResult = Result<RemotePayload, GatewayError>;

#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn call(&self, path: &str, method: Method, body: Option<Value>) -> RemoteResult;
}

/// Typed operations layered over [`RemoteGateway::call`].
#[async_trait]
pub trait VotingApi {
    async fn me(&self) -> Result<Identity, GatewayError>;
    async fn list_weeks(&self) -> Result<WeeksResponse, GatewayError>;
    async fn create_week(&self, week_id: &WeekId) -> Result<CreateWeekResponse, GatewayError>;
    async fn vote(&self, presentation_id: PresentationId) -> Result<MutationAck, GatewayError>;
    async fn health(&self) -> Result<HealthResponse, GatewayError>;
}

#[async_trait]
impl<G> VotingApi for G
where
    G: RemoteGateway + ?Sized,
{
    async fn me(&self) -> Result<Identity, GatewayError> {
        let path = me_route();
        let payload = self.call(path, Method::GET, None).await?;
        Ok(Identity::from_value(expect_json(path, payload)?))
    }

    async fn list_weeks(&self) -> Result<WeeksResponse, GatewayError> {
        let path = weeks_route();
        let payload = self.call(path, Method::GET, None).await?;
        WeeksResponse::decode(expect_json(path, payload)?).map_err(|err| shape_error(path, err))
    }

    async fn create_week(&self, week_id: &WeekId) -> Result<CreateWeekResponse, GatewayError> {
        let path = weeks_route();
        let body = to_body(&CreateWeekRequest {
            week_id: week_id.clone(),
        })?;
        match self.call(path, Method::POST, Some(body)).await? {
            RemotePayload::Json(Value::Null) | RemotePayload::Text(_) => Ok(CreateWeekResponse {
                data: CreatedWeek::default(),
                message: None,
            }),
            RemotePayload::Json(value) => {
                CreateWeekResponse::decode(value).map_err(|err| shape_error(path, err))
            }
        }
    }

    async fn vote(&self, presentation_id: PresentationId) -> Result<MutationAck, GatewayError> {
        let path = vote_route(presentation_id);
        let body = to_body(&VoteRequest::default())?;
        match self.call(&path, Method::POST, Some(body)).await? {
            RemotePayload::Json(value) => Ok(decode_lenient(value)),
            RemotePayload::Text(_) => Ok(MutationAck::default()),
        }
    }

    async fn health(&self) -> Result<HealthResponse, GatewayError> {
        let path = health_route();
        let payload = self.call(path, Method::GET, None).await?;
        decode(path, expect_json(path, payload)?)
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(value).map_err(|err| GatewayError::UnexpectedShape {
        path: "<request>".into(),
        message: err.to_string(),
    })
}

fn expect_json(path: &str, payload: RemotePayload) -> Result<Value, GatewayError> {
    match payload {
        RemotePayload::Json(value) => Ok(value),
        RemotePayload::Text(text) => serde_json::from_str(&text).map_err(|_| {
            GatewayError::UnexpectedShape {
                path: path.to_string(),
                message: "expected a JSON body".into(),
            }
        }),
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|err| shape_error(path, err))
}

fn decode_lenient<T: DeserializeOwned + Default>(value: Value) -> T {
    serde_json::from_value(value).unwrap_or_default()
}

fn shape_error(path: &str, err: serde_json::Error) -> GatewayError {
    GatewayError::UnexpectedShape {
        path: path.to_string(),
        message: err.to_string(),
    }
}

/// Builds the normalized failure for a non-2xx response.
///
/// Fields are read one by one so a mistyped member only loses itself.
pub fn normalize_failure(status: StatusCode, body: RawBody) -> RemoteFailure {
    let structured = match &body {
        RawBody::Json(Value::Object(fields)) => ApiErrorBody {
            code: string_field(fields, "code"),
            message: string_field(fields, "message"),
            error: string_field(fields, "error"),
            data: fields.get("data").cloned(),
            detail_version: fields
                .get("detail_version")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok()),
        },
        _ => ApiErrorBody::default(),
    };

    let raw_text = match &body {
        RawBody::Json(Value::Null) => String::new(),
        RawBody::Json(Value::String(text)) => text.trim().to_string(),
        RawBody::Json(value) => value.to_string(),
        RawBody::Text(text) => text.trim().to_string(),
    };

    let message = structured
        .message
        .clone()
        .or_else(|| structured.error.clone())
        .or_else(|| (!raw_text.is_empty()).then(|| raw_text.clone()))
        .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()));
    let code = structured
        .code
        .clone()
        .unwrap_or_else(|| HTTP_ERROR.to_string());
    let detail = FailureDetail::from_body(&code, &structured);

    RemoteFailure {
        status: status.as_u16(),
        code,
        message,
        body,
        detail,
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    pub bearer_token: Option<String>,
    pub request_timeout: Option<Duration>,
}

/// [`RemoteGateway`] over HTTP. Cookies set by the server are replayed on
/// every later request.
pub struct HttpGateway {
    http: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_options(base_url, GatewayOptions::default())
    }

    pub fn with_options(
        base_url: impl Into<String>,
        options: GatewayOptions,
    ) -> Result<Self, GatewayError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|err| GatewayError::Transport {
            path: base_url.clone(),
            message: err.to_string(),
        })?;
        Ok(Self {
            http,
            base_url,
            bearer_token: options.bearer_token,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn call(&self, path: &str, method: Method, body: Option<Value>) -> RemoteResult {
        let url = self.url_for(path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            // `json` also sets Content-Type: application/json.
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| GatewayError::Transport {
                path: path.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        let text = response
            .text()
            .await
            .map_err(|err| GatewayError::Transport {
                path: path.to_string(),
                message: err.to_string(),
            })?;

        let payload = if is_json {
            if text.trim().is_empty() {
                RemotePayload::Json(Value::Null)
            } else {
                let value = serde_json::from_str(&text).map_err(|err| {
                    GatewayError::MalformedBody {
                        path: path.to_string(),
                        message: err.to_string(),
                    }
                })?;
                RemotePayload::Json(value)
            }
        } else {
            RemotePayload::Text(text)
        };

        if status.is_success() {
            debug!(%method, path, status = status.as_u16(), "api call ok");
            return Ok(payload);
        }

        let raw = match payload {
            RemotePayload::Json(value) => RawBody::Json(value),
            RemotePayload::Text(text) => RawBody::Text(text),
        };
        let failure = normalize_failure(status, raw);
        warn!(
            %method,
            path,
            status = failure.status,
            code = %failure.code,
            "api call failed: {}",
            failure.message
        );
        Err(GatewayError::Application(failure))
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
