use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::WeekId;

/// Code assigned to failures whose body carries no `code` of its own.
pub const HTTP_ERROR: &str = "HTTP_ERROR";
/// Server code for a create that targets an existing week.
pub const WEEK_EXISTS: &str = "WEEK_EXISTS";

pub const FAILURE_DETAIL_VERSION: u32 = 1;

/// Structured error body as sent by the API: `{code, message, data}`.
///
/// `error` is the older single-field form some deployments still return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_version: Option<u32>,
}

/// Typed extra payload attached to a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureDetail {
    ExistingWeek { week_id: WeekId },
}

#[derive(Debug, Deserialize)]
struct ExistingWeekDataV1 {
    week_id: WeekId,
}

impl FailureDetail {
    /// Reads the detail out of a failure body. Unknown versions yield nothing.
    pub fn from_body(code: &str, body: &ApiErrorBody) -> Option<Self> {
        let version = body.detail_version.unwrap_or(FAILURE_DETAIL_VERSION);
        if version != FAILURE_DETAIL_VERSION {
            return None;
        }
        match code {
            WEEK_EXISTS => {
                let data = body.data.clone()?;
                let parsed: ExistingWeekDataV1 = serde_json::from_value(data).ok()?;
                Some(Self::ExistingWeek {
                    week_id: parsed.week_id,
                })
            }
            _ => None,
        }
    }
}

/// The raw body of a failed response, kept for callers that need more fields.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBody {
    Json(Value),
    Text(String),
}

/// A non-2xx response, normalized.
#[derive(Debug, Clone, Error)]
#[error("{code} ({status}): {message}")]
pub struct RemoteFailure {
    pub status: u16,
    pub code: String,
    pub message: String,
    pub body: RawBody,
    pub detail: Option<FailureDetail>,
}

impl RemoteFailure {
    pub fn is_code(&self, code: &str) -> bool {
        self.code == code
    }

    pub fn existing_week(&self) -> Option<&WeekId> {
        match &self.detail {
            Some(FailureDetail::ExistingWeek { week_id }) => Some(week_id),
            None => None,
        }
    }
}
