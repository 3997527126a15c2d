use serde::{Deserialize, Serialize};

use crate::domain::{PresentationId, Week, WeekId};

pub const API_PREFIX: &str = "/api";

pub fn me_route() -> &'static str {
    "/me"
}

pub fn weeks_route() -> &'static str {
    "/weeks"
}

pub fn health_route() -> &'static str {
    "/health"
}

pub fn vote_route(presentation_id: PresentationId) -> String {
    format!("/presentations/{}/vote", presentation_id.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWeekRequest {
    pub week_id: WeekId,
}

/// Votes carry no payload; the server identifies the voter from credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteRequest {}

/// Server replies arrive either wrapped as `{data, message}` or bare.
///
/// Both decode here and nowhere else; callers only ever see [`Envelope`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireEnvelope<T> {
    Wrapped {
        data: T,
        #[serde(default)]
        message: Option<String>,
    },
    Bare(T),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub data: T,
    pub message: Option<String>,
}

impl<T> Envelope<T>
where
    T: for<'de> Deserialize<'de>,
{
    pub fn decode(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_value::<WireEnvelope<T>>(value)? {
            WireEnvelope::Wrapped { data, message } => Self { data, message },
            WireEnvelope::Bare(data) => Self {
                data,
                message: None,
            },
        })
    }
}

/// Reply to mutations that only acknowledge, such as a vote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MutationAck {
    #[serde(default)]
    pub message: Option<String>,
}

/// What a create reply says about the new week. Servers may omit the
/// identifier, in which case the requested one stands.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreatedWeek {
    #[serde(default)]
    pub week_id: Option<WeekId>,
}

pub type WeeksResponse = Envelope<Vec<Week>>;
pub type CreateWeekResponse = Envelope<CreatedWeek>;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub ok: bool,
}
