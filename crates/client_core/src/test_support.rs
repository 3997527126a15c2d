//! In-memory stand-in for the voting server.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use shared::{
    domain::{Presentation, PresentationId, Week, WeekId},
    error::RawBody,
};
use tokio::sync::Notify;

use crate::gateway::{normalize_failure, GatewayError, RemoteGateway, RemotePayload, RemoteResult};

type CallKey = (Method, String);

#[derive(Default)]
struct FakeState {
    weeks: Vec<Week>,
    calls: Vec<(Method, String, Option<Value>)>,
    scripted: HashMap<CallKey, VecDeque<RemoteResult>>,
    /// Weeks another client creates right before our create lands.
    created_elsewhere: Vec<WeekId>,
    /// The next matching call waits here until notified.
    gates: HashMap<CallKey, Arc<Notify>>,
}

#[derive(Default)]
pub(crate) struct FakeServer {
    state: Mutex<FakeState>,
}

pub(crate) fn presentation(id: i64, title: &str, votes: u32) -> Presentation {
    Presentation {
        id: PresentationId(id),
        title: title.to_string(),
        presenter: "presenter".to_string(),
        votes,
        average_rating: None,
        rating_count: None,
        comment_count: None,
    }
}

pub(crate) fn week(id: &str, presentations: Vec<Presentation>) -> Week {
    Week {
        week_id: WeekId::from(id),
        presentations,
        created_at: None,
    }
}

pub(crate) fn failure(status: StatusCode, body: Value) -> GatewayError {
    GatewayError::Application(normalize_failure(status, RawBody::Json(body)))
}

impl FakeServer {
    pub(crate) fn with_weeks(weeks: Vec<Week>) -> Self {
        let server = Self::default();
        server.set_weeks(weeks);
        server
    }

    pub(crate) fn set_weeks(&self, weeks: Vec<Week>) {
        self.state.lock().expect("fake state").weeks = weeks;
    }

    pub(crate) fn set_votes(&self, presentation_id: i64, votes: u32) {
        let mut state = self.state.lock().expect("fake state");
        for week in &mut state.weeks {
            for p in &mut week.presentations {
                if p.id.0 == presentation_id {
                    p.votes = votes;
                }
            }
        }
    }

    /// The next create for `week_id` loses a race against another client.
    pub(crate) fn race_create(&self, week_id: &str) {
        self.state
            .lock()
            .expect("fake state")
            .created_elsewhere
            .push(WeekId::from(week_id));
    }

    pub(crate) fn script(&self, method: Method, path: &str, result: RemoteResult) {
        self.state
            .lock()
            .expect("fake state")
            .scripted
            .entry((method, path.to_string()))
            .or_default()
            .push_back(result);
    }

    /// Holds the next `method path` call after it is recorded until the
    /// returned handle is notified.
    pub(crate) fn hold(&self, method: Method, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .lock()
            .expect("fake state")
            .gates
            .insert((method, path.to_string()), Arc::clone(&gate));
        gate
    }

    pub(crate) fn calls_to(&self, method: Method, path: &str) -> usize {
        self.state
            .lock()
            .expect("fake state")
            .calls
            .iter()
            .filter(|(m, p, _)| *m == method && p == path)
            .count()
    }

    pub(crate) fn last_body(&self, method: Method, path: &str) -> Option<Value> {
        self.state
            .lock()
            .expect("fake state")
            .calls
            .iter()
            .rev()
            .find(|(m, p, _)| *m == method && p == path)
            .and_then(|(_, _, body)| body.clone())
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.state.lock().expect("fake state").calls.len()
    }
}

#[async_trait]
impl RemoteGateway for FakeServer {
    async fn call(&self, path: &str, method: Method, body: Option<Value>) -> RemoteResult {
        let gate = {
            let mut state = self.state.lock().expect("fake state");
            state.calls.push((method.clone(), path.to_string(), body.clone()));
            state.gates.remove(&(method.clone(), path.to_string()))
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().expect("fake state");

        if let Some(queue) = state.scripted.get_mut(&(method.clone(), path.to_string())) {
            if let Some(result) = queue.pop_front() {
                return result;
            }
        }

        if method == Method::GET && path == "/me" {
            return Ok(RemotePayload::Json(json!({"ok": true, "user_id": "tester"})));
        }
        if method == Method::GET && path == "/weeks" {
            let weeks = serde_json::to_value(&state.weeks).expect("weeks json");
            return Ok(RemotePayload::Json(json!({ "data": weeks })));
        }
        if method == Method::POST && path == "/weeks" {
            let requested: WeekId = body
                .as_ref()
                .and_then(|b| serde_json::from_value(b["week_id"].clone()).ok())
                .expect("create body carries week_id");
            if let Some(pos) = state
                .created_elsewhere
                .iter()
                .position(|w| *w == requested)
            {
                state.created_elsewhere.remove(pos);
                state.weeks.push(Week::empty(requested.clone()));
            }
            if state.weeks.iter().any(|w| w.week_id == requested) {
                return Err(failure(
                    StatusCode::CONFLICT,
                    json!({
                        "code": "WEEK_EXISTS",
                        "message": "Week already exists",
                        "data": {"week_id": requested}
                    }),
                ));
            }
            state.weeks.push(Week::empty(requested.clone()));
            return Ok(RemotePayload::Json(json!({
                "data": {"week_id": requested, "presentations": []},
                "message": "Week created"
            })));
        }
        if method == Method::POST {
            if let Some(id) = path
                .strip_prefix("/presentations/")
                .and_then(|rest| rest.strip_suffix("/vote"))
                .and_then(|id| id.parse::<i64>().ok())
            {
                let found = state
                    .weeks
                    .iter_mut()
                    .flat_map(|w| w.presentations.iter_mut())
                    .find(|p| p.id.0 == id);
                return match found {
                    Some(p) => {
                        p.votes += 1;
                        Ok(RemotePayload::Json(json!({"message": "Vote counted"})))
                    }
                    None => Err(failure(
                        StatusCode::NOT_FOUND,
                        json!({"error": "Presentation not found"}),
                    )),
                };
            }
        }

        Err(failure(StatusCode::NOT_FOUND, json!({"error": "no such route"})))
    }
}
