//! In-process stand-in for the remote matching service.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use jobmatch_client::{MatchingServiceClient, ServiceEndpoints};

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nsimilarity-graph";

/// How the fake answers submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Accept,
    Reject,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum Received {
    JobOpening(Value),
    JobSeeker(Vec<ReceivedPart>),
    Visualization(String),
    Matches { entity_id: String, entity_type: String },
}

#[derive(Clone)]
struct FakeState {
    behavior: Behavior,
    log: Arc<Mutex<Vec<Received>>>,
}

pub struct FakeService {
    pub addr: SocketAddr,
    log: Arc<Mutex<Vec<Received>>>,
}

impl FakeService {
    pub async fn start(behavior: Behavior) -> Self {
        let log = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            behavior,
            log: log.clone(),
        };

        let app = Router::new()
            .route("/job-opening/create", post(create_job_opening))
            .route("/job-seeker/upload", post(upload_job_seeker))
            .route("/visualization/:entity_id", get(visualization))
            .route("/matches/:entity_id", get(matches))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, log }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> Arc<MatchingServiceClient> {
        client_for(&self.base_url())
    }

    pub fn received(&self) -> Vec<Received> {
        self.log.lock().unwrap().clone()
    }
}

pub fn client_for(base_url: &str) -> Arc<MatchingServiceClient> {
    let endpoints = ServiceEndpoints::new(base_url.parse().unwrap()).unwrap();
    Arc::new(MatchingServiceClient::new(endpoints, std::time::Duration::from_secs(5)).unwrap())
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn submission_reply(behavior: Behavior, id_field: &str, message: &str) -> Response {
    match behavior {
        Behavior::Accept => {
            let mut body = Map::new();
            body.insert(id_field.to_string(), json!(Uuid::new_v4().to_string()));
            body.insert("message".to_string(), json!(message));
            Json(Value::Object(body)).into_response()
        }
        Behavior::Reject => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "embedding model unavailable"})),
        )
            .into_response(),
        Behavior::Malformed => Json(json!({"status": "ok"})).into_response(),
    }
}

async fn create_job_opening(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    state.log.lock().unwrap().push(Received::JobOpening(body));
    submission_reply(state.behavior, "job_id", "Job opening processed successfully")
}

async fn upload_job_seeker(State(state): State<FakeState>, mut multipart: Multipart) -> Response {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        let data = field.bytes().await.unwrap().to_vec();
        parts.push(ReceivedPart {
            name,
            file_name,
            data,
        });
    }
    state.log.lock().unwrap().push(Received::JobSeeker(parts));
    submission_reply(state.behavior, "seeker_id", "Profile processed successfully")
}

async fn visualization(State(state): State<FakeState>, Path(entity_id): Path<String>) -> Response {
    state
        .log
        .lock()
        .unwrap()
        .push(Received::Visualization(entity_id.clone()));
    if entity_id == "unknown" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "KeyError: 'unknown'").into_response();
    }
    ([(header::CONTENT_TYPE, "image/png")], PNG).into_response()
}

#[derive(Deserialize)]
struct MatchesQuery {
    entity_type: String,
}

async fn matches(
    State(state): State<FakeState>,
    Path(entity_id): Path<String>,
    Query(query): Query<MatchesQuery>,
) -> Response {
    state.log.lock().unwrap().push(Received::Matches {
        entity_id: entity_id.clone(),
        entity_type: query.entity_type.clone(),
    });
    let matches = if query.entity_type == "seeker" {
        json!([{
            "job_id": "j-1",
            "company": "Acme",
            "title": "Backend Engineer",
            "scores": {"experience": 0.91, "development": 0.72, "personality": 0.8},
            "average_score": 0.81
        }])
    } else {
        json!([{
            "seeker_id": "s-1",
            "scores": {"experience": 0.7, "development": 0.7, "personality": 0.7},
            "average_score": 0.7
        }])
    };
    Json(json!({
        "matches": matches,
        "visualization_url": format!("/visualization/{entity_id}"),
    }))
    .into_response()
}
