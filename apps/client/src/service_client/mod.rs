//! Service client: the HTTP boundary with the remote matching service.
//!
//! No other module talks to the service directly. Submissions go through
//! `SubmissionTransport`, visualization fetches through `VisualizationSource`,
//! so the orchestration layers can be exercised against fakes.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::ClientError;
use crate::models::matches::{EntityType, MatchesResponse};
use crate::payload::{EndpointKind, MultipartPayload, Payload};

pub mod endpoints;

pub use endpoints::ServiceEndpoints;

/// Accepted submission as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub identifier: String,
    pub message: Option<String>,
}

#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Sends one payload to the endpoint for `kind`. Exactly one request, no retry.
    async fn submit(&self, kind: EndpointKind, payload: &Payload) -> Result<SubmitResponse, ClientError>;
}

#[async_trait]
pub trait VisualizationSource: Send + Sync {
    /// Fetches the raw image bytes for an entity.
    async fn fetch_visualization(&self, entity_id: &str) -> Result<Bytes, ClientError>;
}

/// reqwest-backed client for the matching service.
#[derive(Clone)]
pub struct MatchingServiceClient {
    client: Client,
    endpoints: ServiceEndpoints,
}

impl MatchingServiceClient {
    pub fn new(endpoints: ServiceEndpoints, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    /// GET /matches/{entity_id}?entity_type=...
    pub async fn fetch_matches(
        &self,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<MatchesResponse, ClientError> {
        let url = self.endpoints.matches(entity_id);
        info!("Fetching matches for {entity_type} {entity_id}");

        let response = self
            .client
            .get(url)
            .query(&[("entity_type", entity_type.as_str())])
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ClientError::MalformedResponse(format!("matches body: {e}")))
    }
}

#[async_trait]
impl SubmissionTransport for MatchingServiceClient {
    async fn submit(&self, kind: EndpointKind, payload: &Payload) -> Result<SubmitResponse, ClientError> {
        let url = match kind {
            EndpointKind::JobOpening => self.endpoints.job_opening_create(),
            EndpointKind::JobSeeker => self.endpoints.job_seeker_upload(),
        };
        debug!("POST {url}");

        let request = self.client.post(url);
        let request = match payload {
            Payload::Fields(fields) => request.json(fields),
            Payload::Multipart(multipart) => request.multipart(to_form(multipart)),
        };

        let response = ensure_success(request.send().await?).await?;
        let body = response.text().await?;
        parse_submit_response(kind, &body)
    }
}

#[async_trait]
impl VisualizationSource for MatchingServiceClient {
    async fn fetch_visualization(&self, entity_id: &str) -> Result<Bytes, ClientError> {
        let url = self.endpoints.visualization(entity_id);
        debug!("GET {url}");

        let response = ensure_success(self.client.get(url).send().await?).await?;
        let bytes = response.bytes().await?;
        debug!("Visualization for {entity_id}: {} bytes", bytes.len());
        Ok(bytes)
    }
}

/// Converts any non-2xx response into `ClientError::Status`, keeping the body for logs.
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("Matching service returned {}: {}", status, body);
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

fn to_form(payload: &MultipartPayload) -> Form {
    let form = payload
        .text
        .iter()
        .fold(Form::new(), |form, (key, value)| form.text(key.clone(), value.clone()));

    payload.files.iter().fold(form, |form, file| {
        let part = Part::bytes(file.content.to_vec()).file_name(file.file_name.clone());
        form.part(file.key.clone(), part)
    })
}

/// Extracts the service-assigned identifier for `kind` from a response body.
pub fn parse_submit_response(kind: EndpointKind, body: &str) -> Result<SubmitResponse, ClientError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ClientError::MalformedResponse(format!("response is not JSON: {e}")))?;

    let field = kind.identifier_field();
    let identifier = value
        .get(field)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ClientError::MalformedResponse(format!("missing '{field}' in response")))?;

    Ok(SubmitResponse {
        identifier: identifier.to_string(),
        message: value.get("message").and_then(Value::as_str).map(String::from),
    })
}
