//! AI recommendation client.
//!
//! Talks to an OpenAI-compatible chat completions API. The answer is free
//! text shown to the requester; nothing downstream parses it.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::domain::ai::{ServiceRequestSummary, TechnicianSummary};
use crate::error::ApiError;

const SYSTEM_PROMPT: &str = "You are a dispatcher for a roadside assistance marketplace. \
Rank the candidate technicians for the request and explain each choice in one sentence. \
Only recommend technicians from the list.";

/// Client for the AI service.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Error response from AI service.
#[derive(Debug, Deserialize)]
struct AiErrorResponse {
    error: AiErrorBody,
}

#[derive(Debug, Deserialize)]
struct AiErrorBody {
    message: String,
}

impl AiClient {
    /// Create a new AI service client.
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, model = model, "AI client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Ask the model to rank `candidates` for `request`.
    #[instrument(skip(self, request, candidates), fields(candidates = candidates.len()))]
    pub async fn recommend_technicians(
        &self,
        request: &ServiceRequestSummary,
        candidates: &[TechnicianSummary],
        request_id: Option<&str>,
    ) -> Result<String, ApiError> {
        let prompt = build_recommendation_prompt(request, candidates);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.2,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self.client.post(&url).bearer_auth(&self.api_key);

        if let Some(rid) = request_id {
            req = req.header("x-request-id", rid);
        }

        debug!(url = %url, "AI service request");

        let response = req.json(&body).send().await.map_err(|e| {
            error!(error = %e, "AI service request failed");
            ApiError::ServiceUnavailable("Recommendation service unavailable".to_string())
        })?;

        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<AiErrorResponse>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("AI service error: {}", status));

            return match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    error!("AI service authentication failed");
                    Err(ApiError::Internal(anyhow::anyhow!("AI service auth error")))
                }
                StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                    Err(ApiError::ServiceUnavailable(
                        "Recommendation service is busy, try again later".to_string(),
                    ))
                }
                _ => {
                    error!(status = %status, message = %message, "AI service error");
                    Err(ApiError::Internal(anyhow::anyhow!(message)))
                }
            };
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse AI service response");
            ApiError::Internal(anyhow::anyhow!("Invalid AI service response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("AI service returned no content")))
    }

    /// Check AI service health.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/models", self.base_url);

        self.client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("AI service health check failed")?
            .error_for_status()
            .context("AI service unhealthy")?;

        Ok(())
    }
}

/// User prompt listing the request and every candidate.
pub fn build_recommendation_prompt(
    request: &ServiceRequestSummary,
    candidates: &[TechnicianSummary],
) -> String {
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Service request:");
    let _ = writeln!(prompt, "- Service: {}", request.service_type);
    let _ = writeln!(
        prompt,
        "- Vehicle: {} ({})",
        request.vehicle_model, request.vehicle_type
    );
    let _ = writeln!(
        prompt,
        "- Location: {} [{:.5}, {:.5}]",
        request.address, request.lat, request.lng
    );
    if !request.description.trim().is_empty() {
        let _ = writeln!(prompt, "- Details: {}", request.description.trim());
    }

    let _ = writeln!(prompt);
    if candidates.is_empty() {
        let _ = writeln!(prompt, "No verified technicians offer this service.");
        return prompt;
    }

    let _ = writeln!(prompt, "Candidate technicians:");
    for (i, tech) in candidates.iter().enumerate() {
        let price = tech
            .price
            .map(|p| format!("${}", p.round_dp(2)))
            .unwrap_or_else(|| "price on request".to_string());
        let _ = writeln!(
            prompt,
            "{}. {} (id {}) - specialties: {}; base [{:.5}, {:.5}] within {} km; {}",
            i + 1,
            tech.name,
            tech.id,
            tech.specialties.join(", "),
            tech.service_area.base_lat,
            tech.service_area.base_lng,
            tech.service_area.radius_km,
            price
        );
    }

    prompt
}
