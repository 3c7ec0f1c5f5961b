use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use crate::error::{Error, Result};
use crate::models::question::QuestionContext;
use crate::services::prompt_service::build_prompt;

pub const FAILED_SHORT: &str = "Explanation unavailable.";
pub const PARSE_FAILED_SHORT: &str = "Explanation could not be read.";
pub const PARSE_FAILED_FULL: &str =
    "The AI service returned a response that could not be read as an explanation. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationPair {
    pub short: String,
    pub full: String,
}

/// Either a generated explanation or a displayable failure message. Both
/// carry a pair, so callers always have something to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExplanationOutcome {
    Ok(ExplanationPair),
    Failed(ExplanationPair),
}

impl ExplanationOutcome {
    pub fn pair(&self) -> &ExplanationPair {
        match self {
            ExplanationOutcome::Ok(pair) | ExplanationOutcome::Failed(pair) => pair,
        }
    }

    pub fn into_pair(self) -> ExplanationPair {
        match self {
            ExplanationOutcome::Ok(pair) | ExplanationOutcome::Failed(pair) => pair,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ExplanationOutcome::Ok(_))
    }

    fn failed(short: &str, full: impl Into<String>) -> Self {
        ExplanationOutcome::Failed(ExplanationPair {
            short: short.to_string(),
            full: full.into(),
        })
    }

    fn parse_failure() -> Self {
        Self::failed(PARSE_FAILED_SHORT, PARSE_FAILED_FULL)
    }
}

/// What came back from one generative call, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamResponse {
    Success(String),
    Status { status: u16, body: String },
    Transport(String),
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    text: Option<String>,
}

/// Pulls `candidates[0].content.parts[0].text` out of a response body.
pub fn extract_text(body: &str) -> Option<String> {
    let response: GenerateContentResponse = serde_json::from_str(body).ok()?;
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}

/// Removes a surrounding markdown code fence (with or without a language tag).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_response(response: UpstreamResponse) -> ExplanationOutcome {
    match response {
        UpstreamResponse::Transport(err) => ExplanationOutcome::failed(
            FAILED_SHORT,
            format!("Explanation request failed (transport error): {}", err),
        ),
        UpstreamResponse::Status { status, body } => ExplanationOutcome::failed(
            FAILED_SHORT,
            format!("Explanation request failed (HTTP {}): {}", status, body),
        ),
        UpstreamResponse::Success(body) => {
            let Some(text) = extract_text(&body) else {
                tracing::warn!("Generative response is missing candidates[0].content.parts[0].text");
                return ExplanationOutcome::parse_failure();
            };
            match serde_json::from_str::<ExplanationPair>(strip_code_fences(&text)) {
                Ok(pair) => ExplanationOutcome::Ok(pair),
                Err(e) => {
                    tracing::warn!(error = %e, "Generated explanation is not a {{short, full}} object");
                    ExplanationOutcome::parse_failure()
                }
            }
        }
    }
}

/// Client for a Gemini-style `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: &str, endpoint: &str, timeout: Duration, client: Client) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("GEMINI_API_KEY must not be empty".to_string()));
        }
        let endpoint = Url::parse_with_params(endpoint, &[("key", api_key)])
            .map_err(|e| Error::Config(format!("Invalid value for GEMINI_ENDPOINT: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub async fn generate(&self, prompt: &str) -> UpstreamResponse {
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let res = match self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) if e.is_timeout() => {
                return UpstreamResponse::Transport(format!(
                    "timed out after {}s",
                    self.timeout.as_secs_f32()
                ))
            }
            Err(e) => return UpstreamResponse::Transport(e.without_url().to_string()),
        };

        let status = res.status();
        let body = match res.text().await {
            Ok(body) => body,
            Err(e) => return UpstreamResponse::Transport(e.without_url().to_string()),
        };

        if status.is_success() {
            UpstreamResponse::Success(body)
        } else {
            UpstreamResponse::Status {
                status: status.as_u16(),
                body,
            }
        }
    }
}

#[derive(Clone)]
pub struct ExplanationService {
    client: GeminiClient,
    permits: Arc<Semaphore>,
}

impl ExplanationService {
    pub fn new(client: GeminiClient, max_concurrent: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Always returns a displayable pair; upstream problems become `Failed`.
    pub async fn generate_explanation(&self, ctx: &QuestionContext) -> ExplanationOutcome {
        let prompt = build_prompt(ctx);
        let response = self.client.generate(&prompt).await;

        match &response {
            UpstreamResponse::Status { status, .. } => tracing::warn!(
                status,
                question_number = ctx.question.number,
                "Explanation request rejected upstream"
            ),
            UpstreamResponse::Transport(err) => tracing::warn!(
                error = %err,
                question_number = ctx.question.number,
                "Explanation request failed"
            ),
            UpstreamResponse::Success(_) => {}
        }

        let outcome = parse_response(response);
        tracing::debug!(
            question_number = ctx.question.number,
            ok = outcome.is_ok(),
            "Explanation generated"
        );
        outcome
    }

    /// Generates explanations concurrently; the output keeps the input order.
    pub async fn explain_many(&self, contexts: Vec<QuestionContext>) -> Vec<(i64, ExplanationOutcome)> {
        let ids: Vec<i64> = contexts.iter().map(|c| c.question.id).collect();
        let mut slots: Vec<Option<ExplanationOutcome>> = vec![None; contexts.len()];
        let mut tasks = JoinSet::new();

        for (idx, ctx) in contexts.into_iter().enumerate() {
            let service = self.clone();
            tasks.spawn(async move {
                let outcome = match service.permits.clone().acquire_owned().await {
                    Ok(_permit) => service.generate_explanation(&ctx).await,
                    Err(_) => ExplanationOutcome::failed(FAILED_SHORT, "Explanation service is shutting down"),
                };
                (idx, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => tracing::error!(error = %e, "Explanation task failed"),
            }
        }

        ids.into_iter()
            .zip(slots)
            .map(|(id, slot)| {
                let outcome = slot.unwrap_or_else(|| {
                    ExplanationOutcome::failed(FAILED_SHORT, "Explanation task did not complete")
                });
                (id, outcome)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test::fixtures::question;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gemini_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
    }

    fn context(id: i64, number: i32) -> QuestionContext {
        QuestionContext {
            question: question(id, number, "C"),
            part_number: 5,
            transcript: None,
            passage: None,
        }
    }

    fn service_for(server: &MockServer, timeout: Duration) -> ExplanationService {
        let client = GeminiClient::new(
            "test-key",
            &format!("{}/v1beta/models/gemini:generateContent", server.uri()),
            timeout,
            Client::new(),
        )
        .unwrap();
        ExplanationService::new(client, 2)
    }

    #[test]
    fn strips_fences_with_and_without_language_tag() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn parses_fenced_pair() {
        let body = gemini_body("```json\n{\"short\": \"Passive voice.\", \"full\": \"<b>was submitted</b> is passive.\"}\n```");
        let outcome = parse_response(UpstreamResponse::Success(body.to_string()));
        assert_eq!(
            outcome,
            ExplanationOutcome::Ok(ExplanationPair {
                short: "Passive voice.".into(),
                full: "<b>was submitted</b> is passive.".into(),
            })
        );
    }

    #[test]
    fn missing_nesting_is_parse_failure() {
        let outcome = parse_response(UpstreamResponse::Success(r#"{"candidates": []}"#.into()));
        assert_eq!(outcome.pair().short, PARSE_FAILED_SHORT);

        let outcome = parse_response(UpstreamResponse::Success(
            r#"{"candidates": [{"content": {"parts": []}}]}"#.into(),
        ));
        assert!(!outcome.is_ok());

        let outcome = parse_response(UpstreamResponse::Success("not json".into()));
        assert_eq!(outcome.pair().full, PARSE_FAILED_FULL);
    }

    #[test]
    fn malformed_inner_json_is_parse_failure() {
        let body = gemini_body("{\"short\": \"only short\"");
        let outcome = parse_response(UpstreamResponse::Success(body.to_string()));
        assert_eq!(outcome.pair().short, PARSE_FAILED_SHORT);
    }

    #[test]
    fn status_failure_carries_status_and_body() {
        let outcome = parse_response(UpstreamResponse::Status {
            status: 403,
            body: "API key not valid".into(),
        });
        assert_eq!(outcome.pair().short, FAILED_SHORT);
        assert!(outcome.pair().full.contains("403"));
        assert!(outcome.pair().full.contains("API key not valid"));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = ExplanationOutcome::Failed(ExplanationPair {
            short: "s".into(),
            full: "f".into(),
        });
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["short"], "s");
    }

    #[test]
    fn blank_api_key_is_configuration_error() {
        let err = GeminiClient::new(" ", "https://example.com/gen", Duration::from_secs(1), Client::new())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn well_formed_response_yields_explanation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(
                r#"{"short": "C fits the blank.", "full": "Option C is an adverb.<br>Others are nouns."}"#,
            )))
            .mount(&server)
            .await;

        let outcome = service_for(&server, Duration::from_secs(5))
            .generate_explanation(&context(1, 101))
            .await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.pair().short, "C fits the blank.");
    }

    #[tokio::test]
    async fn malformed_response_yields_failed_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body("Sure! Here is why C is right.")))
            .mount(&server)
            .await;

        let outcome = service_for(&server, Duration::from_secs(5))
            .generate_explanation(&context(1, 101))
            .await;
        assert_eq!(outcome.pair().short, PARSE_FAILED_SHORT);
    }

    #[tokio::test]
    async fn upstream_error_status_yields_failed_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let outcome = service_for(&server, Duration::from_secs(5))
            .generate_explanation(&context(1, 101))
            .await;
        assert!(!outcome.is_ok());
        assert!(outcome.pair().full.contains("429"));
        assert!(outcome.pair().full.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn timeout_yields_failed_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gemini_body(r#"{"short": "late", "full": "late"}"#))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let outcome = service_for(&server, Duration::from_millis(200))
            .generate_explanation(&context(1, 101))
            .await;
        assert_eq!(outcome.pair().short, FAILED_SHORT);
        assert!(outcome.pair().full.contains("timed out"));
    }

    #[tokio::test]
    async fn explain_many_keeps_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(
                r#"{"short": "ok", "full": "ok"}"#,
            )))
            .mount(&server)
            .await;

        let results = service_for(&server, Duration::from_secs(5))
            .explain_many(vec![context(7, 107), context(3, 103), context(5, 105)])
            .await;

        let ids: Vec<i64> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![7, 3, 5]);
        assert!(results.iter().all(|(_, outcome)| outcome.is_ok()));
    }
}
