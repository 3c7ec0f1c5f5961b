pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::services::{
    content_repository::{ContentRepository, PgContentRepository},
    explanation_service::{ExplanationService, GeminiClient},
    score_service::ScoreService,
    scoring_service::ScoringService,
};
use reqwest::Client;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn ContentRepository>,
    pub scoring_service: ScoringService,
    pub explanation_service: ExplanationService,
}

impl AppState {
    /// Wires the Postgres-backed services from the global configuration.
    /// Fails when the generative API key is missing or blank.
    pub async fn new(pool: PgPool) -> Result<Self> {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.explanation_timeout_secs))
            .build()?;

        let gemini = GeminiClient::new(
            &config.gemini_api_key,
            &config.gemini_endpoint,
            Duration::from_secs(config.explanation_timeout_secs),
            http_client,
        )?;
        let explanation_service =
            ExplanationService::new(gemini, config.max_concurrent_explanations);

        let repository: Arc<dyn ContentRepository> = Arc::new(PgContentRepository::new(pool));
        let scores = ScoreService::load(repository.as_ref(), config.score_fallback).await?;

        Ok(Self::from_parts(
            repository,
            ScoringService::new(scores),
            explanation_service,
        ))
    }

    pub fn from_parts(
        repository: Arc<dyn ContentRepository>,
        scoring_service: ScoringService,
        explanation_service: ExplanationService,
    ) -> Self {
        Self {
            repository,
            scoring_service,
            explanation_service,
        }
    }
}
