pub mod content_repository;
pub mod explanation_service;
pub mod prompt_service;
pub mod score_service;
pub mod scoring_service;
