use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::score_conversion::ScoreConversionEntry;
use crate::models::test::Section;
use crate::services::content_repository::ContentRepository;

/// Scaled score used for a section whose correctness count has no table row.
/// Guessing alone earns a few points on a real sitting, so the floor is not zero.
pub const DEFAULT_FALLBACK_SCALED_SCORE: u32 = 5;

/// Raw correctness count to scaled sub-score lookup. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreConversionTable {
    entries: BTreeMap<u32, ScoreConversionEntry>,
    fallback: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Table,
    FallbackMissingEntry,
    FallbackEmptyTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionScore {
    pub correct: u32,
    pub scaled: u32,
    pub source: ScoreSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub listening: SectionScore,
    pub reading: SectionScore,
    pub total_score: u32,
}

impl ScoreReport {
    pub fn listening_score(&self) -> u32 {
        self.listening.scaled
    }

    pub fn reading_score(&self) -> u32 {
        self.reading.scaled
    }
}

impl ScoreConversionTable {
    /// Later entries for the same count replace earlier ones.
    pub fn new(entries: impl IntoIterator<Item = ScoreConversionEntry>, fallback: u32) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (e.correct_count, e))
            .collect();
        Self { entries, fallback }
    }

    pub fn empty(fallback: u32) -> Self {
        Self::new(Vec::new(), fallback)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fallback(&self) -> u32 {
        self.fallback
    }

    /// Exact-match lookup; never fails.
    pub fn lookup(&self, section: Section, correct: u32) -> SectionScore {
        if self.entries.is_empty() {
            return self.fallback_score(correct, ScoreSource::FallbackEmptyTable);
        }

        match self.entries.get(&correct) {
            Some(entry) => SectionScore {
                correct,
                scaled: match section {
                    Section::Listening => entry.listening_score,
                    Section::Reading => entry.reading_score,
                },
                source: ScoreSource::Table,
            },
            None => self.fallback_score(correct, ScoreSource::FallbackMissingEntry),
        }
    }

    fn fallback_score(&self, correct: u32, source: ScoreSource) -> SectionScore {
        tracing::debug!(correct, ?source, fallback = self.fallback, "Using fallback scaled score");
        SectionScore {
            correct,
            scaled: self.fallback,
            source,
        }
    }

    pub fn calculate(&self, listening_correct: u32, reading_correct: u32) -> ScoreReport {
        let listening = self.lookup(Section::Listening, listening_correct);
        let reading = self.lookup(Section::Reading, reading_correct);
        ScoreReport {
            listening,
            reading,
            total_score: listening.scaled + reading.scaled,
        }
    }
}

#[derive(Clone)]
pub struct ScoreService {
    table: Arc<ScoreConversionTable>,
}

impl ScoreService {
    pub fn new(table: ScoreConversionTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Loads the conversion table once; an empty table is allowed but logged,
    /// since every lookup will then resolve to the fallback.
    pub async fn load(repository: &dyn ContentRepository, fallback: u32) -> Result<Self> {
        let entries = repository.get_score_conversion_table().await?;
        let table = ScoreConversionTable::new(entries, fallback);
        if table.is_empty() {
            tracing::warn!(fallback, "Score conversion table is empty; all scores will use the fallback");
        } else {
            tracing::info!(entries = table.len(), "Loaded score conversion table");
        }
        Ok(Self::new(table))
    }

    pub fn table(&self) -> &ScoreConversionTable {
        &self.table
    }

    pub fn calculate_score(&self, listening_correct: u32, reading_correct: u32) -> ScoreReport {
        self.table.calculate(listening_correct, reading_correct)
    }
}
