use serde::{Deserialize, Serialize};

/// One row of the raw-count to scaled-score table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreConversionEntry {
    pub correct_count: u32,
    pub listening_score: u32,
    pub reading_score: u32,
}
