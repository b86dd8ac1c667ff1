//! Ranking a query vector against the centroid index, and the confidence gate.

use parlance_core::RouterConfig;
use serde::Serialize;

use crate::AiError;
use crate::centroid::CentroidIndex;
use crate::vector::cosine_sim;

/// One scored intent for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticMatch {
    pub intent_id: String,
    /// Cosine similarity to the intent centroid.
    pub score: f32,
    /// Margin over the next-ranked intent. 1.0 when the index holds a
    /// single intent; 0.0 for the last entry of a longer ranking.
    pub gap: f32,
}

/// Score `query` against every centroid, best first.
///
/// Equal scores keep catalog registration order. A non-finite query is an
/// error; centroids are finite by construction.
pub fn rank(query: &[f32], index: &CentroidIndex) -> Result<Vec<SemanticMatch>, AiError> {
    if index.is_empty() {
        return Ok(vec![]);
    }
    if query.len() != index.dim() {
        return Err(AiError::DimensionMismatch {
            expected: index.dim(),
            got: query.len(),
        });
    }

    if !query.iter().all(|x| x.is_finite()) {
        return Err(AiError::EmbeddingUnavailable(
            "query vector has non-finite components".into(),
        ));
    }

    let mut scored: Vec<(&str, f32)> = index
        .centroids()
        .iter()
        .map(|c| (c.intent_id(), cosine_sim(query, c.vector())))
        .collect();
    // `sort_by` is stable, which gives the registration-order tie-break.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let single = scored.len() == 1;
    Ok(scored
        .iter()
        .enumerate()
        .map(|(i, &(intent_id, score))| {
            let gap = match scored.get(i + 1) {
                Some(&(_, next)) => score - next,
                None if single => 1.0,
                None => 0.0,
            };
            SemanticMatch {
                intent_id: intent_id.to_string(),
                score,
                gap,
            }
        })
        .collect())
}

/// Accepts a top match only when it is both close and unambiguous.
///
/// Both thresholds must hold. A high score with a small gap means two
/// intents in a crowded cluster are competing for the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gate {
    pub min_score: f32,
    pub min_gap: f32,
}

impl Default for Gate {
    fn default() -> Self {
        Self::from(&RouterConfig::default())
    }
}

impl From<&RouterConfig> for Gate {
    fn from(config: &RouterConfig) -> Self {
        Self {
            min_score: config.min_score,
            min_gap: config.min_gap,
        }
    }
}

impl Gate {
    pub fn accepts(&self, top: &SemanticMatch) -> bool {
        top.score >= self.min_score && top.gap >= self.min_gap
    }
}
