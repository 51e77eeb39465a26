// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid retriever: weighted fusion of vector and lexical scores.
//!
//! The store returns owner-scoped candidates carrying a cosine score and,
//! when the backend supports keyword search, a raw bm25 score. Fusion
//! min-max normalizes the bm25 side per query and combines:
//!
//! `fused = vector_weight * cosine + lexical_weight * normalized_bm25`
//!
//! Ties break toward the more recently created record.

use std::collections::HashMap;
use std::sync::Arc;

use mnemo_config::model::RetrievalConfig;
use mnemo_core::types::{RetrievalFilters, RetrievedRecord, ScoredCandidate};
use mnemo_core::{MemoryStoreAdapter, MnemoError};

/// Hybrid retrieval over one record store.
pub struct HybridRetriever {
    store: Arc<dyn MemoryStoreAdapter>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(store: Arc<dyn MemoryStoreAdapter>, config: RetrievalConfig) -> Self {
        Self { store, config }
    }

    /// Fetch candidates, fuse, take the top `k`, and rehydrate full records.
    ///
    /// An empty store yields an empty result, not an error.
    pub async fn retrieve(
        &self,
        owner_id: &str,
        query_text: &str,
        query_vector: &[f32],
        k: usize,
        filters: &RetrievalFilters,
    ) -> Result<Vec<RetrievedRecord>, MnemoError> {
        let candidates = self
            .store
            .query(
                owner_id,
                query_vector,
                query_text,
                self.config.candidate_pool,
                filters,
            )
            .await?;

        let fused = fuse(
            &candidates,
            self.config.vector_weight,
            self.config.lexical_weight,
        );
        let top: Vec<(String, f32)> = fused.into_iter().take(k).collect();
        if top.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = top.iter().map(|(id, _)| id.clone()).collect();
        let records = self.store.get_many(&ids).await?;
        let mut by_id: HashMap<String, _> = records
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        Ok(top
            .into_iter()
            .filter_map(|(id, score)| by_id.remove(&id).map(|record| (record, score)))
            .enumerate()
            .map(|(rank, (record, score))| RetrievedRecord {
                record,
                score,
                rank,
            })
            .collect())
    }
}

/// Weighted score fusion. Pure so it can be tested without a store.
///
/// bm25 scores from FTS5 are negative-is-better; they are flipped and
/// min-max normalized into `[0, 1]` across the candidates that have one.
/// Candidates without a lexical score contribute zero on that side.
pub(crate) fn fuse(
    candidates: &[ScoredCandidate],
    vector_weight: f32,
    lexical_weight: f32,
) -> Vec<(String, f32)> {
    let lexical: Vec<f64> = candidates
        .iter()
        .filter_map(|c| c.lexical_score)
        .map(|s| -s)
        .collect();
    let (lex_min, lex_max) = match (
        lexical.iter().cloned().fold(f64::INFINITY, f64::min),
        lexical.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    ) {
        (min, max) if min.is_finite() && max.is_finite() => (min, max),
        _ => (0.0, 0.0),
    };
    let lex_span = lex_max - lex_min;

    let mut scored: Vec<(&ScoredCandidate, f32)> = candidates
        .iter()
        .map(|c| {
            let lex_norm = match c.lexical_score {
                // A lone lexical hit normalizes to full strength.
                Some(_) if lex_span <= f64::EPSILON => 1.0,
                Some(s) => ((-s - lex_min) / lex_span) as f32,
                None => 0.0,
            };
            let fused = vector_weight * c.vector_score + lexical_weight * lex_norm;
            (c, fused)
        })
        .collect();

    scored.sort_by(|(a, sa), (b, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    scored
        .into_iter()
        .map(|(c, score)| (c.id.clone(), score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        id: &str,
        vector_score: f32,
        lexical_score: Option<f64>,
        created_at: &str,
    ) -> ScoredCandidate {
        ScoredCandidate {
            id: id.to_string(),
            vector_score,
            lexical_score,
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn vector_only_preserves_cosine_order() {
        let candidates = vec![
            candidate("low", 0.2, None, "2026-01-01T00:00:00Z"),
            candidate("high", 0.9, None, "2026-01-01T00:00:00Z"),
        ];
        let fused = fuse(&candidates, 0.7, 0.3);
        assert_eq!(fused[0].0, "high");
        assert!((fused[0].1 - 0.63).abs() < 1e-5);
    }

    #[test]
    fn strong_lexical_match_lifts_a_weaker_vector_candidate() {
        // "keyword" has a middling cosine but the best bm25; with a 0.3
        // lexical weight it overtakes the slightly-better vector candidate.
        let candidates = vec![
            candidate("vector", 0.60, Some(-0.5), "2026-01-01T00:00:00Z"),
            candidate("keyword", 0.55, Some(-9.0), "2026-01-01T00:00:00Z"),
        ];
        let fused = fuse(&candidates, 0.7, 0.3);
        // keyword: 0.7*0.55 + 0.3*1.0 = 0.685; vector: 0.7*0.60 + 0.3*0.0 = 0.42
        assert_eq!(fused[0].0, "keyword");
    }

    #[test]
    fn lone_lexical_hit_normalizes_to_full_strength() {
        let candidates = vec![
            candidate("both", 0.1, Some(-3.0), "2026-01-01T00:00:00Z"),
            candidate("vector-only", 0.2, None, "2026-01-01T00:00:00Z"),
        ];
        let fused = fuse(&candidates, 0.7, 0.3);
        // both: 0.7*0.1 + 0.3*1.0 = 0.37; vector-only: 0.14
        assert_eq!(fused[0].0, "both");
    }

    #[test]
    fn ties_break_toward_newer_records() {
        let candidates = vec![
            candidate("older", 0.5, None, "2026-01-01T00:00:00Z"),
            candidate("newer", 0.5, None, "2026-02-01T00:00:00Z"),
        ];
        let fused = fuse(&candidates, 0.7, 0.3);
        assert_eq!(fused[0].0, "newer");
    }

    #[test]
    fn empty_candidates_fuse_to_empty() {
        assert!(fuse(&[], 0.7, 0.3).is_empty());
    }

    #[test]
    fn custom_weights_change_the_balance() {
        let candidates = vec![
            candidate("vector", 0.9, Some(-0.1), "2026-01-01T00:00:00Z"),
            candidate("keyword", 0.1, Some(-9.0), "2026-01-01T00:00:00Z"),
        ];
        // All-lexical weighting ranks by bm25 alone.
        let fused = fuse(&candidates, 0.0, 1.0);
        assert_eq!(fused[0].0, "keyword");
        // All-vector weighting ranks by cosine alone.
        let fused = fuse(&candidates, 1.0, 0.0);
        assert_eq!(fused[0].0, "vector");
    }
}
