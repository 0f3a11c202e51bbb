//! Result Ranker
//!
//! Orders a model's classes by score and keeps the best few.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::AnalyzeError;

/// Number of classes kept per model
pub const TOP_K: usize = 3;

/// A class label with its score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedClass {
    pub label: String,
    pub score: f32,
}

/// Rank `labels` by `scores` descending and keep the first `k`.
///
/// The sort is stable, so equal scores keep label order. NaN scores sort last.
pub fn rank_top_k(labels: &[String], scores: &[f32], k: usize) -> Result<Vec<RankedClass>, AnalyzeError> {
    if labels.len() != scores.len() {
        return Err(AnalyzeError::Validation(format!(
            "{} labels but {} scores",
            labels.len(),
            scores.len()
        )));
    }

    let mut ranked: Vec<(&String, f32)> = labels.iter().zip(scores.iter().copied()).collect();
    ranked.sort_by(|(_, a), (_, b)| descending(*a, *b));

    Ok(ranked
        .into_iter()
        .take(k)
        .map(|(label, score)| RankedClass {
            label: label.clone(),
            score,
        })
        .collect())
}

/// Top-3 ranking
pub fn rank_top3(labels: &[String], scores: &[f32]) -> Result<Vec<RankedClass>, AnalyzeError> {
    rank_top_k(labels, scores, TOP_K)
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
