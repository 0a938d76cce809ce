//! Confidence and recommendation labels.
//!
//! Both derivations are pure threshold functions. Boundaries are exclusive:
//! a confidence of exactly 0.8 is MEDIUM, not HIGH.

use super::models::{ConfidenceLevel, PredictionResult, PredictionSource, Recommendation};

/// Bucket a confidence value produced by the scoring model.
pub fn confidence_level_for(confidence: f64) -> ConfidenceLevel {
    if confidence > 0.8 {
        ConfidenceLevel::High
    } else if confidence > 0.65 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Strength label for the favourite, whatever produced the probabilities.
pub fn recommendation_for(player1_win_prob: f64, player2_win_prob: f64) -> Recommendation {
    let max_prob = player1_win_prob.max(player2_win_prob);
    if max_prob > 0.85 {
        Recommendation::StrongWin
    } else if max_prob > 0.75 {
        Recommendation::Win
    } else if max_prob > 0.60 {
        Recommendation::Moderate
    } else if max_prob > 0.50 {
        Recommendation::Slight
    } else {
        Recommendation::Avoid
    }
}

/// Attach confidence level and recommendation to a result.
///
/// Fallback predictions stay LOW regardless of their numeric confidence.
pub fn enrich(mut result: PredictionResult) -> PredictionResult {
    result.confidence_level = match result.source {
        PredictionSource::Model => confidence_level_for(result.confidence),
        PredictionSource::Fallback => ConfidenceLevel::Low,
    };
    result.recommendation = recommendation_for(result.player1_win_prob, result.player2_win_prob);
    result
}
