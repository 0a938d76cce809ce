//! Rule-based fallback used when the scoring service is unreachable.
//!
//! Starts from a coin flip and nudges player 1's probability by ranking gap
//! and career win-rate gap, clamping after each step so the heuristic never
//! claims more than 70% certainty.

use chrono::Utc;
use tracing::info;

use super::enrich::recommendation_for;
use super::models::{
    favourite, ConfidenceLevel, PredictionRequest, PredictionResult, PredictionSource, Surface,
};

/// Marker stored in `key_factors` for every fallback prediction.
pub const FALLBACK_KEY_FACTORS: &str = "Using fallback rule engine";

/// Probability shift per ranking place.
const RANK_WEIGHT: f64 = 0.01;
/// Probability shift per unit of career win-rate difference.
const WIN_PCT_WEIGHT: f64 = 0.1;
const MIN_PROB: f64 = 0.3;
const MAX_PROB: f64 = 0.7;

/// Produce a prediction without any external dependency. Never fails.
pub fn predict(request: &PredictionRequest, surface: Surface) -> PredictionResult {
    info!(
        "Using rule engine for prediction: {} vs {}",
        request.player1_name, request.player2_name
    );

    let (p1, p2) = heuristic_probabilities(request);
    let predicted_winner = favourite(&request.player1_name, &request.player2_name, p1, p2);

    PredictionResult {
        id: None,
        player1_name: request.player1_name.clone(),
        player2_name: request.player2_name.clone(),
        player1_win_prob: p1,
        player2_win_prob: p2,
        predicted_winner: predicted_winner.to_string(),
        confidence: p1.max(p2),
        confidence_level: ConfidenceLevel::Low,
        recommendation: recommendation_for(p1, p2),
        key_factors: Some(FALLBACK_KEY_FACTORS.to_string()),
        tournament: request.tournament.clone(),
        surface,
        source: PredictionSource::Fallback,
        created_at: Utc::now(),
    }
}

/// `(player1_prob, player2_prob)` after the rank step then the win-rate step.
fn heuristic_probabilities(request: &PredictionRequest) -> (f64, f64) {
    let mut p1 = 0.5;
    let mut p2 = 0.5;

    if let (Some(r1), Some(r2)) = (request.player1_rank, request.player2_rank) {
        // Lower rank number is the stronger player.
        let rank_diff = f64::from(r2) - f64::from(r1);
        p1 = clamp_prob(p1 + rank_diff * RANK_WEIGHT);
        p2 = 1.0 - p1;
    }

    if let (Some(w1), Some(w2)) = (
        request.player1_win_pct_career,
        request.player2_win_pct_career,
    ) {
        p1 = clamp_prob(p1 + (w1 - w2) * WIN_PCT_WEIGHT);
        p2 = 1.0 - p1;
    }

    (p1, p2)
}

fn clamp_prob(p: f64) -> f64 {
    p.clamp(MIN_PROB, MAX_PROB)
}
