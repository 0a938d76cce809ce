use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::predictor::models::{
    ConfidenceLevel, PredictionResult, PredictionSource, Recommendation, Surface,
};

/// Stored form of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Option<i64>,
    pub player1_name: String,
    pub player2_name: String,
    pub player1_win_prob: f64,
    pub player2_win_prob: f64,
    pub predicted_winner: String,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub recommendation: Recommendation,
    pub key_factors: Option<String>,
    pub tournament: String,
    pub surface: Surface,
    pub source: PredictionSource,
    /// Reserved for outcome reconciliation; nothing writes it yet.
    pub actual_winner: Option<String>,
    /// Reserved for outcome reconciliation; nothing writes it yet.
    pub correct: Option<bool>,
    pub created_at: DateTime<Utc>,
    /// Set explicitly wherever the record is written
    pub updated_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// New, not yet persisted record stamped with `now`.
    pub fn from_result(result: &PredictionResult, now: DateTime<Utc>) -> Self {
        PredictionRecord {
            id: None,
            player1_name: result.player1_name.clone(),
            player2_name: result.player2_name.clone(),
            player1_win_prob: result.player1_win_prob,
            player2_win_prob: result.player2_win_prob,
            predicted_winner: result.predicted_winner.clone(),
            confidence: result.confidence,
            confidence_level: result.confidence_level,
            recommendation: result.recommendation,
            key_factors: result.key_factors.clone(),
            tournament: result.tournament.clone(),
            surface: result.surface,
            source: result.source,
            actual_winner: None,
            correct: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_result(self) -> PredictionResult {
        PredictionResult {
            id: self.id,
            player1_name: self.player1_name,
            player2_name: self.player2_name,
            player1_win_prob: self.player1_win_prob,
            player2_win_prob: self.player2_win_prob,
            predicted_winner: self.predicted_winner,
            confidence: self.confidence,
            confidence_level: self.confidence_level,
            recommendation: self.recommendation,
            key_factors: self.key_factors,
            tournament: self.tournament,
            surface: self.surface,
            source: self.source,
            created_at: self.created_at,
        }
    }
}

/// One zero-based page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, size: u32, total_items: i64) -> Self {
        let size_i = i64::from(size.max(1));
        Page {
            items,
            page,
            size,
            total_items,
            total_pages: (total_items + size_i - 1) / size_i,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Aggregate service statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_predictions: i64,
    pub uptime_seconds: u64,
    pub ml_service_available: bool,
    pub timestamp: DateTime<Utc>,
}

/// Player directory entry. Everything but the name is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub rank: Option<i32>,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub career_matches: Option<i32>,
    #[serde(default)]
    pub career_wins: Option<i32>,
    #[serde(default)]
    pub career_titles: Option<i32>,
    #[serde(default)]
    pub surface_preferences: Option<String>,
}

/// Player profile plus derived career win percentage (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub id: Option<i64>,
    pub name: String,
    pub country: Option<String>,
    pub rank: Option<i32>,
    pub points: Option<i64>,
    pub career_matches: Option<i32>,
    pub career_wins: Option<i32>,
    pub win_percentage: f64,
    pub career_titles: Option<i32>,
    pub surface_preferences: Option<String>,
}

impl From<Player> for PlayerStats {
    fn from(player: Player) -> Self {
        let win_percentage = match player.career_matches {
            Some(matches) if matches > 0 => {
                f64::from(player.career_wins.unwrap_or(0)) / f64::from(matches) * 100.0
            }
            _ => 0.0,
        };
        PlayerStats {
            id: player.id,
            name: player.name,
            country: player.country,
            rank: player.rank,
            points: player.points,
            career_matches: player.career_matches,
            career_wins: player.career_wins,
            win_percentage,
            career_titles: player.career_titles,
            surface_preferences: player.surface_preferences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn player(matches: Option<i32>, wins: Option<i32>) -> Player {
        Player {
            id: Some(1),
            name: "Rafael Nadal".into(),
            country: Some("ESP".into()),
            rank: Some(2),
            points: Some(9850),
            career_matches: matches,
            career_wins: wins,
            career_titles: Some(92),
            surface_preferences: Some("CLAY".into()),
        }
    }

    #[test]
    fn win_percentage_is_wins_over_matches() {
        let stats = PlayerStats::from(player(Some(1200), Some(1000)));
        assert_relative_eq!(stats.win_percentage, 83.333_333_333, epsilon = 1e-6);
        assert_eq!(stats.career_titles, Some(92));
        assert_eq!(stats.name, "Rafael Nadal");
    }

    #[test]
    fn win_percentage_is_zero_without_matches() {
        assert_eq!(PlayerStats::from(player(None, Some(3))).win_percentage, 0.0);
        assert_eq!(PlayerStats::from(player(Some(0), Some(0))).win_percentage, 0.0);
    }

    #[test]
    fn missing_wins_count_as_zero() {
        assert_eq!(PlayerStats::from(player(Some(10), None)).win_percentage, 0.0);
    }

    #[test]
    fn player_seed_entry_needs_only_a_name() {
        let p: Player = serde_json::from_str(r#"{"name": "Coco Gauff", "rank": 3}"#).unwrap();
        assert_eq!(p.id, None);
        assert_eq!(p.rank, Some(3));
        assert!(p.country.is_none());
    }

    #[test]
    fn page_counts_partial_last_page() {
        let p: Page<u8> = Page::new(vec![], 0, 10, 21);
        assert_eq!(p.total_pages, 3);
        let p: Page<u8> = Page::new(vec![], 0, 10, 20);
        assert_eq!(p.total_pages, 2);
        let p: Page<u8> = Page::new(vec![], 0, 10, 0);
        assert_eq!(p.total_pages, 0);
    }

    #[test]
    fn page_map_keeps_paging_metadata() {
        let p = Page::new(vec![1, 2], 1, 2, 5).map(|n| n * 10);
        assert_eq!(p.items, vec![10, 20]);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 3);
    }
}
