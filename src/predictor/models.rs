use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Incoming request to predict a single match.
///
/// String fields default to empty so that a missing field is reported by the
/// validator with a field-specific message instead of a deserializer error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(default)]
    pub player1_name: String,
    #[serde(default)]
    pub player2_name: String,
    #[serde(default)]
    pub tournament: String,
    /// Raw surface as supplied by the caller; matched case-insensitively.
    #[serde(default)]
    pub surface: String,
    pub player1_rank: Option<i32>,
    pub player2_rank: Option<i32>,
    pub player1_points: Option<i64>,
    pub player2_points: Option<i64>,
    /// Career win percentage as a fraction (0.0–1.0)
    pub player1_win_pct_career: Option<f64>,
    pub player2_win_pct_career: Option<f64>,
}

/// Playing-court category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Surface {
    Hard,
    Clay,
    Grass,
    Carpet,
}

impl Surface {
    pub const ALL: [Surface; 4] = [Surface::Hard, Surface::Clay, Surface::Grass, Surface::Carpet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Hard => "HARD",
            Surface::Clay => "CLAY",
            Surface::Grass => "GRASS",
            Surface::Carpet => "CARPET",
        }
    }
}

impl FromStr for Surface {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HARD" => Ok(Surface::Hard),
            "CLAY" => Ok(Surface::Clay),
            "GRASS" => Ok(Surface::Grass),
            "CARPET" => Ok(Surface::Carpet),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse confidence bucket shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::Low => "LOW",
        }
    }
}

impl FromStr for ConfidenceLevel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(ConfidenceLevel::High),
            "MEDIUM" => Ok(ConfidenceLevel::Medium),
            "LOW" => Ok(ConfidenceLevel::Low),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// Categorical strength label derived from the favourite's probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongWin,
    Win,
    Moderate,
    Slight,
    Avoid,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongWin => "STRONG_WIN",
            Recommendation::Win => "WIN",
            Recommendation::Moderate => "MODERATE",
            Recommendation::Slight => "SLIGHT",
            Recommendation::Avoid => "AVOID",
        }
    }
}

impl FromStr for Recommendation {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRONG_WIN" => Ok(Recommendation::StrongWin),
            "WIN" => Ok(Recommendation::Win),
            "MODERATE" => Ok(Recommendation::Moderate),
            "SLIGHT" => Ok(Recommendation::Slight),
            "AVOID" => Ok(Recommendation::Avoid),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// Which path produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PredictionSource {
    /// Remote scoring model
    Model,
    /// Local rule-based heuristic
    Fallback,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::Model => "MODEL",
            PredictionSource::Fallback => "FALLBACK",
        }
    }
}

impl FromStr for PredictionSource {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MODEL" => Ok(PredictionSource::Model),
            "FALLBACK" => Ok(PredictionSource::Fallback),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// A string that does not name any variant of a label enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label: {0}")]
pub struct UnknownLabel(pub String);

/// A match prediction as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Set once the prediction has been persisted
    pub id: Option<i64>,
    pub player1_name: String,
    pub player2_name: String,
    pub player1_win_prob: f64,
    pub player2_win_prob: f64,
    pub predicted_winner: String,
    /// max(player1_win_prob, player2_win_prob)
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub recommendation: Recommendation,
    pub key_factors: Option<String>,
    pub tournament: String,
    pub surface: Surface,
    pub source: PredictionSource,
    pub created_at: DateTime<Utc>,
}

/// Tie-break shared by every prediction path: player 1 only wins a strict
/// comparison, exact ties go to player 2.
pub fn favourite<'a>(player1: &'a str, player2: &'a str, p1_prob: f64, p2_prob: f64) -> &'a str {
    if p1_prob > p2_prob {
        player1
    } else {
        player2
    }
}
