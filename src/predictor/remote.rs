use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::enrich::{confidence_level_for, recommendation_for};
use super::error::RemoteError;
use super::models::{favourite, PredictionRequest, PredictionResult, PredictionSource, Surface};
use super::retry::RetryPolicy;

/// Tolerance when checking that the two probabilities sum to one.
const PROB_SUM_TOLERANCE: f64 = 1e-6;

/// Body returned by the scoring service's predict endpoint. Extra fields
/// (e.g. the per-model ensemble breakdown) are ignored, and so is the
/// service's own `confidence`, which is recomputed from the probabilities.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OracleResponse {
    pub player1_win_prob: f64,
    pub player2_win_prob: f64,
    #[serde(default)]
    pub predicted_winner: Option<String>,
    #[serde(default)]
    pub key_factors: Option<String>,
}

/// Trait implemented by every remote scoring backend.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Score a single match. One call, no retries.
    async fn predict(&self, request: &PredictionRequest) -> Result<OracleResponse, RemoteError>;

    /// Cheap liveness probe with no body.
    async fn health(&self) -> Result<(), RemoteError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// HTTP client for the model-serving service.
#[derive(Clone)]
pub struct HttpOracle {
    http: Client,
    base_url: String,
}

impl HttpOracle {
    /// `timeout` bounds each individual HTTP call.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpOracle {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ScoringOracle for HttpOracle {
    async fn predict(&self, request: &PredictionRequest) -> Result<OracleResponse, RemoteError> {
        let url = format!("{}/api/predict", self.base_url);
        info!("Calling ML service: {}", url);

        let resp = self.http.post(&url).json(request).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status { status, body });
        }

        Ok(resp.json::<OracleResponse>().await?)
    }

    async fn health(&self) -> Result<(), RemoteError> {
        let url = format!("{}/api/health", self.base_url);
        debug!("Probing ML service health: {}", url);

        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status { status, body });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ml-service"
    }
}

/// Last-known reachability of the scoring service.
///
/// Telemetry only: it is written after every call and read by health and
/// stats reporting, but never consulted to decide whether to call or retry.
/// Concurrent writers may race; the last write wins and that is fine.
#[derive(Debug, Clone)]
pub struct Availability(Arc<AtomicBool>);

impl Availability {
    pub fn new(initial: bool) -> Self {
        Availability(Arc::new(AtomicBool::new(initial)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, available: bool) {
        self.0.store(available, Ordering::Relaxed);
    }
}

/// Retrying client around a [`ScoringOracle`].
pub struct RemotePredictor {
    oracle: Arc<dyn ScoringOracle>,
    policy: RetryPolicy,
    available: Availability,
}

impl RemotePredictor {
    pub fn new(oracle: Arc<dyn ScoringOracle>, policy: RetryPolicy) -> Self {
        RemotePredictor {
            oracle,
            policy,
            available: Availability::new(true),
        }
    }

    /// Score a match, retrying per the policy. Returns the last error once
    /// every attempt has failed.
    pub async fn predict(
        &self,
        request: &PredictionRequest,
        surface: Surface,
    ) -> Result<PredictionResult, RemoteError> {
        let label = format!("{} prediction", self.oracle.name());
        self.policy
            .run(&label, |attempt| async move {
                debug!(
                    "{} attempt {} for {} vs {}",
                    self.oracle.name(),
                    attempt,
                    request.player1_name,
                    request.player2_name
                );
                let outcome = self
                    .oracle
                    .predict(request)
                    .await
                    .and_then(|resp| into_result(resp, request, surface));
                self.available.set(outcome.is_ok());
                outcome
            })
            .await
    }

    /// Probe the service outside the retry chain. Updates the availability
    /// flag and returns it.
    pub async fn check_health(&self) -> bool {
        match self.oracle.health().await {
            Ok(()) => {
                self.available.set(true);
                true
            }
            Err(e) => {
                warn!("{} health check failed: {}", self.oracle.name(), e);
                self.available.set(false);
                false
            }
        }
    }

    /// Last-known availability; see [`Availability`].
    pub fn is_available(&self) -> bool {
        self.available.get()
    }
}

/// Map an oracle response onto a result, rejecting probabilities that do not
/// form a distribution over the two players.
fn into_result(
    resp: OracleResponse,
    request: &PredictionRequest,
    surface: Surface,
) -> Result<PredictionResult, RemoteError> {
    let (p1, p2) = (resp.player1_win_prob, resp.player2_win_prob);
    if !(0.0..=1.0).contains(&p1) || !(0.0..=1.0).contains(&p2) {
        return Err(RemoteError::InvalidResponse(format!(
            "probabilities out of range: {} / {}",
            p1, p2
        )));
    }
    if (p1 + p2 - 1.0).abs() > PROB_SUM_TOLERANCE {
        return Err(RemoteError::InvalidResponse(format!(
            "probabilities do not sum to 1: {} + {}",
            p1, p2
        )));
    }

    let p1_name = &request.player1_name;
    let p2_name = &request.player2_name;
    let predicted_winner = match resp.predicted_winner {
        Some(w) if w == *p1_name || w == *p2_name => w,
        _ => favourite(p1_name, p2_name, p1, p2).to_string(),
    };
    let confidence = p1.max(p2);

    Ok(PredictionResult {
        id: None,
        player1_name: p1_name.clone(),
        player2_name: p2_name.clone(),
        player1_win_prob: p1,
        player2_win_prob: p2,
        predicted_winner,
        confidence,
        confidence_level: confidence_level_for(confidence),
        recommendation: recommendation_for(p1, p2),
        key_factors: resp.key_factors,
        tournament: request.tournament.clone(),
        surface,
        source: PredictionSource::Model,
        created_at: Utc::now(),
    })
}
