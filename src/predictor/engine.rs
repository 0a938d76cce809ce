use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::db::models::{Page, SystemStats};
use crate::db::PredictionStore;

use super::enrich::enrich;
use super::error::{PredictionError, ValidationError, ValidationField};
use super::fallback;
use super::models::{PredictionRequest, PredictionResult};
use super::remote::RemotePredictor;
use super::validation::validate;

/// Sequences validation, remote scoring, fallback, enrichment and
/// persistence for each prediction.
pub struct PredictionEngine {
    remote: RemotePredictor,
    store: Arc<dyn PredictionStore>,
    started_at: Instant,
}

impl PredictionEngine {
    pub fn new(remote: RemotePredictor, store: Arc<dyn PredictionStore>) -> Self {
        PredictionEngine {
            remote,
            store,
            started_at: Instant::now(),
        }
    }

    /// Predict a single match.
    ///
    /// Only validation can fail. A scoring service that stays down after all
    /// retries is replaced by the fallback heuristic, and a failed save only
    /// leaves the returned result without an `id`.
    pub async fn predict_match(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResult, ValidationError> {
        info!(
            "Processing prediction: {} vs {}",
            request.player1_name, request.player2_name
        );

        let surface = validate(request)?;

        let prediction = match self.remote.predict(request, surface).await {
            Ok(p) => p,
            Err(e) => {
                warn!("ML service failed, using rule engine: {}", e);
                fallback::predict(request, surface)
            }
        };

        let mut prediction = enrich(prediction);
        self.persist(&mut prediction);
        Ok(prediction)
    }

    /// Predict each request in order. The first invalid request aborts the
    /// batch; predictions made before it have already been persisted.
    pub async fn batch_predict(
        &self,
        requests: &[PredictionRequest],
    ) -> Result<Vec<PredictionResult>, ValidationError> {
        info!("Batch prediction with {} matches", requests.len());
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.predict_match(request).await?);
        }
        Ok(results)
    }

    fn persist(&self, prediction: &mut PredictionResult) {
        match self.store.save(prediction) {
            Ok(record) => {
                prediction.id = record.id;
                prediction.created_at = record.created_at;
            }
            Err(e) => warn!("Failed to save prediction to database: {}", e),
        }
    }

    pub fn prediction_history(
        &self,
        page: u32,
        size: u32,
    ) -> Result<Page<PredictionResult>, PredictionError> {
        if size == 0 {
            return Err(ValidationError::new(
                ValidationField::Size,
                "Page size must be at least 1",
            )
            .into());
        }
        Ok(self
            .store
            .list_paged(page, size)?
            .map(|record| record.into_result()))
    }

    pub fn predictions_by_tournament(
        &self,
        tournament: &str,
    ) -> Result<Vec<PredictionResult>, PredictionError> {
        let records = self.store.find_by_tournament(tournament)?;
        Ok(records.into_iter().map(|r| r.into_result()).collect())
    }

    pub fn predictions_by_player(
        &self,
        player: &str,
    ) -> Result<Vec<PredictionResult>, PredictionError> {
        let records = self.store.find_by_player(player)?;
        Ok(records.into_iter().map(|r| r.into_result()).collect())
    }

    pub fn prediction(&self, id: i64) -> Result<PredictionResult, PredictionError> {
        self.store
            .find_by_id(id)?
            .map(|r| r.into_result())
            .ok_or(PredictionError::NotFound { id })
    }

    pub fn system_stats(&self) -> Result<SystemStats, PredictionError> {
        Ok(SystemStats {
            total_predictions: self.store.count()?,
            uptime_seconds: self.started_at.elapsed().as_secs(),
            ml_service_available: self.remote.is_available(),
            timestamp: Utc::now(),
        })
    }

    /// Probe the scoring service; see [`RemotePredictor::check_health`].
    pub async fn check_remote_health(&self) -> bool {
        self.remote.check_health().await
    }

    pub fn is_remote_available(&self) -> bool {
        self.remote.is_available()
    }

    /// Whether the store answers a trivial query.
    pub fn store_reachable(&self) -> bool {
        self.store.count().is_ok()
    }
}
