use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::db::models::{Page, Player, PlayerStats, SystemStats};
use crate::players::{PlayerDirectory, PlayerError};
use crate::predictor::models::{PredictionRequest, PredictionResult};
use crate::predictor::validation::missing_request;
use crate::predictor::{PredictionEngine, PredictionError, ValidationError};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PredictionEngine>,
    pub players: Arc<PlayerDirectory>,
}

/// Envelope wrapping every API body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// Error half of a handler result: status plus the message shown to clients.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        warn!("Validation error: {}", e);
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: e.message,
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(e: PredictionError) -> Self {
        match e {
            PredictionError::Validation(v) => v.into(),
            PredictionError::NotFound { id } => {
                info!("Prediction {} not found", id);
                ApiError {
                    status: StatusCode::NOT_FOUND,
                    message: "Prediction not found".into(),
                }
            }
            PredictionError::Storage(e) => {
                error!("Prediction storage error: {}", e);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error".into(),
                }
            }
        }
    }
}

impl From<PlayerError> for ApiError {
    fn from(e: PlayerError) -> Self {
        match e {
            PlayerError::NotFound { id } => {
                info!("Player {} not found", id);
                ApiError {
                    status: StatusCode::NOT_FOUND,
                    message: "Player not found".into(),
                }
            }
            PlayerError::Storage(e) => {
                error!("Player storage error: {}", e);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error".into(),
                }
            }
        }
    }
}

impl ApiError {
    /// Extractor rejections keep axum's status and text but use the envelope.
    fn rejected(status: StatusCode, message: String) -> Self {
        warn!("Rejected request ({}): {}", status, message);
        ApiError { status, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::rejected(e.status(), e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::rejected(e.status(), e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::rejected(e.status(), e.body_text())
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Build the Axum router for the prediction API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/predictions", post(predict_handler))
        .route("/api/predictions/batch", post(batch_handler))
        .route("/api/predictions/history", get(history_handler))
        .route("/api/predictions/tournament/:tournament", get(tournament_handler))
        .route("/api/predictions/player/:player", get(player_handler))
        .route("/api/predictions/:id", get(prediction_handler))
        .route("/api/players/search", get(player_search_handler))
        .route("/api/players/top", get(top_players_handler))
        .route("/api/players/:id/stats", get(player_stats_handler))
        .route("/api/health", get(health_handler))
        .route("/api/system/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// POST /api/predictions
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Option<PredictionRequest>>, JsonRejection>,
) -> ApiResult<PredictionResult> {
    let Json(payload) = payload?;
    let request = payload.ok_or_else(missing_request)?;
    info!(
        "Prediction request received: {} vs {}",
        request.player1_name, request.player2_name
    );
    let prediction = state.engine.predict_match(&request).await?;
    Ok(ApiResponse::ok(prediction))
}

/// POST /api/predictions/batch
async fn batch_handler(
    State(state): State<Arc<AppState>>,
    requests: Result<Json<Vec<PredictionRequest>>, JsonRejection>,
) -> ApiResult<Vec<PredictionResult>> {
    let Json(requests) = requests?;
    info!("Batch prediction request received with {} matches", requests.len());
    let predictions = state.engine.batch_predict(&requests).await?;
    Ok(ApiResponse::ok(predictions))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    #[serde(default)]
    page: u32,
    #[serde(default = "default_page_size")]
    size: u32,
}

fn default_page_size() -> u32 {
    50
}

/// GET /api/predictions/history?page=0&size=50
async fn history_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Page<PredictionResult>> {
    let Query(params) = params?;
    info!("History request: page={}, size={}", params.page, params.size);
    let history = state.engine.prediction_history(params.page, params.size)?;
    Ok(ApiResponse::ok(history))
}

/// GET /api/predictions/tournament/:tournament
async fn tournament_handler(
    State(state): State<Arc<AppState>>,
    tournament: Result<Path<String>, PathRejection>,
) -> ApiResult<Vec<PredictionResult>> {
    let Path(tournament) = tournament?;
    info!("Tournament predictions request: {}", tournament);
    let predictions = state.engine.predictions_by_tournament(&tournament)?;
    Ok(ApiResponse::ok(predictions))
}

/// GET /api/predictions/player/:player
async fn player_handler(
    State(state): State<Arc<AppState>>,
    player: Result<Path<String>, PathRejection>,
) -> ApiResult<Vec<PredictionResult>> {
    let Path(player) = player?;
    let predictions = state.engine.predictions_by_player(&player)?;
    Ok(ApiResponse::ok(predictions))
}

/// GET /api/predictions/:id
async fn prediction_handler(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<PredictionResult> {
    let Path(id) = id?;
    let prediction = state.engine.prediction(id)?;
    Ok(ApiResponse::ok(prediction))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
}

/// GET /api/players/search?query=nadal
async fn player_search_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Vec<Player>> {
    let Query(params) = params?;
    info!("Player search: {}", params.query);
    Ok(ApiResponse::ok(state.players.search(&params.query)))
}

/// GET /api/players/:id/stats
async fn player_stats_handler(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<PlayerStats> {
    let Path(id) = id?;
    info!("Player stats request: {}", id);
    Ok(ApiResponse::ok(state.players.stats(id)?))
}

#[derive(Debug, Deserialize)]
struct TopParams {
    #[serde(default = "default_top_limit")]
    limit: u32,
}

fn default_top_limit() -> u32 {
    10
}

/// GET /api/players/top?limit=10
async fn top_players_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<TopParams>, QueryRejection>,
) -> ApiResult<Vec<Player>> {
    let Query(params) = params?;
    info!("Top players request: limit={}", params.limit);
    Ok(ApiResponse::ok(state.players.top(params.limit)))
}

/// GET /api/health
///
/// Reports the last-known scoring service state; it does not call out.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = |up: bool, ok: &'static str| if up { ok } else { "unavailable" };
    Json(serde_json::json!({
        "status": "healthy",
        "service": "tennis-predictor",
        "timestamp": Utc::now().timestamp_millis(),
        "database": status(state.engine.store_reachable(), "connected"),
        "ml_service": status(state.engine.is_remote_available(), "connected"),
    }))
}

/// GET /api/system/stats
async fn stats_handler(State(state): State<Arc<AppState>>) -> ApiResult<SystemStats> {
    let stats = state.engine.system_stats()?;
    Ok(ApiResponse::ok(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, StoreError};
    use crate::predictor::error::ValidationField;
    use crate::predictor::remote::tests::{response, ScriptedOracle};
    use crate::predictor::{RemotePredictor, RetryPolicy};
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let db = Arc::new(Database::open(":memory:").unwrap());
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(response(0.7, 0.3))]));
        let remote = RemotePredictor::new(oracle, RetryPolicy::default());
        let engine = PredictionEngine::new(remote, db.clone());
        let players = PlayerDirectory::new(db);
        let seed: Vec<Player> = serde_json::from_str(
            r#"[
                {"name": "Jannik Sinner", "rank": 1, "career_matches": 300, "career_wins": 240},
                {"name": "Carlos Alcaraz", "rank": 2},
                {"name": "Alexander Zverev", "rank": 3}
            ]"#,
        )
        .unwrap();
        players.seed(&seed).unwrap();
        router(AppState {
            engine: Arc::new(engine),
            players: Arc::new(players),
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn assert_error_envelope(body: &Value) {
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn predict_round_trip_through_the_router() {
        let body = r#"{"player1_name": "Jannik Sinner", "player2_name": "Carlos Alcaraz",
                       "tournament": "US Open", "surface": "HARD"}"#;
        let (status, json) = send(app(), post_json("/api/predictions", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["predicted_winner"], "Jannik Sinner");
    }

    #[tokio::test]
    async fn json_null_body_is_the_null_request_error() {
        let (status, json) = send(app(), post_json("/api/predictions", "null")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Prediction request cannot be null");
    }

    #[tokio::test]
    async fn body_without_content_type_gets_the_envelope() {
        let request = Request::post("/api/predictions").body(Body::empty()).unwrap();
        let (status, json) = send(app(), request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_error_envelope(&json);
    }

    #[tokio::test]
    async fn malformed_json_gets_the_envelope() {
        let (status, json) = send(app(), post_json("/api/predictions/batch", "[{")).await;
        assert!(status.is_client_error());
        assert_error_envelope(&json);
    }

    #[tokio::test]
    async fn bad_query_and_path_values_get_the_envelope() {
        let (status, json) = send(app(), get("/api/predictions/history?page=-1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_envelope(&json);

        let (status, json) = send(app(), get("/api/predictions/not-a-number")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_envelope(&json);
    }

    #[tokio::test]
    async fn player_search_ignores_case() {
        let (status, json) = send(app(), get("/api/players/search?query=ALCA")).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Carlos Alcaraz"]);
    }

    #[tokio::test]
    async fn player_search_requires_a_query() {
        let (status, json) = send(app(), get("/api/players/search")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_envelope(&json);
    }

    #[tokio::test]
    async fn player_stats_and_not_found() {
        let (status, json) = send(app(), get("/api/players/1/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Jannik Sinner");
        assert_eq!(json["data"]["win_percentage"], 80.0);

        let (status, json) = send(app(), get("/api/players/99/stats")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Player not found");
    }

    #[tokio::test]
    async fn top_players_default_and_explicit_limit() {
        let (_, json) = send(app(), get("/api/players/top")).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 3);

        let (_, json) = send(app(), get("/api/players/top?limit=2")).await;
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["name"], "Jannik Sinner");
        assert_eq!(data[1]["name"], "Carlos Alcaraz");
    }

    #[test]
    fn player_not_found_maps_to_404() {
        let err: ApiError = PlayerError::NotFound { id: 3 }.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Player not found");
    }

    #[test]
    fn validation_errors_are_bad_requests_with_the_message() {
        let err: ApiError = ValidationError::new(ValidationField::Surface, "Surface cannot be empty").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Surface cannot be empty");
    }

    #[test]
    fn not_found_hides_the_id() {
        let err: ApiError = PredictionError::NotFound { id: 7 }.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Prediction not found");
    }

    #[test]
    fn storage_errors_are_generic_500s() {
        let err: ApiError = PredictionError::Storage(StoreError::LockPoisoned).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn missing_body_maps_to_null_request_message() {
        let err: ApiError = missing_request().into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Prediction request cannot be null");
    }

    #[test]
    fn history_params_default() {
        let params: HistoryParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page, 0);
        assert_eq!(params.size, 50);
    }

    #[test]
    fn success_envelope_shape() {
        let Json(body) = ApiResponse::ok(3);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "data": 3, "error": null}));
    }
}
