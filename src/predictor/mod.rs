pub mod engine;
pub mod enrich;
pub mod error;
pub mod fallback;
pub mod models;
pub mod remote;
pub mod retry;
pub mod validation;

pub use engine::PredictionEngine;
pub use error::{PredictionError, ValidationError};
pub use remote::{HttpOracle, RemotePredictor};
pub use retry::RetryPolicy;
