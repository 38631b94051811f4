pub mod client;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::errors::CycleError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Prediction {
    pub emotion: String,
}

/// A remote model that turns one still image into an emotion label.
#[async_trait]
pub trait PredictionClient: Send + Sync + 'static {
    async fn predict(&self, image: Vec<u8>) -> Result<Prediction, CycleError>;
}
