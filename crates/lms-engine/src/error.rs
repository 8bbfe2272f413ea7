use std::sync::Arc;

use lms_db::StoreError;
use thiserror::Error;

/// Internal failure of an engine computation.
///
/// Cloneable so one failed computation can be handed to every caller that
/// waited on it. Public engine operations turn it into a degraded result.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(Arc<StoreError>),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        Self::Store(Arc::new(err))
    }
}
