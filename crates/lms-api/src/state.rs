use std::sync::Arc;

use lms_db::DataSource;
use lms_engine::{EngineConfig, ProgressEngine};

use crate::config::Environment;

#[derive(Clone, Debug)]
pub struct ApiState {
    pub engine: Arc<ProgressEngine>,
    pub environment: Environment,
}

impl ApiState {
    pub fn new(store: Arc<dyn DataSource>, engine_config: EngineConfig, environment: Environment) -> Self {
        Self {
            engine: Arc::new(ProgressEngine::new(store, engine_config)),
            environment,
        }
    }

    /// State around an already built engine
    pub const fn from_engine(engine: Arc<ProgressEngine>, environment: Environment) -> Self {
        Self { engine, environment }
    }
}
