use greenscore::config::StandardConfig;
use greenscore::rubric::LoadError;
use greenscore::{AppError, Rubric, ScoringEngine};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Build the engine for the configured standard, falling back to the bundled one.
pub(crate) fn load_engine(
    config: &StandardConfig,
    override_path: Option<&Path>,
) -> Result<ScoringEngine, AppError> {
    let path = override_path.or(config.path.as_deref());
    let rubric = match path {
        Some(path) => {
            info!(path = %path.display(), "loading standard from disk");
            Rubric::from_path(path)?
        }
        None => Rubric::bundled()?,
    };

    let engine = ScoringEngine::new(rubric).map_err(LoadError::from)?;
    info!(
        categories = engine.rubric().categories.len(),
        inputs = engine.index().descriptors().len(),
        "standard ready"
    );
    Ok(engine)
}
