//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use superagent_build::{BuildPipeline, BuildServices, PipelineSettings};
use superagent_core::{CompletionClient, SuperAgentConfig, SuperAgentError};

/// State handed to every handler. Built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<BuildPipeline>,
    /// Client used for streamed generation outside the pipeline.
    pub client: Arc<dyn CompletionClient>,
    /// Root served under `/apps`.
    pub output_dir: PathBuf,
}

impl AppState {
    pub fn new(pipeline: BuildPipeline, client: Arc<dyn CompletionClient>) -> Self {
        let output_dir = pipeline.services().output_dir();
        Self {
            pipeline: Arc::new(pipeline),
            client,
            output_dir,
        }
    }

    /// Wire the default services for `config` around `client`.
    pub fn from_config(
        config: &SuperAgentConfig,
        client: Arc<dyn CompletionClient>,
    ) -> Result<Self, SuperAgentError> {
        let services = BuildServices::from_config(config, client.clone())?;
        let pipeline = BuildPipeline::new(services, PipelineSettings::from(config));
        Ok(Self::new(pipeline, client))
    }
}
