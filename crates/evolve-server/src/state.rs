//! Server state.

use crate::{
    config::ServerConfig,
    error::StartupError,
    gateway::GenerationGateway,
    mirror::GitHubMirror,
    rate_limit::CooldownGuard,
};
use evolve_provider::{
    groq::{GroqConfig, GroqProvider},
    BoxedLanguageModel,
};
use evolve_site::{ManagedFiles, Site};
use evolve_util::{SharedClock, SystemClock};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The managed site.
    pub site: Arc<Site>,
    /// Edit request handling.
    pub gateway: Arc<GenerationGateway>,
    /// Optional GitHub mirror for published files.
    pub mirror: Option<Arc<GitHubMirror>>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(site: Arc<Site>, gateway: GenerationGateway) -> Self {
        Self {
            site,
            gateway: Arc::new(gateway),
            mirror: None,
        }
    }

    /// Mirror published files to GitHub.
    pub fn with_mirror(mut self, mirror: GitHubMirror) -> Self {
        self.mirror = Some(Arc::new(mirror));
        self
    }

    /// Build the state described by `config`, using the system clock.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        Self::from_config_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Build the state described by `config` with an explicit clock.
    pub async fn from_config_with_clock(
        config: &ServerConfig,
        clock: SharedClock,
    ) -> Result<Self, StartupError> {
        let site = Arc::new(
            Site::open(
                config.site_dir.clone(),
                config.history_dir.clone(),
                ManagedFiles::default(),
            )
            .await?,
        );

        let model: Option<BoxedLanguageModel> = match &config.api_key {
            Some(key) => {
                let provider = GroqProvider::new(
                    GroqConfig::new(key.clone())
                        .with_model(config.model.clone())
                        .with_base_url(config.api_base_url.clone())
                        .with_timeout(config.request_timeout),
                )?;
                info!(model = %config.model, "Generation enabled");
                Some(Arc::new(provider))
            }
            None => {
                warn!("GROQ_API_KEY not set; /generate will fail until it is configured");
                None
            }
        };

        let gateway = GenerationGateway::new(
            site.clone(),
            model,
            CooldownGuard::new(clock, config.cooldown),
        );
        let mut state = Self::new(site, gateway);

        if let Some(github) = &config.github {
            info!(owner = %github.owner, repo = %github.repo, "Mirroring publishes to GitHub");
            state = state.with_mirror(GitHubMirror::new(github.clone())?);
        }

        Ok(state)
    }
}
