//! Turning an edit request into staged previews.

use crate::{
    error::{ServerError, ServerResult},
    parse::parse_files_payload,
    rate_limit::{CooldownActive, CooldownGuard},
};
use evolve_provider::{BoxedLanguageModel, GenerateOptions, Message};
use evolve_site::Site;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Instructions sent ahead of every edit request.
pub const SYSTEM_PROMPT: &str = "You are an expert web engineer modifying an existing website.
Preserve unrelated functionality and existing code.
Return JSON with keys: files (object mapping filename to full new content).
Do not explain. No markdown. Only JSON.";

/// Sampling temperature for edit requests.
pub const TEMPERATURE: f32 = 0.2;

/// What a successful generation staged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationOutcome {
    /// Managed files that now have a pending preview.
    pub staged: Vec<String>,
    /// Names returned by the model that are not managed files.
    pub ignored: Vec<String>,
}

/// Sends edit requests to the model and stages what comes back.
pub struct GenerationGateway {
    site: Arc<Site>,
    model: Option<BoxedLanguageModel>,
    cooldown: CooldownGuard,
}

impl GenerationGateway {
    /// Create a gateway. Without a model every request fails with a configuration error.
    pub fn new(site: Arc<Site>, model: Option<BoxedLanguageModel>, cooldown: CooldownGuard) -> Self {
        Self {
            site,
            model,
            cooldown,
        }
    }

    /// Generate previews for `prompt`.
    ///
    /// A request inside the cooldown is rejected before anything else is
    /// checked. Otherwise the prompt must be non-empty and a model must be
    /// configured; only a request that passes both starts a new cooldown.
    /// The model call is not retried.
    pub async fn generate(&self, prompt: &str) -> ServerResult<GenerationOutcome> {
        self.cooldown.check().map_err(rate_limited)?;

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ServerError::validation("Missing prompt"));
        }

        let model = self
            .model
            .as_ref()
            .ok_or_else(|| ServerError::Config("GROQ_API_KEY not configured".to_string()))?;

        self.cooldown.try_acquire().map_err(rate_limited)?;

        info!(
            provider = %model.provider_id(),
            model = %model.model_id(),
            prompt = %prompt,
            "Sending edit request"
        );

        let current = self.site.current_files().await;
        let messages = build_messages(&current, prompt);
        let raw = model
            .complete(
                messages,
                GenerateOptions {
                    temperature: Some(TEMPERATURE),
                },
            )
            .await?;
        debug!(raw = %raw, "Model response");

        let payload = parse_files_payload(&raw)?;

        let files = self.site.layout().files();
        let (known, unknown): (BTreeMap<_, _>, BTreeMap<_, _>) = payload
            .files
            .into_iter()
            .partition(|(name, _)| files.contains(name));
        let ignored: Vec<String> = unknown.into_keys().collect();
        if !ignored.is_empty() {
            warn!(files = ?ignored, "Ignoring unmanaged files in model response");
        }

        let staged = self.site.stage(&known).await?;
        Ok(GenerationOutcome { staged, ignored })
    }
}

fn rate_limited(active: CooldownActive) -> ServerError {
    ServerError::RateLimited {
        retry_after: active.retry_after,
    }
}

/// Conversation sent to the model: instructions, current files, then the request.
fn build_messages(current: &BTreeMap<String, String>, prompt: &str) -> Vec<Message> {
    let files_json = serde_json::to_string(current).unwrap_or_else(|_| "{}".to_string());
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(format!("CURRENT FILES:\n{files_json}")),
        Message::user(format!("REQUEST:\n{prompt}")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolve_provider::test::ScriptedModel;
    use evolve_provider::Role;
    use evolve_site::ManagedFiles;
    use evolve_util::ManualClock;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::fs;

    struct Fixture {
        dir: TempDir,
        clock: Arc<ManualClock>,
        model: Arc<ScriptedModel>,
        gateway: GenerationGateway,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let site = Arc::new(
            Site::open(
                dir.path().to_path_buf(),
                dir.path().join(".history"),
                ManagedFiles::default(),
            )
            .await
            .unwrap(),
        );
        fs::write(dir.path().join("live.html"), "<h1>Old</h1>")
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new());
        let model = Arc::new(ScriptedModel::new());
        let gateway = GenerationGateway::new(
            site,
            Some(model.clone()),
            CooldownGuard::new(clock.clone(), Duration::from_secs(5)),
        );
        Fixture {
            dir,
            clock,
            model,
            gateway,
        }
    }

    #[tokio::test]
    async fn test_sends_current_files_and_request() {
        let f = fixture().await;
        f.model
            .push_text(r#"{"files": {"live.html": "<h1>New</h1>"}}"#);

        f.gateway.generate("  make the title say New ").await.unwrap();

        let requests = f.model.requests();
        assert_eq!(requests.len(), 1);
        let messages = &requests[0];
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(
            messages[1].content,
            "CURRENT FILES:\n{\"live.html\":\"<h1>Old</h1>\",\"main.js\":\"\",\"styles.css\":\"\"}"
        );
        assert_eq!(messages[2].content, "REQUEST:\nmake the title say New");
    }

    #[tokio::test]
    async fn test_stages_known_files_and_ignores_others() {
        let f = fixture().await;
        f.model.push_text(
            "```json\n{\"files\": {\"live.html\": \"<h1>New</h1>\", \"server.js\": \"rm -rf\"}}\n```",
        );

        let outcome = f.gateway.generate("edit").await.unwrap();

        assert_eq!(outcome.staged, vec!["live.html"]);
        assert_eq!(outcome.ignored, vec!["server.js"]);
        assert_eq!(
            fs::read_to_string(f.dir.path().join("live.preview.html"))
                .await
                .unwrap(),
            "<h1>New</h1>"
        );
        assert!(!f.dir.path().join("server.js").exists());
        assert!(!f.dir.path().join("server.preview.js").exists());
    }

    #[tokio::test]
    async fn test_cooldown_blocks_second_request() {
        let f = fixture().await;
        f.model.push_text(r#"{"files": {"main.js": "one"}}"#);
        f.model.push_text(r#"{"files": {"main.js": "two"}}"#);

        f.gateway.generate("first").await.unwrap();
        f.clock.advance(Duration::from_secs(4));
        let err = f.gateway.generate("second").await.unwrap_err();
        assert!(matches!(err, ServerError::RateLimited { .. }));
        assert_eq!(f.model.call_count(), 1);
        assert_eq!(
            fs::read_to_string(f.dir.path().join("main.preview.js"))
                .await
                .unwrap(),
            "one"
        );

        f.clock.advance(Duration::from_secs(1));
        f.gateway.generate("second").await.unwrap();
        assert_eq!(
            fs::read_to_string(f.dir.path().join("main.preview.js"))
                .await
                .unwrap(),
            "two"
        );
    }

    #[tokio::test]
    async fn test_empty_prompt_does_not_consume_cooldown() {
        let f = fixture().await;
        f.model.push_text(r#"{"files": {}}"#);

        let err = f.gateway.generate("   ").await.unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
        assert!(f.gateway.generate("real").await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_prompt_inside_cooldown_is_rate_limited() {
        let f = fixture().await;
        f.model.push_text(r#"{"files": {"main.js": "one"}}"#);
        f.gateway.generate("first").await.unwrap();

        f.clock.advance(Duration::from_secs(1));
        let err = f.gateway.generate("").await.unwrap_err();
        assert!(matches!(err, ServerError::RateLimited { .. }));
        assert_eq!(f.model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_model_is_config_error() {
        let dir = TempDir::new().unwrap();
        let site = Arc::new(
            Site::open(
                dir.path().to_path_buf(),
                dir.path().join(".history"),
                ManagedFiles::default(),
            )
            .await
            .unwrap(),
        );
        let gateway = GenerationGateway::new(
            site,
            None,
            CooldownGuard::new(Arc::new(ManualClock::new()), Duration::from_secs(5)),
        );
        let err = gateway.generate("anything").await.unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[tokio::test]
    async fn test_unparseable_response_stages_nothing() {
        let f = fixture().await;
        f.model.push_text("Sorry, I can't do that.");

        let err = f.gateway.generate("edit").await.unwrap_err();
        assert!(matches!(err, ServerError::Parse(_)));
        assert!(err.to_string().contains("Sorry, I can't do that."));
        assert!(!f.dir.path().join("live.preview.html").exists());
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaces() {
        let f = fixture().await;
        f.model.push_api_error(503, "overloaded");

        let err = f.gateway.generate("edit").await.unwrap_err();
        assert!(matches!(err, ServerError::Upstream(_)));
        assert_eq!(f.model.call_count(), 1);
    }
}
