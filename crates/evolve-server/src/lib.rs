//! HTTP server for evolve.
//!
//! Exposes the site editor: natural-language edit requests are turned into
//! previews by a language model, previews are published with a snapshot of
//! the previous live files, and snapshots can be rolled back.

pub mod config;
pub mod error;
pub mod gateway;
pub mod mirror;
pub mod parse;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use config::{ConfigError, GitHubConfig, ServerConfig};
pub use error::{ServerError, ServerResult, StartupError};
pub use gateway::{GenerationGateway, GenerationOutcome};
pub use mirror::GitHubMirror;
pub use parse::{parse_files_payload, FilesPayload, ParseError};
pub use rate_limit::{CooldownActive, CooldownGuard};
pub use routes::create_router;
pub use state::AppState;
