use anyhow::Result;
use dotenvy::dotenv;

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod interface;
pub mod logger;
pub mod menu;
pub mod session;
pub mod transcript;
pub mod utils;

/// Run the application: load `.env`, load config, and start the REPL.
pub async fn run() -> Result<()> {
    // Load environment variables from .env
    dotenv().ok();

    let config = config::AppConfig::load();
    interface::start_repl(&config).await;

    Ok(())
}

// Re-exports for library consumers: common useful types
pub use api::{AnswerSource, QueryAnswer, SourceKind, WorkerClient};
pub use app::{ChatApp, PendingQuery, QueryOutcome, View};
pub use config::AppConfig;
pub use error::ClientError;
pub use menu::{MenuCategory, MenuItem};
pub use session::{Session, SessionStore};
pub use transcript::{ChatMessage, Role};
