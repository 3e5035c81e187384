//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging when you only want the REST server
//! (with OpenAPI/Swagger UI). The workspace's main `clinia-run` binary is the
//! deployment entry point.

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{ensure_bootstrap_admin, router, AppState};
use clinia_core::scheduling::CanonicalSlots;
use clinia_core::scope::ScopePolicy;
use clinia_core::store::MemoryStore;
use clinia_core::CoreConfig;

/// Main entry point for the clinia REST API server
///
/// Starts the REST API server on the configured address (default:
/// 0.0.0.0:3000) and bootstraps an administrator profile so a fresh
/// deployment can sign in.
///
/// # Environment Variables
/// - `CLINIA_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `CLINIA_ATTACHMENT_DIR`: Attachment storage directory (default: "attachments")
/// - `CLINIA_URL_SIGNING_SECRET`: Secret for signed attachment URLs (required)
/// - `CLINIA_ADMINS_MAY_CANCEL`: "1" lets administrators cancel appointments
/// - `CLINIA_ADMIN_IDENTITY`: Bootstrap administrator identity (default: "admin")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the signing secret is missing or too short,
/// - the attachment directory cannot be prepared, or
/// - the server address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CLINIA_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let attachment_dir = std::env::var("CLINIA_ATTACHMENT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("attachments"));
    let secret = std::env::var("CLINIA_URL_SIGNING_SECRET")
        .map_err(|_| anyhow::anyhow!("CLINIA_URL_SIGNING_SECRET is not set"))?;
    let admins_may_cancel = std::env::var("CLINIA_ADMINS_MAY_CANCEL")
        .map(|v| v == "1")
        .unwrap_or(false);
    let admin_identity =
        std::env::var("CLINIA_ADMIN_IDENTITY").unwrap_or_else(|_| "admin".into());

    tracing::info!("-- Starting clinia REST API on {}", addr);

    let cfg = Arc::new(CoreConfig::new(
        attachment_dir,
        secret,
        CanonicalSlots::default(),
        ScopePolicy { admins_may_cancel },
    )?);

    let store = Arc::new(MemoryStore::new());
    ensure_bootstrap_admin(&store, &admin_identity).await?;

    let state = AppState::new(cfg, store)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
