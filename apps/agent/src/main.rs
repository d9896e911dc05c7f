mod config;
mod digest;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod scoring;
mod state;
mod store;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend};
use crate::digest::{DigestStage, SmtpSender};
use crate::extraction::{ExtractionStage, LlmExtractor};
use crate::llm_client::LlmClient;
use crate::models::UserProfile;
use crate::pipeline::Dispatcher;
use crate::routes::build_router;
use crate::scoring::{ScoringStage, WeightedFitScorer};
use crate::state::AppState;
use crate::store::{ChangeFeed, MemoryStore, PgStore, ProfileSource, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job agent v{}", env!("CARGO_PKG_VERSION"));

    let seed = match &config.profile_seed_path {
        Some(path) => Some(read_profile_seed(path, &config.profile_user_id)?),
        None => None,
    };

    // Initialize the record store; one backend serves all three seams
    let (store, feed, profiles): (
        Arc<dyn RecordStore>,
        Arc<dyn ChangeFeed>,
        Arc<dyn ProfileSource>,
    ) = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let pg = Arc::new(PgStore::connect(url).await?);
            if let Some(profile) = &seed {
                pg.upsert_profile(profile).await?;
            }
            (pg.clone(), pg.clone(), pg)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; records are lost on restart");
            let mem = Arc::new(MemoryStore::new());
            if let Some(profile) = seed.clone() {
                mem.insert_profile(profile).await;
            }
            (mem.clone(), mem.clone(), mem)
        }
    };
    if let Some(profile) = &seed {
        info!(user_id = %profile.user_id, "Profile seeded");
    }

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Pipeline stages
    let extraction = Arc::new(ExtractionStage::new(
        Arc::new(LlmExtractor::new(llm)),
        store.clone(),
    ));
    let scoring = Arc::new(ScoringStage::new(
        store.clone(),
        profiles,
        Arc::new(WeightedFitScorer::default()),
    ));
    let sender = SmtpSender::new(&config.smtp, &config.digest_sender)?;
    info!(smtp_enabled = sender.is_enabled(), "Digest mailer initialized");
    let digest = Arc::new(DigestStage::new(
        store.clone(),
        Arc::new(sender),
        config.digest_recipient.clone(),
    ));

    if config.feed_poll_interval_secs > 0 {
        let dispatcher = Dispatcher::new(
            feed,
            extraction.clone(),
            scoring.clone(),
            config.profile_user_id.clone(),
            config.feed_batch_size,
        );
        let interval = Duration::from_secs(config.feed_poll_interval_secs);
        tokio::spawn(async move { dispatcher.run(interval).await });
    } else {
        info!("Change feed dispatcher disabled; events arrive over HTTP only");
    }

    if config.digest_interval_secs > 0 {
        let digest = digest.clone();
        let interval = Duration::from_secs(config.digest_interval_secs);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = digest.run(Utc::now()).await {
                    error!(error = ?e, "Scheduled digest failed");
                }
            }
        });
    }

    // Build app state
    let state = AppState {
        store,
        extraction,
        scoring,
        digest,
        profile_user_id: config.profile_user_id.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Reads the startup profile seed. Its `user_id` must be the configured one.
fn read_profile_seed(path: &str, expected_user_id: &str) -> Result<UserProfile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile seed '{path}'"))?;
    let profile: UserProfile = serde_json::from_str(&raw)
        .with_context(|| format!("Profile seed '{path}' is not a valid profile"))?;
    if profile.user_id != expected_user_id {
        bail!(
            "Profile seed is for '{}' but PROFILE_USER_ID is '{expected_user_id}'",
            profile.user_id
        );
    }
    Ok(profile)
}
