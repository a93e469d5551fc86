mod api;
mod app;
mod auth;
mod config;
mod db;
mod domain;
mod error;
mod logging;
mod middleware;
mod routes;
mod services;
mod store;

use anyhow::{Context, Result};
use std::sync::Arc;

use config::StoreBackend;
use services::{AiClient, EmailClient, LogOnlySender, NotificationSender, RedisCache};
use store::{MemoryStore, PgStore, ServiceRequestStore, TechnicianStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = config::Settings::from_env()?;

    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        store = ?settings.store_backend,
        "Starting roadside assist backend"
    );

    // Store
    let (requests, technicians): (Arc<dyn ServiceRequestStore>, Arc<dyn TechnicianStore>) =
        match settings.store_backend {
            StoreBackend::Postgres => {
                let url = settings
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let pool = db::create_pool(url, settings.database_max_connections).await?;
                db::run_migrations(&pool).await?;
                let store = PgStore::new(pool);
                (Arc::new(store.clone()), Arc::new(store))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                let store = MemoryStore::with_demo_data();
                (Arc::new(store.clone()), Arc::new(store))
            }
        };

    // Redis is optional: without it recommendations are simply not cached
    let cache = match &settings.redis_url {
        Some(url) => match RedisCache::new(url, settings.redis_cache_ttl_seconds).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, continuing without cache");
                None
            }
        },
        None => None,
    };

    // AI client
    let ai_client = match &settings.ai_api_key {
        Some(key) => {
            let client = AiClient::new(
                &settings.ai_api_url,
                key,
                &settings.ai_model,
                settings.ai_timeout_seconds,
            )?;

            // Check AI service health without blocking startup
            tokio::spawn({
                let client = client.clone();
                async move {
                    match client.health_check().await {
                        Ok(()) => tracing::info!("AI service is healthy"),
                        Err(e) => tracing::warn!(error = %e, "AI service health check failed"),
                    }
                }
            });
            Some(client)
        }
        None => {
            tracing::info!("AI_API_KEY not set, recommendations disabled");
            None
        }
    };

    // Email
    let mailer: Arc<dyn NotificationSender> = match &settings.email_api_key {
        Some(key) => Arc::new(EmailClient::new(
            &settings.email_api_url,
            key,
            &settings.email_from,
        )?),
        None => {
            tracing::info!("EMAIL_API_KEY not set, emails are logged only");
            Arc::new(LogOnlySender)
        }
    };

    // JWKS cache for JWT verification
    let jwks_cache = auth::JwksCache::new(
        settings.supabase_jwt_jwks_url.clone(),
        settings.supabase_jwt_issuer.clone(),
        settings.supabase_jwt_audience.clone(),
        settings.jwks_cache_ttl_seconds,
    )?;

    if let Err(e) = jwks_cache.warm_cache().await {
        tracing::warn!(error = %e, "Failed to warm JWKS cache - will fetch on first request");
    }

    let state = app::AppState::new(
        settings.clone(),
        jwks_cache,
        app::Dependencies {
            requests,
            technicians,
            cache,
            ai_client,
            mailer,
        },
    );

    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
