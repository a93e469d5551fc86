use anyhow::{bail, Context, Result};
use std::env;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Where service requests and technicians are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// In-process maps seeded with demo technicians; nothing survives a restart
    Memory,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // Store
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Redis (optional cache)
    pub redis_url: Option<String>,
    pub redis_cache_ttl_seconds: u64,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Supabase Auth
    pub supabase_jwt_jwks_url: String,
    pub supabase_jwt_issuer: String,
    pub supabase_jwt_audience: String,
    pub jwks_cache_ttl_seconds: u64,

    // AI API (recommendations are disabled without a key)
    pub ai_api_url: String,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_timeout_seconds: u64,

    // Email API (log-only without a key)
    pub email_api_url: String,
    pub email_api_key: Option<String>,
    pub email_from: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; `from_env` passes the process environment.
    pub fn from_source<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str, default: u64| -> Result<u64> {
            match var(key) {
                Some(v) => v
                    .parse()
                    .with_context(|| format!("{} must be a positive integer, got {:?}", key, v)),
                None => Ok(default),
            }
        };

        let env = Environment::from_str(&var("ENV").unwrap_or_else(|| "dev".to_string()));
        let server_addr = var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        // Store
        let store_backend = match var("STORE_BACKEND") {
            Some(v) => StoreBackend::parse(&v)
                .with_context(|| format!("STORE_BACKEND must be postgres or memory, got {:?}", v))?,
            None => StoreBackend::Postgres,
        };
        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND is postgres");
        }
        let database_max_connections = number("DATABASE_MAX_CONNECTIONS", 10)? as u32;

        // Redis
        let redis_url = var("REDIS_URL");
        if let Some(url) = &redis_url {
            validate_url("REDIS_URL", url)?;
        }
        let redis_cache_ttl_seconds = number("REDIS_CACHE_TTL_SECONDS", 3600)?; // 1 hour default

        // CORS
        let cors_allow_origins = var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Supabase Auth
        let supabase_jwt_jwks_url =
            var("SUPABASE_JWT_JWKS_URL").context("SUPABASE_JWT_JWKS_URL must be set")?;
        validate_url("SUPABASE_JWT_JWKS_URL", &supabase_jwt_jwks_url)?;
        let supabase_jwt_issuer =
            var("SUPABASE_JWT_ISSUER").context("SUPABASE_JWT_ISSUER must be set")?;
        let supabase_jwt_audience =
            var("SUPABASE_JWT_AUDIENCE").unwrap_or_else(|| "authenticated".to_string());
        let jwks_cache_ttl_seconds = number("JWKS_CACHE_TTL_SECONDS", 1800)?; // 30 minutes default

        // AI API
        let ai_api_url =
            var("AI_API_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        validate_url("AI_API_URL", &ai_api_url)?;
        let ai_api_key = var("AI_API_KEY");
        let ai_model = var("AI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
        let ai_timeout_seconds = number("AI_TIMEOUT_SECONDS", 30)?;

        // Email API
        let email_api_url =
            var("EMAIL_API_URL").unwrap_or_else(|| "https://api.resend.com/emails".to_string());
        validate_url("EMAIL_API_URL", &email_api_url)?;
        let email_api_key = var("EMAIL_API_KEY");
        let email_from =
            var("EMAIL_FROM").unwrap_or_else(|| "Roadside Assist <noreply@roadside.example>".to_string());

        Ok(Settings {
            env,
            server_addr,
            store_backend,
            database_url,
            database_max_connections,
            redis_url,
            redis_cache_ttl_seconds,
            cors_allow_origins,
            supabase_jwt_jwks_url,
            supabase_jwt_issuer,
            supabase_jwt_audience,
            jwks_cache_ttl_seconds,
            ai_api_url,
            ai_api_key,
            ai_model,
            ai_timeout_seconds,
            email_api_url,
            email_api_key,
            email_from,
        })
    }
}

fn validate_url(key: &str, value: &str) -> Result<()> {
    Url::parse(value).with_context(|| format!("{} is not a valid URL: {:?}", key, value))?;
    Ok(())
}
