//! JWKS cache for Supabase JWT verification

use anyhow::{Context, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Claims;

/// Minimum gap between two JWKS fetches
const REFETCH_COOLDOWN: Duration = Duration::from_secs(1);

/// JWKS response structure
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// Individual JWK key
#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[serde(default, rename = "use")]
    key_use: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

/// Cached key with fetch time
#[derive(Clone)]
struct CachedKey {
    key: DecodingKey,
    cached_at: Instant,
}

/// JWKS cache for validating Supabase JWTs
#[derive(Clone)]
pub struct JwksCache {
    inner: Arc<RwLock<JwksCacheInner>>,
    http: reqwest::Client,
    jwks_url: String,
    issuer: String,
    audience: String,
    ttl: Duration,
}

struct JwksCacheInner {
    keys: HashMap<String, CachedKey>,
    last_fetch: Option<Instant>,
}

impl JwksCache {
    pub fn new(
        jwks_url: String,
        issuer: String,
        audience: String,
        ttl_seconds: u64,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            inner: Arc::new(RwLock::new(JwksCacheInner {
                keys: HashMap::new(),
                last_fetch: None,
            })),
            http,
            jwks_url,
            issuer,
            audience,
            ttl: Duration::from_secs(ttl_seconds),
        })
    }

    /// Verify a JWT token and return the claims
    pub async fn verify_token(&self, token: &str) -> Result<Claims> {
        // Decode header to get kid
        let header = decode_header(token).context("Invalid JWT header")?;
        let kid = header.kid.context("JWT missing kid header")?;

        let decoding_key = self.get_or_fetch_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        let token_data =
            decode::<Claims>(token, &decoding_key, &validation).context("JWT validation failed")?;

        Ok(token_data.claims)
    }

    async fn get_or_fetch_key(&self, kid: &str) -> Result<DecodingKey> {
        {
            let cache = self.inner.read();
            if let Some(cached) = cache.keys.get(kid) {
                if cached.cached_at.elapsed() < self.ttl {
                    return Ok(cached.key.clone());
                }
            }
        }

        // Unknown kid or expired entry: the signing keys may have rotated
        self.refresh_keys().await?;

        let cache = self.inner.read();
        cache
            .keys
            .get(kid)
            .map(|c| c.key.clone())
            .context("Key not found in JWKS")
    }

    async fn refresh_keys(&self) -> Result<()> {
        {
            let cache = self.inner.read();
            if let Some(last) = cache.last_fetch {
                if last.elapsed() < REFETCH_COOLDOWN {
                    return Ok(());
                }
            }
        }

        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .context("Failed to fetch JWKS")?;

        if !response.status().is_success() {
            anyhow::bail!("JWKS fetch failed with status: {}", response.status());
        }

        let jwks: JwksResponse = response.json().await.context("Failed to parse JWKS")?;
        let fetched = signing_keys(jwks);

        let now = Instant::now();
        let mut cache = self.inner.write();
        cache.last_fetch = Some(now);
        cache.keys = fetched
            .into_iter()
            .map(|(kid, key)| (kid, CachedKey { key, cached_at: now }))
            .collect();

        tracing::info!(keys = cache.keys.len(), "JWKS cache refreshed");
        Ok(())
    }

    /// Pre-warm the cache by fetching keys
    pub async fn warm_cache(&self) -> Result<()> {
        self.refresh_keys().await
    }
}

/// RSA signature keys from a JWKS document; other keys are skipped.
fn signing_keys(jwks: JwksResponse) -> Vec<(String, DecodingKey)> {
    jwks.keys
        .into_iter()
        .filter(|jwk| jwk.kty == "RSA")
        .filter(|jwk| jwk.key_use.as_deref().map_or(true, |u| u == "sig"))
        .filter_map(|jwk| {
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                tracing::warn!(kid = %jwk.kid, "JWK missing RSA components");
                return None;
            };
            match DecodingKey::from_rsa_components(n, e) {
                Ok(key) => Some((jwk.kid, key)),
                Err(e) => {
                    tracing::warn!(kid = %jwk.kid, error = %e, "Failed to parse JWK");
                    None
                }
            }
        })
        .collect()
}

/// Locally signed tokens for router tests, verified without a JWKS endpoint
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const KID: &str = "local-test-key";
    const PRIVATE_PEM: &[u8] = include_bytes!("testdata/signing_key.pem");
    const PUBLIC_PEM: &[u8] = include_bytes!("testdata/signing_key.pub.pem");

    /// Seed the cache with the bundled public key under [`KID`]
    pub fn trust_local_key(cache: &JwksCache) {
        let key = DecodingKey::from_rsa_pem(PUBLIC_PEM).unwrap();
        let mut inner = cache.inner.write();
        inner.keys.insert(
            KID.to_string(),
            CachedKey {
                key,
                cached_at: Instant::now(),
            },
        );
        inner.last_fetch = Some(Instant::now());
    }

    pub fn sign(claims: &Claims) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(KID.to_string());
        encode(&header, claims, &EncodingKey::from_rsa_pem(PRIVATE_PEM).unwrap()).unwrap()
    }
}
