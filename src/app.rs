use axum::{http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::JwksCache;
use crate::config::Settings;
use crate::middleware::request_id_layer;
use crate::routes;
use crate::services::{
    AiClient, NotificationSender, RedisCache, ServiceRequestManager, TechnicianVerifier,
};
use crate::store::{ServiceRequestStore, TechnicianStore};

/// JSON bodies here are small; anything larger is rejected before parsing
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub jwks_cache: JwksCache,
    pub requests: Arc<dyn ServiceRequestStore>,
    pub technicians: Arc<dyn TechnicianStore>,
    pub manager: ServiceRequestManager,
    pub verifier: TechnicianVerifier,
    /// Absent when Redis is not configured or unreachable at startup
    pub cache: Option<RedisCache>,
    /// Absent when no AI API key is configured
    pub ai_client: Option<AiClient>,
    pub mailer: Arc<dyn NotificationSender>,
}

/// Store handles and external clients wired up by `main`
pub struct Dependencies {
    pub requests: Arc<dyn ServiceRequestStore>,
    pub technicians: Arc<dyn TechnicianStore>,
    pub cache: Option<RedisCache>,
    pub ai_client: Option<AiClient>,
    pub mailer: Arc<dyn NotificationSender>,
}

impl AppState {
    pub fn new(settings: Settings, jwks_cache: JwksCache, deps: Dependencies) -> Arc<Self> {
        let manager = ServiceRequestManager::new(deps.requests.clone());
        let verifier = TechnicianVerifier::new(deps.technicians.clone(), deps.mailer.clone());

        Arc::new(Self {
            settings,
            jwks_cache,
            requests: deps.requests,
            technicians: deps.technicians,
            manager,
            verifier,
            cache: deps.cache,
            ai_client: deps.ai_client,
            mailer: deps.mailer,
        })
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // Build trace layer (use DEBUG for spans to reduce overhead at INFO level)
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let (set_request_id, propagate_request_id) = request_id_layer();

    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Longer preflight cache in dev to cut down on OPTIONS requests
    let max_age = if settings.env.is_dev() {
        std::time::Duration::from_secs(86400)
    } else {
        std::time::Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static("x-request-id"),
        ]))
        .allow_credentials(true)
        .max_age(max_age)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{AppMetadata, Claims};
    use crate::auth::jwks::testing;
    use crate::services::LogOnlySender;
    use crate::store::MemoryStore;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    const ISSUER: &str = "http://127.0.0.1:9/auth/v1";

    fn test_app() -> Router {
        let settings = Settings::from_source(|key| {
            match key {
                "STORE_BACKEND" => Some("memory"),
                "SUPABASE_JWT_JWKS_URL" => Some("http://127.0.0.1:9/jwks.json"),
                "SUPABASE_JWT_ISSUER" => Some(ISSUER),
                _ => None,
            }
            .map(String::from)
        })
        .unwrap();

        let jwks = JwksCache::new(
            settings.supabase_jwt_jwks_url.clone(),
            settings.supabase_jwt_issuer.clone(),
            settings.supabase_jwt_audience.clone(),
            settings.jwks_cache_ttl_seconds,
        )
        .unwrap();
        testing::trust_local_key(&jwks);

        let store = MemoryStore::with_demo_data();
        let state = AppState::new(
            settings,
            jwks,
            Dependencies {
                requests: Arc::new(store.clone()),
                technicians: Arc::new(store),
                cache: None,
                ai_client: None,
                mailer: Arc::new(LogOnlySender),
            },
        );
        create_app(state)
    }

    fn bearer(user_id: Uuid, role: &str, email: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            aud: "authenticated".into(),
            iss: ISSUER.into(),
            iat: now,
            exp: now + 600,
            nbf: None,
            email: Some(email.into()),
            role: Some("authenticated".into()),
            app_metadata: Some(AppMetadata {
                provider: Some("email".into()),
                role: Some(role.into()),
            }),
            user_metadata: None,
        };
        format!("Bearer {}", testing::sign(&claims))
    }

    fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn submission_requires_a_token() {
        let response = test_app()
            .oneshot(
                Request::post("/service-requests")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"serviceType":"towing"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_authorization_is_rejected() {
        let response = test_app()
            .oneshot(
                Request::get("/service-requests")
                    .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_require_a_token() {
        let response = test_app()
            .oneshot(
                Request::get("/admin/technicians")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_refuse_customers() {
        let token = bearer(Uuid::new_v4(), "customer", "dana@example.com");
        let response = test_app()
            .oneshot(
                Request::get("/admin/technicians")
                    .header(header::AUTHORIZATION, token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn customer_submits_lists_and_closes_a_request() {
        let app = test_app();
        let user = Uuid::new_v4();
        let token = bearer(user, "customer", "dana@example.com");

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/service-requests",
                &token,
                json!({
                    "serviceType": "towing",
                    "location": { "address": "Exit 12, I-95", "lat": 40.71, "lng": -74.0 },
                    "status": "completed",
                    "technicianId": Uuid::new_v4()
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["data"]["status"], "pending");
        assert_eq!(created["data"]["user_id"], user.to_string());
        assert!(created["data"]["technician_id"].is_null());
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::get("/service-requests")
                    .header(header::AUTHORIZATION, &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);

        let status_uri = format!("/service-requests/{}/status", id);
        let response = app
            .clone()
            .oneshot(json_request("PATCH", &status_uri, &token, json!({ "status": "cancelled" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["status"], "cancelled");

        let response = app
            .oneshot(json_request("PATCH", &status_uri, &token, json!({ "status": "completed" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn strangers_get_forbidden_on_foreign_requests() {
        let app = test_app();
        let owner = bearer(Uuid::new_v4(), "customer", "dana@example.com");
        let stranger = bearer(Uuid::new_v4(), "customer", "sam@example.com");

        let response = app
            .clone()
            .oneshot(json_request("POST", "/service-requests", &owner, json!({ "serviceType": "lockout" })))
            .await
            .unwrap();
        let id = body_json(response).await["data"]["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(json_request(
                "PATCH",
                &format!("/service-requests/{}/status", id),
                &stranger,
                json!({ "status": "cancelled" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn email_proxy_only_reaches_the_callers_own_address() {
        let app = test_app();
        let customer = bearer(Uuid::new_v4(), "customer", "dana@example.com");
        let admin = bearer(Uuid::new_v4(), "admin", "ops@example.com");
        let to_someone_else = json!({
            "to": "victim@example.org",
            "subject": "Hello",
            "html": "<p>Hi</p>"
        });

        let response = app
            .clone()
            .oneshot(json_request("POST", "/notifications/email", &customer, to_someone_else.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/notifications/email",
                &customer,
                json!({ "to": "Dana@Example.com", "subject": "Receipt", "html": "<p>Thanks</p>" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["data"]["queued"], true);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/notifications/email", &admin, to_someone_else))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = app
            .oneshot(json_request(
                "POST",
                "/notifications/email",
                &admin,
                json!({ "to": "a@b.c@d.e", "subject": "Hi", "html": "<p>x</p>" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
