use super::Claims;
use crate::domain::{Actor, UserRole};
use uuid::Uuid;

/// Authenticated user context extracted from JWT
/// This is attached to request extensions after successful auth
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID (from JWT sub claim)
    pub user_id: Uuid,

    /// User email if available
    pub email: Option<String>,

    /// Account role, customer unless the token says otherwise
    pub role: UserRole,

    /// Token issuer
    pub issuer: String,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;
        if user_id.is_nil() {
            return Err("Invalid user ID in token");
        }

        Ok(Self {
            user_id,
            email: claims.email.clone(),
            role: role_from_claims(claims),
            issuer: claims.iss.clone(),
        })
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// `app_metadata.role` first (server-controlled), then `user_metadata.role`.
/// `user_metadata` is user-writable, so it can never grant admin.
fn role_from_claims(claims: &Claims) -> UserRole {
    let from_app = claims
        .app_metadata
        .as_ref()
        .and_then(|m| m.role.as_deref())
        .and_then(UserRole::parse);
    if let Some(role) = from_app {
        return role;
    }

    claims
        .user_metadata
        .as_ref()
        .and_then(|m| m.get("role"))
        .and_then(|r| r.as_str())
        .and_then(UserRole::parse)
        .filter(|r| *r != UserRole::Admin)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::AppMetadata;
    use serde_json::json;

    fn claims(app_role: Option<&str>, user_metadata: Option<serde_json::Value>) -> Claims {
        Claims {
            sub: "6f1c2a8e-3b4d-4c5e-9f60-718293a4b5c6".into(),
            aud: "authenticated".into(),
            iss: "https://demo.supabase.co/auth/v1".into(),
            iat: 0,
            exp: 0,
            nbf: None,
            email: Some("dana@example.com".into()),
            role: Some("authenticated".into()),
            app_metadata: Some(AppMetadata {
                provider: Some("email".into()),
                role: app_role.map(String::from),
            }),
            user_metadata,
        }
    }

    #[test]
    fn app_metadata_role_wins() {
        let ctx = AuthContext::from_claims(&claims(
            Some("admin"),
            Some(json!({ "role": "technician" })),
        ))
        .unwrap();
        assert_eq!(ctx.role, UserRole::Admin);
        assert!(ctx.actor().is_admin());
    }

    #[test]
    fn user_metadata_role_is_a_fallback() {
        let ctx =
            AuthContext::from_claims(&claims(None, Some(json!({ "role": "technician" })))).unwrap();
        assert_eq!(ctx.role, UserRole::Technician);
    }

    #[test]
    fn user_metadata_cannot_grant_admin() {
        let ctx = AuthContext::from_claims(&claims(None, Some(json!({ "role": "admin" })))).unwrap();
        assert_eq!(ctx.role, UserRole::Customer);
    }

    #[test]
    fn nil_or_malformed_subject_is_rejected() {
        let mut c = claims(None, None);
        c.sub = Uuid::nil().to_string();
        assert!(AuthContext::from_claims(&c).is_err());
        c.sub = "not-a-uuid".into();
        assert!(AuthContext::from_claims(&c).is_err());
    }
}
