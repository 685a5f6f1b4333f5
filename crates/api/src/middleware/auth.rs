//! Authentication extractors.
//!
//! Identity arrives from the edge proxy as trusted `x-user-id` and
//! `x-user-role` headers; this service performs no credential checks of
//! its own. Endpoints that need a caller take [`AuthUser`] as an
//! extractor argument.

use axum::{extract::FromRequestParts, http::request::Parts};

use urban_fable_core::UserId;

use crate::error::ApiError;

/// Role attached to an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

/// Extractor that requires an authenticated caller.
///
/// Rejects with 401 when the identity headers are missing or malformed.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(user: AuthUser) -> impl IntoResponse {
///     format!("Hello, user {}!", user.id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: UserId,
    pub role: Role,
}

impl AuthUser {
    /// Returns true for admin callers.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Reject non-admin callers with 403.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` when the caller is not an admin.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin access required".to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i32>().ok())
            .map(UserId::new)
            .ok_or_else(|| ApiError::Unauthorized("missing user identity".to_string()))?;

        let role = match parts.headers.get("x-user-role").and_then(|v| v.to_str().ok()) {
            Some("admin") => Role::Admin,
            // Absent or unknown roles degrade to customer rather than 401;
            // the id header alone is enough to act as oneself.
            _ => Role::Customer,
        };

        Ok(Self { id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::FromRequestParts;
    use axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<AuthUser, ApiError> {
        let mut builder = Request::builder().uri("/v1/transactions");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(()).expect("request");
        let (mut parts, ()) = request.into_parts();
        AuthUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_customer_headers_accepted() {
        let user = extract(&[("x-user-id", "42")]).await.expect("auth");
        assert_eq!(user.id, UserId::new(42));
        assert_eq!(user.role, Role::Customer);
        assert!(user.require_admin().is_err());
    }

    #[tokio::test]
    async fn test_admin_role_recognized() {
        let user = extract(&[("x-user-id", "7"), ("x-user-role", "admin")])
            .await
            .expect("auth");
        assert!(user.is_admin());
        assert!(user.require_admin().is_ok());
    }

    #[tokio::test]
    async fn test_missing_id_rejected() {
        let result = extract(&[("x-user-role", "admin")]).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_malformed_id_rejected() {
        let result = extract(&[("x-user-id", "not-a-number")]).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_unknown_role_degrades_to_customer() {
        let user = extract(&[("x-user-id", "9"), ("x-user-role", "superuser")])
            .await
            .expect("auth");
        assert_eq!(user.role, Role::Customer);
    }
}
