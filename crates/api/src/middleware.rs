use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use orgdesk_auth::{JwtValidator, Principal};
use orgdesk_core::StoreError;
use orgdesk_orgs::resolve_active_organization;

use crate::app::errors::json_error;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Verify the bearer token, reload the user and resolve the active organization.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    Extension(services): Extension<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(t) => t,
        Err(status) => return json_error(status, "unauthorized", "missing bearer token"),
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "token rejected");
            return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid token");
        }
    };

    let user = match services.users.get(claims.sub).await {
        Ok(u) if u.is_active => u,
        Ok(_) | Err(StoreError::NotFound(_)) => {
            return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unknown or inactive user");
        }
        Err(e) => return crate::app::errors::store_error_response(e),
    };

    let organization =
        match resolve_active_organization(services.memberships.as_ref(), user.id, claims.organization_id).await {
            Ok(access) => access,
            Err(e) => return crate::app::errors::store_error_response(e),
        };

    let mut principal = Principal::new(user.id, user.roles());
    if let Some(access) = &organization {
        principal = principal.with_organization(access.organization.id, access.membership.role.as_role());
    }

    req.extensions_mut()
        .insert(PrincipalContext::new(principal, claims, organization));
    next.run(req).await
}

/// Refuse every protected route until first-run setup has completed.
pub async fn setup_gate(
    Extension(services): Extension<Arc<AppServices>>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match services.settings.load().await {
        Ok(settings) if settings.setup_complete => next.run(req).await,
        Ok(_) => json_error(
            StatusCode::CONFLICT,
            "setup_required",
            "complete the setup wizard first",
        ),
        Err(e) => crate::app::errors::store_error_response(e),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), Err(StatusCode::UNAUTHORIZED));

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), Err(StatusCode::UNAUTHORIZED));

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer  tok "));
        assert_eq!(extract_bearer(&headers), Ok("tok"));
    }
}
