use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::EntityTrait;
use serde_json::json;
use std::sync::Arc;

use super::jwt::{parse_algorithm, validate_token};
use flazic_db::{entities::user, AppState};

/// Extension type giving handlers the authenticated user's row.
///
/// The row is loaded once here so handlers never re-fetch the caller, and so
/// a token for a deleted account is rejected at the door.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub user::Model);

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}

/// Middleware: require a valid access token and a live user row
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Missing or invalid Authorization header" })),
            )
                .into_response();
        }
    };

    let algorithm = parse_algorithm(&state.jwt_algorithm);
    let claims = match validate_token(token, &state.jwt_secret, algorithm) {
        Ok(claims) => claims,
        Err(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid or expired token" })),
            )
                .into_response();
        }
    };

    match user::Entity::find_by_id(claims.sub).one(&state.db).await {
        Ok(Some(account)) => {
            request.extensions_mut().insert(CurrentUser(account));
            next.run(request).await
        }
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid or expired token" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("auth lookup failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

/// Middleware: attach the caller if a valid token is present, but never
/// reject. Public read endpoints use this so owners can see their own
/// private rows while anonymous callers see only public ones.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&request) {
        let algorithm = parse_algorithm(&state.jwt_algorithm);
        if let Ok(claims) = validate_token(token, &state.jwt_secret, algorithm) {
            if let Ok(Some(account)) = user::Entity::find_by_id(claims.sub).one(&state.db).await {
                request.extensions_mut().insert(CurrentUser(account));
            }
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware as axum_mw,
        routing::get,
        Router,
    };
    use jsonwebtoken::Algorithm;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            db: sea_orm::DatabaseConnection::Disconnected,
            jwt_secret: "test-middleware-secret".to_string(),
            jwt_algorithm: "HS256".to_string(),
            token_ttl_minutes: 60,
        })
    }

    async fn ok_handler() -> &'static str {
        "OK"
    }

    fn auth_app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/protected", get(ok_handler))
            .layer(axum_mw::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    fn optional_app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/open", get(ok_handler))
            .layer(axum_mw::from_fn_with_state(state.clone(), optional_auth))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_require_auth_no_header() {
        let app = auth_app(test_state());

        let req = HttpRequest::builder()
            .uri("/protected")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_invalid_token() {
        let app = auth_app(test_state());

        let req = HttpRequest::builder()
            .uri("/protected")
            .header("Authorization", "Bearer invalid-token")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_no_bearer_prefix() {
        let app = auth_app(test_state());

        let req = HttpRequest::builder()
            .uri("/protected")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_wrong_secret() {
        let state = test_state();
        let app = auth_app(state);

        let token = issue_token(uuid::Uuid::new_v4(), "wrong-secret", Algorithm::HS256, 60)
            .unwrap();

        let req = HttpRequest::builder()
            .uri("/protected")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_expired_token() {
        // Expired well past the 60s validation leeway; rejected before any
        // user lookup happens
        let state = test_state();
        let app = auth_app(state.clone());

        let token = issue_token(
            uuid::Uuid::new_v4(),
            &state.jwt_secret,
            Algorithm::HS256,
            -2,
        )
        .unwrap();

        let req = HttpRequest::builder()
            .uri("/protected")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_optional_auth_no_header_passes() {
        let app = optional_app(test_state());

        let req = HttpRequest::builder()
            .uri("/open")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_optional_auth_bad_token_passes() {
        let app = optional_app(test_state());

        let req = HttpRequest::builder()
            .uri("/open")
            .header("Authorization", "Bearer garbage")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_optional_auth_expired_token_passes() {
        // An expired token fails validation before any lookup; the request
        // continues anonymously instead of erroring
        let state = test_state();
        let app = optional_app(state.clone());

        let token = issue_token(
            uuid::Uuid::new_v4(),
            &state.jwt_secret,
            Algorithm::HS256,
            -2,
        )
        .unwrap();

        let req = HttpRequest::builder()
            .uri("/open")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
