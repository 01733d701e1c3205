use axum::{extract::State, http::StatusCode, Extension, Json};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::jwt::{issue_token, parse_algorithm};
use super::middleware::CurrentUser;
use super::password::{hash_password, verify_password};
use crate::api::users::UserResponse;
use crate::error::ApiError;
use flazic_db::entities::user;
use flazic_db::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email address
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until the token expires
    pub expires_in: i64,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(ApiError::Validation(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    if username.contains('@') || username.contains('/') || username.contains(' ') {
        return Err(ApiError::Validation(
            "Username cannot contain @, / or spaces".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let well_formed = email.len() <= 254
        && email.contains('@')
        && !email.starts_with('@')
        && !email.ends_with('@')
        && email
            .split('@')
            .nth(1)
            .is_some_and(|domain| domain.contains('.'));
    if well_formed {
        Ok(())
    } else {
        Err(ApiError::Validation("Invalid email address".to_string()))
    }
}

fn auth_response(state: &AppState, account: user::Model) -> Result<AuthResponse, ApiError> {
    let algorithm = parse_algorithm(&state.jwt_algorithm);
    let token = issue_token(
        account.id,
        &state.jwt_secret,
        algorithm,
        state.token_ttl_minutes,
    )
    .map_err(|e| {
        tracing::error!("token error: {e}");
        ApiError::Internal
    })?;

    Ok(AuthResponse {
        user: UserResponse::from(account),
        access_token: token,
        token_type: "bearer",
        expires_in: state.token_ttl_minutes * 60,
    })
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    validate_username(&body.username)?;
    validate_email(&body.email)?;

    if body.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    if body.password != body.password_confirm {
        return Err(ApiError::Validation("Passwords do not match".to_string()));
    }

    // Single lowercase chokepoint; lookups below compare against this form
    let email = body.email.to_lowercase();

    let existing = user::Entity::find()
        .filter(
            user::Column::Username
                .eq(&body.username)
                .or(user::Column::Email.eq(&email)),
        )
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(ApiError::Conflict(
            "Username or email already taken".to_string(),
        ));
    }

    let password_hash = hash_password(&body.password).map_err(|e| {
        tracing::error!("hash error: {e}");
        ApiError::Internal
    })?;

    let now = chrono::Utc::now().fixed_offset();
    let new_user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(body.username.clone()),
        email: Set(email),
        password_hash: Set(password_hash),
        display_name: Set(body.display_name.clone()),
        bio: Set(None),
        avatar_url: Set(None),
        location: Set(None),
        website_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    // The unique indexes still back us up if two registrations race past the
    // pre-check; From<DbErr> turns that into a 409.
    let created = new_user.insert(&state.db).await?;

    tracing::info!(username = %created.username, "user registered");
    Ok((StatusCode::CREATED, Json(auth_response(&state, created)?)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let found = user::Entity::find()
        .filter(
            user::Column::Username
                .eq(&body.identifier)
                .or(user::Column::Email.eq(body.identifier.to_lowercase())),
        )
        .one(&state.db)
        .await?;

    // Same message whether the account is missing or the password is wrong
    let account = found.ok_or(ApiError::Unauthenticated("Invalid credentials"))?;

    if !verify_password(&body.password, &account.password_hash) {
        return Err(ApiError::Unauthenticated("Invalid credentials"));
    }

    Ok(Json(auth_response(&state, account)?))
}

/// GET /api/auth/me
pub async fn me(Extension(CurrentUser(account)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse::from(account))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_length_bounds() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username(&"a".repeat(50)).is_ok());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_username_forbidden_characters() {
        assert!(validate_username("user@host").is_err());
        assert!(validate_username("user/name").is_err());
        assert!(validate_username("user name").is_err());
        assert!(validate_username("user_name-ok.1").is_ok());
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("alice@nodot").is_err());
        assert!(validate_email(&format!("{}@example.com", "a".repeat(250))).is_err());
    }

    #[test]
    fn test_register_request_deserializes() {
        let body: RegisterRequest = serde_json::from_str(
            r#"{
                "username": "alice",
                "email": "Alice@Example.com",
                "password": "secret1",
                "password_confirm": "secret1"
            }"#,
        )
        .unwrap();
        assert_eq!(body.username, "alice");
        assert!(body.display_name.is_none());
    }

    #[test]
    fn test_login_request_accepts_email_identifier() {
        let body: LoginRequest =
            serde_json::from_str(r#"{"identifier": "alice@example.com", "password": "x"}"#)
                .unwrap();
        assert_eq!(body.identifier, "alice@example.com");
    }

    #[test]
    fn test_auth_response_shape() {
        let account = user::Model {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "hash".into(),
            display_name: None,
            bio: None,
            avatar_url: None,
            location: None,
            website_url: None,
            created_at: chrono::Utc::now().fixed_offset(),
            updated_at: chrono::Utc::now().fixed_offset(),
        };
        let state = AppState {
            db: sea_orm::DatabaseConnection::Disconnected,
            jwt_secret: "secret".into(),
            jwt_algorithm: "HS256".into(),
            token_ttl_minutes: 30,
        };

        let resp = auth_response(&state, account).unwrap();
        assert_eq!(resp.token_type, "bearer");
        assert_eq!(resp.expires_in, 1800);

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["access_token"].is_string());
        assert!(json["user"].get("password_hash").is_none());
        assert!(json["user"].get("email").is_some());
    }
}
