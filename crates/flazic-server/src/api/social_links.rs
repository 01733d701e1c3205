use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::validate_url;
use crate::auth::middleware::CurrentUser;
use crate::error::ApiError;
use flazic_db::entities::social_link::{self, SocialPlatform};
use flazic_db::entities::user;
use flazic_db::AppState;

#[derive(Debug, Serialize)]
pub struct SocialLinkResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub platform: SocialPlatform,
    pub icon: &'static str,
    pub url: String,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<social_link::Model> for SocialLinkResponse {
    fn from(l: social_link::Model) -> Self {
        Self {
            id: l.id,
            user_id: l.user_id,
            icon: l.platform.icon(),
            platform: l.platform,
            url: l.url,
            created_at: l.created_at,
        }
    }
}

/// GET /api/social-links/user/{user_id}
pub async fn list_user_links(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<SocialLinkResponse>>, ApiError> {
    if user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("User not found"));
    }

    let links = social_link::Entity::find()
        .filter(social_link::Column::UserId.eq(user_id))
        .order_by_asc(social_link::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(
        links.into_iter().map(SocialLinkResponse::from).collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateSocialLinkRequest {
    /// Must be one of the known platforms; unknown values fail to parse
    pub platform: SocialPlatform,
    pub url: String,
}

/// POST /api/social-links
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Json(body): Json<CreateSocialLinkRequest>,
) -> Result<(StatusCode, Json<SocialLinkResponse>), ApiError> {
    validate_url("url", &body.url)?;

    let duplicate = social_link::Entity::find()
        .filter(social_link::Column::UserId.eq(account.id))
        .filter(social_link::Column::Platform.eq(body.platform))
        .one(&state.db)
        .await?;
    if duplicate.is_some() {
        return Err(ApiError::Conflict(format!(
            "A {} link already exists",
            body.platform.as_str()
        )));
    }

    let created = social_link::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(account.id),
        platform: Set(body.platform),
        url: Set(body.url),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(SocialLinkResponse::from(created))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSocialLinkRequest {
    pub url: String,
}

/// PUT /api/social-links/{id}
///
/// Only the URL is editable; changing platform means delete and recreate.
pub async fn update_link(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSocialLinkRequest>,
) -> Result<Json<SocialLinkResponse>, ApiError> {
    validate_url("url", &body.url)?;

    let l = social_link::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Social link not found"))?;

    if l.user_id != account.id {
        return Err(ApiError::Forbidden("You do not own this link"));
    }

    let mut active: social_link::ActiveModel = l.into();
    active.url = Set(body.url);
    let updated = active.update(&state.db).await?;

    Ok(Json(SocialLinkResponse::from(updated)))
}

/// DELETE /api/social-links/{id}
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let l = social_link::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Social link not found"))?;

    if l.user_id != account.id {
        return Err(ApiError::Forbidden("You do not own this link"));
    }

    l.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_unknown_platform_rejected() {
        let result: Result<CreateSocialLinkRequest, _> =
            serde_json::from_str(r#"{"platform": "myspace", "url": "https://x.example"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_known_platform_parses() {
        let body: CreateSocialLinkRequest = serde_json::from_str(
            r#"{"platform": "bandcamp", "url": "https://flazic.bandcamp.com"}"#,
        )
        .unwrap();
        assert_eq!(body.platform, SocialPlatform::Bandcamp);
    }

    #[test]
    fn test_response_carries_icon() {
        let l = social_link::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            platform: SocialPlatform::Spotify,
            url: "https://open.spotify.com/artist/x".into(),
            created_at: Utc::now().fixed_offset(),
        };
        let resp = SocialLinkResponse::from(l);
        assert_eq!(resp.icon, SocialPlatform::Spotify.icon());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["platform"], "spotify");
    }
}
