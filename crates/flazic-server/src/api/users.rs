use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{validate_url, PaginatedResponse, PaginationParams};
use crate::auth::middleware::CurrentUser;
use crate::error::ApiError;
use flazic_db::entities::{follow, track, user};
use flazic_db::AppState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub website_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            display_name: u.display_name,
            bio: u.bio,
            avatar_url: u.avatar_url,
            location: u.location,
            website_url: u.website_url,
            created_at: u.created_at,
        }
    }
}

/// Profile card shown to other users: no email.
#[derive(Debug, Serialize)]
pub struct PublicUserResponse {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub website_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<user::Model> for PublicUserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            display_name: u.display_name,
            bio: u.bio,
            avatar_url: u.avatar_url,
            location: u.location,
            website_url: u.website_url,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    pub track_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub total_plays: i64,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<PublicUserResponse>>, ApiError> {
    let (page, per_page) = params.clamp();

    let paginator = user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await?;
    let users = paginator.fetch_page(page - 1).await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(PublicUserResponse::from).collect(),
        total,
        page,
        per_page,
    )))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUserResponse>, ApiError> {
    let account = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(PublicUserResponse::from(account)))
}

/// GET /api/users/{id}/tracks
///
/// Public tracks only, unless the caller is the profile owner.
pub async fn get_user_tracks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    caller: Option<Extension<CurrentUser>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<super::tracks::TrackResponse>>, ApiError> {
    if user::Entity::find_by_id(id).one(&state.db).await?.is_none() {
        return Err(ApiError::NotFound("User not found"));
    }

    let (page, per_page) = params.clamp();
    let is_owner = caller.is_some_and(|Extension(CurrentUser(u))| u.id == id);

    let mut query = track::Entity::find().filter(track::Column::UserId.eq(id));
    if !is_owner {
        query = query.filter(track::Column::IsPublic.eq(true));
    }

    let paginator = query
        .order_by_desc(track::Column::CreatedAt)
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await?;
    let tracks = paginator.fetch_page(page - 1).await?;

    Ok(Json(PaginatedResponse::new(
        tracks
            .into_iter()
            .map(super::tracks::TrackResponse::from)
            .collect(),
        total,
        page,
        per_page,
    )))
}

/// Load the user rows on one side of a set of follow edges, newest edge first
pub(super) async fn load_follow_side(
    state: &AppState,
    edges: Vec<follow::Model>,
    pick_follower: bool,
) -> Result<Vec<PublicUserResponse>, ApiError> {
    let ids: Vec<Uuid> = edges
        .iter()
        .map(|e| if pick_follower { e.follower_id } else { e.following_id })
        .collect();

    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids.clone()))
        .all(&state.db)
        .await?;

    // Preserve edge order (newest first); is_in gives no ordering guarantee
    users.sort_by_key(|u| ids.iter().position(|id| *id == u.id));
    Ok(users.into_iter().map(PublicUserResponse::from).collect())
}

/// GET /api/users/{id}/followers
pub async fn get_user_followers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PublicUserResponse>>, ApiError> {
    if user::Entity::find_by_id(id).one(&state.db).await?.is_none() {
        return Err(ApiError::NotFound("User not found"));
    }

    let edges = follow::Entity::find()
        .filter(follow::Column::FollowingId.eq(id))
        .order_by_desc(follow::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(load_follow_side(&state, edges, true).await?))
}

/// GET /api/users/{id}/following
pub async fn get_user_following(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PublicUserResponse>>, ApiError> {
    if user::Entity::find_by_id(id).one(&state.db).await?.is_none() {
        return Err(ApiError::NotFound("User not found"));
    }

    let edges = follow::Entity::find()
        .filter(follow::Column::FollowerId.eq(id))
        .order_by_desc(follow::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(load_follow_side(&state, edges, false).await?))
}

/// GET /api/users/{id}/stats
pub async fn get_user_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserStatsResponse>, ApiError> {
    if user::Entity::find_by_id(id).one(&state.db).await?.is_none() {
        return Err(ApiError::NotFound("User not found"));
    }

    let track_count = track::Entity::find()
        .filter(track::Column::UserId.eq(id))
        .filter(track::Column::IsPublic.eq(true))
        .count(&state.db)
        .await?;

    let follower_count = follow::Entity::find()
        .filter(follow::Column::FollowingId.eq(id))
        .count(&state.db)
        .await?;

    let following_count = follow::Entity::find()
        .filter(follow::Column::FollowerId.eq(id))
        .count(&state.db)
        .await?;

    #[derive(Debug, sea_orm::FromQueryResult)]
    struct PlaySum {
        total_plays: Option<i64>,
    }

    let total_plays = track::Entity::find()
        .select_only()
        .column_as(track::Column::PlayCount.sum(), "total_plays")
        .filter(track::Column::UserId.eq(id))
        .filter(track::Column::IsPublic.eq(true))
        .into_model::<PlaySum>()
        .one(&state.db)
        .await?
        .and_then(|row| row.total_plays)
        .unwrap_or(0);

    Ok(Json(UserStatsResponse {
        track_count,
        follower_count,
        following_count,
        total_plays,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub website_url: Option<String>,
}

/// PUT /api/users/profile
///
/// Typed partial update: absent fields are left untouched. Only these five
/// fields are editable; username, email and password never change here.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if let Some(url) = &body.avatar_url {
        validate_url("avatar_url", url)?;
    }
    if let Some(url) = &body.website_url {
        validate_url("website_url", url)?;
    }

    let mut active: user::ActiveModel = account.into();
    if let Some(v) = body.display_name {
        active.display_name = Set(Some(v));
    }
    if let Some(v) = body.bio {
        active.bio = Set(Some(v));
    }
    if let Some(v) = body.avatar_url {
        active.avatar_url = Set(Some(v));
    }
    if let Some(v) = body.location {
        active.location = Set(Some(v));
    }
    if let Some(v) = body.website_url {
        active.website_url = Set(Some(v));
    }
    active.updated_at = Set(chrono::Utc::now().fixed_offset());

    let updated = active.update(&state.db).await?;
    Ok(Json(UserResponse::from(updated)))
}

/// DELETE /api/users/{id}
///
/// Self-deletion only. The FK cascade removes everything the account owns.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if account.id != id {
        return Err(ApiError::Forbidden("You can only delete your own account"));
    }

    tracing::info!(username = %account.username, "account deleted");
    account.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_user() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "hashed".into(),
            display_name: Some("Alice".into()),
            bio: Some("producer".into()),
            avatar_url: None,
            location: Some("Berlin".into()),
            website_url: None,
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_public_response_omits_email() {
        let json = serde_json::to_value(PublicUserResponse::from(make_user())).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn test_own_response_includes_email() {
        let json = serde_json::to_value(UserResponse::from(make_user())).unwrap();
        assert_eq!(json["email"], "alice@example.com");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_update_request_partial_fields() {
        let body: UpdateProfileRequest =
            serde_json::from_str(r#"{"bio": "new bio"}"#).unwrap();
        assert_eq!(body.bio.as_deref(), Some("new bio"));
        assert!(body.display_name.is_none());
        assert!(body.avatar_url.is_none());
    }
}
