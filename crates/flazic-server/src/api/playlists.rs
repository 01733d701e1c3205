use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::tracks::{find_visible_track, TrackResponse};
use super::{validate_url, PaginatedResponse, PaginationParams};
use crate::auth::middleware::CurrentUser;
use crate::error::ApiError;
use flazic_db::entities::{playlist, playlist_track, track, user};
use flazic_db::AppState;

#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub cover_image_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    pub track_count: u64,
}

impl PlaylistResponse {
    fn build(p: playlist::Model, track_count: u64) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            title: p.title,
            description: p.description,
            is_public: p.is_public,
            cover_image_url: p.cover_image_url,
            created_at: p.created_at,
            track_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlaylistDetailResponse {
    #[serde(flatten)]
    pub playlist: PlaylistResponse,
    /// Tracks in playlist order
    pub tracks: Vec<TrackResponse>,
}

fn visible_to(p: &playlist::Model, caller: Option<&user::Model>) -> bool {
    p.is_public || caller.is_some_and(|u| u.id == p.user_id)
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("Title cannot be empty".to_string()));
    }
    if title.chars().count() > 200 {
        return Err(ApiError::Validation(
            "Title must be at most 200 characters".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/playlists
///
/// Public playlists, plus the caller's own private ones.
pub async fn list_playlists(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<CurrentUser>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<PlaylistResponse>>, ApiError> {
    let (page, per_page) = params.clamp();

    let mut visibility = Condition::any().add(playlist::Column::IsPublic.eq(true));
    if let Some(Extension(CurrentUser(u))) = &caller {
        visibility = visibility.add(playlist::Column::UserId.eq(u.id));
    }

    let paginator = playlist::Entity::find()
        .filter(visibility)
        .order_by_desc(playlist::Column::CreatedAt)
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await?;
    let playlists = paginator.fetch_page(page - 1).await?;

    let mut data = Vec::with_capacity(playlists.len());
    for p in playlists {
        let track_count = playlist_track::Entity::find()
            .filter(playlist_track::Column::PlaylistId.eq(p.id))
            .count(&state.db)
            .await?;
        data.push(PlaylistResponse::build(p, track_count));
    }

    Ok(Json(PaginatedResponse::new(data, total, page, per_page)))
}

async fn find_visible_playlist(
    state: &AppState,
    id: Uuid,
    caller: Option<&user::Model>,
) -> Result<playlist::Model, ApiError> {
    let p = playlist::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Playlist not found"))?;

    if !visible_to(&p, caller) {
        return Err(ApiError::NotFound("Playlist not found"));
    }
    Ok(p)
}

/// GET /api/playlists/{id}
pub async fn get_playlist(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlaylistDetailResponse>, ApiError> {
    let caller = caller.map(|Extension(CurrentUser(u))| u);
    let p = find_visible_playlist(&state, id, caller.as_ref()).await?;

    let entries = playlist_track::Entity::find()
        .filter(playlist_track::Column::PlaylistId.eq(id))
        .order_by_asc(playlist_track::Column::Position)
        .all(&state.db)
        .await?;

    let track_ids: Vec<Uuid> = entries.iter().map(|e| e.track_id).collect();
    let mut tracks = if track_ids.is_empty() {
        Vec::new()
    } else {
        track::Entity::find()
            .filter(track::Column::Id.is_in(track_ids.clone()))
            .all(&state.db)
            .await?
    };
    tracks.sort_by_key(|t| track_ids.iter().position(|id| *id == t.id));

    // Private tracks stay listed for the playlist owner only
    let tracks: Vec<TrackResponse> = tracks
        .into_iter()
        .filter(|t| super::tracks::visible_to(t, caller.as_ref()))
        .map(TrackResponse::from)
        .collect();

    let track_count = entries.len() as u64;
    Ok(Json(PlaylistDetailResponse {
        playlist: PlaylistResponse::build(p, track_count),
        tracks,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    pub cover_image_url: Option<String>,
}

fn default_public() -> bool {
    true
}

/// POST /api/playlists
pub async fn create_playlist(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Json(body): Json<CreatePlaylistRequest>,
) -> Result<(StatusCode, Json<PlaylistResponse>), ApiError> {
    validate_title(&body.title)?;
    if let Some(url) = &body.cover_image_url {
        validate_url("cover_image_url", url)?;
    }

    let created = playlist::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(account.id),
        title: Set(body.title),
        description: Set(body.description),
        is_public: Set(body.is_public),
        cover_image_url: Set(body.cover_image_url),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(PlaylistResponse::build(created, 0)),
    ))
}

async fn find_owned_playlist(
    state: &AppState,
    account: &user::Model,
    id: Uuid,
) -> Result<playlist::Model, ApiError> {
    let p = playlist::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Playlist not found"))?;

    if p.user_id != account.id {
        return Err(ApiError::Forbidden("You do not own this playlist"));
    }
    Ok(p)
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlaylistRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub cover_image_url: Option<String>,
}

/// PUT /api/playlists/{id}
pub async fn update_playlist(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePlaylistRequest>,
) -> Result<Json<PlaylistResponse>, ApiError> {
    if let Some(title) = &body.title {
        validate_title(title)?;
    }
    if let Some(url) = &body.cover_image_url {
        validate_url("cover_image_url", url)?;
    }

    let p = find_owned_playlist(&state, &account, id).await?;

    let mut active: playlist::ActiveModel = p.into();
    if let Some(v) = body.title {
        active.title = Set(v);
    }
    if let Some(v) = body.description {
        active.description = Set(Some(v));
    }
    if let Some(v) = body.is_public {
        active.is_public = Set(v);
    }
    if let Some(v) = body.cover_image_url {
        active.cover_image_url = Set(Some(v));
    }
    let updated = active.update(&state.db).await?;

    let track_count = playlist_track::Entity::find()
        .filter(playlist_track::Column::PlaylistId.eq(id))
        .count(&state.db)
        .await?;

    Ok(Json(PlaylistResponse::build(updated, track_count)))
}

/// DELETE /api/playlists/{id}
pub async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let p = find_owned_playlist(&state, &account, id).await?;
    p.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AddTrackRequest {
    pub track_id: Uuid,
    /// Appends to the end when omitted
    pub position: Option<i32>,
}

/// POST /api/playlists/{id}/tracks
///
/// Both uniqueness rules (one entry per track, one track per position) are
/// backed by constraints; a racing duplicate insert maps to 409.
pub async fn add_track(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddTrackRequest>,
) -> Result<StatusCode, ApiError> {
    if body.position.is_some_and(|p| p < 0) {
        return Err(ApiError::Validation(
            "position must not be negative".to_string(),
        ));
    }

    find_owned_playlist(&state, &account, id).await?;
    find_visible_track(&state, body.track_id, Some(&account)).await?;

    let txn = state.db.begin().await?;

    let duplicate = playlist_track::Entity::find_by_id((id, body.track_id))
        .one(&txn)
        .await?;
    if duplicate.is_some() {
        return Err(ApiError::Conflict(
            "Track is already in this playlist".to_string(),
        ));
    }

    let position = match body.position {
        Some(p) => p,
        None => {
            let max: Option<i32> = playlist_track::Entity::find()
                .filter(playlist_track::Column::PlaylistId.eq(id))
                .select_only()
                .column_as(playlist_track::Column::Position.max(), "max_position")
                .into_tuple()
                .one(&txn)
                .await?
                .flatten();
            max.map_or(0, |m| m + 1)
        }
    };

    playlist_track::ActiveModel {
        playlist_id: Set(id),
        track_id: Set(body.track_id),
        position: Set(position),
        added_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(StatusCode::CREATED)
}

/// DELETE /api/playlists/{id}/tracks/{track_id}
pub async fn remove_track(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path((id, track_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    find_owned_playlist(&state, &account, id).await?;

    let entry = playlist_track::Entity::find_by_id((id, track_id))
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Track is not in this playlist"))?;

    entry.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_playlist(is_public: bool) -> playlist::Model {
        playlist::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Late Night".into(),
            description: None,
            is_public,
            cover_image_url: None,
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn make_user(id: Uuid) -> user::Model {
        user::Model {
            id,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "hashed".into(),
            display_name: None,
            bio: None,
            avatar_url: None,
            location: None,
            website_url: None,
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_visibility() {
        let p = make_playlist(false);
        assert!(!visible_to(&p, None));
        assert!(!visible_to(&p, Some(&make_user(Uuid::new_v4()))));
        assert!(visible_to(&p, Some(&make_user(p.user_id))));
        assert!(visible_to(&make_playlist(true), None));
    }

    #[test]
    fn test_title_validation() {
        assert!(validate_title("Mix").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("  ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_detail_response_flattens_playlist() {
        let detail = PlaylistDetailResponse {
            playlist: PlaylistResponse::build(make_playlist(true), 2),
            tracks: Vec::new(),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["title"], "Late Night");
        assert_eq!(json["track_count"], 2);
        assert!(json["tracks"].is_array());
    }

    #[test]
    fn test_add_track_request_position_optional() {
        let body: AddTrackRequest = serde_json::from_str(&format!(
            r#"{{"track_id": "{}"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(body.position.is_none());
    }
}
