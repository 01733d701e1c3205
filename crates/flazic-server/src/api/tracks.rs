use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::users::PublicUserResponse;
use super::{validate_url, PaginatedResponse};
use crate::auth::middleware::CurrentUser;
use crate::error::ApiError;
use crate::notify;
use flazic_db::entities::notification::NotificationKind;
use flazic_db::entities::track::AudioSource;
use flazic_db::entities::{like, track, user};
use flazic_db::AppState;

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// External link, or this server's audio endpoint for embedded tracks
    pub audio_url: Option<String>,
    pub has_embedded_audio: bool,
    pub duration_seconds: Option<i32>,
    pub genre: Option<String>,
    pub bpm: Option<i32>,
    pub is_public: bool,
    pub play_count: i64,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    pub updated_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<track::Model> for TrackResponse {
    fn from(t: track::Model) -> Self {
        let (audio_url, has_embedded_audio) = match t.audio_source() {
            Some(AudioSource::External(url)) => (Some(url), false),
            Some(AudioSource::Embedded { .. }) => {
                (Some(format!("/api/tracks/{}/audio", t.id)), true)
            }
            None => (None, false),
        };
        Self {
            id: t.id,
            user_id: t.user_id,
            title: t.title,
            description: t.description,
            audio_url,
            has_embedded_audio,
            duration_seconds: t.duration_seconds,
            genre: t.genre,
            bpm: t.bpm,
            is_public: t.is_public,
            play_count: t.play_count,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Whether `caller` may see this track
pub(super) fn visible_to(t: &track::Model, caller: Option<&user::Model>) -> bool {
    t.is_public || caller.is_some_and(|u| u.id == t.user_id)
}

/// Load a track the caller is allowed to see, or 404. Private tracks 404 for
/// everyone but their owner so their existence is not revealed.
pub(super) async fn find_visible_track(
    state: &AppState,
    id: Uuid,
    caller: Option<&user::Model>,
) -> Result<track::Model, ApiError> {
    let t = track::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Track not found"))?;

    if !visible_to(&t, caller) {
        return Err(ApiError::NotFound("Track not found"));
    }
    Ok(t)
}

async fn bump_play_count(state: &AppState, id: Uuid) -> Result<(), ApiError> {
    // Atomic SQL increment; concurrent plays never lose an update
    track::Entity::update_many()
        .col_expr(
            track::Column::PlayCount,
            Expr::col(track::Column::PlayCount).add(1),
        )
        .filter(track::Column::Id.eq(id))
        .exec(&state.db)
        .await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct TrackListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub genre: Option<String>,
    pub user_id: Option<Uuid>,
    /// Case-insensitive title substring
    pub search: Option<String>,
}

/// GET /api/tracks
pub async fn list_tracks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrackListParams>,
) -> Result<Json<PaginatedResponse<TrackResponse>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);

    let mut query = track::Entity::find().filter(track::Column::IsPublic.eq(true));
    if let Some(genre) = &params.genre {
        query = query.filter(track::Column::Genre.eq(genre));
    }
    if let Some(user_id) = params.user_id {
        query = query.filter(track::Column::UserId.eq(user_id));
    }
    if let Some(search) = &params.search {
        let escaped = search.replace('%', "\\%").replace('_', "\\_");
        query = query.filter(Expr::col(track::Column::Title).ilike(format!("%{escaped}%")));
    }

    let paginator = query
        .order_by_desc(track::Column::CreatedAt)
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await?;
    let tracks = paginator.fetch_page(page - 1).await?;

    Ok(Json(PaginatedResponse::new(
        tracks.into_iter().map(TrackResponse::from).collect(),
        total,
        page,
        per_page,
    )))
}

/// GET /api/tracks/{id}
pub async fn get_track(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackResponse>, ApiError> {
    let caller = caller.map(|Extension(CurrentUser(u))| u);
    let mut t = find_visible_track(&state, id, caller.as_ref()).await?;

    bump_play_count(&state, id).await?;
    t.play_count += 1;

    Ok(Json(TrackResponse::from(t)))
}

/// GET /api/tracks/{id}/audio
///
/// Serves embedded bytes only; externally hosted tracks 404 here.
pub async fn get_track_audio(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let caller = caller.map(|Extension(CurrentUser(u))| u);
    let t = find_visible_track(&state, id, caller.as_ref()).await?;

    let Some(AudioSource::Embedded {
        data,
        mimetype,
        filename,
    }) = t.audio_source()
    else {
        return Err(ApiError::NotFound("Track has no embedded audio"));
    };

    bump_play_count(&state, id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, mimetype),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{filename}\""),
            ),
        ],
        data,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct CreateTrackRequest {
    pub title: String,
    pub description: Option<String>,
    pub audio_url: String,
    pub duration_seconds: Option<i32>,
    pub genre: Option<String>,
    pub bpm: Option<i32>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

fn validate_track_fields(
    title: &str,
    duration_seconds: Option<i32>,
    bpm: Option<i32>,
) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("Title cannot be empty".to_string()));
    }
    if title.chars().count() > 200 {
        return Err(ApiError::Validation(
            "Title must be at most 200 characters".to_string(),
        ));
    }
    if duration_seconds.is_some_and(|d| d < 0) {
        return Err(ApiError::Validation(
            "duration_seconds must not be negative".to_string(),
        ));
    }
    if bpm.is_some_and(|b| !(1..=1000).contains(&b)) {
        return Err(ApiError::Validation(
            "bpm must be between 1 and 1000".to_string(),
        ));
    }
    Ok(())
}

async fn insert_track(
    state: &AppState,
    owner: Uuid,
    title: String,
    description: Option<String>,
    source: AudioSource,
    duration_seconds: Option<i32>,
    genre: Option<String>,
    bpm: Option<i32>,
    is_public: bool,
) -> Result<track::Model, ApiError> {
    let (audio_url, audio_data, audio_mimetype, audio_filename) = source.into_columns();
    let now = chrono::Utc::now().fixed_offset();

    let created = track::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner),
        title: Set(title),
        description: Set(description),
        audio_url: Set(audio_url),
        audio_data: Set(audio_data),
        audio_mimetype: Set(audio_mimetype),
        audio_filename: Set(audio_filename),
        duration_seconds: Set(duration_seconds),
        genre: Set(genre),
        bpm: Set(bpm),
        is_public: Set(is_public),
        play_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    Ok(created)
}

/// POST /api/tracks
pub async fn create_track(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Json(body): Json<CreateTrackRequest>,
) -> Result<(StatusCode, Json<TrackResponse>), ApiError> {
    validate_track_fields(&body.title, body.duration_seconds, body.bpm)?;
    validate_url("audio_url", &body.audio_url)?;

    let created = insert_track(
        &state,
        account.id,
        body.title,
        body.description,
        AudioSource::External(body.audio_url),
        body.duration_seconds,
        body.genre,
        body.bpm,
        body.is_public,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(TrackResponse::from(created))))
}

/// POST /api/tracks/upload-audio
///
/// Multipart form: a `file` part plus text parts mirroring
/// [`CreateTrackRequest`] minus `audio_url`.
pub async fn upload_audio(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<TrackResponse>), ApiError> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut genre: Option<String> = None;
    let mut bpm: Option<i32> = None;
    let mut duration_seconds: Option<i32> = None;
    let mut is_public = true;
    let mut file: Option<(Vec<u8>, String, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .unwrap_or("audio")
                    .to_string();
                let mimetype = field
                    .content_type()
                    .unwrap_or("audio/mpeg")
                    .to_string();
                if !mimetype.starts_with("audio/") {
                    return Err(ApiError::Validation(
                        "File must be an audio type".to_string(),
                    ));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read file: {e}")))?;
                if data.is_empty() {
                    return Err(ApiError::Validation("File is empty".to_string()));
                }
                file = Some((data.to_vec(), mimetype, filename));
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Malformed field: {e}")))?;
                match other {
                    "title" => title = Some(value),
                    "description" => description = Some(value),
                    "genre" => genre = Some(value),
                    "bpm" => {
                        bpm = Some(value.parse().map_err(|_| {
                            ApiError::Validation("bpm must be an integer".to_string())
                        })?)
                    }
                    "duration_seconds" => {
                        duration_seconds = Some(value.parse().map_err(|_| {
                            ApiError::Validation(
                                "duration_seconds must be an integer".to_string(),
                            )
                        })?)
                    }
                    "is_public" => {
                        is_public = value.parse().map_err(|_| {
                            ApiError::Validation("is_public must be true or false".to_string())
                        })?
                    }
                    _ => {}
                }
            }
        }
    }

    let title = title.ok_or_else(|| ApiError::Validation("Title is required".to_string()))?;
    validate_track_fields(&title, duration_seconds, bpm)?;
    let (data, mimetype, filename) =
        file.ok_or_else(|| ApiError::Validation("Audio file is required".to_string()))?;

    let created = insert_track(
        &state,
        account.id,
        title,
        description,
        AudioSource::Embedded {
            data,
            mimetype,
            filename,
        },
        duration_seconds,
        genre,
        bpm,
        is_public,
    )
    .await?;

    tracing::info!(track_id = %created.id, "audio uploaded");
    Ok((StatusCode::CREATED, Json(TrackResponse::from(created))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTrackRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub bpm: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub is_public: Option<bool>,
}

/// PUT /api/tracks/{id}
pub async fn update_track(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTrackRequest>,
) -> Result<Json<TrackResponse>, ApiError> {
    let t = track::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Track not found"))?;

    if t.user_id != account.id {
        return Err(ApiError::Forbidden("You do not own this track"));
    }

    if let Some(title) = &body.title {
        validate_track_fields(title, body.duration_seconds, body.bpm)?;
    } else {
        validate_track_fields(&t.title, body.duration_seconds, body.bpm)?;
    }

    let mut active: track::ActiveModel = t.into();
    if let Some(v) = body.title {
        active.title = Set(v);
    }
    if let Some(v) = body.description {
        active.description = Set(Some(v));
    }
    if let Some(v) = body.genre {
        active.genre = Set(Some(v));
    }
    if let Some(v) = body.bpm {
        active.bpm = Set(Some(v));
    }
    if let Some(v) = body.duration_seconds {
        active.duration_seconds = Set(Some(v));
    }
    if let Some(v) = body.is_public {
        active.is_public = Set(v);
    }
    active.updated_at = Set(chrono::Utc::now().fixed_offset());

    let updated = active.update(&state.db).await?;
    Ok(Json(TrackResponse::from(updated)))
}

/// DELETE /api/tracks/{id}
pub async fn delete_track(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let t = track::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Track not found"))?;

    if t.user_id != account.id {
        return Err(ApiError::Forbidden("You do not own this track"));
    }

    t.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct LikeToggleResponse {
    pub liked: bool,
    pub like_count: u64,
}

/// POST /api/tracks/{id}/like
///
/// Toggle. The like insert and the owner's notification commit together; a
/// concurrent duplicate like loses to the composite PK and maps to 409.
pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeToggleResponse>, ApiError> {
    let t = find_visible_track(&state, id, Some(&account)).await?;

    let txn = state.db.begin().await?;

    let existing = like::Entity::find_by_id((account.id, id)).one(&txn).await?;
    let liked = match existing {
        Some(row) => {
            row.delete(&txn).await?;
            false
        }
        None => {
            like::ActiveModel {
                user_id: Set(account.id),
                track_id: Set(id),
                created_at: Set(chrono::Utc::now().fixed_offset()),
            }
            .insert(&txn)
            .await?;

            notify::notify(&txn, t.user_id, account.id, NotificationKind::Like, Some(id))
                .await?;
            true
        }
    };

    txn.commit().await?;

    let like_count = like::Entity::find()
        .filter(like::Column::TrackId.eq(id))
        .count(&state.db)
        .await?;

    Ok(Json(LikeToggleResponse { liked, like_count }))
}

/// GET /api/tracks/{id}/likes
pub async fn get_track_likes(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PublicUserResponse>>, ApiError> {
    let caller = caller.map(|Extension(CurrentUser(u))| u);
    find_visible_track(&state, id, caller.as_ref()).await?;

    let likes = like::Entity::find()
        .filter(like::Column::TrackId.eq(id))
        .order_by_desc(like::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let ids: Vec<Uuid> = likes.iter().map(|l| l.user_id).collect();
    if ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(&state.db)
        .await?;

    Ok(Json(
        users.into_iter().map(PublicUserResponse::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_track(is_public: bool) -> track::Model {
        track::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Night Drive".into(),
            description: None,
            audio_url: Some("https://cdn.example.com/night-drive.mp3".into()),
            audio_data: None,
            audio_mimetype: None,
            audio_filename: None,
            duration_seconds: Some(215),
            genre: Some("synthwave".into()),
            bpm: Some(110),
            is_public,
            play_count: 7,
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
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
    fn test_visibility_public_track() {
        let t = make_track(true);
        assert!(visible_to(&t, None));
        assert!(visible_to(&t, Some(&make_user(Uuid::new_v4()))));
    }

    #[test]
    fn test_visibility_private_track() {
        let t = make_track(false);
        assert!(!visible_to(&t, None));
        assert!(!visible_to(&t, Some(&make_user(Uuid::new_v4()))));
        assert!(visible_to(&t, Some(&make_user(t.user_id))));
    }

    #[test]
    fn test_response_external_audio() {
        let t = make_track(true);
        let resp = TrackResponse::from(t);
        assert_eq!(
            resp.audio_url.as_deref(),
            Some("https://cdn.example.com/night-drive.mp3")
        );
        assert!(!resp.has_embedded_audio);
    }

    #[test]
    fn test_response_embedded_audio_points_at_endpoint() {
        let mut t = make_track(true);
        t.audio_url = None;
        t.audio_data = Some(vec![1, 2, 3]);
        t.audio_mimetype = Some("audio/ogg".into());
        t.audio_filename = Some("take1.ogg".into());
        let id = t.id;
        let resp = TrackResponse::from(t);
        assert_eq!(resp.audio_url, Some(format!("/api/tracks/{id}/audio")));
        assert!(resp.has_embedded_audio);
    }

    #[test]
    fn test_field_validation() {
        assert!(validate_track_fields("ok", None, None).is_ok());
        assert!(validate_track_fields("", None, None).is_err());
        assert!(validate_track_fields("   ", None, None).is_err());
        assert!(validate_track_fields(&"x".repeat(201), None, None).is_err());
        assert!(validate_track_fields("ok", Some(-1), None).is_err());
        assert!(validate_track_fields("ok", Some(0), None).is_ok());
        assert!(validate_track_fields("ok", None, Some(0)).is_err());
        assert!(validate_track_fields("ok", None, Some(1001)).is_err());
        assert!(validate_track_fields("ok", None, Some(128)).is_ok());
    }

    #[test]
    fn test_search_filter_is_case_insensitive() {
        use sea_orm::{DbBackend, QueryTrait};

        let sql = track::Entity::find()
            .filter(Expr::col(track::Column::Title).ilike("%night%"))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("ILIKE"));
    }

    #[test]
    fn test_create_request_defaults_public() {
        let body: CreateTrackRequest = serde_json::from_str(
            r#"{"title": "Demo", "audio_url": "https://example.com/demo.mp3"}"#,
        )
        .unwrap();
        assert!(body.is_public);
    }
}
