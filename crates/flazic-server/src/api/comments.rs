use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::tracks::find_visible_track;
use super::users::PublicUserResponse;
use crate::auth::middleware::CurrentUser;
use crate::error::ApiError;
use crate::notify;
use flazic_db::entities::notification::NotificationKind;
use flazic_db::entities::{comment, track, user};
use flazic_db::AppState;

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub track_id: Uuid,
    pub user_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    pub timestamp_seconds: Option<i32>,
    /// `m:ss` rendering of `timestamp_seconds`
    pub timestamp_formatted: Option<String>,
    pub is_reply: bool,
    pub reply_count: u64,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<PublicUserResponse>,
}

impl CommentResponse {
    fn build(c: comment::Model, reply_count: u64, author: Option<user::Model>) -> Self {
        Self {
            id: c.id,
            track_id: c.track_id,
            user_id: c.user_id,
            parent_comment_id: c.parent_comment_id,
            timestamp_formatted: c.timestamp_formatted(),
            is_reply: c.is_reply(),
            content: c.content,
            timestamp_seconds: c.timestamp_seconds,
            reply_count,
            created_at: c.created_at,
            author: author.map(PublicUserResponse::from),
        }
    }
}

/// Attach authors and reply counts to a page of comments with two batch
/// queries instead of one pair per row.
async fn decorate(
    state: &AppState,
    comments: Vec<comment::Model>,
) -> Result<Vec<CommentResponse>, ApiError> {
    if comments.is_empty() {
        return Ok(Vec::new());
    }

    let author_ids: Vec<Uuid> = comments.iter().map(|c| c.user_id).collect();
    let authors: HashMap<Uuid, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let comment_ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
    let replies = comment::Entity::find()
        .filter(comment::Column::ParentCommentId.is_in(comment_ids))
        .all(&state.db)
        .await?;
    let mut reply_counts: HashMap<Uuid, u64> = HashMap::new();
    for reply in &replies {
        if let Some(parent) = reply.parent_comment_id {
            *reply_counts.entry(parent).or_default() += 1;
        }
    }

    Ok(comments
        .into_iter()
        .map(|c| {
            let reply_count = reply_counts.get(&c.id).copied().unwrap_or(0);
            let author = authors.get(&c.user_id).cloned();
            CommentResponse::build(c, reply_count, author)
        })
        .collect())
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::Validation("Comment cannot be empty".to_string()));
    }
    if content.chars().count() > 2000 {
        return Err(ApiError::Validation(
            "Comment must be at most 2000 characters".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/tracks/{id}/comments
///
/// Top-level comments, newest first; replies hang off their parent via the
/// replies endpoint.
pub async fn list_track_comments(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let caller = caller.map(|Extension(CurrentUser(u))| u);
    find_visible_track(&state, id, caller.as_ref()).await?;

    let comments = comment::Entity::find()
        .filter(comment::Column::TrackId.eq(id))
        .filter(comment::Column::ParentCommentId.is_null())
        .order_by_desc(comment::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(decorate(&state, comments).await?))
}

async fn find_comment_on_visible_track(
    state: &AppState,
    id: Uuid,
    caller: Option<&user::Model>,
) -> Result<comment::Model, ApiError> {
    let c = comment::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Comment not found"))?;

    // Comments inherit their track's visibility
    find_visible_track(state, c.track_id, caller).await?;
    Ok(c)
}

/// GET /api/comments/{id}
pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommentResponse>, ApiError> {
    let caller = caller.map(|Extension(CurrentUser(u))| u);
    let c = find_comment_on_visible_track(&state, id, caller.as_ref()).await?;

    let reply_count = comment::Entity::find()
        .filter(comment::Column::ParentCommentId.eq(id))
        .count(&state.db)
        .await?;
    let author = user::Entity::find_by_id(c.user_id).one(&state.db).await?;

    Ok(Json(CommentResponse::build(c, reply_count, author)))
}

/// GET /api/comments/{id}/replies
pub async fn get_comment_replies(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let caller = caller.map(|Extension(CurrentUser(u))| u);
    find_comment_on_visible_track(&state, id, caller.as_ref()).await?;

    let replies = comment::Entity::find()
        .filter(comment::Column::ParentCommentId.eq(id))
        .order_by_asc(comment::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(decorate(&state, replies).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub track_id: Uuid,
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
    pub timestamp_seconds: Option<i32>,
}

/// POST /api/comments
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    validate_content(&body.content)?;
    if body.timestamp_seconds.is_some_and(|t| t < 0) {
        return Err(ApiError::Validation(
            "timestamp_seconds must not be negative".to_string(),
        ));
    }

    let t: track::Model = find_visible_track(&state, body.track_id, Some(&account)).await?;

    if let Some(parent_id) = body.parent_comment_id {
        let parent = comment::Entity::find_by_id(parent_id)
            .one(&state.db)
            .await?
            .ok_or(ApiError::NotFound("Parent comment not found"))?;
        if parent.track_id != body.track_id {
            return Err(ApiError::Validation(
                "Parent comment belongs to a different track".to_string(),
            ));
        }
    }

    let txn = state.db.begin().await?;

    let created = comment::ActiveModel {
        id: Set(Uuid::new_v4()),
        track_id: Set(body.track_id),
        user_id: Set(account.id),
        parent_comment_id: Set(body.parent_comment_id),
        content: Set(body.content),
        timestamp_seconds: Set(body.timestamp_seconds),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(&txn)
    .await?;

    notify::notify(
        &txn,
        t.user_id,
        account.id,
        NotificationKind::Comment,
        Some(t.id),
    )
    .await?;

    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::build(created, 0, Some(account))),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// PUT /api/comments/{id}
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    validate_content(&body.content)?;

    let c = comment::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Comment not found"))?;

    if c.user_id != account.id {
        return Err(ApiError::Forbidden("You do not own this comment"));
    }

    let mut active: comment::ActiveModel = c.into();
    active.content = Set(body.content);
    let updated = active.update(&state.db).await?;

    let reply_count = comment::Entity::find()
        .filter(comment::Column::ParentCommentId.eq(id))
        .count(&state.db)
        .await?;

    Ok(Json(CommentResponse::build(
        updated,
        reply_count,
        Some(account),
    )))
}

/// DELETE /api/comments/{id}
///
/// Replies go with it via the parent FK cascade.
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let c = comment::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Comment not found"))?;

    if c.user_id != account.id {
        return Err(ApiError::Forbidden("You do not own this comment"));
    }

    c.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_comment(timestamp_seconds: Option<i32>) -> comment::Model {
        comment::Model {
            id: Uuid::new_v4(),
            track_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            parent_comment_id: None,
            content: "nice groove".into(),
            timestamp_seconds,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_content_validation() {
        assert!(validate_content("ok").is_ok());
        assert!(validate_content("").is_err());
        assert!(validate_content("   \n ").is_err());
        assert!(validate_content(&"x".repeat(2001)).is_err());
        assert!(validate_content(&"x".repeat(2000)).is_ok());
    }

    #[test]
    fn test_response_formats_timestamp() {
        let resp = CommentResponse::build(make_comment(Some(75)), 0, None);
        assert_eq!(resp.timestamp_formatted.as_deref(), Some("1:15"));
        assert!(!resp.is_reply);
    }

    #[test]
    fn test_response_without_timestamp() {
        let resp = CommentResponse::build(make_comment(None), 3, None);
        assert!(resp.timestamp_formatted.is_none());
        assert_eq!(resp.reply_count, 3);
    }

    #[test]
    fn test_reply_flag() {
        let mut c = make_comment(None);
        c.parent_comment_id = Some(Uuid::new_v4());
        let resp = CommentResponse::build(c, 0, None);
        assert!(resp.is_reply);
    }

    #[test]
    fn test_create_request_minimal() {
        let body: CreateCommentRequest = serde_json::from_str(&format!(
            r#"{{"track_id": "{}", "content": "hey"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(body.parent_comment_id.is_none());
        assert!(body.timestamp_seconds.is_none());
    }
}
