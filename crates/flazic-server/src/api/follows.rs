use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::users::{load_follow_side, PublicUserResponse};
use crate::auth::middleware::CurrentUser;
use crate::error::ApiError;
use crate::notify;
use flazic_db::entities::notification::NotificationKind;
use flazic_db::entities::{follow, user};
use flazic_db::AppState;

#[derive(Debug, Serialize)]
pub struct FollowToggleResponse {
    pub following: bool,
    pub follower_count: u64,
}

#[derive(Debug, Serialize)]
pub struct FollowStatusResponse {
    pub following: bool,
    pub follows_you: bool,
}

#[derive(Debug, Serialize)]
pub struct FollowStatsResponse {
    pub follower_count: u64,
    pub following_count: u64,
}

/// POST /api/follow/{user_id}
///
/// Toggle. Creating the edge and notifying the followed user commit
/// together; a racing duplicate follow hits the composite PK and maps to
/// 409. Unfollow does not retract the earlier notification.
pub async fn toggle_follow(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<FollowToggleResponse>, ApiError> {
    if user_id == account.id {
        return Err(ApiError::Validation(
            "You cannot follow yourself".to_string(),
        ));
    }

    if user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("User not found"));
    }

    let txn = state.db.begin().await?;

    let existing = follow::Entity::find_by_id((account.id, user_id))
        .one(&txn)
        .await?;
    let following = match existing {
        Some(edge) => {
            edge.delete(&txn).await?;
            false
        }
        None => {
            follow::ActiveModel {
                follower_id: Set(account.id),
                following_id: Set(user_id),
                created_at: Set(chrono::Utc::now().fixed_offset()),
            }
            .insert(&txn)
            .await?;

            notify::notify(
                &txn,
                user_id,
                account.id,
                NotificationKind::Follow,
                Some(account.id),
            )
            .await?;
            true
        }
    };

    txn.commit().await?;

    let follower_count = follow::Entity::find()
        .filter(follow::Column::FollowingId.eq(user_id))
        .count(&state.db)
        .await?;

    Ok(Json(FollowToggleResponse {
        following,
        follower_count,
    }))
}

/// GET /api/follow/{user_id}/status
pub async fn follow_status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<FollowStatusResponse>, ApiError> {
    if user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("User not found"));
    }

    let following = follow::Entity::find_by_id((account.id, user_id))
        .one(&state.db)
        .await?
        .is_some();
    let follows_you = follow::Entity::find_by_id((user_id, account.id))
        .one(&state.db)
        .await?
        .is_some();

    Ok(Json(FollowStatusResponse {
        following,
        follows_you,
    }))
}

/// GET /api/follow/me/followers
pub async fn my_followers(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
) -> Result<Json<Vec<PublicUserResponse>>, ApiError> {
    let edges = follow::Entity::find()
        .filter(follow::Column::FollowingId.eq(account.id))
        .order_by_desc(follow::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(load_follow_side(&state, edges, true).await?))
}

/// GET /api/follow/me/following
pub async fn my_following(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
) -> Result<Json<Vec<PublicUserResponse>>, ApiError> {
    let edges = follow::Entity::find()
        .filter(follow::Column::FollowerId.eq(account.id))
        .order_by_desc(follow::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(load_follow_side(&state, edges, false).await?))
}

/// GET /api/follow/me/stats
pub async fn my_follow_stats(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
) -> Result<Json<FollowStatsResponse>, ApiError> {
    let follower_count = follow::Entity::find()
        .filter(follow::Column::FollowingId.eq(account.id))
        .count(&state.db)
        .await?;
    let following_count = follow::Entity::find()
        .filter(follow::Column::FollowerId.eq(account.id))
        .count(&state.db)
        .await?;

    Ok(Json(FollowStatsResponse {
        follower_count,
        following_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_response_shape() {
        let json = serde_json::to_value(FollowToggleResponse {
            following: true,
            follower_count: 4,
        })
        .unwrap();
        assert_eq!(json["following"], true);
        assert_eq!(json["follower_count"], 4);
    }

    #[test]
    fn test_status_response_shape() {
        let json = serde_json::to_value(FollowStatusResponse {
            following: false,
            follows_you: true,
        })
        .unwrap();
        assert_eq!(json["following"], false);
        assert_eq!(json["follows_you"], true);
    }
}
