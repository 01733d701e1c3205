use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::users::PublicUserResponse;
use super::PaginatedResponse;
use crate::auth::middleware::CurrentUser;
use crate::error::ApiError;
use flazic_db::entities::notification::{self, NotificationKind};
use flazic_db::entities::user;
use flazic_db::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub icon: &'static str,
    pub target_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<PublicUserResponse>,
}

impl NotificationResponse {
    fn build(n: notification::Model, sender: Option<user::Model>) -> Self {
        // Fall back to a neutral name if the sender row disappeared between
        // queries (cascade delete races the read)
        let sender_name = sender
            .as_ref()
            .map(|u| u.public_name().to_string())
            .unwrap_or_else(|| "Someone".to_string());
        let (message, icon) = n.kind.render(&sender_name);
        Self {
            id: n.id,
            kind: n.kind,
            message,
            icon,
            target_id: n.target_id,
            is_read: n.is_read,
            created_at: n.created_at,
            sender: sender.map(PublicUserResponse::from),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationStatsResponse {
    pub total: u64,
    pub unread: u64,
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Query(params): Query<NotificationListParams>,
) -> Result<Json<PaginatedResponse<NotificationResponse>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);

    let mut query = notification::Entity::find()
        .filter(notification::Column::UserId.eq(account.id));
    if params.unread_only {
        query = query.filter(notification::Column::IsRead.eq(false));
    }

    let paginator = query
        .order_by_desc(notification::Column::CreatedAt)
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;

    let sender_ids: Vec<Uuid> = rows.iter().map(|n| n.from_user_id).collect();
    let senders: HashMap<Uuid, user::Model> = if sender_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(sender_ids))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };

    let data = rows
        .into_iter()
        .map(|n| {
            let sender = senders.get(&n.from_user_id).cloned();
            NotificationResponse::build(n, sender)
        })
        .collect();

    Ok(Json(PaginatedResponse::new(data, total, page, per_page)))
}

/// GET /api/notifications/stats
pub async fn notification_stats(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
) -> Result<Json<NotificationStatsResponse>, ApiError> {
    let total = notification::Entity::find()
        .filter(notification::Column::UserId.eq(account.id))
        .count(&state.db)
        .await?;
    let unread = notification::Entity::find()
        .filter(notification::Column::UserId.eq(account.id))
        .filter(notification::Column::IsRead.eq(false))
        .count(&state.db)
        .await?;

    Ok(Json(NotificationStatsResponse { total, unread }))
}

async fn find_own_notification(
    state: &AppState,
    account: &user::Model,
    id: Uuid,
) -> Result<notification::Model, ApiError> {
    let n = notification::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Notification not found"))?;

    // Other users' notifications 404 rather than 403: their ids are private
    if n.user_id != account.id {
        return Err(ApiError::NotFound("Notification not found"));
    }
    Ok(n)
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let n = find_own_notification(&state, &account, id).await?;

    if !n.is_read {
        let mut active: notification::ActiveModel = n.into();
        active.is_read = Set(true);
        active.update(&state.db).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    notification::Entity::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::UserId.eq(account.id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let n = find_own_notification(&state, &account, id).await?;
    n.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_notification(kind: NotificationKind) -> notification::Model {
        notification::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            from_user_id: Uuid::new_v4(),
            kind,
            target_id: Some(Uuid::new_v4()),
            is_read: false,
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn make_sender(display_name: Option<&str>) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            username: "bob".into(),
            email: "bob@example.com".into(),
            password_hash: "hashed".into(),
            display_name: display_name.map(Into::into),
            bio: None,
            avatar_url: None,
            location: None,
            website_url: None,
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_message_uses_display_name() {
        let resp = NotificationResponse::build(
            make_notification(NotificationKind::Follow),
            Some(make_sender(Some("Bobby"))),
        );
        assert_eq!(resp.message, "Bobby started following you");
        assert_eq!(resp.icon, "👤");
    }

    #[test]
    fn test_message_falls_back_to_username() {
        let resp = NotificationResponse::build(
            make_notification(NotificationKind::Like),
            Some(make_sender(None)),
        );
        assert_eq!(resp.message, "bob liked your track");
    }

    #[test]
    fn test_message_with_missing_sender() {
        let resp =
            NotificationResponse::build(make_notification(NotificationKind::Comment), None);
        assert_eq!(resp.message, "Someone commented on your track");
        assert!(resp.sender.is_none());
    }

    #[test]
    fn test_unread_only_param_defaults_false() {
        let params: NotificationListParams = serde_json::from_str("{}").unwrap();
        assert!(!params.unread_only);
    }
}
