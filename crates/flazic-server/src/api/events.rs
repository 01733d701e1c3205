use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{validate_url, PaginatedResponse};
use crate::auth::middleware::CurrentUser;
use crate::error::ApiError;
use flazic_db::entities::{event, user};
use flazic_db::AppState;

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_date: chrono::DateTime<chrono::FixedOffset>,
    pub location: Option<String>,
    pub online_event: bool,
    pub event_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub is_upcoming: bool,
    pub is_past: bool,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<event::Model> for EventResponse {
    fn from(e: event::Model) -> Self {
        let is_upcoming = e.is_upcoming();
        let is_past = e.is_past();
        Self {
            id: e.id,
            user_id: e.user_id,
            title: e.title,
            description: e.description,
            event_date: e.event_date,
            location: e.location,
            online_event: e.online_event,
            event_url: e.event_url,
            cover_image_url: e.cover_image_url,
            is_upcoming,
            is_past,
            created_at: e.created_at,
        }
    }
}

fn validate_event_fields(
    title: &str,
    event_url: Option<&str>,
    cover_image_url: Option<&str>,
) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("Title cannot be empty".to_string()));
    }
    if let Some(url) = event_url {
        validate_url("event_url", url)?;
    }
    if let Some(url) = cover_image_url {
        validate_url("cover_image_url", url)?;
    }
    Ok(())
}

/// Checked on create and whenever an update supplies a new date; a stored
/// date that has since passed never blocks edits to other fields.
fn validate_event_date(event_date: &chrono::DateTime<chrono::FixedOffset>) -> Result<(), ApiError> {
    if *event_date <= Utc::now() {
        return Err(ApiError::Validation(
            "event_date must be in the future".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct EventListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Omit events that have already happened
    #[serde(default)]
    pub upcoming_only: bool,
    pub user_id: Option<Uuid>,
}

/// GET /api/events
///
/// Soonest first, so the next gig tops the list.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventListParams>,
) -> Result<Json<PaginatedResponse<EventResponse>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);

    let mut query = event::Entity::find();
    if params.upcoming_only {
        query = query.filter(event::Column::EventDate.gt(Utc::now()));
    }
    if let Some(user_id) = params.user_id {
        query = query.filter(event::Column::UserId.eq(user_id));
    }

    let paginator = query
        .order_by_asc(event::Column::EventDate)
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await?;
    let events = paginator.fetch_page(page - 1).await?;

    Ok(Json(PaginatedResponse::new(
        events.into_iter().map(EventResponse::from).collect(),
        total,
        page,
        per_page,
    )))
}

/// GET /api/events/{id}
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventResponse>, ApiError> {
    let e = event::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Event not found"))?;

    Ok(Json(EventResponse::from(e)))
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_date: chrono::DateTime<chrono::FixedOffset>,
    pub location: Option<String>,
    #[serde(default)]
    pub online_event: bool,
    pub event_url: Option<String>,
    pub cover_image_url: Option<String>,
}

/// POST /api/events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), ApiError> {
    validate_event_fields(
        &body.title,
        body.event_url.as_deref(),
        body.cover_image_url.as_deref(),
    )?;
    validate_event_date(&body.event_date)?;

    let created = event::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(account.id),
        title: Set(body.title),
        description: Set(body.description),
        event_date: Set(body.event_date),
        location: Set(body.location),
        online_event: Set(body.online_event),
        event_url: Set(body.event_url),
        cover_image_url: Set(body.cover_image_url),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(EventResponse::from(created))))
}

async fn find_owned_event(
    state: &AppState,
    account: &user::Model,
    id: Uuid,
) -> Result<event::Model, ApiError> {
    let e = event::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Event not found"))?;

    if e.user_id != account.id {
        return Err(ApiError::Forbidden("You are not the organizer"));
    }
    Ok(e)
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub location: Option<String>,
    pub online_event: Option<bool>,
    pub event_url: Option<String>,
    pub cover_image_url: Option<String>,
}

/// PUT /api/events/{id}
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    let e = find_owned_event(&state, &account, id).await?;

    let title = body.title.as_deref().unwrap_or(&e.title);
    validate_event_fields(
        title,
        body.event_url.as_deref(),
        body.cover_image_url.as_deref(),
    )?;
    if let Some(event_date) = &body.event_date {
        validate_event_date(event_date)?;
    }

    let mut active: event::ActiveModel = e.into();
    if let Some(v) = body.title {
        active.title = Set(v);
    }
    if let Some(v) = body.description {
        active.description = Set(Some(v));
    }
    if let Some(v) = body.event_date {
        active.event_date = Set(v);
    }
    if let Some(v) = body.location {
        active.location = Set(Some(v));
    }
    if let Some(v) = body.online_event {
        active.online_event = Set(v);
    }
    if let Some(v) = body.event_url {
        active.event_url = Set(Some(v));
    }
    if let Some(v) = body.cover_image_url {
        active.cover_image_url = Set(Some(v));
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(EventResponse::from(updated)))
}

/// DELETE /api/events/{id}
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let e = find_owned_event(&state, &account, id).await?;
    e.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn future_date() -> chrono::DateTime<chrono::FixedOffset> {
        (Utc::now() + Duration::days(30)).fixed_offset()
    }

    fn past_date() -> chrono::DateTime<chrono::FixedOffset> {
        (Utc::now() - Duration::days(1)).fixed_offset()
    }

    fn make_event(event_date: chrono::DateTime<chrono::FixedOffset>) -> event::Model {
        event::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Release party".into(),
            description: None,
            event_date,
            location: None,
            online_event: true,
            event_url: None,
            cover_image_url: None,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_future_date_required() {
        assert!(validate_event_date(&future_date()).is_ok());
        assert!(validate_event_date(&past_date()).is_err());
    }

    #[test]
    fn test_title_required() {
        assert!(validate_event_fields("Show", None, None).is_ok());
        assert!(validate_event_fields("", None, None).is_err());
        assert!(validate_event_fields("  ", None, None).is_err());
    }

    #[test]
    fn test_url_fields_checked() {
        assert!(
            validate_event_fields("Show", Some("https://tickets.example.com"), None).is_ok()
        );
        assert!(validate_event_fields("Show", Some("not-a-url"), None).is_err());
        assert!(
            validate_event_fields("Show", None, Some("ftp://example.com/poster.png")).is_err()
        );
    }

    #[test]
    fn test_field_edits_allowed_after_date_passes() {
        // Updating title/urls never re-checks a stored date that has
        // already passed; only a supplied replacement date is checked
        assert!(validate_event_fields("New title", None, None).is_ok());

        let supplied: Option<chrono::DateTime<chrono::FixedOffset>> = None;
        assert!(supplied.as_ref().map_or(Ok(()), validate_event_date).is_ok());
        assert!(Some(past_date())
            .as_ref()
            .map_or(Ok(()), validate_event_date)
            .is_err());
    }

    #[test]
    fn test_upcoming_and_past_derived() {
        let resp = EventResponse::from(make_event(future_date()));
        assert!(resp.is_upcoming);
        assert!(!resp.is_past);

        let resp = EventResponse::from(make_event(past_date()));
        assert!(!resp.is_upcoming);
        assert!(resp.is_past);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["is_past"], true);
        assert_eq!(json["is_upcoming"], false);
    }
}
