use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub track_id: Uuid,
    pub user_id: Uuid,
    /// Null for top-level comments; replies point at their parent.
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    /// Seconds into the track this comment is anchored to, if any.
    pub timestamp_seconds: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::track::Entity",
        from = "Column::TrackId",
        to = "super::track::Column::Id"
    )]
    Track,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Author,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentCommentId",
        to = "Column::Id"
    )]
    Parent,
}

impl Related<super::track::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Track.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }

    /// Anchored timestamp as "m:ss", e.g. 75 → "1:15". None when unanchored.
    pub fn timestamp_formatted(&self) -> Option<String> {
        self.timestamp_seconds
            .map(|t| format!("{}:{:02}", t / 60, t % 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_comment(parent: Option<Uuid>, ts: Option<i32>) -> Model {
        Model {
            id: Uuid::new_v4(),
            track_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            parent_comment_id: parent,
            content: "nice drop".into(),
            timestamp_seconds: ts,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_is_reply() {
        assert!(!make_comment(None, None).is_reply());
        assert!(make_comment(Some(Uuid::new_v4()), None).is_reply());
    }

    #[test]
    fn test_timestamp_formatted() {
        assert_eq!(make_comment(None, Some(75)).timestamp_formatted().unwrap(), "1:15");
        assert_eq!(make_comment(None, Some(0)).timestamp_formatted().unwrap(), "0:00");
        assert_eq!(make_comment(None, Some(605)).timestamp_formatted().unwrap(), "10:05");
        assert!(make_comment(None, None).timestamp_formatted().is_none());
    }
}
