use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "notification_kind")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[sea_orm(string_value = "follow")]
    Follow,
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "comment")]
    Comment,
    #[sea_orm(string_value = "track_comment")]
    TrackComment,
    #[sea_orm(string_value = "new_track")]
    NewTrack,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::TrackComment => "track_comment",
            NotificationKind::NewTrack => "new_track",
        }
    }

    /// Display message and icon for a notification of this kind. Extending
    /// the enum means extending this table, nothing else.
    pub fn render(&self, sender_name: &str) -> (String, &'static str) {
        match self {
            NotificationKind::Follow => {
                (format!("{sender_name} started following you"), "👤")
            }
            NotificationKind::Like => (format!("{sender_name} liked your track"), "❤️"),
            NotificationKind::Comment => {
                (format!("{sender_name} commented on your track"), "💬")
            }
            NotificationKind::TrackComment => (
                format!("{sender_name} commented on a track you follow"),
                "🎵",
            ),
            NotificationKind::NewTrack => {
                (format!("{sender_name} published a new track"), "🎶")
            }
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Recipient
    pub user_id: Uuid,
    /// User whose action caused the notification
    pub from_user_id: Uuid,
    pub kind: NotificationKind,
    /// Entity that caused it (track id, follower id, ...), kind-dependent
    pub target_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Recipient,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FromUserId",
        to = "super::user::Column::Id"
    )]
    Sender,
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_as_str() {
        assert_eq!(NotificationKind::Follow.as_str(), "follow");
        assert_eq!(NotificationKind::TrackComment.as_str(), "track_comment");
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&NotificationKind::NewTrack).unwrap();
        assert_eq!(json, "\"new_track\"");
        let kind: NotificationKind = serde_json::from_str("\"like\"").unwrap();
        assert_eq!(kind, NotificationKind::Like);
    }

    #[test]
    fn test_render_covers_every_kind() {
        use sea_orm::Iterable;
        for kind in NotificationKind::iter() {
            let (message, icon) = kind.render("dj_nova");
            assert!(message.contains("dj_nova"));
            assert!(!icon.is_empty());
        }
    }

    #[test]
    fn test_render_follow_message() {
        let (message, icon) = NotificationKind::Follow.render("bob");
        assert_eq!(message, "bob started following you");
        assert_eq!(icon, "👤");
    }
}
