use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Organizer
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTimeWithTimeZone,
    pub location: Option<String>,
    pub online_event: bool,
    pub event_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Organizer,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_upcoming(&self) -> bool {
        self.event_date > Utc::now().fixed_offset()
    }

    pub fn is_past(&self) -> bool {
        !self.is_upcoming()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_event(offset: Duration) -> Model {
        Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Warehouse Night".into(),
            description: None,
            event_date: (Utc::now() + offset).fixed_offset(),
            location: Some("Berlin".into()),
            online_event: false,
            event_url: None,
            cover_image_url: None,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_future_event_is_upcoming() {
        let event = make_event(Duration::days(7));
        assert!(event.is_upcoming());
        assert!(!event.is_past());
    }

    #[test]
    fn test_past_event_is_past() {
        let event = make_event(Duration::days(-1));
        assert!(event.is_past());
        assert!(!event.is_upcoming());
    }
}
