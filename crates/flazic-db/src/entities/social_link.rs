use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fixed allow-list of platforms a profile can link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "social_platform")]
#[serde(rename_all = "snake_case")]
pub enum SocialPlatform {
    #[sea_orm(string_value = "spotify")]
    Spotify,
    #[sea_orm(string_value = "youtube")]
    Youtube,
    #[sea_orm(string_value = "instagram")]
    Instagram,
    #[sea_orm(string_value = "twitter")]
    Twitter,
    #[sea_orm(string_value = "tiktok")]
    Tiktok,
    #[sea_orm(string_value = "soundcloud")]
    Soundcloud,
    #[sea_orm(string_value = "bandcamp")]
    Bandcamp,
    #[sea_orm(string_value = "apple_music")]
    AppleMusic,
}

impl SocialPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialPlatform::Spotify => "spotify",
            SocialPlatform::Youtube => "youtube",
            SocialPlatform::Instagram => "instagram",
            SocialPlatform::Twitter => "twitter",
            SocialPlatform::Tiktok => "tiktok",
            SocialPlatform::Soundcloud => "soundcloud",
            SocialPlatform::Bandcamp => "bandcamp",
            SocialPlatform::AppleMusic => "apple_music",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            SocialPlatform::Spotify => "🎵",
            SocialPlatform::Youtube => "📺",
            SocialPlatform::Instagram => "📸",
            SocialPlatform::Twitter => "🐦",
            SocialPlatform::Tiktok => "🎵",
            SocialPlatform::Soundcloud => "☁️",
            SocialPlatform::Bandcamp => "🎸",
            SocialPlatform::AppleMusic => "🎧",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "social_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub platform: SocialPlatform,
    pub url: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_deserialization() {
        let p: SocialPlatform = serde_json::from_str("\"apple_music\"").unwrap();
        assert_eq!(p, SocialPlatform::AppleMusic);
        let p: SocialPlatform = serde_json::from_str("\"spotify\"").unwrap();
        assert_eq!(p, SocialPlatform::Spotify);
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let result = serde_json::from_str::<SocialPlatform>("\"myspace\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_every_platform_has_an_icon() {
        use sea_orm::Iterable;
        for p in SocialPlatform::iter() {
            assert!(!p.icon().is_empty());
        }
    }
}
