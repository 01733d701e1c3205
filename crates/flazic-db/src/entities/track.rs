use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tracks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Storage columns for the audio source. Never read these directly:
    /// use [`Model::audio_source`], which enforces the external-vs-embedded
    /// variant. Writes go through [`AudioSource::into_columns`].
    #[serde(skip_serializing)]
    pub audio_url: Option<String>,
    #[serde(skip_serializing)]
    pub audio_data: Option<Vec<u8>>,
    #[serde(skip_serializing)]
    pub audio_mimetype: Option<String>,
    #[serde(skip_serializing)]
    pub audio_filename: Option<String>,
    pub duration_seconds: Option<i32>,
    pub genre: Option<String>,
    pub bpm: Option<i32>,
    pub is_public: bool,
    pub play_count: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Artist,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
    #[sea_orm(has_many = "super::like::Entity")]
    Like,
    #[sea_orm(has_many = "super::playlist_track::Entity")]
    PlaylistTrack,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Artist.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl Related<super::like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Like.def()
    }
}

impl Related<super::playlist_track::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlaylistTrack.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Where a track's audio lives: a link to an external host, or bytes we own.
/// The two are mutually exclusive; tracks are only ever created from one of
/// these variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioSource {
    External(String),
    Embedded {
        data: Vec<u8>,
        mimetype: String,
        filename: String,
    },
}

impl AudioSource {
    /// Split the variant into the four nullable storage columns.
    #[allow(clippy::type_complexity)]
    pub fn into_columns(
        self,
    ) -> (
        Option<String>,
        Option<Vec<u8>>,
        Option<String>,
        Option<String>,
    ) {
        match self {
            AudioSource::External(url) => (Some(url), None, None, None),
            AudioSource::Embedded {
                data,
                mimetype,
                filename,
            } => (None, Some(data), Some(mimetype), Some(filename)),
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, AudioSource::Embedded { .. })
    }
}

impl Model {
    /// Reassemble the audio source from storage. Embedded bytes win over a
    /// URL if a legacy row somehow carries both; `None` only for rows written
    /// outside this crate's constructors.
    pub fn audio_source(&self) -> Option<AudioSource> {
        if let Some(data) = &self.audio_data {
            return Some(AudioSource::Embedded {
                data: data.clone(),
                mimetype: self
                    .audio_mimetype
                    .clone()
                    .unwrap_or_else(|| "audio/mpeg".to_string()),
                filename: self
                    .audio_filename
                    .clone()
                    .unwrap_or_else(|| "audio".to_string()),
            });
        }
        self.audio_url.clone().map(AudioSource::External)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn base_model() -> Model {
        Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Night Drive".into(),
            description: None,
            audio_url: None,
            audio_data: None,
            audio_mimetype: None,
            audio_filename: None,
            duration_seconds: Some(214),
            genre: Some("techno".into()),
            bpm: Some(128),
            is_public: true,
            play_count: 0,
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_external_source_roundtrip() {
        let (url, data, mime, name) =
            AudioSource::External("https://cdn.example.com/a.mp3".into()).into_columns();
        let model = Model {
            audio_url: url,
            audio_data: data,
            audio_mimetype: mime,
            audio_filename: name,
            ..base_model()
        };
        assert_eq!(
            model.audio_source(),
            Some(AudioSource::External("https://cdn.example.com/a.mp3".into()))
        );
    }

    #[test]
    fn test_embedded_source_roundtrip() {
        let src = AudioSource::Embedded {
            data: vec![0xFF, 0xFB, 0x90],
            mimetype: "audio/mpeg".into(),
            filename: "take1.mp3".into(),
        };
        let (url, data, mime, name) = src.clone().into_columns();
        assert!(url.is_none());
        let model = Model {
            audio_url: url,
            audio_data: data,
            audio_mimetype: mime,
            audio_filename: name,
            ..base_model()
        };
        assert_eq!(model.audio_source(), Some(src));
    }

    #[test]
    fn test_embedded_wins_over_stray_url() {
        let model = Model {
            audio_url: Some("https://cdn.example.com/a.mp3".into()),
            audio_data: Some(vec![1, 2, 3]),
            audio_mimetype: Some("audio/ogg".into()),
            audio_filename: Some("a.ogg".into()),
            ..base_model()
        };
        assert!(model.audio_source().unwrap().is_embedded());
    }

    #[test]
    fn test_no_source_is_none() {
        assert!(base_model().audio_source().is_none());
    }

    #[test]
    fn test_audio_columns_not_serialized() {
        let json = serde_json::to_value(base_model()).unwrap();
        assert!(json.get("audio_data").is_none());
        assert!(json.get("audio_url").is_none());
        assert_eq!(json["title"], "Night Drive");
    }
}
