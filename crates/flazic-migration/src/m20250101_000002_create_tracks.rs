use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tracks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tracks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tracks::UserId).uuid().not_null())
                    .col(ColumnDef::new(Tracks::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Tracks::Description).text().null())
                    // Audio source: exactly one of audio_url / audio_data is
                    // set, enforced by the AudioSource variant in code.
                    .col(ColumnDef::new(Tracks::AudioUrl).string_len(512).null())
                    .col(ColumnDef::new(Tracks::AudioData).binary().null())
                    .col(ColumnDef::new(Tracks::AudioMimetype).string_len(100).null())
                    .col(ColumnDef::new(Tracks::AudioFilename).string_len(255).null())
                    .col(ColumnDef::new(Tracks::DurationSeconds).integer().null())
                    .col(ColumnDef::new(Tracks::Genre).string_len(50).null())
                    .col(ColumnDef::new(Tracks::Bpm).integer().null())
                    .col(
                        ColumnDef::new(Tracks::IsPublic)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Tracks::PlayCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Tracks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tracks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tracks_user_id")
                            .from(Tracks::Table, Tracks::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tracks_user_id")
                    .table(Tracks::Table)
                    .col(Tracks::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tracks_genre")
                    .table(Tracks::Table)
                    .col(Tracks::Genre)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tracks_is_public")
                    .table(Tracks::Table)
                    .col(Tracks::IsPublic)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tracks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Tracks {
    Table,
    Id,
    UserId,
    Title,
    Description,
    AudioUrl,
    AudioData,
    AudioMimetype,
    AudioFilename,
    DurationSeconds,
    Genre,
    Bpm,
    IsPublic,
    PlayCount,
    CreatedAt,
    UpdatedAt,
}
