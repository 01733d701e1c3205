use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE social_platform AS ENUM \
                 ('spotify', 'youtube', 'instagram', 'twitter', 'tiktok', \
                  'soundcloud', 'bandcamp', 'apple_music')",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SocialLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SocialLinks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SocialLinks::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(SocialLinks::Platform)
                            .custom(Alias::new("social_platform"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(SocialLinks::Url).string_len(512).not_null())
                    .col(
                        ColumnDef::new(SocialLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_social_links_user_id")
                            .from(SocialLinks::Table, SocialLinks::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One link per platform per user
        manager
            .create_index(
                Index::create()
                    .name("uq_social_links_user_platform")
                    .table(SocialLinks::Table)
                    .col(SocialLinks::UserId)
                    .col(SocialLinks::Platform)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SocialLinks::Table).to_owned())
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TYPE social_platform")
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum SocialLinks {
    Table,
    Id,
    UserId,
    Platform,
    Url,
    CreatedAt,
}
