pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users;
mod m20250101_000002_create_tracks;
mod m20250101_000003_create_follows;
mod m20250101_000004_create_likes;
mod m20250101_000005_create_comments;
mod m20250101_000006_create_playlists;
mod m20250101_000007_create_playlist_tracks;
mod m20250101_000008_create_notifications;
mod m20250101_000009_create_events;
mod m20250101_000010_create_social_links;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users::Migration),
            Box::new(m20250101_000002_create_tracks::Migration),
            Box::new(m20250101_000003_create_follows::Migration),
            Box::new(m20250101_000004_create_likes::Migration),
            Box::new(m20250101_000005_create_comments::Migration),
            Box::new(m20250101_000006_create_playlists::Migration),
            Box::new(m20250101_000007_create_playlist_tracks::Migration),
            Box::new(m20250101_000008_create_notifications::Migration),
            Box::new(m20250101_000009_create_events::Migration),
            Box::new(m20250101_000010_create_social_links::Migration),
        ]
    }
}
