pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_profiles;
mod m20250101_000002_create_artists;
mod m20250101_000003_create_songs;
mod m20250101_000004_create_artist_songs;
mod m20250101_000005_create_playlists;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_profiles::Migration),
            Box::new(m20250101_000002_create_artists::Migration),
            Box::new(m20250101_000003_create_songs::Migration),
            Box::new(m20250101_000004_create_artist_songs::Migration),
            Box::new(m20250101_000005_create_playlists::Migration),
        ]
    }
}
