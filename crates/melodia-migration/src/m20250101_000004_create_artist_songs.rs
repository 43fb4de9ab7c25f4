use sea_orm_migration::prelude::*;

use super::m20250101_000002_create_artists::Artists;
use super::m20250101_000003_create_songs::Songs;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ArtistSongs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ArtistSongs::SongId).uuid().not_null())
                    .col(ColumnDef::new(ArtistSongs::ArtistId).uuid().not_null())
                    .col(
                        ColumnDef::new(ArtistSongs::Relation)
                            .string_len(16)
                            .not_null()
                            .default("Featured"),
                    )
                    .primary_key(
                        Index::create()
                            .col(ArtistSongs::SongId)
                            .col(ArtistSongs::ArtistId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_artist_songs_song_id")
                            .from(ArtistSongs::Table, ArtistSongs::SongId)
                            .to(Songs::Table, Songs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_artist_songs_artist_id")
                            .from(ArtistSongs::Table, ArtistSongs::ArtistId)
                            .to(Artists::Table, Artists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_artist_songs_artist_id")
                    .table(ArtistSongs::Table)
                    .col(ArtistSongs::ArtistId)
                    .to_owned(),
            )
            .await?;

        // At most one Primary credit per song
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX idx_artist_songs_one_primary ON artist_songs (song_id) WHERE relation = 'Primary'",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ArtistSongs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ArtistSongs {
    Table,
    SongId,
    ArtistId,
    Relation,
}
