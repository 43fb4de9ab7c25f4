use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Songs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Songs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Songs::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Songs::Description).text().null())
                    .col(ColumnDef::new(Songs::Thumbnail).string_len(512).null())
                    .col(ColumnDef::new(Songs::Duration).integer().null())
                    .col(ColumnDef::new(Songs::ReleaseDate).date().null())
                    .col(ColumnDef::new(Songs::Genre).string_len(128).null())
                    .col(
                        ColumnDef::new(Songs::Views)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Songs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_songs_created_at")
                    .table(Songs::Table)
                    .col(Songs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Full-text search index on title
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX idx_songs_title_fts ON songs USING gin(to_tsvector('english', title))",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Songs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Songs {
    Table,
    Id,
    Title,
    Description,
    Thumbnail,
    Duration,
    ReleaseDate,
    Genre,
    Views,
    CreatedAt,
}
