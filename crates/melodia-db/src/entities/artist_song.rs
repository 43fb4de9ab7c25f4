use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How an artist is credited on a song. Every song has exactly one
/// `Primary` link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ArtistRelation {
    #[sea_orm(string_value = "Primary")]
    Primary,
    #[sea_orm(string_value = "Featured")]
    Featured,
}

impl ArtistRelation {
    /// Relation for the artist at `position` in a credited list.
    pub fn for_position(position: usize) -> Self {
        if position == 0 {
            ArtistRelation::Primary
        } else {
            ArtistRelation::Featured
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "artist_songs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub song_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub artist_id: Uuid,
    pub relation: ArtistRelation,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::song::Entity",
        from = "Column::SongId",
        to = "super::song::Column::Id",
        on_delete = "Cascade"
    )]
    Song,
    #[sea_orm(
        belongs_to = "super::artist::Entity",
        from = "Column::ArtistId",
        to = "super::artist::Column::Id",
        on_delete = "Cascade"
    )]
    Artist,
}

impl Related<super::song::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Song.def()
    }
}

impl Related<super::artist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Artist.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
