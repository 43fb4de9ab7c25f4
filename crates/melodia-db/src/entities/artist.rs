use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "artists")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::artist_song::Entity")]
    ArtistSong,
}

impl Related<super::artist_song::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ArtistSong.def()
    }
}

impl Related<super::song::Entity> for Entity {
    fn to() -> RelationDef {
        super::artist_song::Relation::Song.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::artist_song::Relation::Artist.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
