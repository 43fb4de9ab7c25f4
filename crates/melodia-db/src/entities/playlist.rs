use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Playlists double as albums: the kind is the only thing telling them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PlaylistKind {
    #[sea_orm(string_value = "Playlist")]
    Playlist,
    #[sea_orm(string_value = "Album")]
    Album,
    #[sea_orm(string_value = "EP")]
    #[serde(rename = "EP")]
    Ep,
    #[sea_orm(string_value = "Single")]
    Single,
}

impl PlaylistKind {
    /// Kinds that are presented as albums.
    pub const ALBUM_LIKE: [PlaylistKind; 3] =
        [PlaylistKind::Album, PlaylistKind::Ep, PlaylistKind::Single];

    pub fn is_album_like(self) -> bool {
        Self::ALBUM_LIKE.contains(&self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistKind::Playlist => "Playlist",
            PlaylistKind::Album => "Album",
            PlaylistKind::Ep => "EP",
            PlaylistKind::Single => "Single",
        }
    }
}

impl std::str::FromStr for PlaylistKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Playlist" => Ok(PlaylistKind::Playlist),
            "Album" => Ok(PlaylistKind::Album),
            "EP" => Ok(PlaylistKind::Ep),
            "Single" => Ok(PlaylistKind::Single),
            other => Err(format!("unknown playlist type: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "playlists")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub thumbnail: Option<String>,
    pub user_id: Option<Uuid>,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: PlaylistKind,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id",
        on_delete = "SetNull"
    )]
    Owner,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
