pub mod artist;
pub mod artist_song;
pub mod playlist;
pub mod profile;
pub mod song;
