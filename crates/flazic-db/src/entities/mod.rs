pub mod comment;
pub mod event;
pub mod follow;
pub mod like;
pub mod notification;
pub mod playlist;
pub mod playlist_track;
pub mod social_link;
pub mod track;
pub mod user;
