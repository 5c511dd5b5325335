//! HTTP handlers for resource CRUD, media upload and the info endpoint.

pub mod entity;
pub mod info;
pub mod media;
pub use entity::*;
pub use info::app_info;
pub use media::upload;
