//! Library catalog backend: books, authors, reviews and media served over a REST API whose
//! resources, filters and extensions are declared in a catalog definition.

pub mod case;
pub mod config;
pub mod db;
pub mod error;
pub mod extensions;
pub mod filters;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{default_catalog, load_catalog, resolve, CatalogConfig, ResolvedEntity, ResolvedModel, Settings};
pub use db::{connect, ensure_database_exists};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use routes::app_router;
pub use service::{CrudService, NewUser, UserService};
pub use state::AppState;
