//! `/app/info`: application identity plus raw row counts.

use crate::config::{ResolvedModel, Settings};
use crate::error::{AppError, ConfigError};
use crate::service::users::USERS_TABLE;
use crate::sql::count;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub total_books: i64,
    pub total_authors: i64,
    pub total_reviews: i64,
    pub total_users: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub environment: String,
    pub stats: Stats,
    pub timestamp: DateTime<Utc>,
}

impl AppInfo {
    pub fn new(settings: &Settings, stats: Stats) -> Self {
        AppInfo {
            name: settings.app_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: settings.app_description.clone(),
            environment: settings.environment.clone(),
            stats,
            timestamp: Utc::now(),
        }
    }
}

pub struct InfoService;

impl InfoService {
    /// Counts every row of each table; resource extensions do not apply. Any failed count
    /// fails the whole call.
    pub async fn collect(
        pool: &PgPool,
        model: &ResolvedModel,
        settings: &Settings,
    ) -> Result<AppInfo, AppError> {
        let stats = Stats {
            total_books: Self::count_rows(pool, model, "book").await?,
            total_authors: Self::count_rows(pool, model, "author").await?,
            total_reviews: Self::count_rows(pool, model, "review").await?,
            total_users: Self::count_rows(pool, model, USERS_TABLE).await?,
        };
        Ok(AppInfo::new(settings, stats))
    }

    async fn count_rows(pool: &PgPool, model: &ResolvedModel, table: &str) -> Result<i64, AppError> {
        let table = model.table(table).ok_or_else(|| ConfigError::MissingReference {
            kind: "table",
            id: table.to_string(),
        })?;
        let q = count(table);
        tracing::debug!(sql = %q.sql, "count");
        let n: i64 = sqlx::query_scalar(&q.sql).fetch_one(pool).await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_snake_case_stats() {
        let settings = Settings::from_lookup(|name| match name {
            "APP_ENV" => Some("test".into()),
            _ => None,
        })
        .unwrap();
        let info = AppInfo::new(
            &settings,
            Stats {
                total_books: 3,
                total_authors: 2,
                total_reviews: 5,
                total_users: 1,
            },
        );
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["name"], json!("Beaupeyratheque API"));
        assert_eq!(v["environment"], json!("test"));
        assert_eq!(v["version"], json!(env!("CARGO_PKG_VERSION")));
        assert_eq!(
            v["stats"],
            json!({ "total_books": 3, "total_authors": 2, "total_reviews": 5, "total_users": 1 })
        );
        assert!(v["timestamp"].as_str().is_some());
    }
}
