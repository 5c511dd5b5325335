//! Application users (the `users` table). Not exposed over HTTP; created from the CLI.

use crate::config::{ResolvedModel, ResolvedTable};
use crate::error::{sqlstate, AppError, ConfigError};
use crate::service::password::hash_password;
use crate::sql::qualified_table;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

pub const USERS_TABLE: &str = "users";
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_USER: &str = "ROLE_USER";

/// Column list shared across queries; the password hash is never read back.
const COLUMNS: &str = "id, email, first_name, last_name, roles, is_active, created_at";

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Json<Vec<String>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Property/value pairs printed after creation.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ID", self.id.to_string()),
            ("Email", self.email.clone()),
            ("First Name", self.first_name.clone()),
            ("Last Name", self.last_name.clone()),
            ("Roles", self.roles.0.join(", ")),
            ("Created At", self.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            ("Active", if self.is_active { "Yes" } else { "No" }.to_string()),
        ]
    }
}

#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub admin: bool,
}

impl NewUser<'_> {
    pub fn roles(&self) -> Vec<String> {
        let role = if self.admin { ROLE_ADMIN } else { ROLE_USER };
        vec![role.to_string()]
    }
}

pub fn duplicate_email(email: &str) -> AppError {
    AppError::Conflict(format!("User with email \"{}\" already exists!", email))
}

pub struct UserService;

impl UserService {
    fn table(model: &ResolvedModel) -> Result<&ResolvedTable, AppError> {
        model.table(USERS_TABLE).ok_or_else(|| {
            AppError::Config(ConfigError::MissingReference {
                kind: "table",
                id: USERS_TABLE.to_string(),
            })
        })
    }

    /// Exact (case-sensitive) email lookup.
    pub async fn find_by_email(
        pool: &PgPool,
        model: &ResolvedModel,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let table = Self::table(model)?;
        let query = format!(
            "SELECT {COLUMNS} FROM {} WHERE email = $1",
            qualified_table(table)
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Insert a user with a hashed password and a single role. An email that is already
    /// registered, found up front or by the unique index, is a `Conflict`.
    pub async fn create_user(
        pool: &PgPool,
        model: &ResolvedModel,
        input: &NewUser<'_>,
    ) -> Result<User, AppError> {
        if Self::find_by_email(pool, model, input.email).await?.is_some() {
            return Err(duplicate_email(input.email));
        }
        let table = Self::table(model)?;
        let hashed = hash_password(input.password)?;
        let query = format!(
            "INSERT INTO {} (email, password, first_name, last_name, roles)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}",
            qualified_table(table)
        );
        let created = sqlx::query_as::<_, User>(&query)
            .bind(input.email)
            .bind(&hashed)
            .bind(input.first_name)
            .bind(input.last_name)
            .bind(Json(input.roles()))
            .fetch_one(pool)
            .await;
        match created {
            Ok(user) => {
                tracing::info!(user_id = user.id, email = %user.email, "user created");
                Ok(user)
            }
            Err(e) if sqlstate(&e).as_deref() == Some("23505") => Err(duplicate_email(input.email)),
            Err(e) => Err(e.into()),
        }
    }
}
