//! Services: generic resource CRUD, request validation, users and the info aggregate.

mod crud;
mod info;
pub mod password;
mod users;
mod validation;
pub use crud::{CrudService, DEFAULT_LIMIT};
pub use info::{AppInfo, InfoService, Stats};
pub use users::{NewUser, User, UserService, ROLE_ADMIN, ROLE_USER, USERS_TABLE};
pub use validation::{is_valid_email, is_valid_isbn, RequestValidator};
