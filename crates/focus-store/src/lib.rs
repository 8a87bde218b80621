//! SQLite-backed storage for the focus workspace: domain repos, credential
//! stores, and the action ledger.

pub mod actions;
pub mod database;
pub mod error;
pub mod goals;
pub mod projects;
mod row_helpers;
pub mod schema;
pub mod tasks;
pub mod tokens;
pub mod users;

pub use database::Database;
pub use error::StoreError;
