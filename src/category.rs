//! Defines the `Category` type and the routes for creating and listing
//! categories. A category labels transactions so spending can be grouped and
//! budgeted, and each category is either for income or for expenses.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, database_id::DatabaseId, user::UserID};

/// The ID of a category row.
pub type CategoryId = DatabaseId;

/// Whether a category labels money coming in or going out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// The category labels income, e.g. 'Wages'.
    Income,
    /// The category labels spending, e.g. 'Groceries'.
    Expense,
}

impl CategoryKind {
    /// The string stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(CategoryKind::Income),
            "expense" => Some(CategoryKind::Expense),
            _ => None,
        }
    }
}

impl ToSql for CategoryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for CategoryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

/// A label for grouping transactions, e.g. 'Groceries', 'Eating Out', 'Wages'.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The ID of the user that owns the category.
    pub user_id: UserID,
    /// The display name of the category.
    pub name: String,
    /// Whether the category labels income or expenses.
    pub kind: CategoryKind,
}

/// Create the category table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let name = row.get(2)?;
    let kind = row.get(3)?;

    Ok(Category {
        id,
        user_id,
        name,
        kind,
    })
}

/// Create a category in the database.
///
/// # Errors
/// Returns an [Error::EmptyCategoryName] if `name` is empty or whitespace, or
/// an [Error::SqlError] if the SQL query fails.
pub fn create_category(
    name: &str,
    kind: CategoryKind,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyCategoryName);
    }

    connection.execute(
        "INSERT INTO category (user_id, name, kind) VALUES (?1, ?2, ?3)",
        params![user_id.as_i64(), name, kind],
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        user_id,
        name: name.to_owned(),
        kind,
    })
}

/// Get all of the user's categories, sorted by name.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn list_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, kind FROM category \
             WHERE user_id = :user_id \
             ORDER BY name ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_category_row)?
        .map(|category_result| category_result.map_err(Error::from))
        .collect()
}

/// The state needed for the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a category.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    /// The display name of the category.
    pub name: String,
    /// Whether the category labels income or expenses.
    pub kind: CategoryKind,
}

/// A route handler for creating a category for the currently logged in user.
///
/// # Errors
/// Returns an [Error::EmptyCategoryName] if the name is empty, or an
/// [Error::DatabaseLockError] if the database lock cannot be acquired.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let category = create_category(&request.name, request.kind, user_id, &connection)?;

    Ok((StatusCode::CREATED, Json(category)).into_response())
}

/// A route handler for listing the categories of the currently logged in user,
/// sorted by name.
///
/// # Errors
/// Returns an [Error::DatabaseLockError] if the database lock cannot be
/// acquired, or an [Error::SqlError] if the query fails.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = list_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not list categories: {error}"))?;

    Ok(Json(categories).into_response())
}
