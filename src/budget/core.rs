//! Defines the core data model and database queries for budgets.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::{Error, category::CategoryId, database_id::DatabaseId, period::Period, user::UserID};

/// The ID of a budget row.
pub type BudgetId = DatabaseId;

/// A monthly spending cap for one category.
///
/// Spending against the cap is measured over the calendar month named by
/// `period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The ID of the user that owns the budget.
    pub user_id: UserID,
    /// The ID of the category the cap applies to.
    pub category_id: CategoryId,
    /// The calendar month the cap applies to.
    pub period: Period,
    /// The spending cap in dollars.
    pub amount: f64,
}

/// A budget joined with the name of its category.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetWithCategory {
    /// The budget itself.
    pub budget: Budget,
    /// The display name of the budget's category.
    pub category_name: String,
}

/// Create the budget table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            period TEXT NOT NULL,
            amount REAL NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Create a budget in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category ID does not refer to one of the
///   user's categories,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget(
    category_id: CategoryId,
    period: Period,
    amount: f64,
    user_id: UserID,
    connection: &Connection,
) -> Result<Budget, Error> {
    connection
        .execute(
            "INSERT INTO budget (user_id, category_id, period, amount) VALUES (?1, ?2, ?3, ?4)",
            params![user_id.as_i64(), category_id, period, amount],
        )
        .map_err(|error| match error {
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 787 => {
                Error::InvalidCategory(Some(category_id))
            }
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid();

    Ok(Budget {
        id,
        user_id,
        category_id,
        period,
        amount,
    })
}

fn map_budget_with_category_row(row: &Row) -> Result<BudgetWithCategory, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let category_id = row.get(2)?;
    let period = row.get(3)?;
    let amount = row.get(4)?;
    let category_name = row.get(5)?;

    Ok(BudgetWithCategory {
        budget: Budget {
            id,
            user_id,
            category_id,
            period,
            amount,
        },
        category_name,
    })
}

/// Get the user's budgets for a calendar month with their category names,
/// sorted by category name.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn list_budgets_for_period(
    user_id: UserID,
    period: Period,
    connection: &Connection,
) -> Result<Vec<BudgetWithCategory>, Error> {
    connection
        .prepare(
            "SELECT b.id, b.user_id, b.category_id, b.period, b.amount, c.name \
             FROM budget b \
             INNER JOIN category c ON c.id = b.category_id \
             WHERE b.user_id = ?1 AND b.period = ?2 \
             ORDER BY c.name ASC",
        )?
        .query_map(params![user_id.as_i64(), period], map_budget_with_category_row)?
        .map(|budget_result| budget_result.map_err(Error::from))
        .collect()
}
