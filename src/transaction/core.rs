//! Defines the core data models and database queries for transactions.

use std::collections::HashMap;

use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    account::AccountId,
    category::CategoryId,
    database_id::TransactionId,
    user::UserID,
};

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");

// ============================================================================
// MODELS
// ============================================================================

/// Whether a transaction is money coming in or going out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money earned, e.g. a salary deposit.
    Income,
    /// Money spent, e.g. a coffee shop purchase.
    Expense,
}

impl TransactionKind {
    /// The string stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            _ => None,
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// The amount is a non-negative magnitude. Whether it counts for or against
/// the account balance is decided by `kind`.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The ID of the user that owns the transaction.
    pub user_id: UserID,
    /// The ID of the account the money moved in or out of.
    pub account_id: AccountId,
    /// The ID of the category the transaction belongs to.
    pub category_id: Option<CategoryId>,
    /// Whether money was earned or spent.
    pub kind: TransactionKind,
    /// The amount of money spent or earned, always zero or more.
    pub amount: f64,
    /// When the transaction happened.
    #[serde(with = "date_format")]
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The ID the banking provider uses for this transaction, if synced.
    pub external_transaction_id: Option<String>,
    /// Whether the transaction has not yet settled with the bank.
    pub pending: bool,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        user_id: UserID,
        account_id: AccountId,
        kind: TransactionKind,
        amount: f64,
        date: Date,
    ) -> TransactionBuilder {
        TransactionBuilder {
            user_id,
            account_id,
            category_id: None,
            kind,
            amount,
            date,
            description: String::new(),
            external_transaction_id: None,
            pending: false,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// Optional fields default to empty or `None`. Pass the finished builder to
/// [create_transaction] to write the row and get back the stored
/// [Transaction].
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The ID of the user that will own the transaction.
    pub user_id: UserID,
    /// The ID of the account the money moved in or out of.
    pub account_id: AccountId,
    /// The ID of the category the transaction belongs to.
    pub category_id: Option<CategoryId>,
    /// Whether money was earned or spent.
    pub kind: TransactionKind,
    /// The amount of money spent or earned, always zero or more.
    pub amount: f64,
    /// The date when the transaction occurred.
    pub date: Date,
    /// A human-readable description of the transaction.
    ///
    /// For synced transactions this typically comes from the bank's
    /// description field, e.g. "POS W/D LOBSTER SEAFOO-19:47".
    pub description: String,
    /// Optional unique identifier for synced transactions.
    ///
    /// The database enforces uniqueness on this field per user, which lets
    /// the same provider response be applied multiple times safely.
    ///
    /// - `Some(id)` - Transaction came from a banking provider.
    /// - `None` - Transaction was created manually by the user.
    pub external_transaction_id: Option<String>,
    /// Whether the transaction has not yet settled with the bank.
    pub pending: bool,
}

impl TransactionBuilder {
    /// Set the category for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set the banking provider's ID for the transaction.
    pub fn external_transaction_id(mut self, external_transaction_id: Option<String>) -> Self {
        self.external_transaction_id = external_transaction_id;
        self
    }
}

/// A transaction joined with the names of its account and category, for
/// display in transaction lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionListItem {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The name of the account the money moved in or out of.
    pub account_name: String,
    /// The name of the category, if the transaction has one.
    pub category_name: Option<String>,
    /// Whether money was earned or spent.
    pub kind: TransactionKind,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// When the transaction happened.
    #[serde(with = "date_format")]
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Whether the transaction has not yet settled with the bank.
    pub pending: bool,
}

/// The total money earned and spent on a single day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyFlow {
    /// The day the totals are for.
    #[serde(with = "date_format")]
    pub date: Date,
    /// The sum of income amounts on that day.
    pub income: f64,
    /// The sum of expense amounts on that day.
    pub expense: f64,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                category_id INTEGER,
                kind TEXT NOT NULL,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                external_transaction_id TEXT,
                pending INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
                UNIQUE(user_id, external_transaction_id)
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // Add composite index used by the dashboard queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::NegativeAmount] if the amount is less than zero,
/// - [Error::InvalidCategory] if the category ID does not refer to one of the
///   user's categories,
/// - [Error::InvalidAccount] if the account ID does not refer to a real
///   account,
/// - [Error::DuplicateExternalId] if the user already has a transaction with
///   the specified external transaction ID,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if builder.amount < 0.0 {
        return Err(Error::NegativeAmount(builder.amount));
    }

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, account_id, category_id, kind, amount, date, \
             description, external_transaction_id, pending)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING id, user_id, account_id, category_id, kind, amount, date, description, \
             external_transaction_id, pending",
        )?
        .query_row(
            params![
                builder.user_id.as_i64(),
                builder.account_id,
                builder.category_id,
                builder.kind,
                builder.amount,
                builder.date,
                builder.description,
                builder.external_transaction_id,
                builder.pending,
            ],
            map_transaction_row,
        )
        .map_err(|error| match error {
            // Code 787 occurs when a FOREIGN KEY constraint failed. SQLite
            // does not say which key failed, so blame the category if one was
            // given and the account otherwise.
            rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 787 => {
                match builder.category_id {
                    Some(category_id) => Error::InvalidCategory(Some(category_id)),
                    None => Error::InvalidAccount(builder.account_id),
                }
            }
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 2067 => {
                Error::DuplicateExternalId
            }
            error => error.into(),
        })?;

    Ok(transaction)
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let account_id = row.get(2)?;
    let category_id = row.get(3)?;
    let kind = row.get(4)?;
    let amount = row.get(5)?;
    let date = row.get(6)?;
    let description = row.get(7)?;
    let external_transaction_id = row.get(8)?;
    let pending = row.get(9)?;

    Ok(Transaction {
        id,
        user_id,
        account_id,
        category_id,
        kind,
        amount,
        date,
        description,
        external_transaction_id,
        pending,
    })
}

const LIST_ITEM_QUERY: &str = "SELECT t.id, a.name, c.name, t.kind, t.amount, t.date, \
     t.description, t.pending \
     FROM \"transaction\" t \
     INNER JOIN account a ON a.id = t.account_id \
     LEFT JOIN category c ON c.id = t.category_id \
     WHERE t.user_id = :user_id \
     ORDER BY t.date DESC, t.id DESC";

fn map_list_item_row(row: &Row) -> Result<TransactionListItem, rusqlite::Error> {
    let id = row.get(0)?;
    let account_name = row.get(1)?;
    let category_name = row.get(2)?;
    let kind = row.get(3)?;
    let amount = row.get(4)?;
    let date = row.get(5)?;
    let description = row.get(6)?;
    let pending = row.get(7)?;

    Ok(TransactionListItem {
        id,
        account_name,
        category_name,
        kind,
        amount,
        date,
        description,
        pending,
    })
}

/// Get all of the user's transactions with account and category names, most
/// recent date first.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn list_transactions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<TransactionListItem>, Error> {
    connection
        .prepare(LIST_ITEM_QUERY)?
        .query_map(&[(":user_id", &user_id.as_i64())], map_list_item_row)?
        .map(|item_result| item_result.map_err(Error::from))
        .collect()
}

/// Get the user's `limit` most recent transactions with account and category
/// names.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn list_recent_transactions(
    user_id: UserID,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<TransactionListItem>, Error> {
    connection
        .prepare(&format!("{LIST_ITEM_QUERY} LIMIT {limit}"))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_list_item_row)?
        .map(|item_result| item_result.map_err(Error::from))
        .collect()
}

/// Sum the user's transaction amounts between `start` and `end` inclusive,
/// returned as `(income, expenses)`.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn sum_amounts_by_kind_in_range(
    user_id: UserID,
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<(f64, f64), Error> {
    let totals = connection
        .prepare(
            "SELECT \
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), 0), \
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END), 0) \
             FROM \"transaction\" \
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3",
        )?
        .query_row(params![user_id.as_i64(), start, end], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;

    Ok(totals)
}

/// Get the user's income and expense totals for each day between `start` and
/// `end` inclusive, oldest day first. Days with no transactions are omitted.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn get_daily_flows(
    user_id: UserID,
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<Vec<DailyFlow>, Error> {
    connection
        .prepare(
            "SELECT date, \
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), 0), \
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END), 0) \
             FROM \"transaction\" \
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3 \
             GROUP BY date \
             ORDER BY date ASC",
        )?
        .query_map(params![user_id.as_i64(), start, end], |row| {
            Ok(DailyFlow {
                date: row.get(0)?,
                income: row.get(1)?,
                expense: row.get(2)?,
            })
        })?
        .map(|flow_result| flow_result.map_err(Error::from))
        .collect()
}

/// Sum the user's categorised expenses between `start` and `end` inclusive,
/// keyed by category ID. Income and uncategorised spending are left out.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn sum_expenses_by_category(
    user_id: UserID,
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<HashMap<CategoryId, f64>, Error> {
    connection
        .prepare(
            "SELECT category_id, COALESCE(SUM(amount), 0) \
             FROM \"transaction\" \
             WHERE user_id = ?1 AND kind = 'expense' AND category_id IS NOT NULL \
                AND date BETWEEN ?2 AND ?3 \
             GROUP BY category_id",
        )?
        .query_map(params![user_id.as_i64(), start, end], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .map(|total_result| total_result.map_err(Error::from))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================



#[cfg(test)]
mod list_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        transaction::{
            Transaction, TransactionKind, create_transaction, list_recent_transactions,
            list_transactions,
        },
        user::UserID,
    };

    use crate::test_utils::{insert_test_account, insert_test_category, insert_test_user};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        insert_test_user(&conn, "test@example.com");
        insert_test_account(&conn, 1, "Everyday");
        insert_test_category(&conn, 1, "Groceries");
        conn
    }

    #[test]
    fn lists_most_recent_date_first() {
        let conn = get_test_connection();
        let user_id = UserID::new(1);
        create_transaction(
            Transaction::build(user_id, 1, TransactionKind::Expense, 1.0, date!(2025 - 06 - 01)),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(user_id, 1, TransactionKind::Expense, 2.0, date!(2025 - 06 - 03)),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(user_id, 1, TransactionKind::Expense, 3.0, date!(2025 - 06 - 02)),
            &conn,
        )
        .unwrap();

        let items = list_transactions(user_id, &conn).unwrap();

        let amounts: Vec<f64> = items.iter().map(|item| item.amount).collect();
        assert_eq!(amounts, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn joins_account_and_category_names() {
        let conn = get_test_connection();
        let user_id = UserID::new(1);
        create_transaction(
            Transaction::build(user_id, 1, TransactionKind::Expense, 10.0, date!(2025 - 06 - 01))
                .category_id(Some(1))
                .description("weekly shop"),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(user_id, 1, TransactionKind::Income, 100.0, date!(2025 - 06 - 01)),
            &conn,
        )
        .unwrap();

        let items = list_transactions(user_id, &conn).unwrap();

        assert_eq!(items.len(), 2);
        let categorised = items
            .iter()
            .find(|item| item.description == "weekly shop")
            .expect("could not find the categorised transaction");
        assert_eq!(categorised.account_name, "Everyday");
        assert_eq!(categorised.category_name, Some("Groceries".to_owned()));
        let uncategorised = items
            .iter()
            .find(|item| item.description.is_empty())
            .expect("could not find the uncategorised transaction");
        assert_eq!(uncategorised.category_name, None);
    }

    #[test]
    fn recent_list_respects_limit() {
        let conn = get_test_connection();
        let user_id = UserID::new(1);
        for day in 1..=10 {
            create_transaction(
                Transaction::build(
                    user_id,
                    1,
                    TransactionKind::Expense,
                    day as f64,
                    date!(2025 - 06 - 01).replace_day(day).unwrap(),
                ),
                &conn,
            )
            .unwrap();
        }

        let items = list_recent_transactions(user_id, 5, &conn).unwrap();

        assert_eq!(items.len(), 5);
        let amounts: Vec<f64> = items.iter().map(|item| item.amount).collect();
        assert_eq!(amounts, vec![10.0, 9.0, 8.0, 7.0, 6.0]);
    }

    #[test]
    fn list_is_scoped_to_user() {
        let conn = get_test_connection();
        insert_test_user(&conn, "other@example.com");
        insert_test_account(&conn, 2, "Other everyday");
        create_transaction(
            Transaction::build(UserID::new(2), 2, TransactionKind::Expense, 99.0, date!(2025 - 06 - 01)),
            &conn,
        )
        .unwrap();

        let items = list_transactions(UserID::new(1), &conn).unwrap();

        assert_eq!(items, vec![]);
    }
}
