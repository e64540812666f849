//! Defines the core data model and shared database queries for accounts.

use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId, user::UserID};

/// The ID of an account row.
pub type AccountId = DatabaseId;

/// The kind of financial account.
///
/// Liability kinds ([AccountKind::CreditCard] and [AccountKind::Loan]) count
/// against net worth, all other kinds count towards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// An everyday bank account.
    Checking,
    /// A savings or term deposit account.
    Savings,
    /// A credit card. The balance is the amount owed.
    CreditCard,
    /// A brokerage or retirement account.
    Investment,
    /// A mortgage or personal loan. The balance is the amount owed.
    Loan,
    /// Cash tracked by hand, outside any bank.
    ManualCash,
}

impl AccountKind {
    /// The string stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Checking => "checking",
            AccountKind::Savings => "savings",
            AccountKind::CreditCard => "credit_card",
            AccountKind::Investment => "investment",
            AccountKind::Loan => "loan",
            AccountKind::ManualCash => "manual_cash",
        }
    }

    /// Whether balances of this kind reduce net worth.
    pub fn is_liability(&self) -> bool {
        matches!(self, AccountKind::CreditCard | AccountKind::Loan)
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "checking" => Some(AccountKind::Checking),
            "savings" => Some(AccountKind::Savings),
            "credit_card" => Some(AccountKind::CreditCard),
            "investment" => Some(AccountKind::Investment),
            "loan" => Some(AccountKind::Loan),
            "manual_cash" => Some(AccountKind::ManualCash),
            _ => None,
        }
    }
}

impl ToSql for AccountKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for AccountKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

time::serde::format_description!(
    synced_at_format,
    OffsetDateTime,
    "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]"
);

/// A financial account owned by a user.
///
/// `current_balance` is a cached running total: it starts at
/// `starting_balance` and is adjusted by [adjust_account_balance] whenever a
/// transaction is recorded, or overwritten by a bank sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The ID of the user that owns the account.
    pub user_id: UserID,
    /// The display name of the account.
    pub name: String,
    /// What sort of account this is.
    pub kind: AccountKind,
    /// The balance when the account was created.
    pub starting_balance: f64,
    /// The cached balance including all recorded transactions.
    pub current_balance: f64,
    /// The balance available to spend, as reported by the bank.
    pub available_balance: f64,
    /// The ISO 4217 currency code, e.g. "USD".
    pub currency: String,
    /// Whether the account is kept up to date by a bank connection.
    pub is_sync_enabled: bool,
    /// The ID the banking provider uses for this account, if synced.
    pub external_account_id: Option<String>,
    /// When the account was last refreshed from the banking provider.
    #[serde(with = "synced_at_format::option")]
    pub last_synced_at: Option<OffsetDateTime>,
}

/// Create the account table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            starting_balance REAL NOT NULL,
            current_balance REAL NOT NULL,
            available_balance REAL NOT NULL,
            currency TEXT NOT NULL,
            is_sync_enabled INTEGER NOT NULL,
            external_account_id TEXT,
            last_synced_at TEXT,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            UNIQUE(user_id, external_account_id)
        )",
        (),
    )?;

    Ok(())
}

/// Map a database row to an [Account].
///
/// Expects the columns in the order they are defined in the table.
pub fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let name = row.get(2)?;
    let kind = row.get(3)?;
    let starting_balance = row.get(4)?;
    let current_balance = row.get(5)?;
    let available_balance = row.get(6)?;
    let currency = row.get(7)?;
    let is_sync_enabled = row.get(8)?;
    let external_account_id = row.get(9)?;
    let last_synced_at = row.get(10)?;

    Ok(Account {
        id,
        user_id,
        name,
        kind,
        starting_balance,
        current_balance,
        available_balance,
        currency,
        is_sync_enabled,
        external_account_id,
        last_synced_at,
    })
}

/// Get the user's net worth: the signed sum of current balances where
/// liability accounts (credit cards and loans) count as negative.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn get_net_worth(user_id: UserID, connection: &Connection) -> Result<f64, Error> {
    let net_worth = connection
        .prepare(
            "SELECT COALESCE(SUM(
                CASE WHEN kind IN ('credit_card', 'loan')
                    THEN -current_balance
                    ELSE current_balance
                END), 0)
             FROM account
             WHERE user_id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], |row| row.get(0))?;

    Ok(net_worth)
}

/// Add `delta` to the cached balance of the user's account `account_id`.
///
/// The adjustment is a single UPDATE so that concurrent writers cannot lose
/// each other's updates. Returns whether an account row was matched; a `false`
/// return means the account does not exist or belongs to another user.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn adjust_account_balance(
    account_id: AccountId,
    user_id: UserID,
    delta: f64,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_updated = connection.execute(
        "UPDATE account
         SET current_balance = current_balance + ?1
         WHERE id = ?2 AND user_id = ?3",
        params![delta, account_id, user_id.as_i64()],
    )?;

    Ok(rows_updated > 0)
}


#[cfg(test)]
mod net_worth_tests {
    use rusqlite::{Connection, params};

    use crate::{account::AccountKind, db::initialize, user::UserID};

    use super::get_net_worth;

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn.execute(
            "INSERT INTO user (email, password) VALUES ('test@example.com', 'hunter2')",
            (),
        )
        .unwrap();
        conn
    }

    fn insert_account(conn: &Connection, user_id: i64, kind: AccountKind, balance: f64) {
        conn.execute(
            "INSERT INTO account (user_id, name, kind, starting_balance, current_balance, \
             available_balance, currency, is_sync_enabled) \
             VALUES (?1, ?2, ?3, ?4, ?4, ?4, 'USD', 0)",
            params![user_id, format!("{kind:?}"), kind, balance],
        )
        .unwrap();
    }

    #[test]
    fn liabilities_count_as_negative() {
        let conn = get_test_connection();
        insert_account(&conn, 1, AccountKind::Checking, 1000.0);
        insert_account(&conn, 1, AccountKind::CreditCard, 300.0);

        let net_worth = get_net_worth(UserID::new(1), &conn).unwrap();

        assert_eq!(
            net_worth, 700.0,
            "want net worth 700, got {net_worth}"
        );
    }

    #[test]
    fn sums_all_asset_kinds() {
        let conn = get_test_connection();
        insert_account(&conn, 1, AccountKind::Checking, 100.0);
        insert_account(&conn, 1, AccountKind::Savings, 200.0);
        insert_account(&conn, 1, AccountKind::Investment, 300.0);
        insert_account(&conn, 1, AccountKind::ManualCash, 50.0);
        insert_account(&conn, 1, AccountKind::Loan, 400.0);

        let net_worth = get_net_worth(UserID::new(1), &conn).unwrap();

        assert_eq!(net_worth, 250.0);
    }

    #[test]
    fn returns_zero_for_no_accounts() {
        let conn = get_test_connection();

        let net_worth = get_net_worth(UserID::new(1), &conn).unwrap();

        assert_eq!(net_worth, 0.0);
    }

    #[test]
    fn ignores_other_users_accounts() {
        let conn = get_test_connection();
        conn.execute(
            "INSERT INTO user (email, password) VALUES ('other@example.com', 'hunter2')",
            (),
        )
        .unwrap();
        insert_account(&conn, 1, AccountKind::Checking, 1000.0);
        insert_account(&conn, 2, AccountKind::Checking, 9999.0);

        let net_worth = get_net_worth(UserID::new(1), &conn).unwrap();

        assert_eq!(net_worth, 1000.0);
    }
}
