//! Sets up the application's database.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error, account::create_account_table, budget::create_budget_table,
    category::create_category_table, sync::create_connection_table,
    transaction::create_transaction_table, user::create_user_table,
};

/// Create the tables for the domain models if they do not exist.
///
/// The tables are created within a single exclusive transaction so that
/// concurrent server start-ups cannot observe a half-initialized schema.
///
/// # Errors
///
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_connection_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
