//! The storage for linked institution logins.

use rusqlite::{Connection, Row, params};

use crate::{Error, database_id::DatabaseId, user::UserID};

/// The ID of an external connection row.
pub type ConnectionId = DatabaseId;

/// A linked institution login at a banking data provider.
///
/// The access token is a credential, this type must never be serialized into
/// a response body.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalConnection {
    /// The ID of the connection.
    pub id: ConnectionId,
    /// The ID of the user who linked the institution.
    pub user_id: UserID,
    /// The provider the login lives at, e.g. "plaid".
    pub provider: String,
    /// The provider's identifier for the institution login.
    pub item_id: String,
    /// The long lived token used to fetch data for this login.
    pub access_token: String,
}

/// Create the external connection table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_connection_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS external_connection (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            provider TEXT NOT NULL,
            item_id TEXT NOT NULL,
            access_token TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_connection_row(row: &Row) -> Result<ExternalConnection, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let provider = row.get(2)?;
    let item_id = row.get(3)?;
    let access_token = row.get(4)?;

    Ok(ExternalConnection {
        id,
        user_id,
        provider,
        item_id,
        access_token,
    })
}

/// Store a newly linked institution login.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn create_connection(
    user_id: UserID,
    provider: &str,
    item_id: &str,
    access_token: &str,
    connection: &Connection,
) -> Result<ExternalConnection, Error> {
    connection.execute(
        "INSERT INTO external_connection (user_id, provider, item_id, access_token) \
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id.as_i64(), provider, item_id, access_token],
    )?;

    let id = connection.last_insert_rowid();

    Ok(ExternalConnection {
        id,
        user_id,
        provider: provider.to_owned(),
        item_id: item_id.to_owned(),
        access_token: access_token.to_owned(),
    })
}

/// Get all of the user's linked institution logins, oldest first.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn list_connections(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<ExternalConnection>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, provider, item_id, access_token FROM external_connection \
             WHERE user_id = :user_id \
             ORDER BY id ASC",
        )?
        .query_map(
            &[(":user_id", &user_id.as_i64())],
            map_connection_row,
        )?
        .map(|connection_result| connection_result.map_err(Error::from))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod connection_query_tests {
    use rusqlite::Connection;

    use crate::{db::initialize, test_utils::insert_test_user, user::UserID};

    use super::{ExternalConnection, create_connection, list_connections};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        insert_test_user(&conn, "test@example.com");
        conn
    }

    #[test]
    fn create_connection_succeeds() {
        let conn = get_test_connection();

        let connection = create_connection(
            UserID::new(1),
            "plaid",
            "item-sandbox-1",
            "access-sandbox-1",
            &conn,
        )
        .expect("creating a connection should succeed");

        assert_eq!(
            connection,
            ExternalConnection {
                id: 1,
                user_id: UserID::new(1),
                provider: "plaid".to_owned(),
                item_id: "item-sandbox-1".to_owned(),
                access_token: "access-sandbox-1".to_owned(),
            }
        );
    }

    #[test]
    fn list_returns_connections_oldest_first() {
        let conn = get_test_connection();
        let first =
            create_connection(UserID::new(1), "plaid", "item-1", "token-1", &conn).unwrap();
        let second =
            create_connection(UserID::new(1), "plaid", "item-2", "token-2", &conn).unwrap();

        let got = list_connections(UserID::new(1), &conn)
            .expect("listing connections should succeed");

        assert_eq!(got, vec![first, second]);
    }

    #[test]
    fn list_is_scoped_to_user() {
        let conn = get_test_connection();
        insert_test_user(&conn, "other@example.com");
        create_connection(UserID::new(1), "plaid", "item-1", "token-1", &conn).unwrap();
        let other =
            create_connection(UserID::new(2), "plaid", "item-2", "token-2", &conn).unwrap();

        let got = list_connections(UserID::new(2), &conn)
            .expect("listing connections should succeed");

        assert_eq!(got, vec![other]);
    }
}
