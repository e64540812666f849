//! Defines the endpoint for registering a new user.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState, Error,
    auth::password::{PasswordHash, ValidatedPassword},
    user::create_user,
};

/// The state needed to register a user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection for storing new users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for registering a user.
///
/// The password is kept as a plain string here and validated in the endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    /// The email address to register with.
    pub email: String,
    /// The password to sign in with.
    pub password: String,
}

/// A route handler for registering a new user.
///
/// Registering does not log the user in, the client should call the log-in
/// endpoint next.
///
/// # Errors
///
/// This function will return a:
/// - [Error::TooWeak] if the password is considered too weak,
/// - [Error::DuplicateEmail] if a user with the email already exists,
/// - [Error::HashingError] if the password could not be hashed,
/// - or [Error::DatabaseLockError] if the database lock cannot be acquired.
pub async fn register_user_endpoint(
    State(state): State<RegistrationState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<Response, Error> {
    let validated_password = ValidatedPassword::new(&request.password)?;
    let password_hash = PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = create_user(&request.email, password_hash, &connection)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": user.id, "email": user.email })),
    )
        .into_response())
}
