//! The endpoint for creating a budget.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, budget::core::create_budget, category::CategoryId, period::Period,
    user::UserID,
};

/// The state needed to create a budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetState {
    /// The database connection for storing the new budget.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a budget.
#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    /// The ID of the category the cap applies to.
    pub category_id: CategoryId,
    /// The calendar month the cap applies to, e.g. "2025-06".
    pub period: Period,
    /// The spending cap in dollars.
    pub amount: f64,
}

/// A route handler for creating a budget for the currently logged in user.
///
/// # Errors
/// Returns an [Error::InvalidCategory] if the category does not exist, or an
/// [Error::DatabaseLockError] if the database lock cannot be acquired.
pub async fn create_budget_endpoint(
    State(state): State<CreateBudgetState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<CreateBudgetRequest>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = create_budget(
        request.category_id,
        request.period,
        request.amount,
        user_id,
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(budget)).into_response())
}
