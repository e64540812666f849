//! Log-out route handler that invalidates authentication cookies.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde_json::json;

use crate::auth::cookie::invalidate_auth_cookie;

/// Invalidate the auth cookie pair, logging the client out.
pub async fn log_out_endpoint(jar: PrivateCookieJar) -> Response {
    let jar = invalidate_auth_cookie(jar);

    (jar, Json(json!({ "success": true }))).into_response()
}
