//! Defines the log-in endpoint which verifies a user's credentials and sets the auth cookie pair.
//! The cookie module handles the lower level cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Duration;

use crate::{
    AppState, Error,
    app_state::create_cookie_key,
    auth::{DEFAULT_COOKIE_DURATION, cookie::set_auth_cookie},
    user::get_user_by_email,
};

/// How long the auth cookie should last if the user asks to be remembered at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl LoginState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
        }
    }
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user to log in.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password in the database, which has been verified.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInRequest {
    /// The email address the user registered with.
    pub email: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial auth cookie duration to
    /// [REMEMBER_ME_COOKIE_DURATION]. Defaults to false when omitted.
    #[serde(default)]
    pub remember_me: bool,
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie pair is set and the
/// logged-in user's ID and email are returned.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The email does not belong to a registered user or the password is not
///   correct ([Error::InvalidCredentials]).
/// - An internal error occurred when verifying the password.
pub async fn log_in_endpoint(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Json(request): Json<LogInRequest>,
) -> Result<Response, Error> {
    let user = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_user_by_email(&request.email, &connection).map_err(|error| match error {
            // An unknown email gets the same response as a wrong password.
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    let is_password_valid = user
        .password_hash
        .verify(&request.password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !is_password_valid {
        return Err(Error::InvalidCredentials);
    }

    let cookie_duration = if request.remember_me {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let jar = set_auth_cookie(jar, user.id, cookie_duration)?;

    Ok((jar, Json(json!({ "id": user.id, "email": user.email }))).into_response())
}

#[cfg(test)]
mod log_in_tests {
    use std::{
        collections::HashSet,
        sync::{Arc, Mutex},
    };

    use axum::{
        Json, Router,
        body::Body,
        extract::State,
        http::{Response, StatusCode, header::SET_COOKIE},
        routing::post,
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error, PasswordHash, ValidatedPassword,
        auth::cookie::{COOKIE_EXPIRY, COOKIE_USER_ID, DEFAULT_COOKIE_DURATION},
        endpoints,
        user::{create_user, create_user_table},
    };

    use super::{LogInRequest, LoginState, REMEMBER_ME_COOKIE_DURATION, log_in_endpoint};

    const TEST_EMAIL: &str = "test@example.com";
    const TEST_PASSWORD: &str = "iamtestingthelogin";

    fn get_test_state(with_user: bool) -> LoginState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_user_table(&connection).expect("Could not create user table");

        if with_user {
            let password_hash = PasswordHash::new(
                ValidatedPassword::new_unchecked(TEST_PASSWORD),
                // Use a low cost to keep the tests fast.
                4,
            )
            .expect("Could not hash test password");

            create_user(TEST_EMAIL, password_hash, &connection)
                .expect("Could not create test user");
        }

        LoginState::new("foobar", Arc::new(Mutex::new(connection)))
    }

    async fn new_log_in_request(
        state: LoginState,
        request: LogInRequest,
    ) -> Result<Response<Body>, Error> {
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        log_in_endpoint(State(state), jar, Json(request)).await
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_test_state(true);

        let response = new_log_in_request(
            state,
            LogInRequest {
                email: TEST_EMAIL.to_string(),
                password: TEST_PASSWORD.to_string(),
                remember_me: false,
            },
        )
        .await
        .expect("Could not log in");

        assert_eq!(response.status(), StatusCode::OK);
        assert_set_cookie(&response);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Could not read response body");
        let got: serde_json::Value =
            serde_json::from_slice(&body).expect("Could not parse response body");

        assert_eq!(got, json!({ "id": 1, "email": TEST_EMAIL }));
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let state = get_test_state(false);

        let got = new_log_in_request(
            state,
            LogInRequest {
                email: TEST_EMAIL.to_string(),
                password: TEST_PASSWORD.to_string(),
                remember_me: false,
            },
        )
        .await
        .map(|_| ());

        assert_eq!(got, Err(Error::InvalidCredentials));
    }

    #[tokio::test]
    async fn log_in_fails_with_incorrect_password() {
        let state = get_test_state(true);

        let got = new_log_in_request(
            state,
            LogInRequest {
                email: TEST_EMAIL.to_string(),
                password: "wrongpassword".to_string(),
                remember_me: false,
            },
        )
        .await
        .map(|_| ());

        assert_eq!(got, Err(Error::InvalidCredentials));
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_credentials() {
        let server = get_test_server();

        server
            .post(endpoints::LOG_IN)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn request_deserialises_without_remember_me() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD }))
            .await;

        response.assert_status_ok();
        let cookie = response.cookie(COOKIE_USER_ID);
        assert_date_time_close(
            cookie.expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + DEFAULT_COOKIE_DURATION,
        );
    }

    #[tokio::test]
    async fn remember_me_extends_auth_cookie() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({
                "email": TEST_EMAIL,
                "password": TEST_PASSWORD,
                "remember_me": true,
            }))
            .await;

        response.assert_status_ok();
        let cookie = response.cookie(COOKIE_USER_ID);
        assert_date_time_close(
            cookie.expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + REMEMBER_ME_COOKIE_DURATION,
        );
    }

    fn get_test_server() -> TestServer {
        let state = get_test_state(true);
        let app = Router::new()
            .route(endpoints::LOG_IN, post(log_in_endpoint))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(2),
            "got date time {:?}, want {:?}",
            left,
            right
        );
    }

    #[track_caller]
    fn assert_set_cookie(response: &Response<Body>) {
        let mut found_cookies = HashSet::new();

        for cookie_headers in response.headers().get_all(SET_COOKIE) {
            let cookie_string = cookie_headers.to_str().unwrap();
            let cookie = Cookie::parse(cookie_string).unwrap();

            match cookie.name() {
                COOKIE_USER_ID | COOKIE_EXPIRY => {
                    assert!(cookie.expires_datetime() > Some(OffsetDateTime::now_utc()));
                    found_cookies.insert(cookie.name().to_string());
                }
                _ => panic!("Unexpected cookie found: {}", cookie.name()),
            }
        }

        for cookie_name in [COOKIE_USER_ID, COOKIE_EXPIRY] {
            assert!(
                found_cookies.contains(cookie_name),
                "could not find cookie '{}' in {:?}",
                cookie_name,
                found_cookies
            );
        }
    }
}
