//! User authentication: password hashing and validation, the encrypted auth
//! cookie pair, and the register, log-in, and log-out endpoints.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod register;

pub use cookie::DEFAULT_COOKIE_DURATION;
pub use log_in::{LogInRequest, log_in_endpoint};
pub use log_out::log_out_endpoint;
pub use middleware::auth_guard;
pub use password::{PasswordHash, ValidatedPassword};
pub use register::{RegisterUserRequest, register_user_endpoint};

pub(crate) use cookie::set_auth_cookie;
pub(crate) use log_in::LoginState;
pub(crate) use middleware::AuthState;
pub(crate) use register::RegistrationState;
