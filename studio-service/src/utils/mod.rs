pub mod cookies;
pub mod password;
pub mod validation;

pub use cookies::{CookiePolicy, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
pub use password::{
    hash_password, verify_against_dummy, verify_password, Password, PasswordHashString,
};
pub use validation::ValidatedJson;
